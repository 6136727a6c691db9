//! Troubleshooting scenarios synthesized from extracted artifacts.

use serde::Serialize;
use std::collections::BTreeSet;

use super::{ErrorPattern, ErrorType, PermissionRequirement};

/// Maximum number of permission diagnostics folded into one scenario.
const MAX_PERMISSION_DIAGNOSTICS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceScenario {
    pub name: String,
    pub trigger: String,
    pub diagnostic_steps: Vec<String>,
    pub resolution_steps: Vec<String>,
    pub preventive_measures: Vec<String>,
}

impl MaintenanceScenario {
    pub fn to_maintenance_doc(&self) -> String {
        let mut doc = format!("### {}\n\nTrigger: {}\n", self.name, self.trigger);
        for (title, steps) in [
            ("Diagnose", &self.diagnostic_steps),
            ("Resolve", &self.resolution_steps),
            ("Prevent", &self.preventive_measures),
        ] {
            if steps.is_empty() {
                continue;
            }
            doc.push_str(&format!("\n{}:\n", title));
            for (i, step) in steps.iter().enumerate() {
                doc.push_str(&format!("{}. {}\n", i + 1, step));
            }
        }
        doc
    }
}

/// Build one scenario per distinct unhandled error pattern.
///
/// Handled exceptions are recovered from in code and produce no scenario.
/// Cloud API errors fold in the diagnostics of the first few cloud
/// permissions, since access denial is their most common cause.
pub fn synthesize_scenarios(
    errors: &[ErrorPattern],
    permissions: &BTreeSet<PermissionRequirement>,
) -> Vec<MaintenanceScenario> {
    let permission_diagnostics: Vec<String> = permissions
        .iter()
        .filter(|p| p.is_cloud())
        .take(MAX_PERMISSION_DIAGNOSTICS)
        .flat_map(|p| p.diagnostic_steps())
        .collect();

    let mut seen = BTreeSet::new();
    let mut scenarios = Vec::new();

    for error in errors {
        if error.error_type() == ErrorType::HandledException {
            continue;
        }
        if !seen.insert((error.error_type(), error.pattern().to_string())) {
            continue;
        }

        let mut diagnostic_steps = vec![format!(
            "Search the logs for `{}`",
            error.pattern()
        )];
        if error.error_type() == ErrorType::AwsError {
            diagnostic_steps.extend(permission_diagnostics.iter().cloned());
        }

        scenarios.push(MaintenanceScenario {
            name: scenario_name(error),
            trigger: format!("{} raised: {}", error.error_type(), error.pattern()),
            diagnostic_steps,
            resolution_steps: error.recovery_steps().to_vec(),
            preventive_measures: preventive_measures(error.error_type()),
        });
    }

    scenarios
}

fn scenario_name(error: &ErrorPattern) -> String {
    let subject: String = error.pattern().chars().take(60).collect();
    match error.error_type() {
        ErrorType::Validation => format!("Invalid input: {}", subject),
        ErrorType::Exception => format!("Unexpected failure: {}", subject),
        ErrorType::Retry => format!("Retries exhausted: {}", subject),
        ErrorType::AwsError => format!("Cloud API error: {}", subject),
        ErrorType::HandledException => format!("Handled: {}", subject),
    }
}

fn preventive_measures(error_type: ErrorType) -> Vec<String> {
    match error_type {
        ErrorType::Validation => vec!["Validate parameters before invocation".to_string()],
        ErrorType::Exception => vec!["Add a regression test covering this failure".to_string()],
        ErrorType::Retry => vec!["Alert on elevated retry rates".to_string()],
        ErrorType::AwsError => vec![
            "Keep IAM policies in version control and review them with each release".to_string(),
        ],
        ErrorType::HandledException => Vec::new(),
    }
}
