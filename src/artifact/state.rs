//! State-management semantics of a module or program.

use serde::Serialize;

/// Format-specific state flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum StateFlavor {
    /// Infrastructure modules that report changes and may support dry runs.
    Module {
        supports_check_mode: bool,
        supports_diff: bool,
        tracks_changed: bool,
    },
    /// General programs that persist their own state.
    Source {
        persists_to_file: bool,
        uses_transactions: bool,
    },
}

impl StateFlavor {
    /// State type implied by the flags when none is given explicitly.
    fn implied_state_type(&self) -> &'static str {
        match self {
            StateFlavor::Module {
                supports_check_mode,
                tracks_changed,
                ..
            } => match (supports_check_mode, tracks_changed) {
                (true, true) => "declarative",
                (_, true) => "tracked",
                _ => "imperative",
            },
            StateFlavor::Source {
                persists_to_file,
                uses_transactions,
            } => {
                if *uses_transactions {
                    "transactional"
                } else if *persists_to_file {
                    "file"
                } else {
                    "in_memory"
                }
            }
        }
    }

    fn default_validation_steps(&self) -> Vec<String> {
        match self {
            StateFlavor::Module {
                supports_check_mode,
                supports_diff,
                tracks_changed,
            } => {
                let mut steps = Vec::new();
                if *supports_check_mode {
                    steps.push(
                        "Run in check mode to preview changes without applying them".to_string(),
                    );
                }
                if *supports_diff {
                    steps.push("Run with diff enabled to review the exact changes".to_string());
                }
                if *tracks_changed {
                    steps.push("Re-run and confirm the result reports changed=false".to_string());
                }
                steps
            }
            StateFlavor::Source {
                persists_to_file,
                uses_transactions,
            } => {
                let mut steps = Vec::new();
                if *persists_to_file {
                    steps.push("Inspect the persisted state file for completeness".to_string());
                }
                if *uses_transactions {
                    steps.push("Check for open or aborted transactions".to_string());
                }
                steps
            }
        }
    }
}

/// How a component manages the state it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateManagement {
    pub state_type: String,
    pub state_location: String,
    pub idempotency_support: bool,
    pub rollback_support: bool,
    pub state_validation_steps: Vec<String>,
    #[serde(flatten)]
    pub flavor: StateFlavor,
}

/// Builder input for [`StateManagement`].
#[derive(Debug, Clone)]
pub struct StateManagementBuilder {
    state_type: Option<String>,
    state_location: String,
    idempotency_support: bool,
    rollback_support: bool,
    state_validation_steps: Vec<String>,
    flavor: StateFlavor,
}

impl StateManagement {
    pub fn builder(
        flavor: StateFlavor,
        state_location: impl Into<String>,
    ) -> StateManagementBuilder {
        StateManagementBuilder {
            state_type: None,
            state_location: state_location.into(),
            idempotency_support: false,
            rollback_support: false,
            state_validation_steps: Vec::new(),
            flavor,
        }
    }

    pub fn to_maintenance_doc(&self) -> String {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        format!(
            "{} state in {} (idempotent: {}, rollback: {})",
            self.state_type,
            self.state_location,
            yes_no(self.idempotency_support),
            yes_no(self.rollback_support)
        )
    }
}

impl StateManagementBuilder {
    pub fn state_type(mut self, state_type: impl Into<String>) -> Self {
        self.state_type = Some(state_type.into());
        self
    }

    pub fn idempotent(mut self, yes: bool) -> Self {
        self.idempotency_support = yes;
        self
    }

    pub fn rollback(mut self, yes: bool) -> Self {
        self.rollback_support = yes;
        self
    }

    pub fn validation_step(mut self, step: impl Into<String>) -> Self {
        self.state_validation_steps.push(step.into());
        self
    }

    /// Finish construction, deriving `state_type` and default validation
    /// steps from the flavor flags when they were not supplied.
    pub fn build(self) -> StateManagement {
        let state_type = self
            .state_type
            .unwrap_or_else(|| self.flavor.implied_state_type().to_string());

        let mut steps = self.flavor.default_validation_steps();
        for step in self.state_validation_steps {
            if !steps.contains(&step) {
                steps.push(step);
            }
        }

        StateManagement {
            state_type,
            state_location: self.state_location,
            idempotency_support: self.idempotency_support,
            rollback_support: self.rollback_support,
            state_validation_steps: steps,
            flavor: self.flavor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(check: bool, diff: bool, changed: bool) -> StateFlavor {
        StateFlavor::Module {
            supports_check_mode: check,
            supports_diff: diff,
            tracks_changed: changed,
        }
    }

    #[test]
    fn test_state_type_derived_from_module_flags() {
        let s = StateManagement::builder(module(true, false, true), "remote").build();
        assert_eq!(s.state_type, "declarative");

        let s = StateManagement::builder(module(false, false, true), "remote").build();
        assert_eq!(s.state_type, "tracked");

        let s = StateManagement::builder(module(false, false, false), "remote").build();
        assert_eq!(s.state_type, "imperative");
    }

    #[test]
    fn test_explicit_state_type_wins() {
        let s = StateManagement::builder(module(true, true, true), "remote")
            .state_type("custom")
            .build();
        assert_eq!(s.state_type, "custom");
    }

    #[test]
    fn test_source_flavor_state_type() {
        let flavor = StateFlavor::Source {
            persists_to_file: true,
            uses_transactions: false,
        };
        let s = StateManagement::builder(flavor, "local file").build();
        assert_eq!(s.state_type, "file");
        assert_eq!(s.state_validation_steps.len(), 1);
    }

    #[test]
    fn test_validation_steps_not_duplicated() {
        let s = StateManagement::builder(module(true, false, false), "remote")
            .validation_step("Run in check mode to preview changes without applying them")
            .validation_step("Query the resource")
            .build();
        assert_eq!(s.state_validation_steps.len(), 2);
    }
}
