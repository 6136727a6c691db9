//! Extraction of maintenance artifacts from source text.
//!
//! This module provides:
//! - `Extractor` trait: the capability set every source format implements
//! - `ExtractedArtifacts`: the merged output of one or more extractions
//! - `ExtractorSet`: an explicit name-to-extractor mapping built at startup
//!
//! Every operation is total over text. Malformed input degrades to empty
//! results; nothing here returns an error.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::artifact::{
    synthesize_scenarios, ConfigArtifact, ConnectionKind, ConnectionRequirement, ErrorPattern,
    ErrorType, PermissionRequirement, StateManagement,
};
use crate::coverage::ExtractedData;

pub mod config;
pub mod module;
pub mod patterns;
pub mod source;

pub use config::{ConfigExtractor, ConfigFormat};
pub use module::ModuleExtractor;
pub use source::{SourceExtractor, SourceLanguage};

/// Capability set shared by every source format.
pub trait Extractor: Send + Sync {
    /// Short identifier used for routing and in reports (e.g. "module").
    fn name(&self) -> &'static str;

    fn extract_permissions(&self, source: &str) -> BTreeSet<PermissionRequirement>;

    fn extract_error_patterns(&self, source: &str) -> Vec<ErrorPattern>;

    /// `None` when the source shows no state-management behavior.
    fn extract_state_management(&self, source: &str) -> Option<StateManagement>;

    /// Package names in first-seen order, without duplicates.
    fn extract_dependencies(&self, source: &str) -> Vec<String>;

    fn extract_connection_requirements(&self, source: &str) -> Vec<ConnectionRequirement>;

    /// Run every capability over `source`.
    fn extract(&self, source: &str) -> ExtractedArtifacts {
        ExtractedArtifacts {
            permissions: self.extract_permissions(source),
            error_patterns: self.extract_error_patterns(source),
            state_management: self.extract_state_management(source),
            dependencies: self.extract_dependencies(source),
            connection_requirements: self.extract_connection_requirements(source),
            config: Vec::new(),
        }
    }
}

/// Everything extracted from one file, or merged across many.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedArtifacts {
    pub permissions: BTreeSet<PermissionRequirement>,
    pub error_patterns: Vec<ErrorPattern>,
    pub state_management: Option<StateManagement>,
    pub dependencies: Vec<String>,
    pub connection_requirements: Vec<ConnectionRequirement>,
    pub config: Vec<ConfigArtifact>,
}

impl ExtractedArtifacts {
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
            && self.error_patterns.is_empty()
            && self.state_management.is_none()
            && self.dependencies.is_empty()
            && self.connection_requirements.is_empty()
            && self.config.is_empty()
    }

    /// Fold `other` into `self`.
    ///
    /// Permissions are a set union; lists keep their first occurrence; the
    /// first state descriptor seen wins. Config items are keyed by name.
    pub fn merge(&mut self, other: ExtractedArtifacts) {
        self.permissions.extend(other.permissions);

        for pattern in other.error_patterns {
            if !self.error_patterns.contains(&pattern) {
                self.error_patterns.push(pattern);
            }
        }

        if self.state_management.is_none() {
            self.state_management = other.state_management;
        }

        for dep in other.dependencies {
            if !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }

        for conn in other.connection_requirements {
            if !self.connection_requirements.contains(&conn) {
                self.connection_requirements.push(conn);
            }
        }

        for item in other.config {
            if !self.config.iter().any(|c| c.name == item.name) {
                self.config.push(item);
            }
        }
    }

    /// Shape the artifacts into per-dimension documentation data.
    ///
    /// A dimension is only emitted when something was extracted for it, so
    /// absent artifacts surface as gaps rather than as empty sections.
    pub fn to_dimension_data(&self) -> ExtractedData {
        let mut data = ExtractedData::new();

        if let Some(v) = self.permissions_data() {
            data.insert("permissions".to_string(), v);
        }
        if let Some(v) = self.error_handling_data() {
            data.insert("error_handling".to_string(), v);
        }
        if let Some(v) = self.state_data() {
            data.insert("state_management".to_string(), v);
        }
        if let Some(v) = self.dependencies_data() {
            data.insert("dependencies".to_string(), v);
        }
        if let Some(v) = self.connections_data() {
            data.insert("connections".to_string(), v);
        }
        if let Some(v) = self.configuration_data() {
            data.insert("configuration".to_string(), v);
        }
        if let Some(v) = self.troubleshooting_data() {
            data.insert("troubleshooting".to_string(), v);
        }

        data
    }

    fn permissions_data(&self) -> Option<Value> {
        if self.permissions.is_empty() {
            return None;
        }
        let required: Vec<Value> = self
            .permissions
            .iter()
            .map(|p| {
                json!({
                    "service": p.resource_type(),
                    "action": p.action(),
                    "target": p.target(),
                    "purpose": p.to_maintenance_doc(),
                    "failure_impact": failure_impact(p),
                })
            })
            .collect();
        let scope: BTreeSet<&str> = self.permissions.iter().map(|p| p.resource_type()).collect();
        let diagnostics = patterns::dedup_preserving_order(
            self.permissions.iter().flat_map(|p| p.diagnostic_steps()),
        );

        Some(json!({
            "required_permissions": required,
            "permission_scope": scope.into_iter().collect::<Vec<_>>().join(", "),
            "diagnostic_steps": diagnostics,
        }))
    }

    fn error_handling_data(&self) -> Option<Value> {
        if self.error_patterns.is_empty() {
            return None;
        }
        let patterns: Vec<Value> = self
            .error_patterns
            .iter()
            .map(|e| {
                json!({
                    "pattern": e.pattern(),
                    "error_type": e.error_type().as_str(),
                    "severity": e.severity().as_str(),
                    "recovery_steps": e.recovery_steps(),
                })
            })
            .collect();

        let mut out = Map::new();
        out.insert("error_patterns".to_string(), Value::from(patterns));

        let procedures: Vec<String> = self
            .error_patterns
            .iter()
            .filter(|e| e.error_type() != ErrorType::HandledException)
            .map(ErrorPattern::to_maintenance_doc)
            .collect();
        if !procedures.is_empty() {
            out.insert("recovery_procedures".to_string(), json!(procedures));
        }

        let retries: Vec<&str> = self
            .error_patterns
            .iter()
            .filter(|e| e.error_type() == ErrorType::Retry)
            .map(ErrorPattern::pattern)
            .collect();
        if !retries.is_empty() {
            out.insert(
                "retry_strategy".to_string(),
                json!({
                    "mechanisms": retries,
                    "recovery_steps": ["Check whether retries were exhausted in the logs"],
                }),
            );
        }

        Some(Value::Object(out))
    }

    fn state_data(&self) -> Option<Value> {
        let state = self.state_management.as_ref()?;
        let mut out = Map::new();
        out.insert("state_type".to_string(), json!(state.state_type));
        out.insert("state_location".to_string(), json!(state.state_location));
        out.insert(
            "idempotency".to_string(),
            json!({
                "supported": state.idempotency_support,
                "verification": state.state_validation_steps.first(),
            }),
        );
        if state.rollback_support {
            out.insert(
                "rollback_procedure".to_string(),
                json!("Re-run with the previous desired state to revert the change"),
            );
        }
        if !state.state_validation_steps.is_empty() {
            out.insert(
                "state_validation".to_string(),
                json!(state.state_validation_steps),
            );
        }
        Some(Value::Object(out))
    }

    fn dependencies_data(&self) -> Option<Value> {
        if self.dependencies.is_empty() {
            return None;
        }
        let runtime: Vec<Value> = self
            .dependencies
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "failure_impact": format!("Import of `{}` fails and the component cannot start", name),
                })
            })
            .collect();
        Some(json!({ "runtime_dependencies": runtime }))
    }

    fn connections_data(&self) -> Option<Value> {
        if self.connection_requirements.is_empty() {
            return None;
        }
        let mut out = Map::new();
        out.insert(
            "connection_requirements".to_string(),
            json!(self.connection_requirements),
        );

        let network: Vec<&str> = self
            .connection_requirements
            .iter()
            .filter(|c| c.requirement_type == ConnectionKind::Network)
            .map(|c| c.description.as_str())
            .collect();
        if !network.is_empty() {
            out.insert("network_requirements".to_string(), json!(network));
        }

        let commands = patterns::dedup_preserving_order(
            self.connection_requirements
                .iter()
                .flat_map(|c| c.validation_steps.iter().cloned()),
        );
        if !commands.is_empty() {
            out.insert("validation_commands".to_string(), json!(commands));
        }
        Some(Value::Object(out))
    }

    fn configuration_data(&self) -> Option<Value> {
        if self.config.is_empty() {
            return None;
        }
        let mut out = Map::new();
        let params: Vec<Value> = self
            .config
            .iter()
            .map(|c| {
                let default = if c.sensitive { None } else { c.default.as_deref() };
                json!({
                    "name": c.name,
                    "type": c.value_type.as_str(),
                    "default": default,
                    "description": c.to_maintenance_doc(),
                })
            })
            .collect();
        out.insert("config_parameters".to_string(), Value::from(params));

        let sensitive: Vec<&str> = self
            .config
            .iter()
            .filter(|c| c.sensitive)
            .map(|c| c.name.as_str())
            .collect();
        if !sensitive.is_empty() {
            out.insert("sensitive_parameters".to_string(), json!(sensitive));
        }

        let formats: BTreeSet<&str> = self.config.iter().map(|c| c.format.as_str()).collect();
        out.insert("config_files".to_string(), json!(formats));
        Some(Value::Object(out))
    }

    fn troubleshooting_data(&self) -> Option<Value> {
        let scenarios = synthesize_scenarios(&self.error_patterns, &self.permissions);
        if scenarios.is_empty() {
            return None;
        }
        let procedures = patterns::dedup_preserving_order(
            scenarios
                .iter()
                .flat_map(|s| s.diagnostic_steps.iter().cloned()),
        );
        Some(json!({
            "maintenance_scenarios": scenarios,
            "diagnostic_procedures": procedures,
        }))
    }
}

fn failure_impact(permission: &PermissionRequirement) -> String {
    match permission {
        PermissionRequirement::Cloud { .. } => {
            format!("Calls to `{}` fail with an access denied error", permission)
        }
        PermissionRequirement::Filesystem { .. } => {
            format!("{} operations fail with a permission error", permission.action())
        }
        PermissionRequirement::Network { .. } => {
            "Outbound requests are refused or time out".to_string()
        }
        PermissionRequirement::Database { .. } => {
            "Queries are rejected by the database".to_string()
        }
    }
}

/// The extractors available to a run, keyed by name.
///
/// Built once at startup and shared by reference across workers.
pub struct ExtractorSet {
    extractors: BTreeMap<&'static str, Box<dyn Extractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self {
            extractors: BTreeMap::new(),
        }
    }

    /// Every built-in extractor.
    pub fn standard() -> Self {
        let mut set = Self::new();
        set.register(Box::new(ModuleExtractor::new()));
        set.register(Box::new(SourceExtractor::new(SourceLanguage::Python)));
        set.register(Box::new(SourceExtractor::new(SourceLanguage::JavaScript)));
        for format in ConfigFormat::ALL {
            set.register(Box::new(ConfigExtractor::new(format)));
        }
        set
    }

    /// Add an extractor, replacing any previous one with the same name.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.name(), extractor);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Extractor> {
        self.extractors.get(name).map(|e| e.as_ref())
    }

    /// The primary extractor for a file, if any handles it.
    ///
    /// Python files declaring an Ansible-style module go to `module`; other
    /// code goes to the generic source extractor for its language.
    pub fn select(&self, file_name: &str, source: &str) -> Option<&dyn Extractor> {
        self.select_all(file_name, source).into_iter().next()
    }

    /// Every extractor that applies to a file, primary first.
    ///
    /// Code files also get the environment-lookup config extractor.
    pub fn select_all(&self, file_name: &str, source: &str) -> Vec<&dyn Extractor> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let names: Vec<&str> = match SourceLanguage::from_extension(&ext) {
            Some(SourceLanguage::Python) if ModuleExtractor::is_module_source(source) => {
                vec!["module", ConfigFormat::Source.extractor_name()]
            }
            Some(language) => vec![
                language.extractor_name(),
                ConfigFormat::Source.extractor_name(),
            ],
            None => match ConfigFormat::from_file_name(file_name) {
                Some(format) => vec![format.extractor_name()],
                None => Vec::new(),
            },
        };

        names.into_iter().filter_map(|n| self.get(n)).collect()
    }

    /// Extract a file with every applicable extractor and merge the results.
    pub fn extract_file(&self, file_name: &str, source: &str) -> ExtractedArtifacts {
        let mut merged = ExtractedArtifacts::default();
        for extractor in self.select_all(file_name, source) {
            tracing::debug!(file = file_name, extractor = extractor.name(), "extracting");
            merged.merge(extractor.extract(source));
        }
        merged
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{StateFlavor, ValueType};

    #[test]
    fn test_merge_unions_and_dedups() {
        let mut a = ExtractedArtifacts::default();
        a.permissions
            .insert(PermissionRequirement::cloud("ec2", "DescribeInstances"));
        a.dependencies = vec!["boto3".to_string()];
        a.error_patterns = vec![ErrorPattern::new("bad", ErrorType::Validation)];

        let mut b = ExtractedArtifacts::default();
        b.permissions
            .insert(PermissionRequirement::cloud("ec2", "DescribeInstances"));
        b.permissions
            .insert(PermissionRequirement::cloud("s3", "PutObject"));
        b.dependencies = vec!["requests".to_string(), "boto3".to_string()];
        b.error_patterns = vec![ErrorPattern::new("bad", ErrorType::Validation)];

        a.merge(b);
        assert_eq!(a.permissions.len(), 2);
        assert_eq!(a.dependencies, vec!["boto3", "requests"]);
        assert_eq!(a.error_patterns.len(), 1);
    }

    #[test]
    fn test_merge_keeps_first_state() {
        let first = StateManagement::builder(
            StateFlavor::Source {
                persists_to_file: true,
                uses_transactions: false,
            },
            "local",
        )
        .build();
        let mut a = ExtractedArtifacts {
            state_management: Some(first.clone()),
            ..Default::default()
        };
        let b = ExtractedArtifacts {
            state_management: Some(
                StateManagement::builder(
                    StateFlavor::Source {
                        persists_to_file: false,
                        uses_transactions: true,
                    },
                    "db",
                )
                .build(),
            ),
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(a.state_management, Some(first));
    }

    #[test]
    fn test_empty_artifacts_produce_no_dimension_data() {
        assert!(ExtractedArtifacts::default().to_dimension_data().is_empty());
    }

    #[test]
    fn test_dimension_data_shapes() {
        let mut artifacts = ExtractedArtifacts::default();
        artifacts
            .permissions
            .insert(PermissionRequirement::cloud("ec2", "TerminateInstances"));
        artifacts.error_patterns = vec![
            ErrorPattern::new("UnauthorizedOperation", ErrorType::AwsError),
            ErrorPattern::new("KeyError", ErrorType::HandledException),
        ];
        artifacts.config = vec![ConfigArtifact::new(
            "DB_PASSWORD",
            ValueType::String,
            Some("hunter2".to_string()),
            "env",
        )];

        let data = artifacts.to_dimension_data();
        let perms = &data["permissions"];
        assert_eq!(perms["required_permissions"][0]["action"], "TerminateInstances");
        assert!(perms["required_permissions"][0]["failure_impact"].is_string());

        let errors = &data["error_handling"];
        assert_eq!(errors["error_patterns"].as_array().map(Vec::len), Some(2));
        assert_eq!(errors["recovery_procedures"].as_array().map(Vec::len), Some(1));
        assert!(errors.get("retry_strategy").is_none());

        let config = &data["configuration"];
        assert_eq!(config["sensitive_parameters"][0], "DB_PASSWORD");
        assert!(config["config_parameters"][0]["default"].is_null());

        let troubleshooting = &data["troubleshooting"];
        assert_eq!(
            troubleshooting["maintenance_scenarios"].as_array().map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn test_select_routes_by_file_and_content() {
        let set = ExtractorSet::standard();
        let module_src = "from ansible.module_utils.basic import AnsibleModule\n";
        assert_eq!(set.select("ec2.py", module_src).map(|e| e.name()), Some("module"));
        assert_eq!(
            set.select("app.py", "import os\n").map(|e| e.name()),
            Some("source-python")
        );
        assert_eq!(
            set.select("server.js", "").map(|e| e.name()),
            Some("source-javascript")
        );
        assert_eq!(set.select(".env", "").map(|e| e.name()), Some("config-env"));
        assert_eq!(
            set.select("settings.yaml", "").map(|e| e.name()),
            Some("config-yaml")
        );
        assert_eq!(
            set.select("lib/worker.MJS", "").map(|e| e.name()),
            Some("source-javascript")
        );
        assert!(set.select("README.md", "").is_none());

        let all: Vec<&str> = set
            .select_all("app.py", "")
            .into_iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(all, vec!["source-python", "config-source"]);
    }
}
