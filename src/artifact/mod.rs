//! Artifact model shared by every extractor.
//!
//! Artifacts are plain values: they carry what was found in source and know
//! how to render themselves as a line of maintenance documentation.

mod config_item;
mod connection;
mod error_pattern;
mod permission;
mod scenario;
mod state;

pub use config_item::{is_sensitive_name, ConfigArtifact, ValueType, SENSITIVE_MARKERS};
pub use connection::{ConnectionKind, ConnectionRequirement};
pub use error_pattern::{ErrorPattern, ErrorType, Severity};
pub use permission::PermissionRequirement;
pub use scenario::{synthesize_scenarios, MaintenanceScenario};
pub use state::{StateFlavor, StateManagement, StateManagementBuilder};
