//! External runtime dependencies (network, database, cloud API).

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Network,
    Database,
    CloudApi,
    Authentication,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Network => "network",
            ConnectionKind::Database => "database",
            ConnectionKind::CloudApi => "cloud_api",
            ConnectionKind::Authentication => "authentication",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something the component must be able to reach at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionRequirement {
    pub requirement_type: ConnectionKind,
    pub description: String,
    pub validation_steps: Vec<String>,
}

impl ConnectionRequirement {
    pub fn new(
        requirement_type: ConnectionKind,
        description: impl Into<String>,
        validation_steps: Vec<String>,
    ) -> Self {
        Self {
            requirement_type,
            description: description.into(),
            validation_steps,
        }
    }

    /// Cloud API access for one service.
    pub fn cloud_api(service: &str) -> Self {
        Self::new(
            ConnectionKind::CloudApi,
            format!("AWS API access to {}", service),
            vec![
                "Confirm AWS credentials are available (environment, profile or instance role)".to_string(),
                "Confirm the target region is configured".to_string(),
                format!("Check that the {} endpoint is reachable from the host", service),
            ],
        )
    }

    pub fn to_maintenance_doc(&self) -> String {
        format!("{}: {}", self.requirement_type, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_api_requirement() {
        let c = ConnectionRequirement::cloud_api("ec2");
        assert_eq!(c.requirement_type, ConnectionKind::CloudApi);
        assert!(c.description.contains("ec2"));
        assert_eq!(c.validation_steps.len(), 3);
        assert_eq!(c.to_maintenance_doc(), "cloud_api: AWS API access to ec2");
    }
}
