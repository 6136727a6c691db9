//! Permission requirements detected in source.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A capability a piece of code needs at runtime.
///
/// Equality, hashing and ordering are defined on the semantic key
/// `(resource_type, action, target)` so that collections of permissions
/// behave as true sets regardless of how many call sites produced them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionRequirement {
    /// A cloud API action, e.g. `ec2:DescribeInstances`.
    Cloud {
        service: String,
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
    },
    /// Local filesystem access (read, write, delete, ...).
    Filesystem {
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Outbound network access.
    Network {
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Database access.
    Database {
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl PermissionRequirement {
    pub fn cloud(service: impl Into<String>, action: impl Into<String>) -> Self {
        PermissionRequirement::Cloud {
            service: service.into(),
            action: action.into(),
            resource: None,
        }
    }

    pub fn filesystem(operation: impl Into<String>, path: Option<String>) -> Self {
        PermissionRequirement::Filesystem {
            operation: operation.into(),
            path,
        }
    }

    pub fn network(operation: impl Into<String>, endpoint: Option<String>) -> Self {
        PermissionRequirement::Network {
            operation: operation.into(),
            endpoint,
        }
    }

    pub fn database(operation: impl Into<String>, target: Option<String>) -> Self {
        PermissionRequirement::Database {
            operation: operation.into(),
            target,
        }
    }

    /// The service or resource family this permission belongs to.
    pub fn resource_type(&self) -> &str {
        match self {
            PermissionRequirement::Cloud { service, .. } => service,
            PermissionRequirement::Filesystem { .. } => "filesystem",
            PermissionRequirement::Network { .. } => "network",
            PermissionRequirement::Database { .. } => "database",
        }
    }

    /// The action or operation requested.
    pub fn action(&self) -> &str {
        match self {
            PermissionRequirement::Cloud { action, .. } => action,
            PermissionRequirement::Filesystem { operation, .. }
            | PermissionRequirement::Network { operation, .. }
            | PermissionRequirement::Database { operation, .. } => operation,
        }
    }

    /// The concrete resource the action applies to, when known.
    pub fn target(&self) -> Option<&str> {
        match self {
            PermissionRequirement::Cloud { resource, .. } => resource.as_deref(),
            PermissionRequirement::Filesystem { path, .. } => path.as_deref(),
            PermissionRequirement::Network { endpoint, .. } => endpoint.as_deref(),
            PermissionRequirement::Database { target, .. } => target.as_deref(),
        }
    }

    /// Deduplication key.
    pub fn key(&self) -> (&str, &str, Option<&str>) {
        (self.resource_type(), self.action(), self.target())
    }

    /// Whether this is a cloud API permission.
    pub fn is_cloud(&self) -> bool {
        matches!(self, PermissionRequirement::Cloud { .. })
    }

    /// Render a one-line description suitable for maintenance documentation.
    pub fn to_maintenance_doc(&self) -> String {
        let base = match self {
            PermissionRequirement::Cloud { service, action, .. } => {
                format!("Requires IAM permission `{}:{}`", service, action)
            }
            PermissionRequirement::Filesystem { operation, .. } => {
                format!("Requires filesystem {} access", operation)
            }
            PermissionRequirement::Network { operation, .. } => {
                format!("Requires outbound network access ({})", operation)
            }
            PermissionRequirement::Database { operation, .. } => {
                format!("Requires database {} privileges", operation)
            }
        };
        match self.target() {
            Some(target) => format!("{} on `{}`", base, target),
            None => base,
        }
    }

    /// Steps an operator can follow when this permission is suspected missing.
    pub fn diagnostic_steps(&self) -> Vec<String> {
        match self {
            PermissionRequirement::Cloud { service, action, .. } => vec![
                "Verify the active credentials with `aws sts get-caller-identity`".to_string(),
                format!(
                    "Simulate the policy for `{}:{}` with `aws iam simulate-principal-policy`",
                    service, action
                ),
                format!(
                    "Search CloudTrail for AccessDenied events on `{}:{}`",
                    service, action
                ),
            ],
            PermissionRequirement::Filesystem { operation, path } => {
                let subject = path.as_deref().unwrap_or("the target path");
                vec![
                    format!("Check that {} exists and is reachable", subject),
                    format!(
                        "Confirm the process user has {} permission on {}",
                        operation, subject
                    ),
                    "Inspect mount options and free disk space".to_string(),
                ]
            }
            PermissionRequirement::Network { endpoint, .. } => {
                let subject = endpoint.as_deref().unwrap_or("the remote endpoint");
                vec![
                    format!("Resolve and reach {} from the host", subject),
                    "Check firewall rules, proxies and security groups".to_string(),
                    "Verify TLS certificates and trust stores".to_string(),
                ]
            }
            PermissionRequirement::Database { operation, target } => {
                let subject = target.as_deref().unwrap_or("the database");
                vec![
                    format!("Test connectivity to {}", subject),
                    format!("Confirm the database role is granted {} privileges", operation),
                    "Review the database server log for authentication failures".to_string(),
                ]
            }
        }
    }
}

impl PartialEq for PermissionRequirement {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PermissionRequirement {}

impl Hash for PermissionRequirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for PermissionRequirement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermissionRequirement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for PermissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type(), self.action())?;
        if let Some(target) = self.target() {
            write!(f, " ({})", target)?;
        }
        Ok(())
    }
}
