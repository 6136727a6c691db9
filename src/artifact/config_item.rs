//! Configuration parameters discovered in settings files and lookups.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::fmt;

/// Identifier fragments that mark a parameter as secret-bearing.
pub const SENSITIVE_MARKERS: &[&str] = &["password", "secret", "key", "token", "credential"];

/// Inferred type of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Map,
    Unknown,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Unknown => "unknown",
        }
    }

    /// Infer the type of an unquoted literal.
    pub fn infer(literal: &str) -> Self {
        let trimmed = literal.trim();
        if trimmed.is_empty() {
            return ValueType::Unknown;
        }
        match trimmed.to_lowercase().as_str() {
            "true" | "false" | "yes" | "no" | "on" | "off" => return ValueType::Boolean,
            _ => {}
        }
        if trimmed.parse::<i64>().is_ok() {
            ValueType::Integer
        } else if trimmed.parse::<f64>().is_ok() {
            ValueType::Float
        } else {
            ValueType::String
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One configuration parameter.
///
/// Serialization never emits the default of a sensitive parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigArtifact {
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<String>,
    pub sensitive: bool,
    pub format: String,
}

impl ConfigArtifact {
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        default: Option<String>,
        format: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let sensitive = is_sensitive_name(&name);
        Self {
            name,
            value_type,
            default,
            sensitive,
            format: format.into(),
        }
    }

    pub fn to_maintenance_doc(&self) -> String {
        let default = match (&self.default, self.sensitive) {
            (_, true) => " (sensitive, value redacted)".to_string(),
            (Some(d), false) => format!(" (default: {})", d),
            (None, false) => String::new(),
        };
        format!("`{}`: {}{}", self.name, self.value_type, default)
    }
}

impl Serialize for ConfigArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let default = if self.sensitive {
            None
        } else {
            self.default.as_deref()
        };
        let len = if default.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("ConfigArtifact", len)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value_type", &self.value_type)?;
        match default {
            Some(d) => state.serialize_field("default", d)?,
            None => state.skip_field("default")?,
        }
        state.serialize_field("sensitive", &self.sensitive)?;
        state.serialize_field("format", &self.format)?;
        state.end()
    }
}

/// Case-insensitive substring match against [`SENSITIVE_MARKERS`].
///
/// A name matching several markers still yields a single flag.
pub fn is_sensitive_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_names() {
        assert!(is_sensitive_name("DB_PASSWORD"));
        assert!(is_sensitive_name("api_key"));
        assert!(is_sensitive_name("SecretToken"));
        assert!(is_sensitive_name("aws_credentials_file"));
        assert!(!is_sensitive_name("timeout"));
        assert!(!is_sensitive_name("region"));
    }

    #[test]
    fn test_infer_value_type() {
        assert_eq!(ValueType::infer("8080"), ValueType::Integer);
        assert_eq!(ValueType::infer("0.5"), ValueType::Float);
        assert_eq!(ValueType::infer("True"), ValueType::Boolean);
        assert_eq!(ValueType::infer("us-east-1"), ValueType::String);
        assert_eq!(ValueType::infer(""), ValueType::Unknown);
    }

    #[test]
    fn test_sensitive_default_redacted_in_doc() {
        let c = ConfigArtifact::new("API_TOKEN", ValueType::String, Some("abc".into()), "env");
        assert!(c.sensitive);
        assert!(!c.to_maintenance_doc().contains("abc"));
    }

    #[test]
    fn test_sensitive_default_omitted_from_json() {
        let secret = ConfigArtifact::new(
            "DB_PASSWORD",
            ValueType::String,
            Some("hunter2".into()),
            "env",
        );
        let value = serde_json::to_value(&secret).unwrap();
        assert_eq!(value["sensitive"], true);
        assert!(value.get("default").is_none());

        let plain = ConfigArtifact::new("PORT", ValueType::Integer, Some("8080".into()), "env");
        let value = serde_json::to_value(&plain).unwrap();
        assert_eq!(value["default"], "8080");
        assert_eq!(value["value_type"], "integer");
    }
}
