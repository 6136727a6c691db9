//! Error-handling sites detected in source.

use serde::Serialize;
use std::fmt;

/// Classification of an error site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Input or parameter validation failure reported to the caller.
    Validation,
    /// An exception raised by the code itself.
    Exception,
    /// An exception caught and handled locally.
    HandledException,
    /// Retry or backoff logic.
    Retry,
    /// A cloud provider API error.
    AwsError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "validation",
            ErrorType::Exception => "exception",
            ErrorType::HandledException => "handled_exception",
            ErrorType::Retry => "retry",
            ErrorType::AwsError => "aws_error",
        }
    }

    /// Severity assigned when the extractor has no better signal.
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorType::Validation => Severity::High,
            ErrorType::Exception => Severity::High,
            ErrorType::AwsError => Severity::High,
            ErrorType::Retry => Severity::Medium,
            ErrorType::HandledException => Severity::Low,
        }
    }

    fn default_recovery_steps(&self, pattern: &str) -> Vec<String> {
        match self {
            ErrorType::Validation => vec![
                format!("Read the failure message: {}", pattern),
                "Correct the offending parameters and re-run".to_string(),
            ],
            ErrorType::Exception => vec![
                format!("Inspect the stack trace for {}", pattern),
                "Fix the underlying condition and re-run".to_string(),
            ],
            ErrorType::Retry => vec![
                "Check whether retries were exhausted in the logs".to_string(),
                "Wait for the upstream service to recover, then re-run".to_string(),
            ],
            ErrorType::AwsError => vec![
                format!("Look up the error code {} in the AWS API reference", pattern),
                "Verify credentials, region and IAM permissions".to_string(),
                "Check AWS service health for the region".to_string(),
            ],
            ErrorType::HandledException => Vec::new(),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operational impact of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected failure or handling site.
///
/// `recovery_steps` is never empty unless the pattern is a handled exception.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorPattern {
    pattern: String,
    error_type: ErrorType,
    severity: Severity,
    recovery_steps: Vec<String>,
}

impl ErrorPattern {
    /// Create a pattern with the type's default severity and recovery steps.
    pub fn new(pattern: impl Into<String>, error_type: ErrorType) -> Self {
        Self::with_recovery(pattern, error_type, Vec::new())
    }

    /// Create a pattern with explicit recovery steps.
    ///
    /// Falls back to the type's default steps when `recovery_steps` is empty.
    pub fn with_recovery(
        pattern: impl Into<String>,
        error_type: ErrorType,
        recovery_steps: Vec<String>,
    ) -> Self {
        let pattern = pattern.into();
        let recovery_steps = if recovery_steps.is_empty() {
            error_type.default_recovery_steps(&pattern)
        } else {
            recovery_steps
        };
        Self {
            pattern,
            error_type,
            severity: error_type.default_severity(),
            recovery_steps,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn recovery_steps(&self) -> &[String] {
        &self.recovery_steps
    }

    pub fn to_maintenance_doc(&self) -> String {
        let mut doc = format!("[{}] {} ({})", self.severity, self.pattern, self.error_type);
        if let Some(first) = self.recovery_steps.first() {
            doc.push_str(": ");
            doc.push_str(first);
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_steps_filled_for_unhandled_types() {
        for t in [
            ErrorType::Validation,
            ErrorType::Exception,
            ErrorType::Retry,
            ErrorType::AwsError,
        ] {
            let p = ErrorPattern::new("Boom", t);
            assert!(!p.recovery_steps().is_empty(), "{} has no recovery", t);
        }
    }

    #[test]
    fn test_handled_exception_may_have_no_recovery() {
        let p = ErrorPattern::new("KeyError", ErrorType::HandledException);
        assert!(p.recovery_steps().is_empty());
        assert_eq!(p.severity(), Severity::Low);
    }

    #[test]
    fn test_explicit_recovery_kept() {
        let p = ErrorPattern::with_recovery(
            "InvalidParameter",
            ErrorType::Validation,
            vec!["Fix the parameter".to_string()],
        );
        assert_eq!(p.recovery_steps(), ["Fix the parameter".to_string()]);
    }

    #[test]
    fn test_maintenance_doc() {
        let p =
            ErrorPattern::new("ValueError", ErrorType::Exception).with_severity(Severity::Medium);
        let doc = p.to_maintenance_doc();
        assert!(doc.starts_with("[medium] ValueError (exception)"));
    }
}
