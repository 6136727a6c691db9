//! Infrastructure module extractor.
//!
//! Handles Ansible-style Python modules that drive a cloud SDK: an embedded
//! `DOCUMENTATION` YAML block describes requirements and options, while the
//! code calls boto3-style clients whose method names map onto IAM actions.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::patterns::{
    dedup_preserving_order, is_aws_service, mentions_any, python_code_lines, python_imports,
    snake_to_camel,
};
use super::Extractor;
use crate::artifact::{
    ConnectionKind, ConnectionRequirement, ErrorPattern, ErrorType, PermissionRequirement,
    StateFlavor, StateManagement,
};

lazy_static::lazy_static! {
    static ref DOCUMENTATION_RE: Regex = Regex::new(
        r#"(?ms)^DOCUMENTATION\s*=\s*[rRuU]?(?:'''|""")(.*?)(?:'''|""")"#
    ).unwrap();
    // ec2 = boto3.client('ec2') / conn = module.client("ec2", retry_decorator=...)
    static ref CLIENT_BINDING_RE: Regex = Regex::new(
        r#"\b([A-Za-z_]\w*)\s*=\s*(?:[A-Za-z_][\w.]*\.)?(?:client|resource)\(\s*['"]([\w-]+)['"]"#
    ).unwrap();
    // module.client('ec2').describe_instances()
    static ref INLINE_CLIENT_CALL_RE: Regex = Regex::new(
        r#"\.(?:client|resource)\(\s*['"]([\w-]+)['"][^)]*\)\.([a-z][a-z0-9_]*)\s*\("#
    ).unwrap();
    // ec2_client, s3_conn, dynamodb_resource; the prefix must name a known service
    static ref CONVENTIONAL_CLIENT_RE: Regex = Regex::new(
        r"^([a-z][a-z0-9]*)_(?:client|conn|connection|resource)$"
    ).unwrap();
    static ref METHOD_CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\.([a-z][a-z0-9_]*)\s*\(").unwrap();
    static ref PAGINATOR_RE: Regex = Regex::new(
        r#"\b([A-Za-z_]\w*)\.get_(paginator|waiter)\(\s*['"](\w+)['"]"#
    ).unwrap();

    static ref FAIL_JSON_RE: Regex = Regex::new(
        r#"\.fail_json(_aws)?\((.*)"#
    ).unwrap();
    static ref MSG_LITERAL_RE: Regex = Regex::new(r#"msg\s*=\s*[fru]?['"]([^'"]+)['"]"#).unwrap();
    static ref RAISE_RE: Regex = Regex::new(r"^\s*raise\s+([A-Za-z_][\w.]*)").unwrap();
    static ref EXCEPT_RE: Regex = Regex::new(r"^\s*except\s*\(?\s*([A-Za-z_][\w.]*(?:\s*,\s*[A-Za-z_][\w.]*)*)\s*\)?\s*(?:as\s+\w+\s*)?:").unwrap();
    static ref BOTO_ERROR_CODE_RE: Regex = Regex::new(r#"is_boto3_error_code\(\s*['"]([\w.]+)['"]"#).unwrap();
    static ref RETRY_DECORATOR_RE: Regex = Regex::new(r"^\s*@((?:AWSRetry|backoff)\.\w+|retry\w*)").unwrap();
    static ref LOOP_HEADER_RE: Regex = Regex::new(r"^\s*(?:for\s+\w+\s+in\s+range\(|while\b)").unwrap();

    static ref CHECK_MODE_RE: Regex = Regex::new(r"supports_check_mode\s*=\s*True").unwrap();
    // Assignments and keyword arguments, not `==` comparisons
    static ref DIFF_RE: Regex = Regex::new(r"\._diff\b|\bdiff\s*=(?:[^=]|$)").unwrap();
    static ref CHANGED_RE: Regex = Regex::new(r"\bchanged\s*=(?:[^=]|$)").unwrap();
    static ref HTTP_RE: Regex = Regex::new(r"\b(?:open_url|fetch_url)\s*\(|\brequests\.(?:get|post|put|delete|patch|request|Session)\b").unwrap();
    static ref MODULE_MARKER_RE: Regex = Regex::new(r"(?m)\bAnsible(?:AWS)?Module\b|^DOCUMENTATION\s*=").unwrap();
    static ref REQUIREMENT_NAME_RE: Regex = Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9_.\-]*)").unwrap();
}

/// Client methods that are local helpers rather than API actions.
const NON_API_METHODS: &[&str] = &[
    "get_paginator",
    "get_waiter",
    "can_paginate",
    "close",
    "generate_presigned_url",
    "generate_presigned_post",
];

/// Python database drivers and the connection they imply.
const DATABASE_DRIVERS: &[&str] = &[
    "psycopg2",
    "pymysql",
    "pymongo",
    "redis",
    "sqlalchemy",
    "mysqldb",
];

/// The subset of a module's `DOCUMENTATION` block the extractor reads.
#[derive(Debug, Default, Deserialize)]
struct ModuleDoc {
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    options: BTreeMap<String, OptionDoc>,
    #[serde(default)]
    extends_documentation_fragment: Option<serde_yaml::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct OptionDoc {
    #[serde(default)]
    choices: Vec<serde_yaml::Value>,
}

impl ModuleDoc {
    /// A `state` option offering both `present` and `absent`.
    fn has_state_option(&self) -> bool {
        let Some(state) = self.options.get("state") else {
            return false;
        };
        let choices: Vec<&str> = state.choices.iter().filter_map(|c| c.as_str()).collect();
        choices.contains(&"present") && choices.contains(&"absent")
    }

    fn fragments(&self) -> Vec<String> {
        match &self.extends_documentation_fragment {
            Some(serde_yaml::Value::String(s)) => vec![s.clone()],
            Some(serde_yaml::Value::Sequence(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn requirement_names(&self) -> Vec<String> {
        self.requirements
            .iter()
            .filter_map(|r| REQUIREMENT_NAME_RE.captures(r).map(|c| c[1].to_string()))
            .filter(|name| !name.eq_ignore_ascii_case("python"))
            .collect()
    }
}

/// Extractor for Ansible-style infrastructure modules.
#[derive(Debug, Default, Clone)]
pub struct ModuleExtractor;

impl ModuleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether Python source declares an Ansible-style module.
    pub fn is_module_source(source: &str) -> bool {
        MODULE_MARKER_RE.is_match(source)
    }

    fn documentation(source: &str) -> Option<ModuleDoc> {
        let block = DOCUMENTATION_RE.captures(source)?;
        match serde_yaml::from_str::<ModuleDoc>(&block[1]) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable DOCUMENTATION block");
                None
            }
        }
    }

    /// Variables bound to SDK clients, mapped to their service.
    fn client_bindings(lines: &[&str]) -> HashMap<String, String> {
        let mut bindings = HashMap::new();
        for line in lines {
            for caps in CLIENT_BINDING_RE.captures_iter(line) {
                bindings.insert(caps[1].to_string(), caps[2].to_string());
            }
        }
        bindings
    }

    fn service_for<'a>(bindings: &'a HashMap<String, String>, var: &'a str) -> Option<&'a str> {
        if let Some(service) = bindings.get(var) {
            return Some(service.as_str());
        }
        CONVENTIONAL_CLIENT_RE
            .captures(var)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|service| is_aws_service(service))
    }

    fn services(&self, source: &str) -> BTreeSet<String> {
        self.extract_permissions(source)
            .iter()
            .filter(|p| p.is_cloud())
            .map(|p| p.resource_type().to_string())
            .collect()
    }

    /// Manual retry loops: a bounded or open loop whose body sleeps and
    /// talks about retries or attempts.
    fn manual_retry_loops(lines: &[&str]) -> usize {
        fn indent(line: &str) -> usize {
            line.len() - line.trim_start().len()
        }
        let mut found = 0;

        for (i, header) in lines.iter().enumerate() {
            if !LOOP_HEADER_RE.is_match(header) {
                continue;
            }
            let base = indent(header);
            let body: Vec<&str> = lines[i + 1..]
                .iter()
                .take_while(|l| indent(l) > base)
                .copied()
                .collect();
            let sleeps = body.iter().any(|l| l.contains("sleep("));
            let mentions = std::iter::once(*header)
                .chain(body.iter().copied())
                .any(|l| mentions_any(l, &["retry", "retries", "attempt"]));
            if sleeps && mentions {
                found += 1;
            }
        }

        found
    }
}

impl Extractor for ModuleExtractor {
    fn name(&self) -> &'static str {
        "module"
    }

    fn extract_permissions(&self, source: &str) -> BTreeSet<PermissionRequirement> {
        let lines = python_code_lines(source);
        let bindings = Self::client_bindings(&lines);
        let mut permissions = BTreeSet::new();

        for line in &lines {
            for caps in INLINE_CLIENT_CALL_RE.captures_iter(line) {
                if !NON_API_METHODS.contains(&&caps[2]) {
                    permissions.insert(PermissionRequirement::cloud(
                        &caps[1],
                        snake_to_camel(&caps[2]),
                    ));
                }
            }

            for caps in PAGINATOR_RE.captures_iter(line) {
                let Some(service) = Self::service_for(&bindings, &caps[1]) else {
                    continue;
                };
                let action = match &caps[2] {
                    "paginator" => snake_to_camel(&caps[3]),
                    // Waiters poll a describe call: instance_running -> DescribeInstances
                    _ => {
                        let subject = caps[3].split('_').next().unwrap_or(&caps[3]);
                        format!("Describe{}s", snake_to_camel(subject))
                    }
                };
                permissions.insert(PermissionRequirement::cloud(service, action));
            }

            for caps in METHOD_CALL_RE.captures_iter(line) {
                let (var, method) = (&caps[1], &caps[2]);
                if NON_API_METHODS.contains(&method) {
                    continue;
                }
                if let Some(service) = Self::service_for(&bindings, var) {
                    permissions
                        .insert(PermissionRequirement::cloud(service, snake_to_camel(method)));
                }
            }
        }

        tracing::debug!(count = permissions.len(), "module permissions");
        permissions
    }

    fn extract_error_patterns(&self, source: &str) -> Vec<ErrorPattern> {
        let lines = python_code_lines(source);
        let mut patterns = Vec::new();

        for line in &lines {
            if let Some(caps) = FAIL_JSON_RE.captures(line) {
                let is_aws = caps.get(1).is_some();
                let message = MSG_LITERAL_RE
                    .captures(&caps[2])
                    .map(|m| m[1].trim().to_string())
                    .filter(|m| !m.is_empty());
                let (pattern, error_type) = match (is_aws, message) {
                    (true, Some(m)) => (m, ErrorType::AwsError),
                    (true, None) => ("fail_json_aws".to_string(), ErrorType::AwsError),
                    (false, Some(m)) => (m, ErrorType::Validation),
                    (false, None) => ("fail_json".to_string(), ErrorType::Validation),
                };
                patterns.push(ErrorPattern::new(pattern, error_type));
            }

            if let Some(caps) = RAISE_RE.captures(line) {
                patterns.push(ErrorPattern::new(&caps[1], ErrorType::Exception));
            }

            if let Some(caps) = EXCEPT_RE.captures(line) {
                for name in caps[1].split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    let short = name.rsplit('.').next().unwrap_or(name);
                    let error_type = match short {
                        "ClientError" | "BotoCoreError" | "WaiterError" => ErrorType::AwsError,
                        _ => ErrorType::HandledException,
                    };
                    patterns.push(ErrorPattern::new(short, error_type));
                }
            }

            for caps in BOTO_ERROR_CODE_RE.captures_iter(line) {
                patterns.push(ErrorPattern::new(&caps[1], ErrorType::AwsError));
            }

            if let Some(caps) = RETRY_DECORATOR_RE.captures(line) {
                patterns.push(ErrorPattern::new(format!("@{}", &caps[1]), ErrorType::Retry));
            }
        }

        if Self::manual_retry_loops(&lines) > 0 {
            patterns.push(ErrorPattern::new("manual retry loop", ErrorType::Retry));
        }

        dedup_preserving_order(patterns)
    }

    fn extract_state_management(&self, source: &str) -> Option<StateManagement> {
        let code = python_code_lines(source).join("\n");
        let supports_check_mode = CHECK_MODE_RE.is_match(&code);
        let supports_diff = DIFF_RE.is_match(&code);
        let tracks_changed = CHANGED_RE.is_match(&code);
        let state_option = Self::documentation(source)
            .map(|d| d.has_state_option())
            .unwrap_or(false);

        if !(supports_check_mode || supports_diff || tracks_changed || state_option) {
            return None;
        }

        let location = if self.services(source).is_empty() {
            "managed host"
        } else {
            "cloud provider"
        };

        let mut builder = StateManagement::builder(
            StateFlavor::Module {
                supports_check_mode,
                supports_diff,
                tracks_changed,
            },
            location,
        )
        .idempotent(supports_check_mode || state_option)
        .rollback(state_option);
        if state_option {
            builder = builder.validation_step("Confirm the resource matches the requested `state`");
        }
        Some(builder.build())
    }

    fn extract_dependencies(&self, source: &str) -> Vec<String> {
        let documented = Self::documentation(source)
            .map(|d| d.requirement_names())
            .unwrap_or_default();
        dedup_preserving_order(python_imports(source).into_iter().chain(documented))
    }

    fn extract_connection_requirements(&self, source: &str) -> Vec<ConnectionRequirement> {
        let mut requirements: Vec<ConnectionRequirement> = self
            .services(source)
            .iter()
            .map(|s| ConnectionRequirement::cloud_api(s))
            .collect();

        let fragments = Self::documentation(source)
            .map(|d| d.fragments())
            .unwrap_or_default();
        if fragments.iter().any(|f| mentions_any(f, &["aws", "boto3"])) {
            requirements.push(ConnectionRequirement::new(
                ConnectionKind::Authentication,
                "AWS credentials supplied through module options, profile or environment",
                vec![
                    "Run `aws sts get-caller-identity` with the same profile".to_string(),
                    "Check AWS_PROFILE, AWS_ACCESS_KEY_ID and AWS_REGION on the host".to_string(),
                ],
            ));
        }

        let code = python_code_lines(source).join("\n");
        if HTTP_RE.is_match(&code) {
            requirements.push(ConnectionRequirement::new(
                ConnectionKind::Network,
                "Outbound HTTP(S) access",
                vec!["Check the endpoint responds with `curl -I <url>` from the host".to_string()],
            ));
        }

        for driver in python_imports(source)
            .iter()
            .filter(|m| DATABASE_DRIVERS.contains(&m.to_lowercase().as_str()))
        {
            requirements.push(ConnectionRequirement::new(
                ConnectionKind::Database,
                format!("Database access through {}", driver),
                vec!["Check the database host and port accept connections".to_string()],
            ));
        }

        dedup_preserving_order(requirements)
    }
}
