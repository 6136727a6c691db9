//! Configuration extractor.
//!
//! Scans settings files (env, key/value, YAML, TOML, JSON) and environment
//! or config lookups in code for the parameters a component reads.

use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use super::patterns::dedup_preserving_order;
use super::{ExtractedArtifacts, Extractor};
use crate::artifact::{
    ConfigArtifact, ConnectionKind, ConnectionRequirement, ErrorPattern, PermissionRequirement,
    StateManagement, ValueType,
};

/// Nested settings deeper than this are reported as a single map entry.
const MAX_FLATTEN_DEPTH: usize = 32;

lazy_static::lazy_static! {
    static ref ENV_LINE_RE: Regex = Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.*?)\s*$").unwrap();
    static ref KV_LINE_RE: Regex = Regex::new(r"^\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*[=:]\s*(.*?)\s*$").unwrap();
    static ref SECTION_RE: Regex = Regex::new(r"^\s*\[\s*([^\]]+?)\s*\]\s*$").unwrap();

    // os.environ.get("NAME", default) / os.getenv("NAME", default) / config.get("a.b", default)
    static ref LOOKUP_CALL_RE: Regex = Regex::new(
        r#"\b(?:os\.environ\.get|os\.getenv|environ\.get|getenv|config\.get|settings\.get)\(\s*['"]([\w.\-]+)['"]\s*(?:,\s*([^,)]+))?"#
    ).unwrap();
    // os.environ["NAME"] / process.env["NAME"]
    static ref LOOKUP_INDEX_RE: Regex = Regex::new(
        r#"\b(?:os\.environ|process\.env)\[\s*['"](\w+)['"]\s*\](?:\s*(?:\|\||\?\?)\s*([^;,)\s]+))?"#
    ).unwrap();
    // process.env.NAME || default
    static ref PROCESS_ENV_RE: Regex = Regex::new(
        r#"\bprocess\.env\.([A-Za-z_]\w*)(?:\s*(?:\|\||\?\?)\s*([^;,)\s]+))?"#
    ).unwrap();
    static ref REQUIREMENT_NAME_RE: Regex = Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9_.\-]*)").unwrap();
}

/// Name tokens that mark a parameter as an endpoint.
const ENDPOINT_TOKENS: &[&str] = &[
    "host", "hostname", "url", "uri", "endpoint", "port", "dsn", "addr", "address",
];

/// Name tokens that mark an endpoint as a database.
const DATABASE_TOKENS: &[&str] = &[
    "db", "database", "dsn", "postgres", "postgresql", "pg", "mysql", "redis", "mongo", "mongodb",
    "sql",
];

/// Convert a TOML document into JSON, rendering datetimes as their text.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, child)| (key, toml_to_json(child)))
                .collect(),
        ),
    }
}

/// Settings formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// `NAME=value` environment files.
    Env,
    /// INI and Java properties files.
    KeyValue,
    Yaml,
    Toml,
    Json,
    /// Environment and config lookups inside code.
    Source,
}

impl ConfigFormat {
    pub const ALL: [ConfigFormat; 6] = [
        ConfigFormat::Env,
        ConfigFormat::KeyValue,
        ConfigFormat::Yaml,
        ConfigFormat::Toml,
        ConfigFormat::Json,
        ConfigFormat::Source,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFormat::Env => "env",
            ConfigFormat::KeyValue => "key_value",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
            ConfigFormat::Source => "source",
        }
    }

    pub fn extractor_name(&self) -> &'static str {
        match self {
            ConfigFormat::Env => "config-env",
            ConfigFormat::KeyValue => "config-keyvalue",
            ConfigFormat::Yaml => "config-yaml",
            ConfigFormat::Toml => "config-toml",
            ConfigFormat::Json => "config-json",
            ConfigFormat::Source => "config-source",
        }
    }

    /// Settings format implied by a file name. Code files map to nothing.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name)
            .to_ascii_lowercase();

        if base == ".env" || base.starts_with(".env.") || base.ends_with(".env") {
            return Some(ConfigFormat::Env);
        }
        match base.rsplit_once('.').map(|(_, ext)| ext) {
            Some("ini" | "cfg" | "conf" | "properties") => Some(ConfigFormat::KeyValue),
            Some("yaml" | "yml") => Some(ConfigFormat::Yaml),
            Some("toml") => Some(ConfigFormat::Toml),
            Some("json") => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// Extractor for one configuration format.
#[derive(Debug, Clone)]
pub struct ConfigExtractor {
    format: ConfigFormat,
}

impl ConfigExtractor {
    pub fn new(format: ConfigFormat) -> Self {
        Self { format }
    }

    /// One record per discovered parameter name; the first occurrence wins.
    pub fn extract_config(&self, text: &str) -> Vec<ConfigArtifact> {
        let mut items = Vec::new();
        match self.format {
            ConfigFormat::Env => self.scan_env(text, &mut items),
            ConfigFormat::KeyValue => self.scan_key_value(text, &mut items),
            ConfigFormat::Source => self.scan_lookups(text, &mut items),
            ConfigFormat::Yaml | ConfigFormat::Toml | ConfigFormat::Json => {
                if let Some(doc) = self.structured(text) {
                    self.flatten("", &doc, 0, &mut items);
                }
            }
        }

        let mut seen = HashSet::new();
        items.retain(|item: &ConfigArtifact| seen.insert(item.name.clone()));
        items
    }

    /// Parse a structured settings document into a JSON value.
    fn structured(&self, text: &str) -> Option<Value> {
        let parsed = match self.format {
            ConfigFormat::Yaml => serde_yaml::from_str::<Value>(text).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str::<toml::Value>(text)
                .map(toml_to_json)
                .map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
            _ => return None,
        };
        match parsed {
            Ok(Value::Null) => None,
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::debug!(format = self.format.as_str(), error = %e, "unparseable settings");
                None
            }
        }
    }

    fn artifact(
        &self,
        name: &str,
        value_type: ValueType,
        default: Option<String>,
    ) -> ConfigArtifact {
        ConfigArtifact::new(name, value_type, default, self.format.as_str())
    }

    fn scan_env(&self, text: &str, items: &mut Vec<ConfigArtifact>) {
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(caps) = ENV_LINE_RE.captures(line) {
                let (value_type, default) = literal(&caps[2]);
                items.push(self.artifact(&caps[1], value_type, default));
            }
        }
    }

    fn scan_key_value(&self, text: &str, items: &mut Vec<ConfigArtifact>) {
        let mut section: Option<String> = None;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if let Some(caps) = SECTION_RE.captures(line) {
                section = Some(caps[1].to_string());
                continue;
            }
            if let Some(caps) = KV_LINE_RE.captures(line) {
                let name = match &section {
                    Some(s) => format!("{}.{}", s, &caps[1]),
                    None => caps[1].to_string(),
                };
                let (value_type, default) = literal(&caps[2]);
                items.push(self.artifact(&name, value_type, default));
            }
        }
    }

    fn scan_lookups(&self, text: &str, items: &mut Vec<ConfigArtifact>) {
        // Collect with offsets so results follow source order across patterns.
        let mut found: Vec<(usize, String, Option<String>)> = Vec::new();
        for re in [&*LOOKUP_CALL_RE, &*LOOKUP_INDEX_RE, &*PROCESS_ENV_RE] {
            for caps in re.captures_iter(text) {
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                found.push((
                    start,
                    caps[1].to_string(),
                    caps.get(2).map(|m| m.as_str().to_string()),
                ));
            }
        }
        found.sort_by_key(|(start, _, _)| *start);

        for (_, name, default) in found {
            let (value_type, default) = match default {
                Some(raw) => literal(&raw),
                None => (ValueType::Unknown, None),
            };
            items.push(self.artifact(&name, value_type, default));
        }
    }

    fn flatten(&self, prefix: &str, value: &Value, depth: usize, items: &mut Vec<ConfigArtifact>) {
        let join = |key: &str| {
            if prefix.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", prefix, key)
            }
        };

        match value {
            Value::Object(map) if !map.is_empty() && depth < MAX_FLATTEN_DEPTH => {
                for (key, child) in map {
                    self.flatten(&join(key), child, depth + 1, items);
                }
            }
            _ if prefix.is_empty() => {}
            Value::Object(_) => items.push(self.artifact(prefix, ValueType::Map, None)),
            Value::Array(_) => {
                items.push(self.artifact(prefix, ValueType::List, Some(value.to_string())))
            }
            Value::Bool(b) => {
                items.push(self.artifact(prefix, ValueType::Boolean, Some(b.to_string())))
            }
            Value::Number(n) => {
                let value_type = if n.is_f64() {
                    ValueType::Float
                } else {
                    ValueType::Integer
                };
                items.push(self.artifact(prefix, value_type, Some(n.to_string())));
            }
            Value::String(s) => {
                items.push(self.artifact(prefix, ValueType::String, Some(s.clone())))
            }
            Value::Null => items.push(self.artifact(prefix, ValueType::Unknown, None)),
        }
    }

    /// Package names from manifest-shaped settings (package.json,
    /// pyproject.toml and friends).
    fn manifest_dependencies(doc: &Value) -> Vec<String> {
        let mut names = Vec::new();

        for key in ["dependencies", "devDependencies"] {
            match doc.get(key) {
                Some(Value::Object(map)) => names.extend(map.keys().cloned()),
                Some(Value::Array(items)) => names.extend(requirement_names(items)),
                _ => {}
            }
        }
        if let Some(Value::Array(items)) = doc.pointer("/project/dependencies") {
            names.extend(requirement_names(items));
        }
        if let Some(Value::Object(map)) = doc.pointer("/tool/poetry/dependencies") {
            names.extend(map.keys().filter(|k| *k != "python").cloned());
        }

        dedup_preserving_order(names)
    }
}

impl Extractor for ConfigExtractor {
    fn name(&self) -> &'static str {
        self.format.extractor_name()
    }

    fn extract_permissions(&self, _source: &str) -> BTreeSet<PermissionRequirement> {
        BTreeSet::new()
    }

    fn extract_error_patterns(&self, _source: &str) -> Vec<ErrorPattern> {
        Vec::new()
    }

    fn extract_state_management(&self, _source: &str) -> Option<StateManagement> {
        None
    }

    fn extract_dependencies(&self, source: &str) -> Vec<String> {
        self.structured(source)
            .map(|doc| Self::manifest_dependencies(&doc))
            .unwrap_or_default()
    }

    fn extract_connection_requirements(&self, source: &str) -> Vec<ConnectionRequirement> {
        let requirements = self
            .extract_config(source)
            .into_iter()
            .filter(|item| is_endpoint_name(&item.name))
            .map(|item| {
                let (kind, what) = if has_token(&item.name, DATABASE_TOKENS) {
                    (ConnectionKind::Database, "Database endpoint")
                } else {
                    (ConnectionKind::Network, "Network endpoint")
                };
                ConnectionRequirement::new(
                    kind,
                    format!("{} configured by `{}`", what, item.name),
                    vec![format!(
                        "Check that the value of `{}` resolves and accepts connections",
                        item.name
                    )],
                )
            });
        dedup_preserving_order(requirements)
    }

    fn extract(&self, source: &str) -> ExtractedArtifacts {
        ExtractedArtifacts {
            dependencies: self.extract_dependencies(source),
            connection_requirements: self.extract_connection_requirements(source),
            config: self.extract_config(source),
            ..Default::default()
        }
    }
}

/// Type and default of a literal as written in a settings file or code.
fn literal(raw: &str) -> (ValueType, Option<String>) {
    let raw = raw.trim();
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\''))
            || (raw.starts_with('`') && raw.ends_with('`')));
    if quoted {
        let inner = &raw[1..raw.len() - 1];
        return (ValueType::String, Some(inner.to_string()));
    }
    match raw {
        "" => (ValueType::Unknown, None),
        "None" | "null" | "undefined" | "~" => (ValueType::Unknown, None),
        _ if raw.starts_with('[') => (ValueType::List, Some(raw.to_string())),
        _ if raw.starts_with('{') => (ValueType::Map, Some(raw.to_string())),
        _ => (ValueType::infer(raw), Some(raw.to_string())),
    }
}

fn requirement_names(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|r| REQUIREMENT_NAME_RE.captures(r).map(|c| c[1].to_string()))
        .collect()
}

fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn has_token(name: &str, tokens: &[&str]) -> bool {
    name_tokens(name).iter().any(|t| tokens.contains(&t.as_str()))
}

fn is_endpoint_name(name: &str) -> bool {
    if has_token(name, ENDPOINT_TOKENS) {
        return true;
    }
    // camelCase names such as apiUrl or dbHost
    let lower = name.to_ascii_lowercase();
    ["url", "uri", "host", "endpoint"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}
