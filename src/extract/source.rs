//! Generic source extractor backed by tree-sitter.
//!
//! A language profile names the syntax node kinds for calls, raise sites and
//! exception handlers. One bounded walk over the tree classifies every call
//! by callee name into filesystem, network or database permissions and turns
//! raise/handle sites into error patterns. Imports come from a query.
//!
//! Without the `tree-sitter` feature every operation returns nothing.

use std::collections::BTreeSet;

use phf::{phf_map, phf_set};

use super::patterns::dedup_preserving_order;
use super::Extractor;
use crate::artifact::{
    ConnectionKind, ConnectionRequirement, ErrorPattern, ErrorType, PermissionRequirement,
    StateFlavor, StateManagement,
};

#[cfg(feature = "tree-sitter")]
use streaming_iterator::StreamingIterator;
#[cfg(feature = "tree-sitter")]
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

/// Syntax nodes deeper than this are not visited.
pub const MAX_WALK_DEPTH: usize = 256;

/// Permission family a callee belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Filesystem,
    Network,
    Database,
}

/// Fully qualified callees (`os.remove`, `fetch`).
static QUALIFIED_CALLEES: phf::Map<&'static str, (Bucket, &'static str)> = phf_map! {
    // Python
    "open" => (Bucket::Filesystem, "read"),
    "os.remove" => (Bucket::Filesystem, "delete"),
    "os.unlink" => (Bucket::Filesystem, "delete"),
    "os.rmdir" => (Bucket::Filesystem, "delete"),
    "shutil.rmtree" => (Bucket::Filesystem, "delete"),
    "os.makedirs" => (Bucket::Filesystem, "write"),
    "os.mkdir" => (Bucket::Filesystem, "write"),
    "os.rename" => (Bucket::Filesystem, "write"),
    "shutil.copy" => (Bucket::Filesystem, "write"),
    "shutil.move" => (Bucket::Filesystem, "write"),
    "os.listdir" => (Bucket::Filesystem, "read"),
    "os.walk" => (Bucket::Filesystem, "read"),
    "os.scandir" => (Bucket::Filesystem, "read"),
    "requests.get" => (Bucket::Network, "request"),
    "requests.post" => (Bucket::Network, "request"),
    "requests.put" => (Bucket::Network, "request"),
    "requests.delete" => (Bucket::Network, "request"),
    "requests.patch" => (Bucket::Network, "request"),
    "requests.request" => (Bucket::Network, "request"),
    "httpx.get" => (Bucket::Network, "request"),
    "httpx.post" => (Bucket::Network, "request"),
    "urlopen" => (Bucket::Network, "request"),
    "urllib.request.urlopen" => (Bucket::Network, "request"),
    "socket.create_connection" => (Bucket::Network, "connect"),
    "sqlite3.connect" => (Bucket::Database, "connect"),
    "psycopg2.connect" => (Bucket::Database, "connect"),
    "pymysql.connect" => (Bucket::Database, "connect"),
    "create_engine" => (Bucket::Database, "connect"),
    "MongoClient" => (Bucket::Database, "connect"),
    // JavaScript
    "fs.readFile" => (Bucket::Filesystem, "read"),
    "fs.readFileSync" => (Bucket::Filesystem, "read"),
    "fs.readdir" => (Bucket::Filesystem, "read"),
    "fs.writeFile" => (Bucket::Filesystem, "write"),
    "fs.writeFileSync" => (Bucket::Filesystem, "write"),
    "fs.appendFile" => (Bucket::Filesystem, "write"),
    "fs.appendFileSync" => (Bucket::Filesystem, "write"),
    "fs.mkdir" => (Bucket::Filesystem, "write"),
    "fs.mkdirSync" => (Bucket::Filesystem, "write"),
    "fs.unlink" => (Bucket::Filesystem, "delete"),
    "fs.unlinkSync" => (Bucket::Filesystem, "delete"),
    "fs.rm" => (Bucket::Filesystem, "delete"),
    "fs.rmSync" => (Bucket::Filesystem, "delete"),
    "fetch" => (Bucket::Network, "request"),
    "axios" => (Bucket::Network, "request"),
    "axios.get" => (Bucket::Network, "request"),
    "axios.post" => (Bucket::Network, "request"),
    "http.request" => (Bucket::Network, "request"),
    "http.get" => (Bucket::Network, "request"),
    "https.request" => (Bucket::Network, "request"),
    "https.get" => (Bucket::Network, "request"),
    "mongoose.connect" => (Bucket::Database, "connect"),
    "mysql.createConnection" => (Bucket::Database, "connect"),
};

/// Method names distinctive enough to classify on their own.
static METHOD_CALLEES: phf::Map<&'static str, (Bucket, &'static str)> = phf_map! {
    "read_text" => (Bucket::Filesystem, "read"),
    "read_bytes" => (Bucket::Filesystem, "read"),
    "write_text" => (Bucket::Filesystem, "write"),
    "write_bytes" => (Bucket::Filesystem, "write"),
    "readFileSync" => (Bucket::Filesystem, "read"),
    "writeFileSync" => (Bucket::Filesystem, "write"),
    "execute" => (Bucket::Database, "query"),
    "executemany" => (Bucket::Database, "query"),
    "executescript" => (Bucket::Database, "query"),
    "query" => (Bucket::Database, "query"),
};

/// Calls that serialize program state to disk.
static PERSIST_CALLEES: phf::Set<&'static str> = phf_set! {
    "json.dump", "pickle.dump", "yaml.dump", "yaml.safe_dump", "shelve.open",
    "toml.dump",
};

static TRANSACTION_METHODS: phf::Set<&'static str> = phf_set! {
    "commit", "rollback", "begin", "begin_nested", "transaction", "startTransaction",
};

static RETRY_CALLEES: phf::Set<&'static str> = phf_set! {
    "retry", "pRetry", "asyncRetry", "backOff", "backoff",
};

/// Languages the generic extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    Python,
    JavaScript,
}

impl SourceLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "python",
            SourceLanguage::JavaScript => "javascript",
        }
    }

    pub fn extractor_name(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "source-python",
            SourceLanguage::JavaScript => "source-javascript",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(SourceLanguage::Python),
            "js" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            _ => None,
        }
    }

    #[cfg(feature = "tree-sitter")]
    fn profile(&self) -> Profile {
        match self {
            SourceLanguage::Python => Profile {
                language: tree_sitter_python::LANGUAGE.into(),
                call_kind: "call",
                raise_kind: "raise_statement",
                handler_kind: "except_clause",
                decorator_kind: Some("decorator"),
                import_query: PYTHON_IMPORT_QUERY,
            },
            SourceLanguage::JavaScript => Profile {
                language: tree_sitter_javascript::LANGUAGE.into(),
                call_kind: "call_expression",
                raise_kind: "throw_statement",
                handler_kind: "catch_clause",
                decorator_kind: None,
                import_query: JS_IMPORT_QUERY,
            },
        }
    }
}

#[cfg(feature = "tree-sitter")]
const PYTHON_IMPORT_QUERY: &str = r#"
(import_statement
  name: (dotted_name) @module)

(import_statement
  name: (aliased_import
    name: (dotted_name) @module))

(import_from_statement
  module_name: (dotted_name) @module)
"#;

#[cfg(feature = "tree-sitter")]
const JS_IMPORT_QUERY: &str = r#"
(import_statement
  source: (string) @source)

(call_expression
  function: (identifier) @require_func (#eq? @require_func "require")
  arguments: (arguments (string) @source))
"#;

/// Node kinds that matter for one language.
#[cfg(feature = "tree-sitter")]
struct Profile {
    language: Language,
    call_kind: &'static str,
    raise_kind: &'static str,
    handler_kind: &'static str,
    decorator_kind: Option<&'static str>,
    import_query: &'static str,
}

/// Everything one walk over a file finds.
#[derive(Debug, Default)]
struct SourceScan {
    permissions: BTreeSet<PermissionRequirement>,
    error_patterns: Vec<ErrorPattern>,
    persists_to_file: bool,
    uses_transactions: bool,
    dependencies: Vec<String>,
}

impl SourceScan {
    fn state(&self) -> Option<StateManagement> {
        if !self.persists_to_file && !self.uses_transactions {
            return None;
        }
        let location = if self.uses_transactions {
            "database"
        } else {
            "local file"
        };
        Some(
            StateManagement::builder(
                StateFlavor::Source {
                    persists_to_file: self.persists_to_file,
                    uses_transactions: self.uses_transactions,
                },
                location,
            )
            .rollback(self.uses_transactions)
            .build(),
        )
    }

    fn connections(&self) -> Vec<ConnectionRequirement> {
        let requirements = self.permissions.iter().filter_map(|p| match p {
            PermissionRequirement::Network { endpoint, .. } => Some(ConnectionRequirement::new(
                ConnectionKind::Network,
                match endpoint {
                    Some(e) => format!("Outbound network access to {}", e),
                    None => "Outbound network access".to_string(),
                },
                vec![match endpoint {
                    Some(e) => format!("Check `{}` is reachable from the host", e),
                    None => {
                        "Check outbound traffic is allowed by firewalls and proxies".to_string()
                    }
                }],
            )),
            PermissionRequirement::Database { .. } => Some(ConnectionRequirement::new(
                ConnectionKind::Database,
                "Database connectivity",
                vec![
                    "Check the database host and port accept connections".to_string(),
                    "Verify the configured database credentials".to_string(),
                ],
            )),
            _ => None,
        });
        dedup_preserving_order(requirements)
    }
}

/// Extractor for general application source.
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    language: SourceLanguage,
}

impl SourceExtractor {
    pub fn new(language: SourceLanguage) -> Self {
        Self { language }
    }

    #[cfg(not(feature = "tree-sitter"))]
    fn scan(&self, _source: &str) -> SourceScan {
        tracing::debug!(
            language = self.language.as_str(),
            "built without tree-sitter; skipping source extraction"
        );
        SourceScan::default()
    }

    #[cfg(feature = "tree-sitter")]
    fn scan(&self, source: &str) -> SourceScan {
        let profile = self.language.profile();
        let bytes = source.as_bytes();

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&profile.language) {
            tracing::debug!(error = %e, "failed to load grammar");
            return SourceScan::default();
        }
        let Some(tree) = parser.parse(bytes, None) else {
            tracing::debug!(language = self.language.as_str(), "parser returned no tree");
            return SourceScan::default();
        };
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!(language = self.language.as_str(), "syntax errors; skipping file");
            return SourceScan::default();
        }

        let mut scan = SourceScan::default();
        walk(root, MAX_WALK_DEPTH, |node| {
            let kind = node.kind();
            if kind == profile.call_kind {
                classify_call(&mut scan, node, bytes);
            } else if kind == profile.raise_kind {
                if let Some(name) = raised_name(node, bytes) {
                    scan.error_patterns
                        .push(ErrorPattern::new(name, ErrorType::Exception));
                }
            } else if kind == profile.handler_kind {
                for name in handled_names(node, bytes) {
                    scan.error_patterns
                        .push(ErrorPattern::new(name, ErrorType::HandledException));
                }
            } else if Some(kind) == profile.decorator_kind {
                let text = node_text(node, bytes);
                let name = text
                    .trim_start_matches('@')
                    .split('(')
                    .next()
                    .unwrap_or("")
                    .trim();
                let lower = name.to_lowercase();
                if lower.contains("retry") || lower.contains("backoff") {
                    scan.error_patterns
                        .push(ErrorPattern::new(format!("@{}", name), ErrorType::Retry));
                }
            }
        });

        scan.error_patterns = dedup_preserving_order(std::mem::take(&mut scan.error_patterns));
        scan.dependencies = self.imports(&profile, root, bytes);
        scan
    }

    #[cfg(feature = "tree-sitter")]
    fn imports(&self, profile: &Profile, root: Node, bytes: &[u8]) -> Vec<String> {
        let query = match Query::new(&profile.language, profile.import_query) {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!(error = %e, "invalid import query");
                return Vec::new();
            }
        };
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        let mut found = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                let text = node_text(capture.node, bytes);
                match (name, self.language) {
                    ("module", SourceLanguage::Python) => {
                        let top = text.split('.').next().unwrap_or(text);
                        if super::patterns::is_external_python_module(top) {
                            found.push(top.to_string());
                        }
                    }
                    ("source", SourceLanguage::JavaScript) => {
                        let spec = text.trim_matches(|c| c == '"' || c == '\'' || c == '`');
                        if let Some(pkg) = super::patterns::js_package_name(spec) {
                            found.push(pkg);
                        }
                    }
                    _ => {}
                }
            }
        }
        dedup_preserving_order(found)
    }
}

impl Extractor for SourceExtractor {
    fn name(&self) -> &'static str {
        self.language.extractor_name()
    }

    fn extract_permissions(&self, source: &str) -> BTreeSet<PermissionRequirement> {
        self.scan(source).permissions
    }

    fn extract_error_patterns(&self, source: &str) -> Vec<ErrorPattern> {
        self.scan(source).error_patterns
    }

    fn extract_state_management(&self, source: &str) -> Option<StateManagement> {
        self.scan(source).state()
    }

    fn extract_dependencies(&self, source: &str) -> Vec<String> {
        self.scan(source).dependencies
    }

    fn extract_connection_requirements(&self, source: &str) -> Vec<ConnectionRequirement> {
        self.scan(source).connections()
    }

    /// Single parse for all capabilities.
    fn extract(&self, source: &str) -> super::ExtractedArtifacts {
        let scan = self.scan(source);
        super::ExtractedArtifacts {
            state_management: scan.state(),
            connection_requirements: scan.connections(),
            permissions: scan.permissions,
            error_patterns: scan.error_patterns,
            dependencies: scan.dependencies,
            config: Vec::new(),
        }
    }
}

/// Pre-order walk over named nodes, bounded by `max_depth`.
#[cfg(feature = "tree-sitter")]
fn walk<'t>(root: Node<'t>, max_depth: usize, mut visit: impl FnMut(Node<'t>)) {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        visit(node);
        if depth >= max_depth {
            continue;
        }
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push((child, depth + 1));
            }
        }
    }
}

#[cfg(feature = "tree-sitter")]
fn node_text<'s>(node: Node, bytes: &'s [u8]) -> &'s str {
    node.utf8_text(bytes).unwrap_or("")
}

/// Callee text with whitespace removed (`os.path.join`, `fs.readFileSync`).
#[cfg(feature = "tree-sitter")]
fn callee(node: Node, bytes: &[u8]) -> Option<String> {
    let function = node.child_by_field_name("function")?;
    let text: String = node_text(function, bytes)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First string literal argument, unquoted.
#[cfg(feature = "tree-sitter")]
fn first_string_arg(node: Node, bytes: &[u8]) -> Option<String> {
    let args = node.child_by_field_name("arguments")?;
    let first = args.named_child(0)?;
    if first.kind() != "string" {
        return None;
    }
    let text = node_text(first, bytes)
        .trim_start_matches(|c: char| matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .trim_matches(|c| c == '"' || c == '\'' || c == '`');
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(feature = "tree-sitter")]
fn classify_call(scan: &mut SourceScan, node: Node, bytes: &[u8]) {
    let Some(name) = callee(node, bytes) else {
        return;
    };
    let method = name.rsplit('.').next().unwrap_or(&name);

    if PERSIST_CALLEES.contains(name.as_str()) {
        scan.persists_to_file = true;
    }
    if name.contains('.') && TRANSACTION_METHODS.contains(method) {
        scan.uses_transactions = true;
    }
    // Decorator calls are reported by the decorator itself.
    let in_decorator = node.parent().is_some_and(|p| p.kind() == "decorator");
    if !in_decorator && (RETRY_CALLEES.contains(name.as_str()) || RETRY_CALLEES.contains(method)) {
        scan.error_patterns
            .push(ErrorPattern::new(name.clone(), ErrorType::Retry));
    }

    let entry = QUALIFIED_CALLEES
        .get(name.as_str())
        .or_else(|| name.contains('.').then(|| METHOD_CALLEES.get(method)).flatten());
    let Some(&(bucket, operation)) = entry else {
        return;
    };

    let target = first_string_arg(node, bytes);
    let permission = match bucket {
        Bucket::Filesystem => {
            let operation = if name == "open" && opens_for_writing(node, bytes) {
                "write"
            } else {
                operation
            };
            if operation != "read" {
                scan.persists_to_file = true;
            }
            PermissionRequirement::filesystem(operation, target)
        }
        Bucket::Network => PermissionRequirement::network(operation, target),
        Bucket::Database => PermissionRequirement::database(operation, None),
    };
    scan.permissions.insert(permission);
}

/// `open(path, "w")` and friends.
#[cfg(feature = "tree-sitter")]
fn opens_for_writing(node: Node, bytes: &[u8]) -> bool {
    let Some(args) = node.child_by_field_name("arguments") else {
        return false;
    };
    let mode = match args.named_child(1) {
        Some(arg) if arg.kind() == "string" => node_text(arg, bytes).to_string(),
        Some(arg) if arg.kind() == "keyword_argument" => {
            let text = node_text(arg, bytes);
            match text.split_once('=') {
                Some((key, value)) if key.trim() == "mode" => value.to_string(),
                _ => return false,
            }
        }
        _ => return false,
    };
    let mode = mode.trim_matches(|c| c == '"' || c == '\'' || c == ' ');
    mode.contains('w') || mode.contains('a') || mode.contains('x') || mode.contains('+')
}

/// Exception name raised or thrown at a site. Bare re-raises yield nothing.
#[cfg(feature = "tree-sitter")]
fn raised_name(node: Node, bytes: &[u8]) -> Option<String> {
    let expr = node.named_child(0)?;
    let target = match expr.kind() {
        "call" => expr.child_by_field_name("function")?,
        "new_expression" => expr.child_by_field_name("constructor")?,
        "identifier" | "attribute" | "member_expression" => expr,
        _ => return None,
    };
    let text = node_text(target, bytes);
    let short = text.rsplit('.').next().unwrap_or(text).trim();
    // `throw err` rethrows a caught value rather than naming an error type.
    if short.is_empty() || short.starts_with(|c: char| c.is_lowercase()) {
        return None;
    }
    Some(short.to_string())
}

/// Exception types caught by a handler clause.
#[cfg(feature = "tree-sitter")]
fn handled_names(node: Node, bytes: &[u8]) -> Vec<String> {
    let text = node_text(node, bytes);
    if let Some(rest) = text.strip_prefix("except") {
        let header = rest.split(':').next().unwrap_or("");
        let types = header.split(" as ").next().unwrap_or("");
        let names: Vec<String> = types
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| n.rsplit('.').next().unwrap_or(n).to_string())
            .collect();
        if names.is_empty() {
            return vec!["bare except".to_string()];
        }
        return names;
    }
    match node.child_by_field_name("parameter") {
        Some(param) => vec![format!("catch ({})", node_text(param, bytes))],
        None => vec!["catch".to_string()],
    }
}

#[cfg(all(test, feature = "tree-sitter"))]
mod tests {
    use super::*;

    const PY_APP: &str = r#"
import os
import requests
import sqlite3 as db
from tenacity import retry, stop_after_attempt
from .local import helper


@retry(stop=stop_after_attempt(3))
def fetch_status():
    return requests.get("https://status.example.com/health")


def save(path, payload):
    with open(path, "w") as fh:
        fh.write(payload)
    requests.get("https://status.example.com/health")


def load():
    conn = db.connect("app.db")
    cur = conn.cursor()
    cur.execute("SELECT 1")
    conn.commit()
    try:
        return open("config.json").read()
    except (KeyError, json.JSONDecodeError) as e:
        raise ValueError("bad config")
    except FileNotFoundError:
        raise
"#;

    const JS_APP: &str = r#"
const fs = require('fs');
const express = require("express");
import axios from 'axios';
import { helper } from './helper';

async function run() {
  try {
    const res = await fetch('https://api.example.com/items');
    fs.writeFileSync('/tmp/cache.json', JSON.stringify(res));
  } catch (err) {
    throw new Error('fetch failed');
  }
}
"#;

    fn python() -> SourceExtractor {
        SourceExtractor::new(SourceLanguage::Python)
    }

    fn javascript() -> SourceExtractor {
        SourceExtractor::new(SourceLanguage::JavaScript)
    }

    #[test]
    fn test_python_permissions() {
        let perms = python().extract_permissions(PY_APP);
        assert!(perms.contains(&PermissionRequirement::network(
            "request",
            Some("https://status.example.com/health".to_string())
        )));
        assert!(perms.contains(&PermissionRequirement::filesystem("write", None)));
        assert!(perms.contains(&PermissionRequirement::filesystem(
            "read",
            Some("config.json".to_string())
        )));
        assert!(perms.contains(&PermissionRequirement::database("query", None)));
        // Two identical requests.get calls collapse into one permission.
        let network = perms
            .iter()
            .filter(|p| matches!(p, PermissionRequirement::Network { .. }))
            .count();
        assert_eq!(network, 1);
    }

    #[test]
    fn test_python_error_patterns() {
        let patterns = python().extract_error_patterns(PY_APP);
        let has = |p: &str, t: ErrorType| {
            patterns
                .iter()
                .any(|e| e.pattern() == p && e.error_type() == t)
        };
        assert!(has("ValueError", ErrorType::Exception));
        assert!(has("KeyError", ErrorType::HandledException));
        assert!(has("JSONDecodeError", ErrorType::HandledException));
        assert!(has("FileNotFoundError", ErrorType::HandledException));
        assert!(has("@retry", ErrorType::Retry));
        // The bare `raise` re-raises and names nothing.
        assert_eq!(
            patterns
                .iter()
                .filter(|e| e.error_type() == ErrorType::Exception)
                .count(),
            1
        );
    }

    #[test]
    fn test_python_state_and_dependencies() {
        let state = python()
            .extract_state_management(PY_APP)
            .expect("state detected");
        assert_eq!(state.state_type, "transactional");
        assert!(state.rollback_support);

        assert_eq!(
            python().extract_dependencies(PY_APP),
            vec!["requests", "tenacity"]
        );
    }

    #[test]
    fn test_python_connections() {
        let conns = python().extract_connection_requirements(PY_APP);
        assert!(conns
            .iter()
            .any(|c| c.requirement_type == ConnectionKind::Network));
        assert_eq!(
            conns
                .iter()
                .filter(|c| c.requirement_type == ConnectionKind::Database)
                .count(),
            1
        );
    }

    #[test]
    fn test_javascript_extraction() {
        let artifacts = javascript().extract(JS_APP);
        assert!(artifacts.permissions.contains(&PermissionRequirement::network(
            "request",
            Some("https://api.example.com/items".to_string())
        )));
        assert!(artifacts.permissions.contains(&PermissionRequirement::filesystem(
            "write",
            Some("/tmp/cache.json".to_string())
        )));
        assert_eq!(artifacts.dependencies, vec!["express", "axios"]);
        assert!(artifacts
            .error_patterns
            .iter()
            .any(|e| e.pattern() == "Error" && e.error_type() == ErrorType::Exception));
        assert!(artifacts
            .error_patterns
            .iter()
            .any(|e| e.pattern() == "catch (err)"
                && e.error_type() == ErrorType::HandledException));
        let state = artifacts.state_management.expect("file persistence");
        assert_eq!(state.state_type, "file");
    }

    #[test]
    fn test_invalid_syntax_degrades_to_empty() {
        let artifacts = python().extract("def broken(:\n    raise (((\n");
        assert!(artifacts.is_empty());
        let artifacts = javascript().extract("function ( { throw");
        assert!(artifacts.is_empty());
    }
}
