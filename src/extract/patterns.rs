//! Shared text helpers for the extractors.
//!
//! Free functions only; extractors compose these rather than inheriting them.

use phf::phf_set;
use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    // import foo, import foo.bar as baz (start of line, possibly indented)
    static ref PY_IMPORT_RE: Regex = Regex::new(r"^\s*import\s+([a-zA-Z_][a-zA-Z0-9_.]*(?:\s*,\s*[a-zA-Z_][a-zA-Z0-9_.]*)*)").unwrap();
    // from foo.bar import baz
    static ref PY_FROM_IMPORT_RE: Regex = Regex::new(r"^\s*from\s+([a-zA-Z_][a-zA-Z0-9_.]*)\s+import\b").unwrap();
    // import x from 'pkg' / require('pkg')
    static ref JS_IMPORT_RE: Regex = Regex::new(r#"(?:\bfrom\s+|\brequire\s*\(\s*|^\s*import\s+)['"]([^'"]+)['"]"#).unwrap();
}

/// Python standard library modules that never count as dependencies.
///
/// Deliberately small: the extractors only need to keep the common
/// stdlib imports of infrastructure code out of dependency lists.
static PYTHON_STDLIB: phf::Set<&'static str> = phf_set! {
    "__future__", "abc", "argparse", "ast", "asyncio", "base64", "collections",
    "contextlib", "copy", "csv", "dataclasses", "datetime", "enum", "errno",
    "functools", "glob", "hashlib", "hmac", "http", "importlib", "io",
    "itertools", "json", "logging", "math", "os", "pathlib", "pickle",
    "platform", "random", "re", "shlex", "shutil", "signal", "socket",
    "sqlite3", "ssl", "string", "struct", "subprocess", "sys", "tempfile",
    "textwrap", "threading", "time", "traceback", "typing", "unittest",
    "urllib", "uuid", "warnings", "xml", "zipfile",
};

/// Node.js builtin modules.
static NODE_BUILTINS: phf::Set<&'static str> = phf_set! {
    "assert", "buffer", "child_process", "cluster", "crypto", "dns", "events",
    "fs", "http", "https", "net", "os", "path", "process", "querystring",
    "readline", "stream", "url", "util", "zlib",
};

/// AWS service names recognized as the prefix of a conventionally named
/// client variable such as `ec2_client` or `s3_conn`.
static AWS_SERVICES: phf::Set<&'static str> = phf_set! {
    "acm", "apigateway", "autoscaling", "cloudformation", "cloudfront",
    "cloudtrail", "cloudwatch", "codebuild", "codecommit", "codedeploy",
    "cognito", "dynamodb", "ec2", "ecr", "ecs", "efs", "eks", "elasticache",
    "elb", "elbv2", "emr", "es", "events", "firehose", "glue", "iam",
    "kinesis", "kms", "lambda", "logs", "rds", "redshift", "route53", "s3",
    "secretsmanager", "ses", "sns", "sqs", "ssm", "sts", "waf", "wafv2",
};

pub fn is_aws_service(name: &str) -> bool {
    AWS_SERVICES.contains(name)
}

pub fn is_python_stdlib(module: &str) -> bool {
    PYTHON_STDLIB.contains(module)
}

pub fn is_node_builtin(module: &str) -> bool {
    let module = module.strip_prefix("node:").unwrap_or(module);
    NODE_BUILTINS.contains(module)
}

/// Convert a snake_case method name to a CamelCase API action.
///
/// `describe_instances` becomes `DescribeInstances`.
pub fn snake_to_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Drop repeated items, keeping the first occurrence of each.
pub fn dedup_preserving_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Lines of Python source that are code: triple-quoted blocks and
/// full-line comments are skipped.
pub fn python_code_lines(source: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut in_block: Option<&'static str> = None;

    for line in source.lines() {
        let trimmed = line.trim();

        if let Some(delim) = in_block {
            if trimmed.contains(delim) {
                in_block = None;
            }
            continue;
        }
        if let Some((delim, rest)) = opening_triple_quote(trimmed) {
            if !rest.contains(delim) {
                in_block = Some(delim);
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(line);
    }

    lines
}

/// Top-level third-party packages imported by Python source.
///
/// Relative, private and stdlib imports are skipped.
pub fn python_imports(source: &str) -> Vec<String> {
    let mut found = Vec::new();

    for line in python_code_lines(source) {
        if let Some(caps) = PY_IMPORT_RE.captures(line) {
            for module in caps[1].split(',') {
                let module = module.split_whitespace().next().unwrap_or("");
                found.push(top_level(module).to_string());
            }
        } else if let Some(caps) = PY_FROM_IMPORT_RE.captures(line) {
            found.push(top_level(&caps[1]).to_string());
        }
    }

    dedup_preserving_order(found.into_iter().filter(|m| is_external_python_module(m)))
}

/// Packages imported or required by JavaScript source.
///
/// Scoped packages keep their scope (`@aws-sdk/client-s3`); deep imports
/// are cut to the package name. Relative paths and Node builtins are skipped.
pub fn js_imports(source: &str) -> Vec<String> {
    let packages = source
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .flat_map(|line| JS_IMPORT_RE.captures_iter(line).map(|c| c[1].to_string()))
        .filter_map(|spec| js_package_name(&spec));
    dedup_preserving_order(packages)
}

pub(crate) fn js_package_name(spec: &str) -> Option<String> {
    if spec.starts_with('.') || spec.starts_with('/') || is_node_builtin(spec) {
        return None;
    }
    let mut parts = spec.split('/');
    let first = parts.next()?;
    if first.starts_with('@') {
        let second = parts.next()?;
        Some(format!("{}/{}", first, second))
    } else if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

pub(crate) fn is_external_python_module(module: &str) -> bool {
    !module.is_empty()
        && !module.starts_with('.')
        && !module.starts_with('_')
        && !is_python_stdlib(module)
}

fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// If the line opens a triple-quoted string, the delimiter and the text
/// after it. Assignments such as `DOCUMENTATION = r'''` count.
fn opening_triple_quote(trimmed: &str) -> Option<(&'static str, &str)> {
    let strip_prefix = |s: &str| -> usize {
        let rest = s.trim_start_matches(|c: char| {
            matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F')
        });
        s.len() - rest.len()
    };
    let mut candidates = vec![strip_prefix(trimmed)];
    if let Some(eq) = trimmed.find('=') {
        let after = &trimmed[eq + 1..];
        let ws = after.len() - after.trim_start().len();
        let start = eq + 1 + ws;
        candidates.push(start + strip_prefix(&trimmed[start..]));
    }

    for start in candidates {
        let body = &trimmed[start..];
        for delim in ["\"\"\"", "'''"] {
            if let Some(rest) = body.strip_prefix(delim) {
                return Some((delim, rest));
            }
        }
    }
    None
}

/// Whether `haystack` mentions any of `needles`, ignoring case.
pub fn mentions_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_service_vocabulary() {
        assert!(is_aws_service("ec2"));
        assert!(is_aws_service("dynamodb"));
        assert!(!is_aws_service("db"));
        assert!(!is_aws_service("http"));
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("describe_instances"), "DescribeInstances");
        assert_eq!(snake_to_camel("put_object"), "PutObject");
        assert_eq!(snake_to_camel("get"), "Get");
        assert_eq!(snake_to_camel("__init__"), "Init");
    }

    #[test]
    fn test_dedup_preserving_order() {
        let deduped = dedup_preserving_order(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_python_imports_skip_stdlib_and_relative() {
        let src = r#"
import os
import boto3, botocore.exceptions
from requests.adapters import HTTPAdapter
from . import helpers
from ._private import x
import json
import boto3
"#;
        assert_eq!(python_imports(src), vec!["boto3", "botocore", "requests"]);
    }

    #[test]
    fn test_python_imports_ignore_docstrings() {
        let src = r#"
DOCUMENTATION = r'''
module: foo
requirements:
  - import fake
'''
import yaml
"#;
        assert_eq!(python_imports(src), vec!["yaml"]);
    }

    #[test]
    fn test_js_imports() {
        let src = r#"
import express from 'express';
const { S3Client } = require("@aws-sdk/client-s3");
import fs from 'fs';
import util from './util';
import get from 'lodash/get';
// import ignored from 'ignored';
"#;
        assert_eq!(
            js_imports(src),
            vec!["express", "@aws-sdk/client-s3", "lodash"]
        );
    }

    #[test]
    fn test_mentions_any_is_case_insensitive() {
        assert!(mentions_any("MAX_RETRIES", &["retry", "retries"]));
        assert!(!mentions_any("timeout", &["retry"]));
    }
}
