//! Integration tests for the extraction pipeline.
//!
//! These tests route the fixtures under testdata/project through the
//! standard extractor set, the same way the CLI does.

use std::path::PathBuf;

use opscover::artifact::{ConnectionKind, ErrorType, PermissionRequirement, ValueType};
use opscover::cli;
use opscover::coverage::{self, CoverageCalculator, CoverageScope};
use opscover::dimension::DimensionSpecification;
use opscover::extract::{ExtractedArtifacts, Extractor, ExtractorSet, ModuleExtractor};

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("project")
}

fn extract_fixture(name: &str) -> ExtractedArtifacts {
    let path = project_path().join(name);
    let source = std::fs::read_to_string(&path).expect("fixture should exist");
    ExtractorSet::standard().extract_file(&path.to_string_lossy(), &source)
}

fn actions(artifacts: &ExtractedArtifacts) -> Vec<String> {
    artifacts.permissions.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_module_permissions_are_exact_and_deduplicated() {
    let artifacts = extract_fixture("ec2_instance.py");

    // describe_instances is called three times in the fixture.
    assert_eq!(
        actions(&artifacts),
        vec!["ec2:DescribeInstances", "ec2:TerminateInstances"]
    );
}

#[test]
fn test_module_fixture_routes_to_module_extractor() {
    let path = project_path().join("ec2_instance.py");
    let source = std::fs::read_to_string(&path).unwrap();
    let set = ExtractorSet::standard();

    let primary = set.select("ec2_instance.py", &source).expect("routed");
    assert_eq!(primary.name(), "module");
    assert!(ModuleExtractor::is_module_source(&source));
}

#[test]
fn test_module_error_handling_and_state() {
    let artifacts = extract_fixture("ec2_instance.py");

    let has = |pattern: &str, kind: ErrorType| {
        artifacts
            .error_patterns
            .iter()
            .any(|e| e.pattern() == pattern && e.error_type() == kind)
    };
    assert!(has("ids is required", ErrorType::Validation));
    assert!(has("InvalidInstanceID.NotFound", ErrorType::AwsError));
    assert!(has("Failed to terminate instances", ErrorType::AwsError));
    assert!(has("ImportError", ErrorType::HandledException));

    let state = artifacts.state_management.as_ref().expect("state detected");
    assert_eq!(state.state_type, "declarative");
    assert!(state.idempotency_support);

    for dep in ["botocore", "ansible_collections", "boto3"] {
        assert!(artifacts.dependencies.iter().any(|d| d == dep), "{}", dep);
    }
    assert!(artifacts
        .connection_requirements
        .iter()
        .any(|c| c.requirement_type == ConnectionKind::CloudApi));
}

#[test]
fn test_yaml_settings_flatten_and_flag_secrets() {
    let artifacts = extract_fixture("settings.yaml");

    let names: Vec<&str> = artifacts.config.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "api.endpoint",
            "api.timeout",
            "database.host",
            "database.password",
            "database.port",
            "log_level"
        ]
    );

    let password = artifacts
        .config
        .iter()
        .find(|c| c.name == "database.password")
        .unwrap();
    assert!(password.sensitive);
    assert!(!password.to_maintenance_doc().contains("changeme"));

    let kinds: Vec<(ConnectionKind, bool)> = artifacts
        .connection_requirements
        .iter()
        .map(|c| (c.requirement_type, c.description.contains("database.host")))
        .collect();
    assert!(kinds.contains(&(ConnectionKind::Database, true)));
    assert!(artifacts
        .connection_requirements
        .iter()
        .any(|c| c.requirement_type == ConnectionKind::Network
            && c.description.contains("api.endpoint")));
}

#[test]
fn test_env_file_types() {
    let artifacts = extract_fixture("service.env");

    let find = |name: &str| artifacts.config.iter().find(|c| c.name == name).unwrap();
    assert!(find("API_TOKEN").sensitive);
    assert_eq!(find("API_TOKEN").value_type, ValueType::String);
    assert_eq!(find("WORKER_CONCURRENCY").value_type, ValueType::Integer);
    assert_eq!(find("DEBUG").value_type, ValueType::Boolean);
    assert!(!find("DEBUG").sensitive);
}

#[test]
fn test_manifest_dependencies() {
    let artifacts = extract_fixture("package.json");
    assert_eq!(artifacts.dependencies, vec!["express", "jest"]);
}

#[cfg(feature = "tree-sitter")]
#[test]
fn test_python_source_fixture() {
    let artifacts = extract_fixture("worker.py");

    assert!(artifacts.permissions.contains(&PermissionRequirement::network(
        "request",
        Some("https://status.internal/health".to_string())
    )));
    assert!(artifacts
        .permissions
        .iter()
        .any(|p| matches!(p, PermissionRequirement::Database { .. })));
    assert_eq!(artifacts.dependencies, vec!["requests", "tenacity"]);

    let state = artifacts.state_management.as_ref().expect("transactions");
    assert_eq!(state.state_type, "transactional");

    assert!(artifacts
        .error_patterns
        .iter()
        .any(|e| e.pattern() == "RuntimeError" && e.error_type() == ErrorType::Exception));
    assert!(artifacts
        .error_patterns
        .iter()
        .any(|e| e.error_type() == ErrorType::Retry));

    // The environment lookup is picked up alongside the code facts.
    let status = artifacts
        .config
        .iter()
        .find(|c| c.name == "STATUS_URL")
        .expect("env lookup");
    assert_eq!(status.default.as_deref(), Some("https://status.internal/health"));
}

#[cfg(feature = "tree-sitter")]
#[test]
fn test_javascript_source_fixture() {
    let artifacts = extract_fixture("server.js");

    assert!(artifacts.permissions.contains(&PermissionRequirement::filesystem(
        "write",
        Some("/var/cache/items.json".to_string())
    )));
    assert!(artifacts.permissions.contains(&PermissionRequirement::network(
        "request",
        Some("https://api.internal/items".to_string())
    )));
    assert_eq!(artifacts.dependencies, vec!["express"]);
    assert_eq!(
        artifacts.state_management.as_ref().map(|s| s.state_type.as_str()),
        Some("file")
    );

    let names: Vec<&str> = artifacts.config.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"UPSTREAM_URL"));
    assert!(names.contains(&"PORT"));
}

#[test]
fn test_unknown_and_malformed_files_degrade() {
    let set = ExtractorSet::standard();

    assert!(set.select_all("notes.txt", "anything").is_empty());
    assert!(set.extract_file("notes.txt", "anything").is_empty());

    let broken_yaml = set.extract_file("broken.yaml", "key: [unclosed\n  - : :");
    assert!(broken_yaml.config.is_empty());

    let broken_json = set.extract_file("broken.json", "{\"a\": ");
    assert!(broken_json.is_empty());

    let broken_module = set.extract_file(
        "broken.py",
        "DOCUMENTATION = r'''\n: : [\n'''\nAnsibleModule(\n",
    );
    assert!(broken_module.permissions.is_empty());
    assert!(broken_module.dependencies.is_empty());
}

#[test]
fn test_merge_is_idempotent_over_repeated_files() {
    let once = extract_fixture("ec2_instance.py");
    let mut twice = once.clone();
    twice.merge(extract_fixture("ec2_instance.py"));
    assert_eq!(once, twice);
}

#[test]
fn test_project_scan_feeds_coverage() {
    let root = project_path();
    let set = ExtractorSet::standard();
    let excludes = cli::build_excludes(&[]).unwrap();
    let files = cli::collect_files(&root, &set, &excludes).unwrap();

    assert_eq!(files.len(), 6);

    let artifacts = cli::extract_files(&files, &set);
    assert!(artifacts
        .permissions
        .contains(&PermissionRequirement::cloud("ec2", "TerminateInstances")));
    assert!(artifacts.dependencies.iter().any(|d| d == "boto3"));
    assert!(artifacts.dependencies.iter().any(|d| d == "express"));

    let data = artifacts.to_dimension_data();
    for dimension in [
        "permissions",
        "error_handling",
        "dependencies",
        "configuration",
        "connections",
    ] {
        assert!(data.contains_key(dimension), "{}", dimension);
    }
    // Extracted facts alone never document a monitoring story.
    assert!(!data.contains_key("monitoring"));

    let spec = DimensionSpecification::builtin();
    let result = CoverageCalculator::new(spec)
        .scope(CoverageScope::All)
        .measure(&data);
    assert!((0.0..=1.0).contains(&result.overall_coverage()));
    assert_eq!(result.dimension_scores()["monitoring"], 0.0);
    assert!(result.dimension_scores()["permissions"] > 0.0);

    let again = coverage::measure(&data, 0.85);
    assert_eq!(again, coverage::measure(&data, 0.85));
}

#[test]
fn test_project_scan_excludes() {
    let root = project_path();
    let set = ExtractorSet::standard();
    let excludes = cli::build_excludes(&["*.py".to_string(), "*.env".to_string()]).unwrap();
    let files = cli::collect_files(&root, &set, &excludes).unwrap();

    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["package.json", "server.js", "settings.yaml"]);
}
