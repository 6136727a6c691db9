//! Command-line interface for opscover.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::coverage::{CoverageCalculator, CoverageResult, CoverageScope, ExtractedData};
use crate::dimension::DimensionSpecification;
use crate::error::{CoverageFailure, SpecError};
use crate::extract::{ExtractedArtifacts, ExtractorSet};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", "target", "__pycache__", "venv"];

/// Generated lock files look like config but carry no settings.
const SKIPPED_FILES: &[&str] = &["package-lock.json"];

/// Operational documentation coverage.
///
/// opscover extracts maintenance facts from infrastructure modules, program
/// source and configuration files (cloud permissions, error handling, state
/// semantics, dependencies, connections, settings) and scores how completely
/// a body of documentation covers them.
#[derive(Parser)]
#[command(name = "opscover")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract maintenance artifacts from a file or directory
    Extract(ExtractArgs),
    /// Score a JSON documentation file against the dimension specification
    Measure(MeasureArgs),
    /// Extract from source and score the result in one step
    Check(CheckArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// Only dimensions present in the data
    Supplied,
    /// Every dimension; absent ones score zero
    All,
}

impl From<ScopeArg> for CoverageScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Supplied => CoverageScope::Supplied,
            ScopeArg::All => CoverageScope::All,
        }
    }
}

/// Arguments for the extract command.
#[derive(Parser)]
pub struct ExtractArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Glob of paths to skip (repeatable), matched against the path relative to the scan root
    #[arg(short, long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,
}

/// Options shared by the scoring commands.
#[derive(Args)]
pub struct ScoringArgs {
    /// Dimension specification YAML (default: built-in taxonomy)
    #[arg(short, long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Minimum overall coverage, 0.0 to 1.0 (default: the specification's)
    #[arg(short, long)]
    pub minimum: Option<f64>,

    /// Also fail when any dimension is below its own minimum
    #[arg(long)]
    pub strict: bool,

    /// Which dimensions take part in the measurement
    #[arg(long, value_enum, default_value = "supplied")]
    pub scope: ScopeArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,
}

/// Arguments for the measure command.
#[derive(Parser)]
pub struct MeasureArgs {
    /// JSON file mapping dimension names to documentation data
    pub data: PathBuf,

    #[command(flatten)]
    pub scoring: ScoringArgs,
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to scan (file or directory)
    pub path: PathBuf,

    #[command(flatten)]
    pub scoring: ScoringArgs,

    /// Glob of paths to skip (repeatable), matched against the path relative to the scan root
    #[arg(short, long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,
}

/// Compile exclude globs into one matcher.
pub fn build_excludes(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid exclude glob {:?}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect the files some extractor can handle, in a stable order.
pub fn collect_files(
    root: &Path,
    extractors: &ExtractorSet,
    excludes: &GlobSet,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if excludes.is_match(relative) || excludes.is_match(path) {
            tracing::debug!(path = %relative.display(), "excluded");
            continue;
        }

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if SKIPPED_FILES.contains(&name) {
            continue;
        }
        // Routing only looks at content for .py files, which always have an extractor.
        if extractors.select_all(name, "").is_empty() {
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Extract every file in parallel and merge the results in file order.
pub fn extract_files(files: &[PathBuf], extractors: &ExtractorSet) -> ExtractedArtifacts {
    let per_file: Vec<ExtractedArtifacts> = files
        .par_iter()
        .filter_map(|path| {
            let bytes = match std::fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    return None;
                }
            };
            let source = String::from_utf8_lossy(&bytes);
            let name = path.to_string_lossy();
            Some(extractors.extract_file(&name, &source))
        })
        .collect();

    let mut merged = ExtractedArtifacts::default();
    for artifacts in per_file {
        merged.merge(artifacts);
    }
    merged
}

/// Resolve a scan target into its file list.
fn scan_target(
    path: &Path,
    extractors: &ExtractorSet,
    excludes: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot access path {:?}", path))?;
    if metadata.is_dir() {
        let excludes = build_excludes(excludes)?;
        collect_files(path, extractors, &excludes)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

/// Load the specification named on the command line, applying overrides.
pub fn load_specification(
    spec: Option<&Path>,
    minimum: Option<f64>,
) -> Result<DimensionSpecification, SpecError> {
    let base = match spec {
        Some(path) => DimensionSpecification::from_file(path)?,
        None => DimensionSpecification::builtin().clone(),
    };
    match minimum {
        Some(m) => base.with_minimum_coverage(m),
        None => Ok(base),
    }
}

/// Read measurement input: a JSON object keyed by dimension name.
pub fn read_dimension_data(path: &Path) -> anyhow::Result<ExtractedData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let data: ExtractedData = serde_json::from_str(&content).with_context(|| {
        format!(
            "{} must contain a JSON object keyed by dimension",
            path.display()
        )
    })?;
    Ok(data)
}

/// Score data and decide the verdict.
///
/// Returns the result and whether it passes; strict mode additionally
/// requires every measured dimension to meet its own minimum.
pub fn score(
    spec: &DimensionSpecification,
    data: &ExtractedData,
    scope: CoverageScope,
    strict: bool,
) -> (CoverageResult, bool) {
    let calculator = CoverageCalculator::new(spec).scope(scope);
    let (result, passed) = match calculator.assert_coverage(data, spec.minimum_coverage()) {
        Ok(result) => (result, true),
        Err(failure) => {
            tracing::info!("{}", failure);
            let CoverageFailure::BelowMinimum { result, .. } = failure;
            (*result, false)
        }
    };

    if strict && passed && !result.below_minimum().is_empty() {
        tracing::info!(
            dimensions = ?result.below_minimum(),
            "strict mode: dimensions below their minimum"
        );
        return (result, false);
    }
    (result, passed)
}

fn emit_coverage(
    format: OutputFormat,
    source: &str,
    result: &CoverageResult,
    strict: bool,
    passed: bool,
) -> anyhow::Result<i32> {
    match format {
        OutputFormat::Json => report::write_json_coverage(source, result, strict, passed)?,
        OutputFormat::Pretty => report::write_pretty_coverage(source, result, strict, passed),
    }
    Ok(if passed { EXIT_SUCCESS } else { EXIT_FAILED })
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    let extractors = ExtractorSet::standard();
    let files = scan_target(&args.path, &extractors, &args.excludes)?;

    if files.is_empty() {
        eprintln!("Warning: no files to scan");
    }
    tracing::info!(files = files.len(), "extracting");

    let artifacts = extract_files(&files, &extractors);
    let path_str = args.path.to_string_lossy();

    match args.format {
        OutputFormat::Json => report::write_json_extraction(&path_str, files.len(), &artifacts)?,
        OutputFormat::Pretty => report::write_pretty_extraction(&path_str, files.len(), &artifacts),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the measure command.
pub fn run_measure(args: &MeasureArgs) -> anyhow::Result<i32> {
    let spec = match load_specification(args.scoring.spec.as_deref(), args.scoring.minimum) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid dimension specification: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let data = read_dimension_data(&args.data)?;
    let (result, passed) = score(&spec, &data, args.scoring.scope.into(), args.scoring.strict);

    emit_coverage(
        args.scoring.format,
        &args.data.to_string_lossy(),
        &result,
        args.scoring.strict,
        passed,
    )
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let spec = match load_specification(args.scoring.spec.as_deref(), args.scoring.minimum) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: invalid dimension specification: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let extractors = ExtractorSet::standard();
    let files = scan_target(&args.path, &extractors, &args.excludes)?;
    if files.is_empty() {
        eprintln!("Warning: no files to scan");
    }

    let artifacts = extract_files(&files, &extractors);
    let data = artifacts.to_dimension_data();
    tracing::info!(
        files = files.len(),
        dimensions = data.len(),
        "extracted dimension data"
    );

    let (result, passed) = score(&spec, &data, args.scoring.scope.into(), args.scoring.strict);

    emit_coverage(
        args.scoring.format,
        &args.path.to_string_lossy(),
        &result,
        args.scoring.strict,
        passed,
    )
}
