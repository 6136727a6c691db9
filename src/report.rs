//! Output formatting for opscover results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::coverage::{CoverageResult, DimensionBreakdown};
use crate::extract::ExtractedArtifacts;

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report for an extraction run.
#[derive(Serialize)]
pub struct ExtractionReport<'a> {
    pub version: &'static str,
    pub path: &'a str,
    pub files_scanned: usize,
    pub artifacts: &'a ExtractedArtifacts,
}

/// JSON report for a coverage measurement.
#[derive(Serialize)]
pub struct CoverageReport<'a> {
    pub version: &'static str,
    pub source: &'a str,
    pub strict: bool,
    pub passed: bool,
    pub coverage: &'a CoverageResult,
}

/// Render an extraction report as pretty-printed JSON.
pub fn extraction_json(
    path: &str,
    files_scanned: usize,
    artifacts: &ExtractedArtifacts,
) -> anyhow::Result<String> {
    let report = ExtractionReport {
        version: env!("CARGO_PKG_VERSION"),
        path,
        files_scanned,
        artifacts,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Render a coverage report as pretty-printed JSON.
///
/// `passed` is the verdict the CLI exits with, which in strict mode also
/// requires every dimension to meet its own minimum.
pub fn coverage_json(
    source: &str,
    result: &CoverageResult,
    strict: bool,
    passed: bool,
) -> anyhow::Result<String> {
    let report = CoverageReport {
        version: env!("CARGO_PKG_VERSION"),
        source,
        strict,
        passed,
        coverage: result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn write_json_extraction(
    path: &str,
    files_scanned: usize,
    artifacts: &ExtractedArtifacts,
) -> anyhow::Result<()> {
    println!("{}", extraction_json(path, files_scanned, artifacts)?);
    Ok(())
}

pub fn write_json_coverage(
    source: &str,
    result: &CoverageResult,
    strict: bool,
    passed: bool,
) -> anyhow::Result<()> {
    println!("{}", coverage_json(source, result, strict, passed)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header(label: &str, target: &str) {
    println!();
    print!("  ");
    print!("{}", "opscover".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
    print!("  {}", format!("{:<10}", label).dimmed());
    println!("{}", target);
    println!();
}

/// Write extracted artifacts grouped by kind.
pub fn write_pretty_extraction(path: &str, files_scanned: usize, artifacts: &ExtractedArtifacts) {
    write_header("Scanning:", path);
    println!(
        "  {} file{} scanned",
        files_scanned,
        if files_scanned == 1 { "" } else { "s" }
    );
    println!();

    if artifacts.is_empty() {
        println!("  {}", "No artifacts found".dimmed());
        println!();
        return;
    }

    write_section(
        "Permissions",
        artifacts.permissions.iter().map(|p| p.to_maintenance_doc()),
    );
    write_section(
        "Error patterns",
        artifacts.error_patterns.iter().map(|e| {
            format!(
                "{} {}",
                severity_tag(e.severity().as_str()),
                e.to_maintenance_doc()
            )
        }),
    );
    write_section(
        "State management",
        artifacts.state_management.iter().map(|s| s.to_maintenance_doc()),
    );
    write_section(
        "Dependencies",
        artifacts.dependencies.iter().map(|d| d.blue().to_string()),
    );
    write_section(
        "Connections",
        artifacts
            .connection_requirements
            .iter()
            .map(|c| c.to_maintenance_doc()),
    );
    write_section(
        "Configuration",
        artifacts.config.iter().map(|c| c.to_maintenance_doc()),
    );
}

fn write_section<I>(title: &str, lines: I)
where
    I: IntoIterator<Item = String>,
{
    let lines: Vec<String> = lines.into_iter().collect();
    if lines.is_empty() {
        return;
    }
    println!("  {} ({}):", title.bold(), lines.len());
    for line in lines {
        println!("    {}", line);
    }
    println!();
}

fn severity_tag(severity: &str) -> ColoredString {
    match severity {
        "high" => "HIGH".red(),
        "medium" => "MED ".yellow(),
        _ => "LOW ".blue(),
    }
}

/// Write a coverage measurement with its per-dimension breakdown.
pub fn write_pretty_coverage(source: &str, result: &CoverageResult, strict: bool, passed: bool) {
    write_header("Measuring:", source);

    if passed {
        print!("  {}", "✓ PASS".green());
    } else {
        print!("  {}", "✗ FAIL".red());
    }
    print!("  Coverage: ");
    print!("{}", colored_percent(result.overall_coverage()));
    println!(
        "  {}",
        format!("(minimum {:.1}%)", result.minimum() * 100.0).dimmed()
    );
    println!();

    if !result.breakdown().is_empty() {
        write_breakdown(result.breakdown());
        println!();
    }

    let missing: Vec<(&String, &Vec<String>)> = result
        .missing_elements()
        .iter()
        .filter(|(_, elements)| !elements.is_empty())
        .collect();
    if !missing.is_empty() {
        println!("  {}", "Missing elements:".bold());
        for (dimension, elements) in missing {
            println!("    {:<20} {}", dimension, elements.join(", ").dimmed());
        }
        println!();
    }

    if !result.recommendations().is_empty() {
        println!("  {}", "Recommendations:".bold());
        for rec in result.recommendations() {
            println!("    {} {}", "→".yellow(), rec);
        }
        println!();
    }

    print!(
        "  {}",
        format!("Threshold: {:.1}%", result.minimum() * 100.0).dimmed()
    );
    if strict {
        print!("  {}", "(strict)".dimmed());
    }
    print!("  ");
    if passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
    println!();
}

fn write_breakdown(breakdown: &[DimensionBreakdown]) {
    println!("  {}", "Breakdown:".bold());
    println!(
        "    {:<20} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "dimension".dimmed(),
        "score".dimmed(),
        "elem".dimmed(),
        "compl".dimmed(),
        "useful".dimmed(),
        "weight".dimmed()
    );
    for row in breakdown {
        let marker = if row.meets_minimum() {
            " ".normal()
        } else {
            "!".red()
        };
        println!(
            "  {} {:<20} {:>7} {:>6.0}% {:>6.0}% {:>6.0}% {:>7.2}",
            marker,
            row.name,
            colored_percent(row.score),
            row.element * 100.0,
            row.completeness * 100.0,
            row.usefulness * 100.0,
            row.weight
        );
    }
}

fn colored_percent(score: f64) -> ColoredString {
    let text = format!("{:.1}%", score * 100.0);
    match score {
        s if s >= 0.85 => text.green().bold(),
        s if s >= 0.70 => text.green(),
        s if s >= 0.50 => text.yellow(),
        s if s >= 0.25 => text.yellow().bold(),
        _ => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::measure;
    use crate::coverage::ExtractedData;
    use serde_json::{json, Value};

    #[test]
    fn test_coverage_json_nests_result() {
        let mut data = ExtractedData::new();
        data.insert("dependencies".to_string(), json!({}));
        let result = measure(&data, 0.85);

        let text = coverage_json("data.json", &result, false, result.passed()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["source"], "data.json");
        assert_eq!(value["passed"], false);
        assert_eq!(value["strict"], false);
        assert_eq!(value["coverage"]["scope"], "supplied");
        assert!(value["coverage"]["overall_coverage"].as_f64().unwrap() < 0.85);
        assert_eq!(value["coverage"]["breakdown"][0]["name"], "dependencies");
        assert_eq!(value["coverage"]["recommendations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extraction_json_includes_counts() {
        let mut artifacts = ExtractedArtifacts::default();
        artifacts.dependencies.push("boto3".to_string());

        let text = extraction_json("./mods", 3, &artifacts).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["path"], "./mods");
        assert_eq!(value["files_scanned"], 3);
        assert_eq!(value["artifacts"]["dependencies"][0], "boto3");
        assert_eq!(value["artifacts"]["state_management"], Value::Null);
    }

    #[test]
    fn test_extraction_json_redacts_secrets() {
        let set = crate::extract::ExtractorSet::standard();
        let artifacts = set.extract_file(".env", "DB_PASSWORD=hunter2\nPORT=8080\n");

        let text = extraction_json(".", 1, &artifacts).unwrap();
        assert!(!text.contains("hunter2"), "{}", text);

        let value: Value = serde_json::from_str(&text).unwrap();
        let config = value["artifacts"]["config"].as_array().unwrap();
        let password = config.iter().find(|c| c["name"] == "DB_PASSWORD").unwrap();
        assert_eq!(password["sensitive"], true);
        assert!(password.get("default").is_none());
        let port = config.iter().find(|c| c["name"] == "PORT").unwrap();
        assert_eq!(port["default"], "8080");
    }

    #[test]
    fn test_colored_percent_text() {
        colored::control::set_override(false);
        assert_eq!(colored_percent(0.5).to_string(), "50.0%");
        assert_eq!(colored_percent(1.0).to_string(), "100.0%");
    }
}
