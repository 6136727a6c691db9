//! Coverage calculation.
//!
//! Scores extracted documentation data against a [`DimensionSpecification`].
//! Each dimension gets the mean of three sub-scores:
//!
//! - element coverage: required top-level keys present
//! - completeness coverage: required fields filled on every instance
//! - usefulness coverage: an actionability indicator appears anywhere
//!
//! The overall coverage is the weight-averaged score of the measured
//! dimensions. Malformed input lowers scores; it never errors.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::dimension::{DimensionSpec, DimensionSpecification};
use crate::error::CoverageFailure;

pub use crate::dimension::DEFAULT_MINIMUM_COVERAGE;

/// Extracted documentation data, keyed by dimension name.
pub type ExtractedData = BTreeMap<String, Value>;

/// Nesting depth beyond which the indicator search stops descending.
pub const MAX_INDICATOR_DEPTH: usize = 32;

/// Which dimensions take part in a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageScope {
    /// Only dimensions present in the input (all of them if none are).
    #[default]
    Supplied,
    /// Every dimension of the specification; absent ones score zero.
    All,
}

/// Sub-scores of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionBreakdown {
    pub name: String,
    pub element: f64,
    pub completeness: f64,
    pub usefulness: f64,
    pub score: f64,
    pub weight: f64,
    pub minimum_coverage: f64,
}

impl DimensionBreakdown {
    pub fn meets_minimum(&self) -> bool {
        self.score >= self.minimum_coverage
    }
}

/// Immutable outcome of one measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    overall_coverage: f64,
    passed: bool,
    minimum: f64,
    scope: CoverageScope,
    dimension_scores: BTreeMap<String, f64>,
    missing_elements: BTreeMap<String, Vec<String>>,
    below_minimum: Vec<String>,
    recommendations: Vec<String>,
    breakdown: Vec<DimensionBreakdown>,
}

impl CoverageResult {
    /// Weighted coverage in `0.0..=1.0`.
    pub fn overall_coverage(&self) -> f64 {
        self.overall_coverage
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Threshold the measurement was judged against.
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn scope(&self) -> CoverageScope {
        self.scope
    }

    pub fn dimension_scores(&self) -> &BTreeMap<String, f64> {
        &self.dimension_scores
    }

    /// Required elements absent per measured dimension (empty when satisfied).
    pub fn missing_elements(&self) -> &BTreeMap<String, Vec<String>> {
        &self.missing_elements
    }

    /// Measured dimensions scoring under their own minimum, in declaration order.
    pub fn below_minimum(&self) -> &[String] {
        &self.below_minimum
    }

    /// Remediation hints, lowest-scoring dimension first.
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Per-dimension sub-scores in declaration order.
    pub fn breakdown(&self) -> &[DimensionBreakdown] {
        &self.breakdown
    }
}

/// Scores extracted data against a specification.
///
/// Holds no state between calls; the same input always yields the same result.
#[derive(Debug, Clone, Copy)]
pub struct CoverageCalculator<'a> {
    spec: &'a DimensionSpecification,
    scope: CoverageScope,
}

impl<'a> CoverageCalculator<'a> {
    pub fn new(spec: &'a DimensionSpecification) -> Self {
        Self {
            spec,
            scope: CoverageScope::default(),
        }
    }

    pub fn scope(mut self, scope: CoverageScope) -> Self {
        self.scope = scope;
        self
    }

    /// Measure against the specification's own global threshold.
    pub fn measure(&self, data: &ExtractedData) -> CoverageResult {
        self.measure_with_minimum(data, self.spec.minimum_coverage())
    }

    /// Measure against a caller-supplied global threshold.
    pub fn measure_with_minimum(&self, data: &ExtractedData, minimum: f64) -> CoverageResult {
        let measured = self.measured_dimensions(data);

        let mut breakdown = Vec::with_capacity(measured.len());
        let mut dimension_scores = BTreeMap::new();
        let mut missing_elements = BTreeMap::new();

        for dim in &measured {
            let value = data.get(&dim.name);
            let (element, missing) = element_coverage(dim, value);
            let completeness = completeness_coverage(dim, value);
            let usefulness = usefulness_coverage(value, self.spec.actionability_indicators());
            let score = clamp01((element + completeness + usefulness) / 3.0);

            tracing::debug!(
                dimension = %dim.name,
                element,
                completeness,
                usefulness,
                score,
                "scored dimension"
            );

            dimension_scores.insert(dim.name.clone(), score);
            missing_elements.insert(dim.name.clone(), missing);
            breakdown.push(DimensionBreakdown {
                name: dim.name.clone(),
                element,
                completeness,
                usefulness,
                score,
                weight: dim.weight,
                minimum_coverage: dim.minimum_coverage,
            });
        }

        let overall_coverage = weighted_mean(&breakdown);
        let below_minimum: Vec<String> = breakdown
            .iter()
            .filter(|b| !b.meets_minimum())
            .map(|b| b.name.clone())
            .collect();
        let recommendations = recommendations(&breakdown, &missing_elements);

        CoverageResult {
            overall_coverage,
            passed: overall_coverage >= minimum,
            minimum,
            scope: self.scope,
            dimension_scores,
            missing_elements,
            below_minimum,
            recommendations,
            breakdown,
        }
    }

    /// Measure and fail when the overall coverage is below `minimum`.
    pub fn assert_coverage(
        &self,
        data: &ExtractedData,
        minimum: f64,
    ) -> Result<CoverageResult, CoverageFailure> {
        let result = self.measure_with_minimum(data, minimum);
        if result.overall_coverage < minimum || minimum.is_nan() {
            return Err(CoverageFailure::BelowMinimum {
                measured: result.overall_coverage,
                minimum,
                result: Box::new(result),
            });
        }
        Ok(result)
    }

    fn measured_dimensions(&self, data: &ExtractedData) -> Vec<&'a DimensionSpec> {
        for key in data.keys() {
            if self.spec.get(key).is_none() {
                tracing::debug!(dimension = %key, "ignoring data for unknown dimension");
            }
        }

        let all: Vec<&DimensionSpec> = self.spec.dimensions().iter().collect();
        match self.scope {
            CoverageScope::All => all,
            CoverageScope::Supplied => {
                let supplied: Vec<&DimensionSpec> = all
                    .iter()
                    .copied()
                    .filter(|d| data.contains_key(&d.name))
                    .collect();
                if supplied.is_empty() {
                    all
                } else {
                    supplied
                }
            }
        }
    }
}

/// Measure with the built-in specification.
pub fn measure(data: &ExtractedData, minimum: f64) -> CoverageResult {
    CoverageCalculator::new(DimensionSpecification::builtin()).measure_with_minimum(data, minimum)
}

/// Assert coverage with the built-in specification.
pub fn assert_coverage(
    data: &ExtractedData,
    minimum: f64,
) -> Result<CoverageResult, CoverageFailure> {
    CoverageCalculator::new(DimensionSpecification::builtin()).assert_coverage(data, minimum)
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Weighted mean of the measured scores. Falls back to the plain mean when
/// every measured dimension has zero weight.
fn weighted_mean(breakdown: &[DimensionBreakdown]) -> f64 {
    if breakdown.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = breakdown.iter().map(|b| b.weight).sum();
    if total_weight > 0.0 {
        let weighted: f64 = breakdown.iter().map(|b| b.weight * b.score).sum();
        clamp01(weighted / total_weight)
    } else {
        clamp01(breakdown.iter().map(|b| b.score).sum::<f64>() / breakdown.len() as f64)
    }
}

/// True when a value carries content: not null, not blank, not an empty
/// collection.
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn has_data(value: Option<&Value>) -> bool {
    value.map(is_filled).unwrap_or(false)
}

fn element_coverage(dim: &DimensionSpec, value: Option<&Value>) -> (f64, Vec<String>) {
    if dim.required_elements.is_empty() {
        let score = if has_data(value) { 1.0 } else { 0.0 };
        return (score, Vec::new());
    }

    let object = value.and_then(Value::as_object);
    let missing: Vec<String> = dim
        .required_elements
        .iter()
        .filter(|e| {
            !object
                .and_then(|o| o.get(e.as_str()))
                .map(|v| !v.is_null())
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    let present = dim.required_elements.len() - missing.len();
    (
        clamp01(present as f64 / dim.required_elements.len() as f64),
        missing,
    )
}

fn completeness_coverage(dim: &DimensionSpec, value: Option<&Value>) -> f64 {
    if dim.required_fields.is_empty() {
        return if has_data(value) { 1.0 } else { 0.0 };
    }

    let object = value.and_then(Value::as_object);
    let total: f64 = dim
        .required_fields
        .iter()
        .map(|(category, fields)| {
            let instances = instances_of(object.and_then(|o| o.get(category)));
            if instances.is_empty() {
                return 0.0;
            }
            let sum: f64 = instances.iter().map(|i| instance_completeness(i, fields)).sum();
            sum / instances.len() as f64
        })
        .sum();

    clamp01(total / dim.required_fields.len() as f64)
}

/// Instances of a category: array elements, the entries of a keyed
/// collection (an object whose values are all objects), or the value itself.
fn instances_of(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) if map.is_empty() => Vec::new(),
        Some(Value::Object(map)) if map.values().all(Value::is_object) => map.values().collect(),
        Some(other) => vec![other],
    }
}

fn instance_completeness(instance: &Value, fields: &[String]) -> f64 {
    if fields.is_empty() {
        return 1.0;
    }
    let Some(object) = instance.as_object() else {
        return 0.0;
    };
    let filled = fields
        .iter()
        .filter(|f| object.get(f.as_str()).map(is_filled).unwrap_or(false))
        .count();
    filled as f64 / fields.len() as f64
}

fn usefulness_coverage(value: Option<&Value>, indicators: &[String]) -> f64 {
    match value {
        Some(v) if contains_indicator(v, indicators) => 1.0,
        _ => 0.0,
    }
}

/// Search nested mappings and lists for a filled indicator key.
///
/// Explicit stack walk bounded by [`MAX_INDICATOR_DEPTH`]; nodes already
/// visited are skipped.
pub fn contains_indicator(root: &Value, indicators: &[String]) -> bool {
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];
    let mut visited: HashSet<*const Value> = HashSet::new();

    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_INDICATOR_DEPTH || !visited.insert(node as *const Value) {
            continue;
        }
        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    if is_filled(child) && indicators.iter().any(|i| i == key) {
                        return true;
                    }
                    stack.push((child, depth + 1));
                }
            }
            Value::Array(items) => {
                stack.extend(items.iter().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }

    false
}

/// Lowest score first; ties keep declaration order (stable sort).
fn recommendations(
    breakdown: &[DimensionBreakdown],
    missing: &BTreeMap<String, Vec<String>>,
) -> Vec<String> {
    let mut ranked: Vec<&DimensionBreakdown> = breakdown.iter().collect();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

    ranked
        .into_iter()
        .filter(|b| !b.meets_minimum())
        .map(|b| {
            let absent = missing.get(&b.name).map(Vec::as_slice).unwrap_or(&[]);
            let detail = if absent.is_empty() {
                "complete the required fields and add actionable detail".to_string()
            } else {
                absent.join(", ")
            };
            format!(
                "Improve {} documentation: {:.1}% coverage is below its {:.1}% minimum; {} missing element{} ({})",
                b.name,
                b.score * 100.0,
                b.minimum_coverage * 100.0,
                absent.len(),
                if absent.len() == 1 { "" } else { "s" },
                detail
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimensionSpec;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> ExtractedData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn two_dimension_spec() -> DimensionSpecification {
        DimensionSpecification::new(vec![
            DimensionSpec::new("alpha", 0.5, 0.5)
                .require_elements(["a", "b"])
                .require_fields("a", ["x", "y"]),
            DimensionSpec::new("beta", 0.5, 0.5)
                .require_elements(["c"])
                .require_fields("c", ["z"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_element_coverage_partial() {
        let dim = DimensionSpec::new("d", 1.0, 0.0).require_elements(["a", "b", "c", "d"]);
        let (score, missing) = element_coverage(&dim, Some(&json!({"a": 1, "c": "x"})));
        assert_eq!(score, 0.5);
        assert_eq!(missing, vec!["b", "d"]);
    }

    #[test]
    fn test_element_coverage_without_required_elements() {
        let dim = DimensionSpec::new("d", 1.0, 0.0);
        assert_eq!(element_coverage(&dim, Some(&json!({"k": 1}))).0, 1.0);
        assert_eq!(element_coverage(&dim, Some(&json!({}))).0, 0.0);
        assert_eq!(element_coverage(&dim, None).0, 0.0);
    }

    #[test]
    fn test_element_coverage_non_object_data() {
        let dim = DimensionSpec::new("d", 1.0, 0.0).require_elements(["a"]);
        let (score, missing) = element_coverage(&dim, Some(&json!(["a"])));
        assert_eq!(score, 0.0);
        assert_eq!(missing, vec!["a"]);
    }

    #[test]
    fn test_completeness_averages_within_then_across_categories() {
        let dim = DimensionSpec::new("d", 1.0, 0.0)
            .require_fields("items", ["x", "y"])
            .require_fields("other", ["z"]);
        // items: instance 1 has both (1.0), instance 2 has one (0.5) -> 0.75
        // other: missing entirely -> 0.0
        let value = json!({
            "items": [{"x": 1, "y": 2}, {"x": 1, "y": ""}]
        });
        let score = completeness_coverage(&dim, Some(&value));
        assert!((score - 0.375).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_completeness_keyed_collection_and_single_object() {
        let dim = DimensionSpec::new("d", 1.0, 0.0).require_fields("deps", ["name", "version"]);
        let keyed = json!({"deps": {"a": {"name": "a", "version": "1"}, "b": {"name": "b"}}});
        assert!((completeness_coverage(&dim, Some(&keyed)) - 0.75).abs() < 1e-9);

        let single = json!({"deps": {"name": "a", "version": "1"}});
        assert_eq!(completeness_coverage(&dim, Some(&single)), 1.0);
    }

    #[test]
    fn test_usefulness_searches_nested_data() {
        let indicators = vec!["failure_impact".to_string()];
        let nested = json!({"a": [{"b": {"failure_impact": "outage"}}]});
        assert!(contains_indicator(&nested, &indicators));

        let blank = json!({"a": {"failure_impact": ""}});
        assert!(!contains_indicator(&blank, &indicators));

        assert!(!contains_indicator(&json!({"a": 1}), &indicators));
    }

    #[test]
    fn test_indicator_search_is_depth_bounded() {
        let indicators = vec!["failure_impact".to_string()];
        let mut deep = json!({"failure_impact": "x"});
        for _ in 0..(MAX_INDICATOR_DEPTH + 5) {
            deep = json!({ "next": deep });
        }
        assert!(!contains_indicator(&deep, &indicators));

        let mut shallow = json!({"failure_impact": "x"});
        for _ in 0..5 {
            shallow = json!({ "next": shallow });
        }
        assert!(contains_indicator(&shallow, &indicators));
    }

    #[test]
    fn test_supplied_scope_measures_only_present_dimensions() {
        let spec = two_dimension_spec();
        let calc = CoverageCalculator::new(&spec);
        let input = data(&[("alpha", json!({"a": {"x": 1, "y": 2}, "b": true}))]);
        let result = calc.measure_with_minimum(&input, 0.5);

        assert_eq!(result.dimension_scores().len(), 1);
        assert!(result.dimension_scores().contains_key("alpha"));
        // element 1, completeness 1, usefulness 0 -> 2/3
        assert!((result.overall_coverage() - 2.0 / 3.0).abs() < 1e-9);
        assert!(result.passed());
    }

    #[test]
    fn test_all_scope_counts_absent_dimensions_as_zero() {
        let spec = two_dimension_spec();
        let calc = CoverageCalculator::new(&spec).scope(CoverageScope::All);
        let input = data(&[("alpha", json!({"a": {"x": 1, "y": 2}, "b": true}))]);
        let result = calc.measure_with_minimum(&input, 0.5);

        assert_eq!(result.dimension_scores()["beta"], 0.0);
        assert!((result.overall_coverage() - 1.0 / 3.0).abs() < 1e-9);
        assert!(!result.passed());
        assert_eq!(result.missing_elements()["beta"], vec!["c"]);
        assert_eq!(result.below_minimum(), ["beta".to_string()]);
    }

    #[test]
    fn test_unknown_dimensions_ignored() {
        let spec = two_dimension_spec();
        let calc = CoverageCalculator::new(&spec);
        let input = data(&[("nonsense", json!({"a": 1}))]);
        let result = calc.measure(&input);
        // Nothing known was supplied, so every dimension is measured.
        assert_eq!(result.dimension_scores().len(), 2);
        assert_eq!(result.overall_coverage(), 0.0);
    }

    #[test]
    fn test_missing_elements_empty_when_satisfied() {
        let spec = two_dimension_spec();
        let calc = CoverageCalculator::new(&spec);
        let input = data(&[("beta", json!({"c": {"z": "v"}}))]);
        let result = calc.measure(&input);
        assert_eq!(result.missing_elements()["beta"], Vec::<String>::new());
    }

    #[test]
    fn test_passing_result_still_reports_weak_dimension() {
        let spec = DimensionSpecification::new(vec![
            DimensionSpec::new("alpha", 0.8, 0.5)
                .require_elements(["a", "b"])
                .require_fields("a", ["x", "y"]),
            DimensionSpec::new("beta", 0.2, 0.9)
                .require_elements(["c", "d"])
                .require_fields("c", ["z"]),
        ])
        .unwrap();
        let input = data(&[
            ("alpha", json!({"a": {"x": 1, "y": 2}, "b": true})),
            ("beta", json!({"c": {"z": "v"}})),
        ]);
        let result = CoverageCalculator::new(&spec).measure_with_minimum(&input, 0.6);

        // alpha 2/3, beta 1/2 -> 0.8 * 2/3 + 0.2 * 1/2
        assert!((result.overall_coverage() - (0.8 * 2.0 / 3.0 + 0.1)).abs() < 1e-9);
        assert!(result.passed());
        assert_eq!(result.below_minimum(), ["beta".to_string()]);
        assert_eq!(result.missing_elements()["beta"], vec!["d"]);
        assert!(result.missing_elements()["alpha"].is_empty());
        assert_eq!(result.recommendations().len(), 1);
        assert!(result.recommendations()[0].contains("beta"));
    }

    #[test]
    fn test_repeated_required_elements_count_once() {
        let yaml = r#"
dimensions:
  - name: d
    weight: 1.0
    required_elements: [a, a, b]
"#;
        let spec = DimensionSpecification::from_yaml(yaml).unwrap();
        let (score, missing) = element_coverage(&spec.dimensions()[0], Some(&json!({"b": 1})));
        assert_eq!(score, 0.5);
        assert_eq!(missing, vec!["a"]);
    }

    #[test]
    fn test_recommendations_sorted_with_stable_ties() {
        let spec = DimensionSpecification::new(vec![
            DimensionSpec::new("first", 0.25, 0.9).require_elements(["a"]),
            DimensionSpec::new("second", 0.25, 0.9).require_elements(["a"]),
            DimensionSpec::new("third", 0.25, 0.9).require_elements(["a", "b"]),
            DimensionSpec::new("fourth", 0.25, 0.0).require_elements(["a"]),
        ])
        .unwrap();
        let calc = CoverageCalculator::new(&spec).scope(CoverageScope::All);
        let input = data(&[("third", json!({"a": "present"}))]);
        let result = calc.measure(&input);

        let recs = result.recommendations();
        // "fourth" meets its zero minimum and is never recommended.
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("first"));
        assert!(recs[1].contains("second"));
        assert!(recs[2].contains("third"));
        assert!(recs[2].contains("1 missing element "));
    }

    #[test]
    fn test_assert_coverage_message() {
        let spec = two_dimension_spec();
        let calc = CoverageCalculator::new(&spec);
        let input = data(&[("alpha", json!({}))]);
        let err = calc.assert_coverage(&input, 0.85).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("0.85"), "{}", msg);
        assert!(msg.contains("below minimum"), "{}", msg);
        assert_eq!(err.result().overall_coverage(), 0.0);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let input = data(&[(
            "dependencies",
            json!({"runtime_dependencies": [{"name": "a"}], "package_manager": "pip"}),
        )]);
        let first = measure(&input, DEFAULT_MINIMUM_COVERAGE);
        let second = measure(&input, DEFAULT_MINIMUM_COVERAGE);
        assert_eq!(first, second);
    }
}
