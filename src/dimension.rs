//! Dimension specification: the scoring taxonomy, held as data.
//!
//! A specification is parsed from YAML (the built-in one is embedded from
//! `templates/dimensions.yaml`), validated once at construction, and is
//! read-only afterwards. Invalid specifications are rejected; weights are
//! never silently normalized.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{SpecError, WEIGHT_TOLERANCE};

/// Global pass threshold used when neither the caller nor the
/// specification provides one.
pub const DEFAULT_MINIMUM_COVERAGE: f64 = 0.85;

/// YAML source of the built-in taxonomy.
pub const BUILTIN_SPEC_YAML: &str = include_str!("templates/dimensions.yaml");

static BUILTIN: Lazy<DimensionSpecification> = Lazy::new(|| {
    DimensionSpecification::from_yaml(BUILTIN_SPEC_YAML)
        .expect("built-in dimension specification must be valid")
});

/// One scoring dimension.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DimensionSpec {
    pub name: String,
    /// Keys expected at the top level of the dimension's data.
    #[serde(default)]
    pub required_elements: Vec<String>,
    /// Fields each instance of a category must carry to be complete.
    #[serde(default)]
    pub required_fields: BTreeMap<String, Vec<String>>,
    /// Share of the overall score.
    pub weight: f64,
    /// Per-dimension pass threshold.
    #[serde(default)]
    pub minimum_coverage: f64,
}

impl DimensionSpec {
    pub fn new(name: impl Into<String>, weight: f64, minimum_coverage: f64) -> Self {
        Self {
            name: name.into(),
            required_elements: Vec::new(),
            required_fields: BTreeMap::new(),
            weight,
            minimum_coverage,
        }
    }

    pub fn require_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for e in elements {
            let e = e.into();
            if !self.required_elements.contains(&e) {
                self.required_elements.push(e);
            }
        }
        self
    }

    pub fn require_fields<I, S>(mut self, category: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields
            .insert(category.into(), fields.into_iter().map(Into::into).collect());
        self
    }
}

/// On-disk shape of a specification file.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct SpecFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    minimum_coverage: Option<f64>,
    #[serde(default)]
    actionability_indicators: Vec<String>,
    dimensions: Vec<DimensionSpec>,
}

/// A validated, immutable set of dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSpecification {
    dimensions: Vec<DimensionSpec>,
    actionability_indicators: Vec<String>,
    minimum_coverage: f64,
}

impl DimensionSpecification {
    /// Validate and build a specification with default indicators and threshold.
    pub fn new(dimensions: Vec<DimensionSpec>) -> Result<Self, SpecError> {
        Self::with_options(dimensions, default_indicators(), DEFAULT_MINIMUM_COVERAGE)
    }

    /// Validate and build a specification.
    ///
    /// Repeated required elements and fields collapse to their first
    /// occurrence.
    pub fn with_options(
        mut dimensions: Vec<DimensionSpec>,
        actionability_indicators: Vec<String>,
        minimum_coverage: f64,
    ) -> Result<Self, SpecError> {
        validate(&dimensions, minimum_coverage)?;
        for d in &mut dimensions {
            dedup_in_place(&mut d.required_elements);
            for fields in d.required_fields.values_mut() {
                dedup_in_place(fields);
            }
        }
        Ok(Self {
            dimensions,
            actionability_indicators,
            minimum_coverage,
        })
    }

    /// Parse a specification from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        let file: SpecFile =
            serde_yaml::from_str(yaml).map_err(|e| SpecError::Parse(e.to_string()))?;
        let indicators = if file.actionability_indicators.is_empty() {
            default_indicators()
        } else {
            file.actionability_indicators
        };
        Self::with_options(
            file.dimensions,
            indicators,
            file.minimum_coverage.unwrap_or(DEFAULT_MINIMUM_COVERAGE),
        )
    }

    /// Parse a specification from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SpecError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SpecError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml(&content)
    }

    /// The built-in taxonomy, parsed once per process.
    pub fn builtin() -> &'static DimensionSpecification {
        &BUILTIN
    }

    /// Copy of this specification with some weights replaced.
    ///
    /// The result is re-validated, so overrides must still sum to 1.0.
    pub fn with_weights(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, SpecError> {
        for name in overrides.keys() {
            if self.get(name).is_none() {
                return Err(SpecError::UnknownDimension(name.clone()));
            }
        }
        let dimensions = self
            .dimensions
            .iter()
            .map(|d| {
                let mut d = d.clone();
                if let Some(w) = overrides.get(&d.name) {
                    d.weight = *w;
                }
                d
            })
            .collect();
        Self::with_options(
            dimensions,
            self.actionability_indicators.clone(),
            self.minimum_coverage,
        )
    }

    /// Copy of this specification with a different global threshold.
    pub fn with_minimum_coverage(&self, minimum: f64) -> Result<Self, SpecError> {
        Self::with_options(
            self.dimensions.clone(),
            self.actionability_indicators.clone(),
            minimum,
        )
    }

    /// Dimensions in declaration order.
    pub fn dimensions(&self) -> &[DimensionSpec] {
        &self.dimensions
    }

    pub fn get(&self, name: &str) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn actionability_indicators(&self) -> &[String] {
        &self.actionability_indicators
    }

    /// Default global pass threshold.
    pub fn minimum_coverage(&self) -> f64 {
        self.minimum_coverage
    }

    pub fn total_weight(&self) -> f64 {
        self.dimensions.iter().map(|d| d.weight).sum()
    }
}

fn default_indicators() -> Vec<String> {
    [
        "failure_impact",
        "recovery_procedure",
        "recovery_steps",
        "resolution_steps",
        "diagnostic_steps",
        "troubleshooting",
        "rollback_procedure",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

fn valid_fraction(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Check a dimension list for structural and weight integrity.
pub fn validate(dimensions: &[DimensionSpec], minimum_coverage: f64) -> Result<(), SpecError> {
    if dimensions.is_empty() {
        return Err(SpecError::Empty);
    }
    if !valid_fraction(minimum_coverage) {
        return Err(SpecError::InvalidGlobalMinimum(minimum_coverage));
    }

    let mut names = HashSet::new();
    for (i, d) in dimensions.iter().enumerate() {
        if d.name.trim().is_empty() {
            return Err(SpecError::EmptyName(i));
        }
        if !names.insert(d.name.as_str()) {
            return Err(SpecError::DuplicateDimension(d.name.clone()));
        }
        if !d.weight.is_finite() || d.weight < 0.0 {
            return Err(SpecError::InvalidWeight {
                name: d.name.clone(),
                weight: d.weight,
            });
        }
        if !valid_fraction(d.minimum_coverage) {
            return Err(SpecError::InvalidMinimum {
                name: d.name.clone(),
                minimum: d.minimum_coverage,
            });
        }
    }

    let sum: f64 = dimensions.iter().map(|d| d.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(SpecError::WeightSum {
            sum,
            tolerance: WEIGHT_TOLERANCE,
        });
    }

    Ok(())
}
