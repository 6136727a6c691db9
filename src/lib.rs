//! opscover - operational documentation coverage.
//!
//! opscover reads infrastructure modules, program source and configuration
//! files, extracts the facts an operator needs to maintain them (cloud
//! permissions, error handling, state semantics, dependencies, connections,
//! settings) and scores how completely documentation covers each of those
//! dimensions.
//!
//! # Architecture
//!
//! - `artifact`: plain value types for extracted facts
//! - `extract`: the `Extractor` trait, its module/source/config variants and
//!   the `ExtractorSet` that routes files to them
//! - `dimension`: the weighted dimension taxonomy, loaded from YAML
//! - `coverage`: element, completeness and usefulness scoring
//! - `error`: typed specification and assertion failures
//! - `report`: output formatting (pretty, JSON)
//! - `cli`, `logging`: the binary's plumbing
//!
//! # Adding a Source Format
//!
//! Implement `Extractor` and register it on an `ExtractorSet`; routing by
//! file name lives in `ExtractorSet::select_all`.

pub mod artifact;
pub mod cli;
pub mod coverage;
pub mod dimension;
pub mod error;
pub mod extract;
pub mod logging;
pub mod report;

pub use artifact::{
    ConfigArtifact, ConnectionKind, ConnectionRequirement, ErrorPattern, ErrorType,
    MaintenanceScenario, PermissionRequirement, Severity, StateFlavor, StateManagement,
};
pub use coverage::{
    assert_coverage, measure, CoverageCalculator, CoverageResult, CoverageScope,
    DimensionBreakdown, ExtractedData,
};
pub use dimension::{DimensionSpec, DimensionSpecification};
pub use error::{CoverageFailure, SpecError};
pub use extract::{
    ConfigExtractor, ConfigFormat, ExtractedArtifacts, Extractor, ExtractorSet, ModuleExtractor,
    SourceExtractor, SourceLanguage,
};
