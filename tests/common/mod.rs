//! Shared fixtures for integration tests.

use std::time::Duration;

use flowlint::config::{PipelineConfig, StageConfig};
use flowlint::pipeline::{CHECKER, CORRECTOR, FAST_CORRECTOR, TEXT_CHECKER};

/// Distinct model per stage so scripted completions can address stages
/// individually, the way deployments separate them.
pub const CHECKER_MODEL: &str = "m-checker";
pub const TEXT_CHECKER_MODEL: &str = "m-text";
pub const CORRECTOR_MODEL: &str = "m-corrector";
pub const FAST_CORRECTOR_MODEL: &str = "m-fast";

pub fn scripted_config(reports_dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_default_stage(StageConfig::default().with_timeout(Duration::from_secs(5)))
        .with_stage_model(CHECKER, CHECKER_MODEL)
        .with_stage_model(TEXT_CHECKER, TEXT_CHECKER_MODEL)
        .with_stage_model(CORRECTOR, CORRECTOR_MODEL)
        .with_stage_model(FAST_CORRECTOR, FAST_CORRECTOR_MODEL)
        .with_reports_dir(reports_dir)
}
