//! Per-stage and pipeline configuration.
//!
//! Configuration is an explicit value passed at pipeline construction — one
//! [`StageConfig`] per stage, no process-wide singletons. [`PipelineConfig::from_env`]
//! exists for deployments that configure through the environment, in the
//! usual dotenv-then-vars order.

use std::path::PathBuf;
use std::time::Duration;

use rustc_hash::FxHashMap;

/// Configuration of a single stage's external call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageConfig {
    /// Model identifier forwarded to the completion service.
    pub model: String,
    /// Bound on the stage's external call; timeout degrades to the stage's
    /// fallback output, identical to a failed call.
    pub timeout: Duration,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl StageConfig {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration of a whole pipeline run.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    stages: FxHashMap<String, StageConfig>,
    default_stage: StageConfig,
    /// Directory receiving the persisted run artifact.
    pub reports_dir: PathBuf,
}

impl PipelineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: FxHashMap::default(),
            default_stage: StageConfig::default(),
            reports_dir: PathBuf::from("reports"),
        }
    }

    /// Stage configuration, falling back to the pipeline default for stages
    /// without an explicit entry.
    #[must_use]
    pub fn stage(&self, name: &str) -> &StageConfig {
        self.stages.get(name).unwrap_or(&self.default_stage)
    }

    #[must_use]
    pub fn with_stage(mut self, name: impl Into<String>, config: StageConfig) -> Self {
        self.stages.insert(name.into(), config);
        self
    }

    /// Convenience: override just the model of one stage.
    #[must_use]
    pub fn with_stage_model(self, name: impl Into<String>, model: impl Into<String>) -> Self {
        let name = name.into();
        let config = self.stage(&name).clone().with_model(model);
        self.with_stage(name, config)
    }

    #[must_use]
    pub fn with_default_stage(mut self, config: StageConfig) -> Self {
        self.default_stage = config;
        self
    }

    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Builds a configuration from the environment, loading a `.env` file
    /// first when present.
    ///
    /// Recognized variables: `FLOWLINT_MODEL` (default model),
    /// `FLOWLINT_TIMEOUT_SECS`, `FLOWLINT_REPORTS_DIR`, and per-stage model
    /// overrides `FLOWLINT_MODEL_CHECKER`, `FLOWLINT_MODEL_TEXT_CHECKER`,
    /// `FLOWLINT_MODEL_CORRECTOR`, `FLOWLINT_MODEL_FAST_CORRECTOR`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::new();

        if let Ok(model) = std::env::var("FLOWLINT_MODEL") {
            config.default_stage.model = model;
        }
        if let Ok(secs) = std::env::var("FLOWLINT_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            config.default_stage.timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var("FLOWLINT_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }

        for stage in crate::pipeline::STANDARD_STAGES {
            let key = format!("FLOWLINT_MODEL_{}", stage.to_ascii_uppercase());
            if let Ok(model) = std::env::var(&key) {
                config = config.with_stage_model(*stage, model);
            }
        }
        config
    }
}
