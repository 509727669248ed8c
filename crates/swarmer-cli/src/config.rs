use serde::Deserialize;
use std::path::{Path, PathBuf};
use swarmer_agent::ModelConfig;
use swarmer_core::{SwarmError, SwarmResult};
use swarmer_orchestrator::SchedulerConfig;

/// Contents of `swarmer.toml`.
#[derive(Debug, Deserialize)]
pub struct SwarmerConfig {
    /// Required by `run`; `validate` works without it.
    #[serde(default)]
    pub model: Option<ModelConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

impl Default for SwarmerConfig {
    fn default() -> Self {
        Self {
            model: None,
            scheduler: SchedulerConfig::default(),
            files_dir: default_files_dir(),
        }
    }
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("project_files")
}

impl SwarmerConfig {
    pub fn parse(text: &str) -> SwarmResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SwarmError::Config(e.to_string()))?;
        config.scheduler.validate()?;
        if let Some(model) = &config.model {
            model.validate()?;
        }
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults when `required`
    /// is false.
    pub async fn load(path: &Path, required: bool) -> SwarmResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(SwarmError::Config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))),
        }
    }

    /// The model section with its API key resolved from the environment.
    pub fn resolved_model(&self) -> SwarmResult<ModelConfig> {
        let mut model = self
            .model
            .clone()
            .ok_or_else(|| SwarmError::Config("missing [model] section".into()))?;
        model.resolve_api_key()?;
        Ok(model)
    }
}
