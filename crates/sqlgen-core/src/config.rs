use crate::errors::ConfigError;
use crate::model::GenerationParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(
        default = "default_version",
        rename = "configVersion",
        alias = "version"
    )]
    pub version: u32,
    pub model: ModelConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub few_shot: FewShotConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Completion endpoint the prompt is POSTed to.
    pub endpoint: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FewShotConfig {
    pub enabled: bool,
    pub num_examples: usize,
    pub use_semantic_similarity: bool,
}

impl Default for FewShotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_examples: 3,
            use_semantic_similarity: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub use_cache: bool,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.1,
            top_p: 0.9,
            use_cache: true,
            timeout_seconds: 60,
        }
    }
}

impl GenerationConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            use_cache: self.use_cache,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub schema_optimization: bool,
    pub query_validation: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            schema_optimization: true,
            query_validation: true,
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let cfg: AppConfig = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.cache.max_size == 0 {
        return Err(ConfigError("cache.max_size must be at least 1".into()));
    }
    if cfg.few_shot.enabled && cfg.few_shot.num_examples == 0 {
        return Err(ConfigError(
            "few_shot.num_examples must be at least 1 when few_shot is enabled".into(),
        ));
    }
    if cfg.generation.timeout_seconds == 0 {
        return Err(ConfigError(
            "generation.timeout_seconds must be at least 1".into(),
        ));
    }
    Ok(cfg)
}

const SAMPLE_CONFIG: &str = r#"configVersion: 1
model:
  endpoint: http://127.0.0.1:8080/v1/completions
  name: nsql-6b
database:
  path: employees.db
few_shot:
  enabled: true
  num_examples: 3
  use_semantic_similarity: false
cache:
  enabled: true
  max_size: 100
generation:
  max_new_tokens: 200
  temperature: 0.1
  top_p: 0.9
  use_cache: true
  timeout_seconds: 60
performance:
  schema_optimization: true
  query_validation: true
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
