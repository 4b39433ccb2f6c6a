use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct IngestConfig {
    pub store: StoreConfig,
    pub upload: UploadSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// Project URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    /// HTTP request timeout.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UploadSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub batch_timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency: 1,
            batch_timeout_secs: 30,
        }
    }
}

impl UploadSettings {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

impl IngestConfig {
    /// Layered load: defaults, then the TOML file (`path`, or the per-user
    /// default when it exists), then `SALEMATE__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()));
            }
            None => {
                let default_path = get_config_path();
                builder = builder.add_source(File::from(default_path).required(false));
            }
        }
        let config: Self = builder
            .add_source(
                Environment::with_prefix("SALEMATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.batch_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "upload.batch_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("salemate").join("ingest.toml")
    } else {
        PathBuf::from("ingest.toml")
    }
}
