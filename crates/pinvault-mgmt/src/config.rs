//! Service configuration, loaded from TOML or JSON.

use std::path::{Path, PathBuf};

use pinvault_reduce::{PolicyConfig, ZstdCodec};
use pinvault_storage::RemoteStoreConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the `pvault` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// JSON file holding file records.
    pub records_path: PathBuf,
    /// Zstd level used for uploads.
    pub codec_level: i32,
    /// Whether uploads run the compression policy at all.
    pub compression_enabled: bool,
    /// Compression policy.
    pub policy: PolicyConfig,
    /// Remote content store.
    pub remote: RemoteStoreConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("data/files.json"),
            codec_level: ZstdCodec::DEFAULT_LEVEL,
            compression_enabled: true,
            policy: PolicyConfig::default(),
            remote: RemoteStoreConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Parse a config file; the format follows the extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => {
                let config: VaultConfig = toml::from_str(&contents)?;
                Ok(config)
            }
            "json" => {
                let config: VaultConfig = serde_json::from_str(&contents)?;
                Ok(config)
            }
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        }
    }

    /// Load `path` if it exists, defaults otherwise; `PINATA_JWT` overrides the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found, using defaults: {}", path.display());
            Self::default()
        };
        Ok(Self {
            remote: config.remote.clone().with_env_jwt(),
            ..config
        })
    }

    /// Codec configured for uploads and downloads.
    pub fn codec(&self) -> ZstdCodec {
        ZstdCodec::new(self.codec_level)
    }
}
