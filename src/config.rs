use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::semantic::{DEFAULT_MODEL, DEFAULT_TOP_K};

const CONFIG_FILE: &str = "config.yaml";

/// Default source documents file name
const DEFAULT_DOCUMENTS_FILE: &str = "projects.json";
/// Default index snapshot file name
const DEFAULT_INDEX_FILE: &str = "search_index.bin";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Default daemon address
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2").
    /// Changing it invalidates the saved index.
    #[serde(default = "default_model")]
    pub model: String,

    /// Number of results returned when the caller does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// JSON array of project documents, relative to the data directory
    #[serde(default = "default_documents_file")]
    pub documents_file: String,

    /// Index snapshot, relative to the data directory
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            default_top_k: default_top_k(),
            documents_file: default_documents_file(),
            index_file: default_index_file(),
            download_timeout_secs: default_download_timeout_secs(),
            listen_addr: default_listen_addr(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_documents_file() -> String {
    DEFAULT_DOCUMENTS_FILE.to_string()
}

fn default_index_file() -> String {
    DEFAULT_INDEX_FILE.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }

        if self.default_top_k == 0 {
            bail!("default_top_k must be greater than 0");
        }

        if self.download_timeout_secs == 0 {
            bail!("download_timeout_secs must be greater than 0");
        }

        if self.documents_file.trim().is_empty() || self.index_file.trim().is_empty() {
            bail!("documents_file and index_file must not be empty");
        }

        Ok(())
    }

    /// Load `config.yaml` from `base_path`, creating it with defaults if missing.
    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_path)
            .with_context(|| format!("failed to create {}", base_path.display()))?;

        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            let config = Self {
                base_path: base_path.to_path_buf(),
                ..Default::default()
            };
            config.save()?;
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("config is malformed: {}", path.display()))?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_str = serde_yml::to_string(&self)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_path)?;
        tmp.write_all(config_str.as_bytes())?;
        tmp.persist(self.base_path.join(CONFIG_FILE))
            .map_err(|err| err.error)
            .context("failed to write config")?;

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn documents_path(&self) -> PathBuf {
        self.base_path.join(&self.documents_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_path.join(&self.index_file)
    }
}
