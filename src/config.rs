use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub cepea: Option<ProviderConfig>,
    pub ipeadata: Option<ProviderConfig>,
    pub bcb: Option<ProviderConfig>,
    pub ptax: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            cepea: Some(ProviderConfig {
                base_url: "https://www.cepea.esalq.usp.br".to_string(),
            }),
            ipeadata: Some(ProviderConfig {
                base_url: "http://www.ipeadata.gov.br".to_string(),
            }),
            bcb: Some(ProviderConfig {
                base_url: "https://api.bcb.gov.br".to_string(),
            }),
            ptax: Some(ProviderConfig {
                base_url: "https://olinda.bcb.gov.br".to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn cepea_base_url(&self) -> &str {
        self.cepea
            .as_ref()
            .map_or("https://www.cepea.esalq.usp.br", |p| &p.base_url)
    }

    pub fn ipeadata_base_url(&self) -> &str {
        self.ipeadata
            .as_ref()
            .map_or("http://www.ipeadata.gov.br", |p| &p.base_url)
    }

    pub fn bcb_base_url(&self) -> &str {
        self.bcb
            .as_ref()
            .map_or("https://api.bcb.gov.br", |p| &p.base_url)
    }

    pub fn ptax_base_url(&self) -> &str {
        self.ptax
            .as_ref()
            .map_or("https://olinda.bcb.gov.br", |p| &p.base_url)
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "agq")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "agq")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
