use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{BASIC_LAUNCH_REQUEST, Placement};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    pub resolver: ResolverConfig,
    pub tabs: TabsConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lti-resolver")
                .join("lti.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Message type a resolved handler must have
    pub launch_message_type: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            launch_message_type: BASIC_LAUNCH_REQUEST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabsConfig {
    /// Handlers with other message types never become tabs
    pub message_types: Vec<String>,
    pub default_link_fragment: String,
    pub link_fragments: BTreeMap<Placement, String>,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            message_types: vec![BASIC_LAUNCH_REQUEST.to_string()],
            default_link_fragment: "nav".to_string(),
            link_fragments: BTreeMap::new(),
        }
    }
}

impl TabsConfig {
    pub fn link_fragment(&self, placement: Placement) -> &str {
        self.link_fragments
            .get(&placement)
            .map(String::as_str)
            .unwrap_or(&self.default_link_fragment)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub default_per_page: usize,
    pub max_per_page: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            max_per_page: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            storage: StorageConfig::default(),
            resolver: ResolverConfig::default(),
            tabs: TabsConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the resolver and history service cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.resolver.launch_message_type.trim().is_empty() {
            eyre::bail!("resolver.launch_message_type must not be empty");
        }
        if self.tabs.message_types.iter().any(|t| t.trim().is_empty()) {
            eyre::bail!("tabs.message_types must not contain empty entries");
        }
        if self.history.default_per_page == 0 || self.history.max_per_page == 0 {
            eyre::bail!("history page sizes must be at least 1");
        }
        if self.history.default_per_page > self.history.max_per_page {
            eyre::bail!(
                "history.default_per_page ({}) exceeds history.max_per_page ({})",
                self.history.default_per_page,
                self.history.max_per_page
            );
        }
        Ok(())
    }
}
