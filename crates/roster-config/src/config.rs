use roster_types::{SortPolicy, DEFAULT_PAGE_SIZE, PAGE_SIZE_CHOICES};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths::{get_config_path, get_default_store_path};

struct ConfigLock {
    _file: File,
}

impl ConfigLock {
    fn acquire_exclusive(config_path: &Path) -> Result<Self, std::io::Error> {
        let lock_path = config_path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)?;
        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if result != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(ConfigLock { _file: file })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_map_size")]
    pub map_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            map_size: default_map_size(),
        }
    }
}

fn default_map_size() -> u64 {
    64 * 1024 * 1024 // 64MB
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_sizes")]
    pub page_sizes: Vec<usize>,
    #[serde(default)]
    pub sort_policy: SortPolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_sizes: default_page_sizes(),
            sort_policy: SortPolicy::default(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_page_sizes() -> Vec<usize> {
    PAGE_SIZE_CHOICES.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_name_width")]
    pub name_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            name_width: default_name_width(),
        }
    }
}

fn default_name_width() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let _lock = ConfigLock::acquire_exclusive(path)?;
        Self::load_unlocked(path)
    }

    fn load_unlocked(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn save_unlocked(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load, modify and save under a single lock so concurrent edits from
    /// two processes don't clobber each other.
    pub fn edit_at<F>(path: &Path, edit: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        let _lock = ConfigLock::acquire_exclusive(path)?;
        let mut config = Config::load_unlocked(path)?;
        edit(&mut config);
        config.save_unlocked(path)?;
        Ok(config)
    }

    pub fn edit<F>(edit: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Config),
    {
        Self::edit_at(&get_config_path(), edit)
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(get_default_store_path)
    }

    pub fn is_allowed_page_size(&self, page_size: usize) -> bool {
        page_size > 0 && self.view.page_sizes.contains(&page_size)
    }
}
