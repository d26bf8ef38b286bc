//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, else the platform config directory)
//! 3. `BACKUPGAP_*` environment variables
//! 4. Command-line flags ([`Config::apply_cli`])

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::RefreshPolicy;
use crate::cli::Cli;
use crate::duplicates::DuplicatePolicy;
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::DEFAULT_CACHE_FILE_NAME;

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "BACKUPGAP_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Basename of the hash map file kept at each root.
    pub cache_file_name: String,
    /// Duplicate handling while hashing the source.
    pub duplicate_policy: DuplicatePolicy,
    /// When an existing hash map is rebuilt.
    pub refresh: RefreshPolicy,
    /// Read buffer size for hashing, in bytes.
    pub buffer_size: usize,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Move deleted files to the trash instead of unlinking them.
    pub use_trash: bool,
    /// Remove directories emptied by deletions.
    pub prune_empty_dirs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file_name: DEFAULT_CACHE_FILE_NAME.to_string(),
            duplicate_policy: DuplicatePolicy::Report,
            refresh: RefreshPolicy::Ask,
            buffer_size: DEFAULT_BUFFER_SIZE,
            follow_symlinks: false,
            use_trash: false,
            prune_empty_dirs: true,
        }
    }
}

impl Config {
    /// Load configuration from `explicit` or the platform config file.
    ///
    /// Falls back to defaults (plus environment) when the file is unusable.
    #[must_use]
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path()
                .map_err(|e| log::debug!("No platform config directory: {}", e))
                .ok(),
        };
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::extract(Self::base()),
        }
    }

    /// Load configuration layered on the TOML file at `path`.
    ///
    /// A missing file is skipped. An invalid file is reported and ignored.
    #[must_use]
    pub fn load_from_path(path: PathBuf) -> Self {
        if !path.exists() {
            log::debug!("Config file {} not found, using defaults", path.display());
        }
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX));

        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::extract(Self::base())
            }
        }
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Self {
        figment.extract().unwrap_or_else(|e| {
            log::warn!("Ignoring invalid {}* environment: {}", ENV_PREFIX, e);
            Self::default()
        })
    }

    /// Override settings with flags given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(name) = &cli.cache_name {
            self.cache_file_name.clone_from(name);
        }
        if let Some(policy) = cli.duplicate_policy {
            self.duplicate_policy = policy;
        }
        if let Some(refresh) = cli.refresh {
            self.refresh = refresh;
        }
        if let Some(size) = cli.buffer_size {
            self.buffer_size = size;
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        }
        if cli.trash {
            self.use_trash = true;
        }
        if cli.keep_empty_dirs {
            self.prune_empty_dirs = false;
        }
    }

    /// Check settings that would make a run unsafe or meaningless.
    ///
    /// # Errors
    ///
    /// The cache file name must be a plain, non-empty file name, and the
    /// buffer size must be positive.
    pub fn validate(&self) -> Result<()> {
        let name = Path::new(&self.cache_file_name);
        let plain = name.file_name().is_some_and(|n| n == name.as_os_str());
        if self.cache_file_name.is_empty() || !plain {
            anyhow::bail!(
                "Cache file name must be a plain file name, got '{}'",
                self.cache_file_name
            );
        }
        if self.buffer_size == 0 {
            anyhow::bail!("Buffer size must be greater than zero");
        }
        Ok(())
    }

    /// Save the configuration as TOML to the platform config path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined or written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save the configuration as TOML to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be found.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "backupgap")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
