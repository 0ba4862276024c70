//! Pager configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Default number of headers per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// How push updates merge into a mailbox that is not showing page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushMergePolicy {
    /// Prepend new mail whatever page is visible.
    #[default]
    Always,
    /// Skip push merges while a page other than the first is visible.
    FirstPageOnly,
}

/// Settings for the cache and pagination coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Headers per page, also used as the scroll-growth chunk size.
    pub page_size: u32,
    /// Push merge behaviour away from page 1.
    pub push_merge: PushMergePolicy,
    /// Whether search also matches message snippets.
    pub search_snippets: bool,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            push_merge: PushMergePolicy::Always,
            search_snippets: true,
        }
    }
}

impl PagerConfig {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailpager")
            .join("config.json")
    }

    /// Parse and validate a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration at `path`, falling back to defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds invalid values.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let config = Self::from_json(&contents)?;
                info!(path = %path.display(), page_size = config.page_size, "Loaded pager config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No pager config, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!(path = %path.display(), "Pager config saved");
        Ok(())
    }

    /// Check that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `page_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }
}
