//! `tandem.config.json`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tandem_editor::{default_providers, DiagramTypeConfig, Provider, Providers};
use tandem_features::{merge, MergeError, MergeOptions, MergePolicy, MergeResult};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "tandem.config.json";
pub const DEFAULT_PORT: u16 = 3030;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub diagram_type: DiagramTypeConfig,
    #[serde(default)]
    pub disabled_features: Vec<String>,
    #[serde(default)]
    pub merge_policy: MergePolicy,
    #[serde(default)]
    pub deep_merge: bool,
    /// Directory for persisted layout records; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_dir: Option<PathBuf>,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            diagram_type: DiagramTypeConfig::default(),
            disabled_features: Vec::new(),
            merge_policy: MergePolicy::default(),
            deep_merge: false,
            layout_dir: None,
            port: DEFAULT_PORT,
        }
    }
}

impl WorkspaceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: WorkspaceConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // Relative layout dirs are relative to the config file
        if let Some(dir) = config.layout_dir.take() {
            let base = path.parent().unwrap_or(Path::new(""));
            config.layout_dir = Some(if dir.is_relative() { base.join(dir) } else { dir });
        }
        tracing::debug!(path = %path.display(), diagram_type = %config.diagram_type.id, "loaded config");
        Ok(config)
    }

    /// `tandem.config.json` in `dir`, or the defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            policy: self.merge_policy,
            deep_merge: self.deep_merge,
        }
    }

    /// Effective providers: built-in defaults, then `custom`, then the
    /// disabled list.
    pub fn providers(&self, custom: Option<&Providers>) -> Result<MergeResult<Provider>, ConfigError> {
        let defaults = default_providers(&self.diagram_type);
        let merged = merge(&defaults, custom, &self.disabled_features, &self.merge_options())?;
        for warning in &merged.warnings {
            tracing::warn!("{}", warning);
        }
        Ok(merged)
    }
}
