//! Configuration for keel.
//!
//! The [`Config`] struct owns two concerns: where keel keeps its on-disk
//! state (module clone caches, generated provisioning projects, plan
//! artifacts) and which external executables it drives.
//!
//! # Resolution order
//!
//! 1. `KEEL_DATA_DIR` environment variable, when set
//! 2. `~/.keel/config.toml`, when present
//! 3. Built-in defaults (`~/.keel`, falling back to the system temp
//!    directory when no home directory exists)
//!
//! # Directory layout
//!
//! ```text
//! <data_dir>/terraform/modules/<template>/<version>/   clone cache
//! <data_dir>/terraform/state/<project>/                generated project
//! <data_dir>/terraform/state/<project>/plans/          plan artifacts
//! <data_dir>/helm/<template>/<version>/                chart clone cache
//! ```
//!
//! Terraform cache segments replace spaces in template names with dots;
//! helm segments keep the raw name.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DATA_DIR_ENV, DATA_DIR_NAME, GIT_BIN, HELM_DIR, INSPECT_BIN, MODULES_DIR, PLANS_DIR, STATE_DIR,
    TERRAFORM_BIN, TERRAFORM_DIR,
};
use crate::core::KeelError;

/// External tool executables keel drives as subprocesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Source-control executable.
    pub git: String,
    /// Terraform-compatible executable.
    pub terraform: String,
    /// Module-introspection executable whose stdout is schema JSON.
    pub inspect: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: GIT_BIN.to_string(),
            terraform: TERRAFORM_BIN.to_string(),
            inspect: INSPECT_BIN.to_string(),
        }
    }
}

/// keel configuration: data directory layout and external tool names.
///
/// Every field has a default, so a missing config file yields a working
/// configuration. The environment override is applied both when defaulting
/// and when loading, so `KEEL_DATA_DIR` always wins over the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for caches, projects and plan artifacts.
    pub data_dir: PathBuf,
    /// Executable names or paths for the tools keel invokes.
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default config path, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Fails when a config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, KeelError> {
        match Self::default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific path; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, KeelError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content).map_err(|e| KeelError::ConfigError {
                message: format!("{}: {e}", path.display()),
            })?
        } else {
            Self::default()
        };
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Write the configuration to `path` as TOML.
    ///
    /// # Errors
    ///
    /// Fails when serialization or the atomic write fails.
    pub fn save_to(&self, path: &Path) -> Result<(), KeelError> {
        let content = toml::to_string_pretty(self)?;
        crate::utils::fs::safe_write(path, &content).map_err(|e| KeelError::ConfigError {
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// `~/.keel/config.toml`, when a home directory can be determined.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DATA_DIR_NAME).join("config.toml"))
    }

    /// Replace the data directory, for tests and `--data-dir`.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Clone-cache directory for a terraform module version.
    ///
    /// Spaces in the template name become dots in the path segment.
    #[must_use]
    pub fn module_cache_dir(&self, template_name: &str, version: &str) -> PathBuf {
        self.data_dir
            .join(TERRAFORM_DIR)
            .join(MODULES_DIR)
            .join(template_name.replace(' ', "."))
            .join(version)
    }

    /// Clone-cache directory for a helm chart version.
    #[must_use]
    pub fn chart_cache_dir(&self, template_name: &str, version: &str) -> PathBuf {
        self.data_dir.join(HELM_DIR).join(template_name).join(version)
    }

    /// Generated-project directory for a provisioning project.
    #[must_use]
    pub fn state_dir(&self, project: &str) -> PathBuf {
        self.data_dir.join(TERRAFORM_DIR).join(STATE_DIR).join(project)
    }

    /// Plan-artifact directory inside a project's state directory.
    #[must_use]
    pub fn plans_dir(&self, project: &str) -> PathBuf {
        self.state_dir(project).join(PLANS_DIR)
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map_or_else(|| std::env::temp_dir().join("keel"), |home| home.join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_module_cache_dir_replaces_spaces_with_dots() {
        let config = Config::default().with_data_dir("/data");
        assert_eq!(
            config.module_cache_dir("Storage Account", "1.0"),
            PathBuf::from("/data/terraform/modules/Storage.Account/1.0")
        );
    }

    #[test]
    #[serial]
    fn test_chart_cache_dir_keeps_raw_name() {
        let config = Config::default().with_data_dir("/data");
        assert_eq!(
            config.chart_cache_dir("Message Queue", "2.1"),
            PathBuf::from("/data/helm/Message Queue/2.1")
        );
    }

    #[test]
    #[serial]
    fn test_state_and_plans_layout() {
        let config = Config::default().with_data_dir("/data");
        assert_eq!(config.state_dir("shop-prod"), PathBuf::from("/data/terraform/state/shop-prod"));
        assert_eq!(
            config.plans_dir("shop-prod"),
            PathBuf::from("/data/terraform/state/shop-prod/plans")
        );
    }

    #[test]
    #[serial]
    fn test_load_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config.tools, ToolsConfig::default());
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = Config::default().with_data_dir(temp.path().join("store"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[tools]\nterraform = \"tofu\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tools.terraform, "tofu");
        assert_eq!(config.tools.git, "git");
    }

    #[test]
    #[serial]
    fn test_env_override_wins_over_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/from-file\"\n").unwrap();

        unsafe { std::env::set_var(DATA_DIR_ENV, "/from-env") };
        let config = Config::load_from(&path);
        unsafe { std::env::remove_var(DATA_DIR_ENV) };

        assert_eq!(config.unwrap().data_dir, PathBuf::from("/from-env"));
    }
}
