use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InstallerError, Result};

pub const DEFAULT_LOCK_FILE: &str = "/var/lib/pacman/db.lck";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pacman_binary: String,
    /// Prefix for privileged commands. Empty runs them directly.
    pub privilege_command: String,
    pub lock_file: PathBuf,
    /// CLI only: skip the `[y/N]` prompts.
    pub auto_confirm: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pacman_binary: "pacman".to_string(),
            privilege_command: "sudo".to_string(),
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE),
            auto_confirm: false,
        }
    }
}

impl Config {
    /// Reads the user config, falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| {
            InstallerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME is not set",
            ))
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("pacinstaller")
                .join("config.json"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "privilege_command": "doas" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.privilege_command, "doas");
        assert_eq!(config.pacman_binary, "pacman");
        assert_eq!(config.lock_file, PathBuf::from(DEFAULT_LOCK_FILE));
    }

    #[test]
    fn saved_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            auto_confirm: true,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(InstallerError::Config(_))
        ));
    }
}
