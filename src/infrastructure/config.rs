use crate::domain::{config::BridgeConfig, error::{BridgeError, BridgeResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = ".serialbridge";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Manager that only looks at the given locations.
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load the effective configuration.
    ///
    /// The nearest project file wins over the global file; without either the
    /// defaults are used.
    pub fn load_config(&self) -> BridgeResult<BridgeConfig> {
        match self.active_config_path() {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                self.load_config_from_path(path)
            }
            None => Ok(BridgeConfig::default()),
        }
    }

    /// The file `load_config` reads, if any exists.
    pub fn active_config_path(&self) -> Option<&Path> {
        [&self.project_config_path, &self.global_config_path]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .find(|path| path.exists())
    }

    /// Get global configuration path
    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("serialbridge").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> BridgeResult<BridgeConfig> {
        let content = fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| BridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &BridgeConfig) -> BridgeResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| BridgeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| BridgeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Write a default project configuration under `path`. Returns the file written.
    pub fn init_project_config(&self, path: &Path) -> BridgeResult<PathBuf> {
        let config_dir = path.join(CONFIG_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(BridgeError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| BridgeError::Config {
            message: format!("Failed to create {} directory: {}", CONFIG_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &BridgeConfig::default())?;

        Ok(config_file)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(
            Some(temp_dir.path().join("missing-global.toml")),
            None,
        );

        let config = manager.load_config().unwrap();
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.server.port, 8765);
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(None, None);

        let written = manager.init_project_config(temp_dir.path()).unwrap();

        let config_file = temp_dir.path().join(".serialbridge").join("config.toml");
        assert_eq!(written, config_file);

        let content = fs::read_to_string(&config_file).unwrap();
        let config: BridgeConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.serial.default_baud_rate, 115_200);

        // A second init refuses to overwrite
        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }

    #[test]
    fn test_project_config_wins_over_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[server]\nport = 9001\n").unwrap();
        fs::write(&project, "[server]\nport = 9002\n").unwrap();

        let manager = ConfigManager::with_paths(Some(global.clone()), Some(project.clone()));
        assert_eq!(manager.load_config().unwrap().server.port, 9002);
        assert_eq!(manager.active_config_path(), Some(project.as_path()));

        let manager = ConfigManager::with_paths(Some(global.clone()), None);
        assert_eq!(manager.load_config().unwrap().server.port, 9001);
        assert_eq!(manager.active_config_path(), Some(global.as_path()));
    }

    #[test]
    fn test_missing_files_are_not_active() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(
            Some(temp_dir.path().join("missing-global.toml")),
            Some(temp_dir.path().join("missing-project.toml")),
        );
        assert_eq!(manager.active_config_path(), None);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        let manager = ConfigManager::with_paths(None, None);
        let err = manager.load_config_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
