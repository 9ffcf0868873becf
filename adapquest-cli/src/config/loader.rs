use super::types::{
    CliConfig, DEFAULT_LOG_FILTER, LogConfig, RawCliConfig, RawEngineConfig, RawLogConfig,
};
use adapquest_core::EngineConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CliConfig> {
        Self::load_from(
            Self::user_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Load merged configuration from explicit paths; missing files are skipped
    pub fn load_from(user: Option<&Path>, project: &Path) -> Result<CliConfig> {
        let mut raw = RawCliConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user
            && let Some(user_config) = Self::read_raw(user_path)?
        {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "adapquest").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with ADAPQUEST_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ADAPQUEST_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".adapquest/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawCliConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCliConfig, overlay: RawCliConfig) -> RawCliConfig {
        RawCliConfig {
            engine: RawEngineConfig {
                workers: overlay.engine.workers.or(base.engine.workers),
                max_joint_states: overlay
                    .engine
                    .max_joint_states
                    .or(base.engine.max_joint_states),
            },
            log: RawLogConfig {
                filter: overlay.log.filter.or(base.log.filter),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCliConfig) -> CliConfig {
        let defaults = EngineConfig::default();
        CliConfig {
            engine: EngineConfig {
                workers: raw.engine.workers.unwrap_or(defaults.workers),
                max_joint_states: raw
                    .engine
                    .max_joint_states
                    .unwrap_or(defaults.max_joint_states),
            },
            log: LogConfig {
                filter: raw
                    .log
                    .filter
                    .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Load Tests ====================

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();

        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");
        std::fs::write(&user, "[engine]\nworkers = 2\n\n[log]\nfilter = \"info\"\n").unwrap();
        std::fs::write(&project, "[engine]\nworkers = 8\n").unwrap();

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();

        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.log.filter, "info");
        assert_eq!(
            config.engine.max_joint_states,
            EngineConfig::default().max_joint_states
        );
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("project.toml");
        std::fs::write(&project, "[engine\nworkers = ").unwrap();

        let result = ConfigLoader::load_from(None, &project);

        assert!(result.is_err());
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawCliConfig {
            engine: RawEngineConfig {
                workers: Some(3),
                max_joint_states: Some(64),
            },
            log: RawLogConfig {
                filter: Some("debug".to_string()),
            },
        };

        let merged = ConfigLoader::merge_raw(base, RawCliConfig::default());

        assert_eq!(merged.engine.workers, Some(3));
        assert_eq!(merged.engine.max_joint_states, Some(64));
        assert_eq!(merged.log.filter.as_deref(), Some("debug"));
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_user_config_path_ends_with_config_toml() {
        if let Some(path) = ConfigLoader::user_config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_project_config_path() {
        let path = ConfigLoader::project_config_path();
        assert!(path.ends_with("config.toml"));
    }
}
