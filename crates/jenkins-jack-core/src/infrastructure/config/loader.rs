use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;
use toml_edit::{
    value,
    DocumentMut,
};

use super::interpolation::{
    interpolate_toml,
    InterpolationError,
};
use super::schema::JackConfig;
use super::validation::ConfigValidator;

pub const CONFIG_PATH_ENV: &str = "JENKINS_JACK_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to edit TOML: {0}")]
    EditError(#[from] toml_edit::TomlError),

    #[error("Environment variable interpolation failed: {0}")]
    InterpolationError(#[from] InterpolationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No connection named '{0}'")]
    UnknownConnection(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn discover_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            tracing::debug!(path = %path, "Using config path from {}", CONFIG_PATH_ENV);
            return PathBuf::from(path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("jenkins-jack").join("config.toml");
            if path.exists() {
                tracing::debug!(path = %path.display(), "Using user config path");
                return path;
            }
        }

        let fallback = dirs::home_dir()
            .unwrap_or_default()
            .join(".jenkins-jack")
            .join("config.toml");
        tracing::debug!(path = %fallback.display(), "Using fallback config path");
        fallback
    }

    pub fn load_default() -> ConfigResult<JackConfig> {
        Self::load(&Self::discover_config_path())
    }

    pub fn load(path: &Path) -> ConfigResult<JackConfig> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses, interpolates and validates a configuration document.
    pub fn parse(content: &str) -> ConfigResult<JackConfig> {
        let mut value: toml::Value = toml::from_str(content)?;

        interpolate_toml(&mut value)?;

        let config: JackConfig = value.try_into().map_err(|e| {
            ConfigError::InvalidConfig(format!("Failed to deserialize config: {}", e))
        })?;

        let validation = ConfigValidator::validate(&config);
        for warning in &validation.warnings {
            tracing::warn!(field = %warning.field, "{}", warning.message);
        }
        if !validation.is_ok() {
            return Err(ConfigError::InvalidConfig(validation.summary()));
        }

        tracing::debug!(connections = config.connections.len(), "Loaded config");
        Ok(config)
    }

    /// Marks `name` as the active connection in the file at `path`.
    ///
    /// The document is edited in place: comments, ordering and raw `${VAR}`
    /// references survive, only the `active` flags change.
    pub fn select_connection(path: &Path, name: &str) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        let mut doc = content.parse::<DocumentMut>()?;

        let connections = doc
            .get_mut("connections")
            .and_then(|item| item.as_array_of_tables_mut())
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))?;

        let found = connections
            .iter()
            .any(|table| table.get("name").and_then(|n| n.as_str()) == Some(name));
        if !found {
            return Err(ConfigError::UnknownConnection(name.to_string()));
        }

        for table in connections.iter_mut() {
            let selected = table.get("name").and_then(|n| n.as_str()) == Some(name);
            if selected {
                table.insert("active", value(true));
            } else if table.contains_key("active") {
                table.insert("active", value(false));
            }
        }

        std::fs::write(path, doc.to_string())?;
        tracing::info!(connection = name, "Selected connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const TWO_CONNECTIONS: &str = r#"# hosts
[[connections]]
name = "local"
uri = "http://127.0.0.1:8080"
username = "admin"
password = "${JACK_LOADER_TEST_UNSET:-admin}"
active = true

[[connections]]
name = "prod"  # careful
uri = "https://ci.example.com"
username = "deployer"

[pipeline]
log_poll_delay_ms = 250
"#;

    #[test]
    fn test_parse_with_interpolation() {
        let config = ConfigLoader::parse(TWO_CONNECTIONS).unwrap();
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[0].password, "admin");
        assert_eq!(config.active_connection().unwrap().name, "local");
        assert_eq!(config.pipeline.log_poll_delay_ms, 250);
        assert_eq!(config.pipeline.build_ready_timeout_secs, 10);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let err = ConfigLoader::parse("[pipeline]\nbrowser_build_output = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));

        let err = ConfigLoader::parse("[[connections]]\nname = \"x\"\nuri = \"http://x\"\npassword = \"${JACK_LOADER_TEST_MISSING}\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InterpolationError(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ConfigLoader::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_select_connection_preserves_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, TWO_CONNECTIONS).unwrap();

        ConfigLoader::select_connection(&path, "prod").unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# hosts"));
        assert!(written.contains("name = \"prod\"  # careful"));
        assert!(written.contains("${JACK_LOADER_TEST_UNSET:-admin}"));

        let config = ConfigLoader::load(&path).unwrap();
        assert!(!config.connections[0].active);
        assert!(config.connections[1].active);
        assert_eq!(config.active_connection().unwrap().name, "prod");
    }

    #[test]
    fn test_select_unknown_connection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, TWO_CONNECTIONS).unwrap();

        let err = ConfigLoader::select_connection(&path, "staging").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConnection(name) if name == "staging"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TWO_CONNECTIONS);
    }

    #[test]
    fn test_discover_config_path_env_override() {
        std::env::set_var(CONFIG_PATH_ENV, "/custom/jack.toml");
        let path = ConfigLoader::discover_config_path();
        assert_eq!(path, PathBuf::from("/custom/jack.toml"));
        std::env::remove_var(CONFIG_PATH_ENV);
    }
}
