use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use anyhow::{
    Context as _,
    Result,
};
use dialoguer::Confirm;
use jenkins_jack_client::JenkinsClient;
use jenkins_jack_core::application::folder_url;
use jenkins_jack_core::infrastructure::{
    ConfigLoader,
    ConnectionConfig,
    JackConfig,
};

/// Global options plus lazily loaded configuration
pub struct Context {
    config_path: PathBuf,
    connection: Option<String>,
    yes: bool,
}

/// A connected host and the configuration it came from
pub struct Session {
    pub config: JackConfig,
    pub connection: ConnectionConfig,
    pub client: Arc<JenkinsClient>,
}

impl Session {
    /// Where job listings start: the connection's folder filter, or the root.
    pub fn job_root(&self) -> Option<String> {
        self.connection
            .folder_filter
            .as_deref()
            .filter(|folder| !folder.is_empty())
            .map(|folder| folder_url(&self.connection.client_settings().server_url, folder))
    }
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, connection: Option<String>, yes: bool) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(ConfigLoader::discover_config_path),
            connection,
            yes,
        }
    }

    pub fn assume_yes(&self) -> bool {
        self.yes
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load_config(&self) -> Result<JackConfig> {
        ConfigLoader::load(&self.config_path)
            .with_context(|| format!("Failed to load {}", self.config_path.display()))
    }

    /// Loads the configuration and connects to the selected host.
    pub fn session(&self) -> Result<Session> {
        let config = self.load_config()?;

        let connection = match self.connection.as_deref() {
            Some(name) => config
                .connection(name)
                .with_context(|| format!("No connection named '{name}'"))?,
            None => config
                .active_connection()
                .context("No connection configured")?,
        }
        .clone();

        tracing::debug!(connection = %connection.name, uri = %connection.uri, "Connecting");
        let client = JenkinsClient::connect(connection.client_settings())?;

        Ok(Session {
            config,
            connection,
            client: Arc::new(client),
        })
    }

    /// Asks before a destructive action unless `--yes` was given.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes() {
            return Ok(true);
        }
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}
