use std::fmt;

use jenkins_jack_client::ClientSettings;
use secrecy::SecretString;
use serde::{
    Deserialize,
    Serialize,
};

pub(super) const DEFAULT_BUILD_READY_TIMEOUT_SECS: u64 = 10;

pub(super) const DEFAULT_LOG_POLL_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JackConfig {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl JackConfig {
    /// The connection flagged `active`, or the first one when none is.
    pub fn active_connection(&self) -> Option<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|connection| connection.active)
            .or_else(|| self.connections.first())
    }

    pub fn connection(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|connection| connection.name == name)
    }
}

/// One Jenkins host
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,

    pub uri: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub crumb_issuer: bool,

    #[serde(default = "default_true")]
    pub strict_tls: bool,

    /// Roots the job resolver at this folder instead of the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_filter: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("active", &self.active)
            .field("crumb_issuer", &self.crumb_issuer)
            .field("strict_tls", &self.strict_tls)
            .field("folder_filter", &self.folder_filter)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn client_settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::new(
            self.uri.clone(),
            self.username.clone(),
            SecretString::from(self.password.clone()),
        );
        settings.crumb_issuer = self.crumb_issuer;
        settings.strict_tls = self.strict_tls;
        settings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Print the console URL instead of streaming the log.
    #[serde(default)]
    pub browser_build_output: bool,

    #[serde(default = "default_build_ready_timeout_secs")]
    pub build_ready_timeout_secs: u64,

    #[serde(default = "default_log_poll_delay_ms")]
    pub log_poll_delay_ms: u64,

    #[serde(default)]
    pub params: ParamsSection,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            browser_build_output: false,
            build_ready_timeout_secs: DEFAULT_BUILD_READY_TIMEOUT_SECS,
            log_poll_delay_ms: DEFAULT_LOG_POLL_DELAY_MS,
            params: ParamsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub interactive_input: bool,
}

impl Default for ParamsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interactive_input: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_build_ready_timeout_secs() -> u64 {
    DEFAULT_BUILD_READY_TIMEOUT_SECS
}

fn default_log_poll_delay_ms() -> u64 {
    DEFAULT_LOG_POLL_DELAY_MS
}
