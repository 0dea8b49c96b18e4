//! Jenkins REST client for Jenkins Jack
//!
//! Talks to one Jenkins host over its JSON API and the handful of HTML/form
//! endpoints the JSON API does not cover (replay pages, console scripts).
//!
//! # Architecture
//!
//! - `client` - `JenkinsClient`, the `JenkinsApi` implementation plus the
//!   node, queue and build housekeeping endpoints
//! - `types` - API response types
//! - `mapper` - Data mapping utilities
//! - `config` - Connection settings and job path encoding
//!
//! # Example Usage
//!
//! ```no_run
//! use jenkins_jack_api::JenkinsApi;
//! use jenkins_jack_client::{
//!     ClientSettings,
//!     JenkinsClient,
//! };
//! use secrecy::SecretString;
//!
//! # async fn run() -> jenkins_jack_api::JackResult<()> {
//! let settings = ClientSettings::new(
//!     "http://localhost:8080",
//!     "admin",
//!     SecretString::from("token".to_string()),
//! );
//! let client = JenkinsClient::connect(settings)?;
//! let jobs = client.list_jobs(None).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod mapper;
mod types;

pub use client::JenkinsClient;
pub use config::ClientSettings;
