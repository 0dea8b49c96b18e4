//! Pipeline workflows on top of a [`JenkinsApi`](jenkins_jack_api::JenkinsApi)
//! implementation.
//!
//! - [`application`]: job resolution, config merging, build readiness, log
//!   streaming, batch operations and the [`PipelineRunner`]
//! - [`domain`]: `config.xml` patching and the build records the runner keeps
//! - [`infrastructure`]: TOML configuration and the per-script sidecar file

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{
    JobResolver,
    PipelineOutcome,
    PipelinePrompt,
    PipelineRunner,
    PipelineSettings,
    StreamOutcome,
    UpdateOutcome,
};
pub use domain::{
    ActiveBuild,
    PipelineBuild,
};
pub use infrastructure::{
    ConfigLoader,
    JackConfig,
    PipelineConfig,
};
