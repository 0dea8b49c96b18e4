pub mod config;
mod sidecar;

pub use config::{
    ConfigError,
    ConfigLoader,
    ConnectionConfig,
    JackConfig,
    PipelineSection,
};
pub use sidecar::PipelineConfig;
