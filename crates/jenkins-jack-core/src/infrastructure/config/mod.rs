pub mod interpolation;
pub mod loader;
pub mod schema;
pub mod validation;

pub use interpolation::interpolate;
pub use loader::{
    ConfigError,
    ConfigLoader,
    ConfigResult,
    CONFIG_PATH_ENV,
};
pub use schema::{
    ConnectionConfig,
    JackConfig,
    ParamsSection,
    PipelineSection,
};
pub use validation::{
    ConfigIssue,
    ConfigValidator,
    ValidationResult,
};
