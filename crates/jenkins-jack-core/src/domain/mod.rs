pub mod job_config;
mod pipeline;

pub use job_config::{
    patch_script,
    restore_definition,
    PatchedConfig,
    PIPELINE_TEMPLATE,
};
pub use pipeline::{
    ActiveBuild,
    PipelineBuild,
};
