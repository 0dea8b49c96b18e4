mod batch;
mod job_config;
mod log_stream;
mod parameters;
mod pipeline_runner;
mod readiness;
mod resolver;

pub use batch::{
    render_report,
    run_batch,
    BatchItem,
    BARRIER_LINE,
};
pub use job_config::{
    create_or_update,
    restore_scm,
    MergeOutcome,
};
pub use log_stream::{
    cancelled,
    follow_log,
    StreamOutcome,
};
pub use parameters::{
    parameter_title,
    resolve_parameters,
    ParameterPrompt,
};
pub use pipeline_runner::{
    FolderChoice,
    PipelineOutcome,
    PipelinePrompt,
    PipelineRunner,
    PipelineSettings,
    UpdateOutcome,
};
pub use readiness::{
    await_ready,
    PollPolicy,
};
pub use resolver::{
    folder_url,
    JobResolver,
};
