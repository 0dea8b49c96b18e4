//! Shared vocabulary for Jenkins Jack
//!
//! - `error` - the error taxonomy every layer reports with
//! - `types` - jobs, builds, nodes and queue items as the client sees them
//! - `api` - the async trait the core logic drives the remote host through

pub mod api;
pub mod error;
pub mod types;

pub use api::JenkinsApi;
pub use error::{
    JackError,
    JackResult,
};
pub use types::{
    BuildResult,
    BuildSummary,
    ExecutorBuild,
    JobDescriptor,
    JobMetadata,
    JobNode,
    JobType,
    LogChunk,
    NodeInfo,
    ParameterDefinition,
    ParameterKind,
    QueueItem,
};
