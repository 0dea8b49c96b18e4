use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::JackResult;
use crate::types::*;

/// The slice of the Jenkins REST API the resolver, the config merge and the
/// pipeline runner talk through.
///
/// Job names are folder-qualified full names (`folder/sub/job`); the
/// implementation is responsible for turning them into `/job/.../job/...`
/// paths.
#[async_trait]
pub trait JenkinsApi: Send + Sync {
    /// Base URL of the host, without a trailing slash
    fn server_url(&self) -> &str;

    /// Lists the `jobs[...]` tree under `url` (the host root when `None`),
    /// three levels deep.
    async fn list_jobs(&self, url: Option<&str>) -> JackResult<Vec<JobNode>>;

    /// Fetches job metadata; `Ok(None)` when the job does not exist.
    async fn get_job(&self, name: &str) -> JackResult<Option<JobMetadata>>;

    /// Reads the raw `config.xml` of a job
    async fn get_job_config(&self, name: &str) -> JackResult<String>;

    /// Replaces the `config.xml` of an existing job
    async fn update_job_config(&self, name: &str, xml: &str) -> JackResult<()>;

    /// Creates a job from a configuration document. A folder-qualified name
    /// creates the job inside that folder.
    async fn create_job(&self, name: &str, xml: &str) -> JackResult<()>;

    /// Fetches metadata for one build. Fails with `NotFound` until Jenkins
    /// has actually started it.
    async fn get_build(&self, name: &str, number: i64) -> JackResult<BuildSummary>;

    /// Enqueues a build, with parameters when the job declares any
    async fn trigger_build(
        &self, name: &str, params: Option<&BTreeMap<String, String>>,
    ) -> JackResult<()>;

    /// Sends the abort signal to a running build
    async fn stop_build(&self, name: &str, number: i64) -> JackResult<()>;

    /// Reads console output starting at `offset`
    async fn fetch_log_chunk(&self, name: &str, number: i64, offset: u64) -> JackResult<LogChunk>;
}
