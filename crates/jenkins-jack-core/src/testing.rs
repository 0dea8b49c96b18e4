//! In-memory `JenkinsApi` used by the core tests.

use std::collections::{
    BTreeMap,
    HashMap,
    HashSet,
    VecDeque,
};
use std::sync::Mutex;

use async_trait::async_trait;
use jenkins_jack_api::{
    BuildSummary,
    JackError,
    JackResult,
    JenkinsApi,
    JobMetadata,
    JobNode,
    LogChunk,
};

pub const SERVER: &str = "http://fake-jenkins";
pub const FOLDER: &str = "com.cloudbees.hudson.plugins.folder.Folder";
pub const MULTIBRANCH: &str = "org.jenkinsci.plugins.workflow.multibranch.WorkflowMultiBranchProject";
pub const ORG_FOLDER: &str = "jenkins.branch.OrganizationFolder";
pub const WORKFLOW_JOB: &str = "org.jenkinsci.plugins.workflow.job.WorkflowJob";

pub fn job_url(full_name: &str) -> String {
    format!("{SERVER}/job/{}", full_name.split('/').collect::<Vec<_>>().join("/job/"))
}

pub fn node(full_name: &str, class_name: &str, buildable: bool, jobs: Vec<JobNode>) -> JobNode {
    JobNode {
        full_name: full_name.to_string(),
        url: job_url(full_name),
        class_name: class_name.to_string(),
        buildable,
        description: None,
        jobs,
    }
}

pub fn metadata(full_name: &str, next_build_number: i64) -> JobMetadata {
    JobMetadata {
        full_name: full_name.to_string(),
        name: full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
        url: job_url(full_name),
        buildable: true,
        next_build_number,
        description: None,
        parameters: None,
    }
}

#[derive(Default)]
struct State {
    listings: HashMap<Option<String>, Vec<JobNode>>,
    failing_listings: HashSet<String>,
    list_calls: usize,
    jobs: HashMap<String, JobMetadata>,
    configs: HashMap<String, String>,
    config_writes: Vec<(String, String)>,
    created: Vec<(String, String)>,
    fail_metadata: bool,
    /// Builds and the number of lookups that still miss before they appear.
    builds: HashMap<(String, i64), u32>,
    ready_after: u32,
    build_lookups: u32,
    triggered: Vec<(String, Option<BTreeMap<String, String>>)>,
    stopped: Vec<(String, i64)>,
    log_chunks: VecDeque<JackResult<LogChunk>>,
    log_offsets: Vec<u64>,
}

/// Scriptable stand-in for a Jenkins host
#[derive(Default)]
pub struct FakeJenkins {
    state: Mutex<State>,
}

impl FakeJenkins {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_listing(self, url: Option<&str>, jobs: Vec<JobNode>) -> Self {
        self.state().listings.insert(url.map(str::to_string), jobs);
        self
    }

    pub fn failing_listing(self, url: &str) -> Self {
        self.state().failing_listings.insert(url.to_string());
        self
    }

    pub fn with_job(self, job: JobMetadata, config: &str) -> Self {
        {
            let mut state = self.state();
            state.configs.insert(job.full_name.clone(), config.to_string());
            state.jobs.insert(job.full_name.clone(), job);
        }
        self
    }

    pub fn failing_metadata(self) -> Self {
        self.state().fail_metadata = true;
        self
    }

    /// Builds become visible only on the `n`th lookup.
    pub fn ready_after(self, n: u32) -> Self {
        self.state().ready_after = n.saturating_sub(1);
        self
    }

    pub fn with_build(self, job: &str, number: i64) -> Self {
        let misses = self.state().ready_after;
        self.state().builds.insert((job.to_string(), number), misses);
        self
    }

    pub fn with_log(self, chunks: Vec<JackResult<LogChunk>>) -> Self {
        self.state().log_chunks = chunks.into();
        self
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn build_lookups(&self) -> u32 {
        self.state().build_lookups
    }

    pub fn config(&self, job: &str) -> Option<String> {
        self.state().configs.get(job).cloned()
    }

    pub fn config_writes(&self) -> Vec<(String, String)> {
        self.state().config_writes.clone()
    }

    pub fn created(&self) -> Vec<(String, String)> {
        self.state().created.clone()
    }

    pub fn triggered(&self) -> Vec<(String, Option<BTreeMap<String, String>>)> {
        self.state().triggered.clone()
    }

    pub fn stopped(&self) -> Vec<(String, i64)> {
        self.state().stopped.clone()
    }

    pub fn log_offsets(&self) -> Vec<u64> {
        self.state().log_offsets.clone()
    }
}

pub fn chunk(text: &str, next_offset: u64, more_data: bool) -> JackResult<LogChunk> {
    Ok(LogChunk {
        text: text.to_string(),
        next_offset,
        more_data,
    })
}

#[async_trait]
impl JenkinsApi for FakeJenkins {
    fn server_url(&self) -> &str {
        SERVER
    }

    async fn list_jobs(&self, url: Option<&str>) -> JackResult<Vec<JobNode>> {
        let mut state = self.state();
        state.list_calls += 1;
        if let Some(url) = url {
            if state.failing_listings.contains(url) {
                return Err(JackError::Connection(format!("cannot reach {url}")));
            }
        }
        state
            .listings
            .get(&url.map(str::to_string))
            .cloned()
            .ok_or_else(|| JackError::NotFound(url.unwrap_or("/").to_string()))
    }

    async fn get_job(&self, name: &str) -> JackResult<Option<JobMetadata>> {
        let state = self.state();
        if state.fail_metadata {
            return Err(JackError::Connection("connection refused".to_string()));
        }
        Ok(state.jobs.get(name).cloned())
    }

    async fn get_job_config(&self, name: &str) -> JackResult<String> {
        self.state()
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| JackError::NotFound(name.to_string()))
    }

    async fn update_job_config(&self, name: &str, xml: &str) -> JackResult<()> {
        let mut state = self.state();
        if !state.jobs.contains_key(name) {
            return Err(JackError::NotFound(name.to_string()));
        }
        state.configs.insert(name.to_string(), xml.to_string());
        state
            .config_writes
            .push((name.to_string(), xml.to_string()));
        Ok(())
    }

    async fn create_job(&self, name: &str, xml: &str) -> JackResult<()> {
        let mut state = self.state();
        state.jobs.insert(name.to_string(), metadata(name, 1));
        state.configs.insert(name.to_string(), xml.to_string());
        state.created.push((name.to_string(), xml.to_string()));
        Ok(())
    }

    async fn get_build(&self, name: &str, number: i64) -> JackResult<BuildSummary> {
        let mut state = self.state();
        state.build_lookups += 1;
        match state.builds.get_mut(&(name.to_string(), number)) {
            Some(0) => Ok(BuildSummary {
                number,
                url: format!("{}/{number}", job_url(name)),
                result: None,
                building: true,
                description: None,
                started_at: None,
                duration_ms: None,
            }),
            Some(misses) => {
                *misses -= 1;
                Err(JackError::NotFound(format!("{name} #{number}")))
            }
            None => Err(JackError::NotFound(format!("{name} #{number}"))),
        }
    }

    async fn trigger_build(
        &self, name: &str, params: Option<&BTreeMap<String, String>>,
    ) -> JackResult<()> {
        let mut state = self.state();
        let number = match state.jobs.get_mut(name) {
            Some(job) => {
                let number = job.next_build_number;
                job.next_build_number += 1;
                number
            }
            None => return Err(JackError::NotFound(name.to_string())),
        };
        let misses = state.ready_after;
        state.builds.insert((name.to_string(), number), misses);
        state.triggered.push((name.to_string(), params.cloned()));
        Ok(())
    }

    async fn stop_build(&self, name: &str, number: i64) -> JackResult<()> {
        self.state().stopped.push((name.to_string(), number));
        Ok(())
    }

    async fn fetch_log_chunk(&self, _name: &str, _number: i64, offset: u64) -> JackResult<LogChunk> {
        let mut state = self.state();
        state.log_offsets.push(offset);
        state
            .log_chunks
            .pop_front()
            .unwrap_or_else(|| chunk("", offset, false))
    }
}
