//! API response types for the Jenkins JSON API

use jenkins_jack_api::JobNode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<JobNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Job {
    #[serde(rename = "fullName")]
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub buildable: bool,
    #[serde(rename = "nextBuildNumber")]
    #[serde(default)]
    pub next_build_number: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub property: Vec<JobProperty>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobProperty {
    #[serde(rename = "_class")]
    #[serde(default)]
    pub _class: Option<String>,
    #[serde(rename = "parameterDefinitions")]
    #[serde(default)]
    pub parameter_definitions: Vec<ParameterDefinition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParameterDefinition {
    #[serde(rename = "_class")]
    #[serde(default)]
    pub _class: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "defaultParameterValue")]
    #[serde(default)]
    pub default_parameter_value: Option<DefaultValue>,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DefaultValue {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Build {
    pub number: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobBuildsResponse {
    #[serde(default)]
    pub builds: Vec<Build>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComputerResponse {
    #[serde(default)]
    pub computer: Vec<Computer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Computer {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub offline: bool,
    #[serde(rename = "temporarilyOffline")]
    #[serde(default)]
    pub temporarily_offline: bool,
    #[serde(rename = "offlineCauseReason")]
    #[serde(default)]
    pub offline_cause_reason: Option<String>,
    #[serde(rename = "numExecutors")]
    #[serde(default)]
    pub num_executors: u32,
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub executors: Vec<Executor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Executor {
    #[serde(rename = "currentExecutable")]
    #[serde(default)]
    pub current_executable: Option<Executable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Executable {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(rename = "fullDisplayName")]
    #[serde(default)]
    pub full_display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueResponse {
    #[serde(default)]
    pub items: Vec<QueueEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueEntry {
    pub id: i64,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(rename = "inQueueSince")]
    #[serde(default)]
    pub in_queue_since: Option<i64>,
    #[serde(default)]
    pub stuck: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub task: Option<QueueTask>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueTask {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Crumb {
    pub crumb: String,
    #[serde(rename = "crumbRequestField")]
    pub crumb_request_field: String,
}
