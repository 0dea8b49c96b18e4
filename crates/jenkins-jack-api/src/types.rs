use std::fmt;

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Taxonomy branch a job was discovered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Default,
    Folder,
    #[serde(rename = "multibranch")]
    Multi,
    Org,
}

impl JobType {
    /// Maps a Jenkins `_class` onto a taxonomy branch. Only the simple name
    /// after the last `.` is compared, so `Folder` and
    /// `com.cloudbees.hudson.plugins.folder.Folder` classify alike.
    pub fn from_class_name(class_name: &str) -> Self {
        let simple = class_name.rsplit('.').next().unwrap_or(class_name);
        match simple {
            "Folder" | "BlueSteelTeamFolder" => JobType::Folder,
            "WorkflowMultiBranchProject" => JobType::Multi,
            "OrganizationFolder" => JobType::Org,
            _ => JobType::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Default => "default",
            JobType::Folder => "folder",
            JobType::Multi => "multibranch",
            JobType::Org => "org",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the `jobs[...]` tree exactly as Jenkins reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobNode {
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "_class", default)]
    pub class_name: String,
    #[serde(default)]
    pub buildable: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobNode>,
}

/// A buildable leaf job produced by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub full_name: String,
    pub url: String,
    pub class_name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub buildable: bool,
    pub description: Option<String>,
}

impl JobDescriptor {
    /// Whether the job runs a pipeline script (replay is only offered for these).
    pub fn is_pipeline(&self) -> bool {
        self.job_type != JobType::Default || self.class_name.ends_with("WorkflowJob")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Boolean,
    Choice { choices: Vec<String> },
    Text,
    Password,
    Other { class_name: String },
}

/// Build parameter declared by a job's `ParametersDefinitionProperty`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: Option<String>,
    /// Default rendered the way Jenkins expects it in a form field.
    pub default_value: Option<String>,
    pub kind: ParameterKind,
}

/// Job metadata as returned after a lookup or a configuration write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub full_name: String,
    pub name: String,
    pub url: String,
    pub buildable: bool,
    pub next_build_number: i64,
    pub description: Option<String>,
    pub parameters: Option<Vec<ParameterDefinition>>,
}

impl JobMetadata {
    pub fn has_parameters(&self) -> bool {
        self.parameters.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
}

impl BuildResult {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUCCESS" => Some(BuildResult::Success),
            "FAILURE" => Some(BuildResult::Failure),
            "UNSTABLE" => Some(BuildResult::Unstable),
            "ABORTED" => Some(BuildResult::Aborted),
            "NOT_BUILT" => Some(BuildResult::NotBuilt),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BuildResult::Success => "✔",
            BuildResult::Failure => "✘",
            BuildResult::Unstable => "!",
            BuildResult::Aborted => "⊘",
            BuildResult::NotBuilt => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub number: i64,
    pub url: String,
    pub result: Option<BuildResult>,
    pub building: bool,
    pub description: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

/// A slice of console output fetched from `progressiveText`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub text: String,
    /// Offset to request next.
    pub next_offset: u64,
    pub more_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorBuild {
    pub url: String,
    pub number: Option<i64>,
    pub full_display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub display_name: String,
    pub offline: bool,
    pub temporarily_offline: bool,
    pub offline_reason: Option<String>,
    pub num_executors: u32,
    pub idle: bool,
    pub running: Vec<ExecutorBuild>,
}

impl NodeInfo {
    /// The controller node cannot be toggled offline from the client.
    pub fn is_controller(&self) -> bool {
        matches!(
            self.display_name.as_str(),
            "master" | "Built-In Node" | "built-in"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub name: String,
    pub why: Option<String>,
    pub url: Option<String>,
    pub stuck: bool,
    pub blocked: bool,
    pub in_queue_since: Option<DateTime<Utc>>,
}
