use serde::{
    Deserialize,
    Serialize,
};

/// A build started from a local script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineBuild {
    pub job: String,
    pub number: i64,
    pub job_url: String,
    pub source: String,
    pub has_params: bool,
}

impl PipelineBuild {
    pub fn console_url(&self) -> String {
        format!("{}/{}/console", self.job_url.trim_end_matches('/'), self.number)
    }
}

/// Occupant of a runner's single active-build slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveBuild {
    /// Job is being created, updated or parameterized.
    Preparing { job: String },
    /// Build was triggered; its log is being awaited or followed.
    Running(PipelineBuild),
}

impl ActiveBuild {
    pub fn job(&self) -> &str {
        match self {
            ActiveBuild::Preparing { job } => job,
            ActiveBuild::Running(build) => &build.job,
        }
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            ActiveBuild::Preparing { .. } => None,
            ActiveBuild::Running(build) => Some(build.number),
        }
    }
}
