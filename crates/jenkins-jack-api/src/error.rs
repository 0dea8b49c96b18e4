use thiserror::Error;

/// Errors surfaced by every Jenkins Jack operation
#[derive(Error, Debug)]
pub enum JackError {
    #[error("Could not connect to the remote Jenkins: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Timed out waiting for build after {seconds} seconds: {job} #{build}")]
    Timeout { job: String, build: i64, seconds: u64 },

    #[error("Jenkins returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Already building/streaming - {job}{}", build_suffix(.build))]
    AlreadyBuilding { job: String, build: Option<i64> },

    #[error("\"{0}\" is disabled on the remote Jenkins")]
    JobDisabled(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JackError {
    /// True when the host could not be reached or refused the credentials.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            JackError::Connection(_) | JackError::AuthenticationFailed(_)
        )
    }

    /// True when the job, build or endpoint does not exist on the host.
    pub fn is_not_found(&self) -> bool {
        matches!(self, JackError::NotFound(_))
    }
}

fn build_suffix(build: &Option<i64>) -> String {
    build.map(|b| format!(": #{b}")).unwrap_or_default()
}

pub type JackResult<T> = Result<T, JackError>;

impl From<serde_json::Error> for JackError {
    fn from(err: serde_json::Error) -> Self {
        JackError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_not_connectivity() {
        let err = JackError::Timeout {
            job: "demo".to_string(),
            build: 4,
            seconds: 10,
        };
        assert!(!err.is_connectivity());
        assert_eq!(
            err.to_string(),
            "Timed out waiting for build after 10 seconds: demo #4"
        );
    }

    #[test]
    fn test_already_building_message() {
        let running = JackError::AlreadyBuilding {
            job: "folder/demo".to_string(),
            build: Some(12),
        };
        assert_eq!(
            running.to_string(),
            "Already building/streaming - folder/demo: #12"
        );

        let preparing = JackError::AlreadyBuilding {
            job: "demo".to_string(),
            build: None,
        };
        assert_eq!(preparing.to_string(), "Already building/streaming - demo");
    }

    #[test]
    fn test_connectivity_grouping() {
        assert!(JackError::Connection("refused".to_string()).is_connectivity());
        assert!(JackError::AuthenticationFailed("401".to_string()).is_connectivity());
        assert!(!JackError::NotFound("job".to_string()).is_connectivity());
    }

    #[test]
    fn test_not_found_is_distinct_from_timeout() {
        assert!(JackError::NotFound("job".to_string()).is_not_found());
        let timeout = JackError::Timeout {
            job: "demo".to_string(),
            build: 3,
            seconds: 10,
        };
        assert!(!timeout.is_not_found());
        assert!(!timeout.is_connectivity());
    }
}
