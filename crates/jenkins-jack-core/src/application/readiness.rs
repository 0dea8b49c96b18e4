use std::time::Duration;

use jenkins_jack_api::{
    BuildSummary,
    JackError,
    JackResult,
    JenkinsApi,
};

/// How often and how long to look for a freshly enqueued build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_timeout_secs(10)
    }
}

impl PollPolicy {
    /// One attempt per second for `seconds` seconds.
    pub fn from_timeout_secs(seconds: u64) -> Self {
        Self {
            attempts: seconds.min(u64::from(u32::MAX)) as u32,
            interval: Duration::from_secs(1),
        }
    }

    fn budget_secs(&self) -> u64 {
        (self.interval * self.attempts).as_secs()
    }
}

/// Waits until build `number` of `job` exists on the host.
///
/// Jenkins accepts a build into its queue before it assigns it a record, so a
/// lookup failure of any kind only means "not yet". Running out of attempts is
/// reported as [`JackError::Timeout`].
pub async fn await_ready(
    api: &dyn JenkinsApi, job: &str, number: i64, policy: PollPolicy,
) -> JackResult<BuildSummary> {
    tracing::debug!(job, build = number, attempts = policy.attempts, "Waiting for build to start");

    for attempt in 1..=policy.attempts {
        match api.get_build(job, number).await {
            Ok(build) => {
                tracing::debug!(job, build = number, attempt, "Build ready");
                return Ok(build);
            }
            Err(e) => {
                tracing::trace!(job, build = number, attempt, error = %e, "Build not ready yet");
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(JackError::Timeout {
        job: job.to_string(),
        build: number,
        seconds: policy.budget_secs(),
    })
}
