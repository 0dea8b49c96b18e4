use std::time::Duration;

use jenkins_jack_api::{
    JackError,
    JenkinsApi,
};
use tokio::sync::watch;

/// How a console follow ended
#[derive(Debug)]
pub enum StreamOutcome {
    /// Jenkins reported no more data.
    Completed,
    /// The observer detached. The build itself keeps running.
    Cancelled,
    Failed(JackError),
}

/// Resolves once `cancel` flips to `true`. A dropped sender never cancels.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Streams the console of a build into `sink` chunk by chunk, polling every
/// `delay` while the host reports more data.
pub async fn follow_log<F>(
    api: &dyn JenkinsApi, job: &str, number: i64, delay: Duration, mut sink: F,
    cancel: &mut watch::Receiver<bool>,
) -> StreamOutcome
where
    F: FnMut(&str),
{
    let mut offset = 0u64;

    loop {
        if *cancel.borrow() {
            return StreamOutcome::Cancelled;
        }

        let chunk = tokio::select! {
            _ = cancelled(cancel) => return StreamOutcome::Cancelled,
            chunk = api.fetch_log_chunk(job, number, offset) => chunk,
        };

        match chunk {
            Ok(chunk) => {
                if !chunk.text.is_empty() {
                    sink(&chunk.text);
                }
                offset = chunk.next_offset;
                if !chunk.more_data {
                    tracing::debug!(job, build = number, bytes = offset, "Console stream ended");
                    return StreamOutcome::Completed;
                }
            }
            Err(e) => {
                tracing::warn!(job, build = number, error = %e, "Console stream failed");
                return StreamOutcome::Failed(e);
            }
        }

        tokio::select! {
            _ = cancelled(cancel) => return StreamOutcome::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
