use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use jenkins_jack_api::JackResult;

pub const BARRIER_LINE: &str =
    "--------------------------------------------------------------------------------";

/// Outcome of one target in a batch
#[derive(Debug)]
pub struct BatchItem<T> {
    pub target: String,
    pub result: JackResult<T>,
}

impl<T> BatchItem<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs `op` for every target concurrently and waits for all of them.
///
/// Results come back in target order. A failing target never cancels its
/// siblings; its error is kept in its own entry.
pub async fn run_batch<T, F, Fut>(targets: Vec<String>, op: F) -> Vec<BatchItem<T>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = JackResult<T>>,
{
    let futures = targets.iter().cloned().map(&op);
    let results = join_all(futures).await;

    let items: Vec<BatchItem<T>> = targets
        .into_iter()
        .zip(results)
        .map(|(target, result)| BatchItem { target, result })
        .collect();

    let failed = items.iter().filter(|item| !item.is_ok()).count();
    tracing::debug!(total = items.len(), failed, "Batch finished");
    items
}

/// Renders every entry, success or failure, between barrier lines.
pub fn render_report<T: Display>(items: &[BatchItem<T>]) -> String {
    let mut report = String::new();
    for item in items {
        report.push_str(BARRIER_LINE);
        report.push('\n');
        report.push_str(&item.target);
        report.push_str("\n\n");
        match &item.result {
            Ok(output) => report.push_str(&output.to_string()),
            Err(e) => report.push_str(&format!("Error: {e}")),
        }
        report.push('\n');
        report.push_str(BARRIER_LINE);
        report.push('\n');
    }
    report
}

#[cfg(test)]
mod tests {
    use jenkins_jack_api::JackError;

    use super::*;

    #[tokio::test]
    async fn test_failure_is_captured_per_item() {
        let targets: Vec<String> = (1..=5).map(|i| format!("node-{i}")).collect();

        let items = run_batch(targets, |target| async move {
            if target == "node-3" {
                Err(JackError::Connection(format!("{target} unreachable")))
            } else {
                Ok(format!("{target} ok"))
            }
        })
        .await;

        assert_eq!(items.len(), 5);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.target, format!("node-{}", i + 1));
            if i == 2 {
                assert!(matches!(item.result, Err(JackError::Connection(_))));
            } else {
                assert_eq!(item.result.as_ref().unwrap(), &format!("node-{} ok", i + 1));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_targets_run_concurrently() {
        let started = tokio::time::Instant::now();
        let targets: Vec<String> = (0..4).map(|i| i.to_string()).collect();

        let items = run_batch(targets, |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Ok::<_, JackError>(())
        })
        .await;

        assert_eq!(items.len(), 4);
        assert_eq!(started.elapsed(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_render_report() {
        let items = vec![
            BatchItem {
                target: "agent-1".to_string(),
                result: Ok("done".to_string()),
            },
            BatchItem {
                target: "agent-2".to_string(),
                result: Err(JackError::NotFound("agent-2".to_string())),
            },
        ];

        let report = render_report(&items);
        assert_eq!(report.matches(BARRIER_LINE).count(), 4);
        assert!(report.contains("agent-1\n\ndone\n"));
        assert!(report.contains("agent-2\n\nError: Not found: agent-2\n"));
    }
}
