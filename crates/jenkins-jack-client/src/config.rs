use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use secrecy::SecretString;

/// Everything needed to talk to one Jenkins host
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: String,
    pub username: String,
    pub password: SecretString,
    /// Fetch a CSRF crumb and send it with every POST
    pub crumb_issuer: bool,
    /// When false, self-signed certificates are accepted
    pub strict_tls: bool,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn new(
        server_url: impl Into<String>, username: impl Into<String>, password: SecretString,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password,
            crumb_issuer: false,
            strict_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

static JOB_PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?/(job/.*)$").expect("Invalid regex pattern"));

/// Turns `folder/sub/job` into the `folder/job/sub/job/job` URL path.
pub(crate) fn encode_job_name(name: &str) -> String {
    name.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/job/")
}

/// Splits a full job name into its parent folder and leaf name.
pub(crate) fn split_job_path(job_path: &str) -> (Option<&str>, &str) {
    let job_path = job_path.trim_matches('/');
    match job_path.rfind('/') {
        Some(slash_pos) => (Some(&job_path[..slash_pos]), &job_path[slash_pos + 1..]),
        None => (None, job_path),
    }
}

/// Jenkins reports URLs using its own configured root, which may differ from
/// the one we connect through. Keeps the `job/...` path and swaps the host.
pub(crate) fn rebase_url(server_url: &str, url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.is_empty() {
        return server_url.to_string();
    }
    match JOB_PATH_PATTERN.captures(url) {
        Some(caps) => format!("{}/{}", server_url, &caps[1]),
        None => url.to_string(),
    }
}

/// URL path segment for a node under `/computer/`.
pub(crate) fn node_path(name: &str) -> String {
    match name {
        "master" => "(master)".to_string(),
        "Built-In Node" | "built-in" => "(built-in)".to_string(),
        other => urlencoding::encode(other).into_owned(),
    }
}
