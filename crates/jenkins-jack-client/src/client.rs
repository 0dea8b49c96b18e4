//! Jenkins API client and methods

use std::collections::BTreeMap;
use std::sync::{
    LazyLock,
    Once,
};
use std::time::Duration;

use async_trait::async_trait;
use jenkins_jack_api::{
    BuildSummary,
    JackError,
    JackResult,
    JenkinsApi,
    JobMetadata,
    JobNode,
    LogChunk,
    NodeInfo,
    QueueItem,
};
use regex::Regex;
use reqwest::header::{
    HeaderMap,
    HeaderValue,
    AUTHORIZATION,
    CONTENT_TYPE,
};
use reqwest::{
    redirect,
    Client,
    RequestBuilder,
    Response,
    StatusCode,
};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::config::{
    self,
    ClientSettings,
};
use crate::{
    mapper,
    types,
};

const JOB_PROPS: &str = "fullName,url,buildable,description";

const JOB_METADATA_TREE: &str = "fullName,name,url,buildable,nextBuildNumber,description,property[_class,parameterDefinitions[_class,name,description,defaultParameterValue[value],choices]]";

const BUILD_TREE: &str = "number,url,result,building,description,timestamp,duration";

static REPLAY_SCRIPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<textarea[^>]*name="_\.mainScript"[^>]*>(.*?)</textarea>"#)
        .expect("Invalid regex pattern")
});

static ANY_TEXTAREA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<textarea[^>]*>(.*?)</textarea>").expect("Invalid regex pattern")
});

static CRYPTO_PROVIDER: Once = Once::new();

fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Already installed by the embedding binary is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

fn transport_error(context: &str, err: reqwest::Error) -> JackError {
    JackError::Connection(format!("{context}: {err}"))
}

/// Maps a non-success status onto the error taxonomy.
fn status_error(status: StatusCode, body: &str, context: &str) -> JackError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            JackError::AuthenticationFailed(format!("{context}: HTTP {status}"))
        }
        StatusCode::NOT_FOUND => JackError::NotFound(context.to_string()),
        _ => {
            let message = if body.contains("<!DOCTYPE html>") || body.contains("<html") {
                format!("{context}. Check the Jenkins log for details")
            } else if body.chars().count() > 300 {
                let preview: String = body.chars().take(300).collect();
                format!("{context}: {preview}...")
            } else if body.is_empty() {
                context.to_string()
            } else {
                format!("{context}: {body}")
            };
            JackError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Decodes named and numeric character references in scraped page text.
fn unescape_html(text: &str, context: &str) -> JackResult<String> {
    quick_xml::escape::unescape(text)
        .map(|unescaped| unescaped.into_owned())
        .map_err(|e| JackError::Parse(format!("{context}: {e}")))
}

fn rebase_tree(server_url: &str, nodes: &mut [JobNode]) {
    for node in nodes {
        node.url = config::rebase_url(server_url, &node.url);
        rebase_tree(server_url, &mut node.jobs);
    }
}

/// Jenkins REST client
pub struct JenkinsClient {
    client: Client,
    server_url: String,
    crumb_issuer: bool,
    crumb: OnceCell<Option<(String, String)>>,
}

impl JenkinsClient {
    /// Builds a client for one host. Reconfiguring means building a new one.
    pub fn connect(settings: ClientSettings) -> JackResult<Self> {
        ensure_crypto_provider();

        let auth_value = format!(
            "{}:{}",
            settings.username,
            settings.password.expose_secret()
        );
        let auth_header = format!(
            "Basic {}",
            base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                auth_value.as_bytes()
            )
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_header)
                .map_err(|e| JackError::InvalidConfig(format!("Invalid auth format: {e}")))?,
        );

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(!settings.strict_tls)
            .build()
            .map_err(|e| JackError::Internal(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(
            server_url = %settings.server_url,
            username = %settings.username,
            crumb_issuer = settings.crumb_issuer,
            "Created Jenkins client"
        );

        Ok(Self {
            client: http_client,
            server_url: settings.server_url.trim_end_matches('/').to_string(),
            crumb_issuer: settings.crumb_issuer,
            crumb: OnceCell::new(),
        })
    }

    fn job_url(&self, name: &str) -> String {
        format!("{}/job/{}", self.server_url, config::encode_job_name(name))
    }

    /// Browser URL of a build's console page
    pub fn console_url(&self, name: &str, number: i64) -> String {
        format!("{}/{}/console", self.job_url(name), number)
    }

    async fn get_text(&self, url: &str, context: &str) -> JackResult<String> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        let response = Self::expect_success(response, context, false).await?;
        response
            .text()
            .await
            .map_err(|e| transport_error(context, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> JackResult<T> {
        let body = self.get_text(url, context).await?;
        serde_json::from_str(&body).map_err(|e| JackError::Parse(format!("{context}: {e}")))
    }

    async fn crumb(&self) -> JackResult<Option<&(String, String)>> {
        if !self.crumb_issuer {
            return Ok(None);
        }

        let crumb = self
            .crumb
            .get_or_try_init(|| async {
                let url = format!("{}/crumbIssuer/api/json", self.server_url);
                match self.get_json::<types::Crumb>(&url, "Failed to fetch crumb").await {
                    Ok(crumb) => Ok(Some((crumb.crumb_request_field, crumb.crumb))),
                    Err(e) if e.is_not_found() => {
                        tracing::debug!("Crumb issuer disabled on host");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        Ok(crumb.as_ref())
    }

    async fn post(&self, url: &str) -> JackResult<RequestBuilder> {
        tracing::debug!(%url, "POST");
        let mut request = self.client.post(url);
        if let Some((field, value)) = self.crumb().await? {
            request = request.header(field.as_str(), value.as_str());
        }
        Ok(request)
    }

    /// Sends a request, treating 302 as success when `redirect_ok` is set.
    async fn send(
        &self, request: RequestBuilder, context: &str, redirect_ok: bool,
    ) -> JackResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        Self::expect_success(response, context, redirect_ok).await
    }

    async fn expect_success(
        response: Response, context: &str, redirect_ok: bool,
    ) -> JackResult<Response> {
        let status = response.status();
        if status.is_success() || (redirect_ok && status == StatusCode::FOUND) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, context, "Jenkins request failed");
        Err(status_error(status, &body, context))
    }

    /// Checks that the host is reachable and accepts the credentials
    pub async fn validate_connection(&self) -> JackResult<()> {
        let url = format!("{}/api/json?tree=mode", self.server_url);
        self.get_text(&url, "Failed to connect").await.map(|_| ())
    }

    pub async fn list_builds(&self, name: &str) -> JackResult<Vec<BuildSummary>> {
        let encoded_path = config::encode_job_name(name);
        let url = format!("{}/api/json?tree=builds[{BUILD_TREE}]", self.job_url(name));
        let response: types::JobBuildsResponse = self
            .get_json(&url, &format!("Failed to fetch builds for {name}"))
            .await?;

        Ok(response
            .builds
            .into_iter()
            .map(|build| mapper::build_to_summary(build, &self.server_url, &encoded_path))
            .collect())
    }

    /// Deletes a build. Jenkins answers with a redirect, which is success.
    pub async fn delete_build(&self, name: &str, number: i64) -> JackResult<()> {
        let url = format!("{}/{}/doDelete", self.job_url(name), number);
        let request = self.post(&url).await?;
        self.send(
            request,
            &format!("Failed to delete {name} #{number}"),
            true,
        )
        .await?;
        tracing::info!(job = name, build = number, "Deleted build");
        Ok(())
    }

    /// Scrapes the recorded pipeline script from a build's replay page
    pub async fn get_replay_script(&self, name: &str, number: i64) -> JackResult<String> {
        let url = format!("{}/{}/replay", self.job_url(name), number);
        let context = format!("Failed to fetch replay script for {name} #{number}");
        let html = self.get_text(&url, &context).await?;

        let captures = REPLAY_SCRIPT_PATTERN
            .captures(&html)
            .or_else(|| ANY_TEXTAREA_PATTERN.captures(&html))
            .ok_or_else(|| JackError::NotFound(format!("Replay script for {name} #{number}")))?;

        unescape_html(&captures[1], &context)
    }

    /// Runs a Groovy script in the script console of the controller or of a node
    pub async fn run_script(&self, source: &str, node: Option<&str>) -> JackResult<String> {
        let url = match node {
            Some(node) => format!(
                "{}/computer/{}/scriptText",
                self.server_url,
                config::node_path(node)
            ),
            None => format!("{}/scriptText", self.server_url),
        };
        let context = format!(
            "Failed to run console script on {}",
            node.unwrap_or("controller")
        );

        let request = self.post(&url).await?.form(&[("script", source)]);
        let response = self.send(request, &context, false).await?;
        response
            .text()
            .await
            .map_err(|e| transport_error(&context, e))
    }

    pub async fn list_nodes(&self) -> JackResult<Vec<NodeInfo>> {
        let url = format!(
            "{}/computer/api/json?tree=computer[displayName,offline,temporarilyOffline,offlineCauseReason,numExecutors,idle,executors[currentExecutable[url,number,fullDisplayName]]]",
            self.server_url
        );
        let response: types::ComputerResponse =
            self.get_json(&url, "Failed to fetch nodes").await?;

        Ok(response
            .computer
            .into_iter()
            .map(|computer| mapper::computer_to_node(computer, &self.server_url))
            .collect())
    }

    async fn node_temporarily_offline(&self, name: &str) -> JackResult<bool> {
        #[derive(serde::Deserialize)]
        struct NodeState {
            #[serde(rename = "temporarilyOffline", default)]
            temporarily_offline: bool,
        }

        let url = format!(
            "{}/computer/{}/api/json?tree=temporarilyOffline",
            self.server_url,
            config::node_path(name)
        );
        let state: NodeState = self
            .get_json(&url, &format!("Failed to fetch node {name}"))
            .await?;
        Ok(state.temporarily_offline)
    }

    async fn toggle_offline(&self, name: &str, message: &str) -> JackResult<()> {
        let url = format!(
            "{}/computer/{}/toggleOffline?offlineMessage={}",
            self.server_url,
            config::node_path(name),
            urlencoding::encode(message)
        );
        let request = self.post(&url).await?;
        self.send(request, &format!("Failed to toggle node {name}"), true)
            .await?;
        Ok(())
    }

    /// Marks a node temporarily offline; a no-op when it already is.
    pub async fn set_node_offline(&self, name: &str, message: &str) -> JackResult<()> {
        if self.node_temporarily_offline(name).await? {
            return Ok(());
        }
        self.toggle_offline(name, message).await
    }

    /// Brings a temporarily offline node back online.
    pub async fn set_node_online(&self, name: &str) -> JackResult<()> {
        if !self.node_temporarily_offline(name).await? {
            return Ok(());
        }
        self.toggle_offline(name, "").await
    }

    pub async fn list_queue(&self) -> JackResult<Vec<QueueItem>> {
        let url = format!(
            "{}/queue/api/json?tree=items[id,why,inQueueSince,stuck,blocked,task[name,url]]",
            self.server_url
        );
        let response: types::QueueResponse =
            self.get_json(&url, "Failed to fetch queue").await?;

        Ok(response
            .items
            .into_iter()
            .map(|entry| mapper::queue_entry_to_item(entry, &self.server_url))
            .collect())
    }

    pub async fn cancel_queue_item(&self, id: i64) -> JackResult<()> {
        let url = format!("{}/queue/cancelItem?id={}", self.server_url, id);
        let request = self.post(&url).await?;
        self.send(request, &format!("Failed to cancel queue item {id}"), true)
            .await?;
        Ok(())
    }

    async fn job_action(&self, name: &str, action: &str) -> JackResult<()> {
        let url = format!("{}/{}", self.job_url(name), action);
        let request = self.post(&url).await?;
        self.send(request, &format!("Failed to {action} {name}"), true)
            .await?;
        Ok(())
    }

    pub async fn enable_job(&self, name: &str) -> JackResult<()> {
        self.job_action(name, "enable").await
    }

    pub async fn disable_job(&self, name: &str) -> JackResult<()> {
        self.job_action(name, "disable").await
    }

    pub async fn delete_job(&self, name: &str) -> JackResult<()> {
        self.job_action(name, "doDelete").await
    }
}

#[async_trait]
impl JenkinsApi for JenkinsClient {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn list_jobs(&self, url: Option<&str>) -> JackResult<Vec<JobNode>> {
        let root = match url {
            Some(url) => config::rebase_url(&self.server_url, url),
            None => self.server_url.clone(),
        };
        let url = format!(
            "{root}/api/json?tree=jobs[{JOB_PROPS},jobs[{JOB_PROPS},jobs[{JOB_PROPS}]]]"
        );

        let mut response: types::JobsResponse = self.get_json(&url, "Failed to fetch jobs").await?;
        rebase_tree(&self.server_url, &mut response.jobs);
        Ok(response.jobs)
    }

    async fn get_job(&self, name: &str) -> JackResult<Option<JobMetadata>> {
        let url = format!("{}/api/json?tree={JOB_METADATA_TREE}", self.job_url(name));
        match self
            .get_json::<types::Job>(&url, &format!("Failed to fetch job {name}"))
            .await
        {
            Ok(job) => Ok(Some(mapper::job_to_metadata(job, &self.server_url))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_job_config(&self, name: &str) -> JackResult<String> {
        let url = format!("{}/config.xml", self.job_url(name));
        self.get_text(&url, &format!("Failed to fetch config.xml of {name}"))
            .await
    }

    async fn update_job_config(&self, name: &str, xml: &str) -> JackResult<()> {
        let url = format!("{}/config.xml", self.job_url(name));
        let request = self
            .post(&url)
            .await?
            .header(CONTENT_TYPE, "application/xml")
            .body(xml.to_string());
        self.send(request, &format!("Failed to update config.xml of {name}"), false)
            .await?;
        tracing::info!(job = name, "Updated job configuration");
        Ok(())
    }

    async fn create_job(&self, name: &str, xml: &str) -> JackResult<()> {
        let (folder, leaf) = config::split_job_path(name);
        let base = match folder {
            Some(folder) => self.job_url(folder),
            None => self.server_url.clone(),
        };
        let url = format!("{}/createItem?name={}", base, urlencoding::encode(leaf));

        let request = self
            .post(&url)
            .await?
            .header(CONTENT_TYPE, "application/xml")
            .body(xml.to_string());
        self.send(request, &format!("Failed to create job {name}"), true)
            .await?;
        tracing::info!(job = name, "Created job");
        Ok(())
    }

    async fn get_build(&self, name: &str, number: i64) -> JackResult<BuildSummary> {
        let url = format!(
            "{}/{}/api/json?tree={BUILD_TREE}",
            self.job_url(name),
            number
        );
        let build: types::Build = self
            .get_json(&url, &format!("Failed to fetch {name} #{number}"))
            .await?;
        Ok(mapper::build_to_summary(
            build,
            &self.server_url,
            &config::encode_job_name(name),
        ))
    }

    async fn trigger_build(
        &self, name: &str, params: Option<&BTreeMap<String, String>>,
    ) -> JackResult<()> {
        let url = match params {
            Some(_) => format!("{}/buildWithParameters", self.job_url(name)),
            None => format!("{}/build", self.job_url(name)),
        };

        let form_data: Vec<(&str, &str)> = params
            .map(|params| {
                params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(job = name, params = form_data.len(), "Triggering build");

        let params_info = form_data
            .iter()
            .map(|(k, v)| {
                if v.chars().count() > 50 {
                    format!("{k}={}...", v.chars().take(50).collect::<String>())
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let request = self.post(&url).await?.form(&form_data);
        self.send(
            request,
            &format!("Failed to trigger build. Job: {name}, Parameters: [{params_info}]"),
            true,
        )
        .await?;

        tracing::info!(job = name, "Build triggered");
        Ok(())
    }

    async fn stop_build(&self, name: &str, number: i64) -> JackResult<()> {
        let url = format!("{}/{}/stop", self.job_url(name), number);
        let request = self.post(&url).await?;
        self.send(request, &format!("Failed to abort {name} #{number}"), true)
            .await?;
        tracing::info!(job = name, build = number, "Abort signal sent");
        Ok(())
    }

    async fn fetch_log_chunk(&self, name: &str, number: i64, offset: u64) -> JackResult<LogChunk> {
        let url = format!(
            "{}/{}/logText/progressiveText?start={}",
            self.job_url(name),
            number,
            offset
        );
        let context = format!("Failed to fetch console output of {name} #{number}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        let response = Self::expect_success(response, &context, false).await?;

        let headers = response.headers();
        let text_size = headers
            .get("X-Text-Size")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let more_data = headers
            .get("X-More-Data")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&context, e))?;
        let next_offset = text_size.unwrap_or(offset + text.len() as u64);

        Ok(LogChunk {
            text,
            next_offset,
            more_data,
        })
    }
}
