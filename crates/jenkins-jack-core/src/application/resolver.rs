use std::sync::Arc;

use futures::future::{
    BoxFuture,
    FutureExt,
};
use jenkins_jack_api::{
    JackResult,
    JenkinsApi,
    JobDescriptor,
    JobNode,
    JobType,
};

/// Flattens the heterogeneous Jenkins job tree into runnable leaf jobs.
///
/// Folders are expanded by fetching their own listing, so nesting deeper than
/// the three levels the tree query returns is still discovered. Multibranch
/// projects and organization folders are expanded from the nested listing
/// only. Any failed fetch fails the whole call.
pub struct JobResolver {
    api: Arc<dyn JenkinsApi>,
}

impl JobResolver {
    pub fn new(api: Arc<dyn JenkinsApi>) -> Self {
        Self { api }
    }

    /// Resolves every leaf job under `url` (the host root when `None`), in
    /// the order the host lists them.
    pub async fn resolve(&self, url: Option<&str>) -> JackResult<Vec<JobDescriptor>> {
        let jobs = self.resolve_from(url.map(str::to_string), None).await?;
        tracing::debug!(count = jobs.len(), root = url.unwrap_or("/"), "Resolved jobs");
        Ok(jobs)
    }

    /// Resolves the jobs under a folder given by its full name.
    pub async fn resolve_folder(&self, folder: &str) -> JackResult<Vec<JobDescriptor>> {
        let url = folder_url(self.api.server_url(), folder);
        self.resolve(Some(&url)).await
    }

    pub async fn resolve_filtered<F>(
        &self, url: Option<&str>, filter: F,
    ) -> JackResult<Vec<JobDescriptor>>
    where
        F: Fn(&JobDescriptor) -> bool,
    {
        let jobs = self.resolve(url).await?;
        Ok(jobs.into_iter().filter(|job| filter(job)).collect())
    }

    /// Full names of every folder under `url`, depth-first.
    pub async fn folders(&self, url: Option<&str>) -> JackResult<Vec<String>> {
        self.folders_from(url.map(str::to_string)).await
    }

    fn resolve_from(
        &self, url: Option<String>, inherited: Option<JobType>,
    ) -> BoxFuture<'_, JackResult<Vec<JobDescriptor>>> {
        async move {
            let nodes = self.api.list_jobs(url.as_deref()).await?;
            let mut resolved = Vec::with_capacity(nodes.len());

            for node in nodes {
                match JobType::from_class_name(&node.class_name) {
                    JobType::Folder => {
                        let children = self
                            .resolve_from(Some(node.url.clone()), Some(JobType::Folder))
                            .await?;
                        resolved.extend(children);
                    }
                    JobType::Multi => {
                        let job_type = inherited.unwrap_or(JobType::Multi);
                        resolved.extend(
                            node.jobs
                                .into_iter()
                                .map(|branch| descriptor(branch, job_type)),
                        );
                    }
                    JobType::Org => {
                        let job_type = inherited.unwrap_or(JobType::Org);
                        for repository in node.jobs {
                            resolved.extend(
                                repository
                                    .jobs
                                    .into_iter()
                                    .map(|branch| descriptor(branch, job_type)),
                            );
                        }
                    }
                    JobType::Default => {
                        resolved.push(descriptor(node, inherited.unwrap_or(JobType::Default)));
                    }
                }
            }

            Ok(resolved)
        }
        .boxed()
    }

    fn folders_from(&self, url: Option<String>) -> BoxFuture<'_, JackResult<Vec<String>>> {
        async move {
            let nodes = self.api.list_jobs(url.as_deref()).await?;
            let mut folders = Vec::new();

            for node in nodes {
                if JobType::from_class_name(&node.class_name) == JobType::Folder {
                    folders.push(node.full_name.clone());
                    folders.extend(self.folders_from(Some(node.url)).await?);
                }
            }

            Ok(folders)
        }
        .boxed()
    }
}

fn descriptor(node: JobNode, job_type: JobType) -> JobDescriptor {
    JobDescriptor {
        full_name: node.full_name,
        url: node.url,
        class_name: node.class_name,
        job_type,
        buildable: node.buildable,
        description: node.description.filter(|d| !d.is_empty()),
    }
}

/// URL of a folder job given its full name
pub fn folder_url(server_url: &str, folder: &str) -> String {
    let path = folder
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/job/");
    format!("{}/job/{}", server_url.trim_end_matches('/'), path)
}
