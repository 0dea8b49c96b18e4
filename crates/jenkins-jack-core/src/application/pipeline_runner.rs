use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};
use std::time::Duration;

use jenkins_jack_api::{
    JackError,
    JackResult,
    JenkinsApi,
    JobMetadata,
};
use tokio::sync::watch;

use super::job_config::{
    create_or_update,
    restore_scm,
    MergeOutcome,
};
use super::log_stream::{
    cancelled,
    follow_log,
    StreamOutcome,
};
use super::parameters::{
    resolve_parameters,
    ParameterPrompt,
};
use super::readiness::{
    await_ready,
    PollPolicy,
};
use super::resolver::JobResolver;
use crate::domain::{
    ActiveBuild,
    PipelineBuild,
};
use crate::infrastructure::config::PipelineSection;
use crate::infrastructure::PipelineConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Report the console URL instead of following the log.
    pub browser_build_output: bool,
    pub ready_policy: PollPolicy,
    pub log_poll_delay: Duration,
    pub params_enabled: bool,
    pub interactive_input: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineSection::default())
    }
}

impl From<&PipelineSection> for PipelineSettings {
    fn from(section: &PipelineSection) -> Self {
        Self {
            browser_build_output: section.browser_build_output,
            ready_policy: PollPolicy::from_timeout_secs(section.build_ready_timeout_secs),
            log_poll_delay: Duration::from_millis(section.log_poll_delay_ms),
            params_enabled: section.params.enabled,
            interactive_input: section.params.interactive_input,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderChoice {
    Root,
    Folder(String),
}

/// User decisions the runner needs on top of parameter input
pub trait PipelinePrompt: ParameterPrompt {
    /// Whether to create `job`, which does not exist on the host yet.
    fn confirm_create(&self, job: &str) -> bool;

    /// Where to create a new job. `None` cancels.
    fn select_folder(&self, folders: &[String]) -> Option<FolderChoice>;
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// The build was triggered. `stream` is `None` when the console was handed
    /// off to the browser.
    Completed {
        build: PipelineBuild,
        stream: Option<StreamOutcome>,
    },
    /// Stopped before a build was observed.
    Cancelled,
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(JobMetadata),
    Created(JobMetadata),
    Cancelled,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    active: Option<ActiveBuild>,
}

/// Clears the slot it claimed, unless it was taken over in the meantime.
struct SlotGuard<'a> {
    runner: &'a PipelineRunner,
    generation: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.runner.slot();
        if slot.generation == self.generation {
            slot.active = None;
        }
    }
}

impl SlotGuard<'_> {
    fn set(&self, active: ActiveBuild) {
        let mut slot = self.runner.slot();
        if slot.generation == self.generation {
            slot.active = Some(active);
        }
    }
}

/// Pushes local pipeline scripts to Jenkins and runs them.
///
/// One runner drives at most one build at a time: starting another while a
/// build is being prepared or followed is rejected with
/// [`JackError::AlreadyBuilding`].
pub struct PipelineRunner {
    api: Arc<dyn JenkinsApi>,
    prompt: Arc<dyn PipelinePrompt>,
    settings: PipelineSettings,
    slot: Mutex<Slot>,
    last_build: Mutex<Option<PipelineBuild>>,
}

impl PipelineRunner {
    pub fn new(
        api: Arc<dyn JenkinsApi>, prompt: Arc<dyn PipelinePrompt>, settings: PipelineSettings,
    ) -> Self {
        Self {
            api,
            prompt,
            settings,
            slot: Mutex::new(Slot::default()),
            last_build: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active(&self) -> Option<ActiveBuild> {
        self.slot().active.clone()
    }

    pub fn last_build(&self) -> Option<PipelineBuild> {
        self.last_build
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn claim(&self, job: &str) -> JackResult<SlotGuard<'_>> {
        let mut slot = self.slot();
        if let Some(active) = &slot.active {
            return Err(JackError::AlreadyBuilding {
                job: active.job().to_string(),
                build: active.number(),
            });
        }

        slot.generation += 1;
        slot.active = Some(ActiveBuild::Preparing {
            job: job.to_string(),
        });
        Ok(SlotGuard {
            runner: self,
            generation: slot.generation,
        })
    }

    /// Creates or updates the job linked to `script_path` with `source`,
    /// triggers it, and follows its console into `sink`.
    pub async fn execute<F>(
        &self, script_path: &Path, source: &str, sink: F, mut cancel: watch::Receiver<bool>,
    ) -> JackResult<PipelineOutcome>
    where
        F: FnMut(&str),
    {
        let guard = self.claim(&script_path.display().to_string())?;

        let mut config = PipelineConfig::load_or_create(script_path)?;
        guard.set(ActiveBuild::Preparing {
            job: config.buildable_name(),
        });

        if *cancel.borrow() {
            return Ok(PipelineOutcome::Cancelled);
        }
        let Some(merge) = self.push_script(&mut config, source).await? else {
            return Ok(PipelineOutcome::Cancelled);
        };

        // The SCM definition goes back whether or not the trigger succeeded.
        let triggered = self.trigger(&merge.job, source, &mut config, &cancel).await;

        if let Some(definition) = merge.detached_definition.as_deref() {
            restore_scm(self.api.as_ref(), &merge.job.full_name, definition).await?;
        }

        let Some(build) = triggered? else {
            return Ok(PipelineOutcome::Cancelled);
        };
        guard.set(ActiveBuild::Running(build.clone()));

        let policy = self.settings.ready_policy;
        let ready = tokio::select! {
            _ = cancelled(&mut cancel) => None,
            ready = await_ready(self.api.as_ref(), &build.job, build.number, policy) => Some(ready),
        };
        match ready {
            None => return Ok(PipelineOutcome::Cancelled),
            Some(ready) => {
                ready?;
            }
        }

        let stream = if self.settings.browser_build_output {
            None
        } else {
            Some(
                follow_log(
                    self.api.as_ref(),
                    &build.job,
                    build.number,
                    self.settings.log_poll_delay,
                    sink,
                    &mut cancel,
                )
                .await,
            )
        };

        *self
            .last_build
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(build.clone());
        drop(guard);

        Ok(PipelineOutcome::Completed { build, stream })
    }

    /// Pushes `source` to the job linked to `script_path` without building.
    pub async fn update(&self, script_path: &Path, source: &str) -> JackResult<UpdateOutcome> {
        let guard = self.claim(&script_path.display().to_string())?;

        let mut config = PipelineConfig::load_or_create(script_path)?;
        guard.set(ActiveBuild::Preparing {
            job: config.buildable_name(),
        });

        Ok(match self.push_script(&mut config, source).await? {
            None => UpdateOutcome::Cancelled,
            Some(merge) if merge.created => UpdateOutcome::Created(merge.job),
            Some(merge) => UpdateOutcome::Updated(merge.job),
        })
    }

    /// Stops the active build and frees the slot. Returns the job and build
    /// number that were signalled, if a build was running.
    pub async fn abort(&self) -> JackResult<Option<(String, i64)>> {
        let build = {
            let mut slot = self.slot();
            match slot.active.take() {
                Some(ActiveBuild::Running(build)) => build,
                other => {
                    slot.active = other;
                    return Ok(None);
                }
            }
        };

        self.api.stop_build(&build.job, build.number).await?;
        Ok(Some((build.job, build.number)))
    }

    /// Confirms creation of a missing job, then merges the script into it.
    async fn push_script(
        &self, config: &mut PipelineConfig, source: &str,
    ) -> JackResult<Option<MergeOutcome>> {
        let job_name = config.buildable_name();

        if self.api.get_job(&job_name).await?.is_none() {
            if !self.prompt.confirm_create(&job_name) {
                return Ok(None);
            }

            if config.folder.is_none() {
                let folders = JobResolver::new(self.api.clone()).folders(None).await?;
                match self.prompt.select_folder(&folders) {
                    None => return Ok(None),
                    Some(FolderChoice::Root) => {}
                    Some(FolderChoice::Folder(folder)) => {
                        config.folder = Some(folder);
                        config.save()?;
                    }
                }
            }
        }

        let merge = create_or_update(self.api.as_ref(), source, &config.buildable_name()).await?;
        Ok(Some(merge))
    }

    /// Resolves parameters and triggers the build. `None` when cancelled.
    async fn trigger(
        &self, job: &JobMetadata, source: &str, config: &mut PipelineConfig,
        cancel: &watch::Receiver<bool>,
    ) -> JackResult<Option<PipelineBuild>> {
        if !job.buildable {
            return Err(JackError::JobDisabled(job.full_name.clone()));
        }
        if *cancel.borrow() {
            return Ok(None);
        }

        let params = self.parameters(job, config)?;
        if *cancel.borrow() {
            return Ok(None);
        }

        self.api.trigger_build(&job.full_name, params.as_ref()).await?;
        tracing::info!(job = %job.full_name, build = job.next_build_number, "Pipeline build triggered");

        Ok(Some(PipelineBuild {
            job: job.full_name.clone(),
            number: job.next_build_number,
            job_url: job.url.clone(),
            source: source.to_string(),
            has_params: params.is_some(),
        }))
    }

    fn parameters(
        &self, job: &JobMetadata, config: &mut PipelineConfig,
    ) -> JackResult<Option<BTreeMap<String, String>>> {
        let Some(definitions) = job.parameters.as_deref() else {
            return Ok(None);
        };

        if !self.settings.params_enabled {
            // buildWithParameters with no values uses the job's defaults
            return Ok(Some(BTreeMap::new()));
        }

        let prompt = self
            .settings
            .interactive_input
            .then_some(self.prompt.as_ref());
        let values = resolve_parameters(definitions, config, prompt);

        config.set_params(&values);
        config.save()?;
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicBool,
        Ordering,
    };

    use jenkins_jack_api::{
        ParameterDefinition,
        ParameterKind,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::domain::job_config::PIPELINE_TEMPLATE;
    use crate::testing::{
        chunk,
        job_url,
        metadata,
        node,
        FakeJenkins,
        FOLDER,
    };

    struct Answers {
        create: bool,
        folder: Option<FolderChoice>,
        asked_create: AtomicBool,
    }

    impl Answers {
        fn new(create: bool, folder: Option<FolderChoice>) -> Self {
            Self {
                create,
                folder,
                asked_create: AtomicBool::new(false),
            }
        }
    }

    impl ParameterPrompt for Answers {
        fn input(&self, _definition: &ParameterDefinition, _current: &str) -> Option<String> {
            Some("typed".to_string())
        }

        fn choose(
            &self, _definition: &ParameterDefinition, choices: &[String], _current: &str,
        ) -> Option<String> {
            choices.last().cloned()
        }
    }

    impl PipelinePrompt for Answers {
        fn confirm_create(&self, _job: &str) -> bool {
            self.asked_create.store(true, Ordering::SeqCst);
            self.create
        }

        fn select_folder(&self, _folders: &[String]) -> Option<FolderChoice> {
            self.folder.clone()
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            ready_policy: PollPolicy::from_timeout_secs(3),
            log_poll_delay: Duration::from_millis(10),
            ..PipelineSettings::default()
        }
    }

    fn script(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "echo 'hello'").unwrap();
        path
    }

    fn existing_job(name: &str, next: i64) -> (JobMetadata, String) {
        let xml = crate::domain::job_config::patch_script(PIPELINE_TEMPLATE, "")
            .unwrap()
            .xml;
        (metadata(name, next), xml)
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_streams_and_records_last_build() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (job, xml) = existing_job("deploy", 5);
        let fake = Arc::new(
            FakeJenkins::new()
                .with_job(job, &xml)
                .ready_after(2)
                .with_log(vec![chunk("Started\n", 8, true), chunk("Done\n", 13, false)]),
        );
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            settings(),
        );
        let (_tx, rx) = watch::channel(false);
        let mut output = String::new();

        let outcome = runner
            .execute(&path, "echo 'hello'", |text| output.push_str(text), rx)
            .await
            .unwrap();

        match outcome {
            PipelineOutcome::Completed { build, stream } => {
                assert_eq!(build.job, "deploy");
                assert_eq!(build.number, 5);
                assert!(!build.has_params);
                assert!(matches!(stream, Some(StreamOutcome::Completed)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(output, "Started\nDone\n");
        assert_eq!(fake.triggered(), vec![("deploy".to_string(), None)]);
        assert!(runner.active().is_none());
        assert_eq!(runner.last_build().unwrap().number, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_build_is_rejected_while_active() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (job, xml) = existing_job("deploy", 1);
        let fake = Arc::new(
            FakeJenkins::new()
                .with_job(job, &xml)
                .with_log(vec![chunk("a", 1, true), chunk("b", 2, true), chunk("c", 3, false)]),
        );
        let runner = Arc::new(PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            PipelineSettings {
                log_poll_delay: Duration::from_secs(5),
                ..settings()
            },
        ));

        let first = {
            let runner = runner.clone();
            let path = path.clone();
            tokio::spawn(async move {
                let (_tx, rx) = watch::channel(false);
                runner.execute(&path, "echo 1", |_| {}, rx).await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(matches!(runner.active(), Some(ActiveBuild::Running(_))));

        let err = runner.update(&path, "echo 2").await.unwrap_err();
        match err {
            JackError::AlreadyBuilding { job, build } => {
                assert_eq!(job, "deploy");
                assert_eq!(build, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            first.await.unwrap().unwrap(),
            PipelineOutcome::Completed { .. }
        ));
        assert!(runner.active().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_running_build() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (job, xml) = existing_job("deploy", 9);
        let fake = Arc::new(
            FakeJenkins::new()
                .with_job(job, &xml)
                .with_log(vec![chunk("a", 1, true), chunk("b", 2, false)]),
        );
        let runner = Arc::new(PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            PipelineSettings {
                log_poll_delay: Duration::from_secs(5),
                ..settings()
            },
        ));

        let first = {
            let runner = runner.clone();
            tokio::spawn(async move {
                let (_tx, rx) = watch::channel(false);
                runner.execute(&path, "echo 1", |_| {}, rx).await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        let aborted = runner.abort().await.unwrap();
        assert_eq!(aborted, Some(("deploy".to_string(), 9)));
        assert!(runner.active().is_none());
        assert_eq!(fake.stopped(), vec![("deploy".to_string(), 9)]);

        first.await.unwrap().unwrap();
        assert_eq!(runner.abort().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_trigger() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (job, xml) = existing_job("deploy", 1);
        let fake = Arc::new(FakeJenkins::new().with_job(job, &xml));
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            settings(),
        );
        let (_tx, rx) = watch::channel(true);

        let outcome = runner.execute(&path, "echo 1", |_| {}, rx).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::Cancelled));
        assert!(fake.triggered().is_empty());
        assert!(runner.active().is_none());
        assert!(runner.last_build().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_waiting_for_build() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (job, xml) = existing_job("deploy", 1);
        let fake = Arc::new(FakeJenkins::new().with_job(job, &xml).ready_after(10));
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            settings(),
        );
        let (_tx, rx) = watch::channel(false);

        let err = runner.execute(&path, "echo 1", |_| {}, rx).await.unwrap_err();
        assert!(matches!(err, JackError::Timeout { seconds: 3, .. }));
        assert!(runner.active().is_none());
    }

    #[tokio::test]
    async fn test_disabled_job_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        let (mut job, xml) = existing_job("deploy", 1);
        job.buildable = false;
        let fake = Arc::new(FakeJenkins::new().with_job(job, &xml));
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            settings(),
        );
        let (_tx, rx) = watch::channel(false);

        let err = runner.execute(&path, "echo 1", |_| {}, rx).await.unwrap_err();
        assert!(matches!(err, JackError::JobDisabled(name) if name == "deploy"));
        assert!(fake.triggered().is_empty());
    }

    #[tokio::test]
    async fn test_declined_creation_is_cancelled() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "fresh.groovy");
        let fake = Arc::new(FakeJenkins::new());
        let answers = Arc::new(Answers::new(false, None));
        let runner = PipelineRunner::new(fake.clone(), answers.clone(), settings());

        let outcome = runner.update(&path, "echo 1").await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Cancelled));
        assert!(answers.asked_create.load(Ordering::SeqCst));
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn test_update_creates_job_in_chosen_folder() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "fresh.groovy");
        let fake = Arc::new(
            FakeJenkins::new()
                .with_listing(None, vec![node("team", FOLDER, false, vec![])])
                .with_listing(Some(&job_url("team")), vec![]),
        );
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(true, Some(FolderChoice::Folder("team".to_string())))),
            settings(),
        );

        let outcome = runner.update(&path, "echo 1").await.unwrap();
        match outcome {
            UpdateOutcome::Created(job) => assert_eq!(job.full_name, "team/fresh"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fake.created()[0].0, "team/fresh");
        assert_eq!(
            PipelineConfig::load(&path).unwrap().folder.as_deref(),
            Some("team")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_parameters_are_resolved_and_saved() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "deploy.groovy");
        std::fs::write(
            dir.path().join(".deploy.config.json"),
            r#"{ "name": "deploy", "params": { "ENV": "stage" } }"#,
        )
        .unwrap();

        let (mut job, xml) = existing_job("deploy", 2);
        job.parameters = Some(vec![
            ParameterDefinition {
                name: "ENV".to_string(),
                description: None,
                default_value: Some("dev".to_string()),
                kind: ParameterKind::String,
            },
            ParameterDefinition {
                name: "DRY_RUN".to_string(),
                description: None,
                default_value: Some("false".to_string()),
                kind: ParameterKind::Boolean,
            },
        ]);
        let fake = Arc::new(FakeJenkins::new().with_job(job, &xml));
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            PipelineSettings {
                browser_build_output: true,
                ..settings()
            },
        );
        let (_tx, rx) = watch::channel(false);

        let outcome = runner.execute(&path, "echo 1", |_| {}, rx).await.unwrap();
        assert!(matches!(
            outcome,
            PipelineOutcome::Completed { stream: None, .. }
        ));

        let triggered = fake.triggered();
        let params = triggered[0].1.clone().unwrap();
        assert_eq!(params["ENV"], "stage");
        assert_eq!(params["DRY_RUN"], "false");

        let saved = PipelineConfig::load(&path).unwrap().saved_params();
        assert_eq!(saved, params);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scm_definition_restored_after_trigger() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "scm.groovy");
        let scm = r#"<flow-definition><definition class="org.jenkinsci.plugins.workflow.cps.CpsScmFlowDefinition"><scriptPath>Jenkinsfile</scriptPath></definition></flow-definition>"#;
        let fake = Arc::new(FakeJenkins::new().with_job(metadata("scm", 1), scm));
        let runner = PipelineRunner::new(
            fake.clone(),
            Arc::new(Answers::new(false, None)),
            settings(),
        );
        let (_tx, rx) = watch::channel(false);

        runner.execute(&path, "echo 1", |_| {}, rx).await.unwrap();

        let writes = fake.config_writes();
        assert_eq!(writes.len(), 2);
        assert!(!writes[0].1.contains("CpsScmFlowDefinition"));
        assert!(writes[1].1.contains("<scriptPath>Jenkinsfile</scriptPath>"));
        assert_eq!(fake.triggered().len(), 1);
    }
}
