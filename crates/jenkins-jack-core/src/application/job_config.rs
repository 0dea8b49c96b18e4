use jenkins_jack_api::{
    JackError,
    JackResult,
    JenkinsApi,
    JobMetadata,
};

use crate::domain::job_config::{
    patch_script,
    restore_definition,
    PIPELINE_TEMPLATE,
};

/// Result of pushing a script to a job
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Job metadata read back after the write.
    pub job: JobMetadata,
    pub created: bool,
    /// SCM definition swapped out for the inline script, if any.
    pub detached_definition: Option<String>,
}

/// Writes `script` into `job`, creating the job from the pipeline template
/// when it does not exist yet.
///
/// Only the script and the quiet period are touched on an existing job. The
/// fetch-patch-write sequence is not atomic: a concurrent edit between the
/// read and the write is overwritten.
pub async fn create_or_update(
    api: &dyn JenkinsApi, script: &str, job: &str,
) -> JackResult<MergeOutcome> {
    let existing = api.get_job(job).await?;

    let (created, detached_definition) = match existing {
        Some(_) => {
            let xml = api.get_job_config(job).await?;
            let patched = patch_script(&xml, script)?;
            tracing::info!(job, "Job exists, updating configuration");
            api.update_job_config(job, &patched.xml).await?;
            (false, patched.detached_definition)
        }
        None => {
            let patched = patch_script(PIPELINE_TEMPLATE, script)?;
            tracing::info!(job, "Job does not exist, creating it");
            api.create_job(job, &patched.xml).await?;
            (true, None)
        }
    };

    let metadata = api
        .get_job(job)
        .await?
        .ok_or_else(|| JackError::NotFound(format!("Job {job} after writing its configuration")))?;

    Ok(MergeOutcome {
        job: metadata,
        created,
        detached_definition,
    })
}

/// Puts back the SCM definition detached by [`create_or_update`].
pub async fn restore_scm(api: &dyn JenkinsApi, job: &str, definition: &str) -> JackResult<()> {
    let xml = api.get_job_config(job).await?;
    let restored = restore_definition(&xml, definition)?;
    api.update_job_config(job, &restored).await?;
    tracing::info!(job, "Restored SCM definition");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job_config::read_script;
    use crate::testing::{
        metadata,
        FakeJenkins,
    };

    const WITH_THROTTLE: &str = r#"<?xml version='1.1' encoding='UTF-8'?>
<flow-definition plugin="workflow-job@2.40">
  <properties>
    <hudson.plugins.throttleconcurrents.ThrottleJobProperty plugin="throttle-concurrents@2.0">
      <maxConcurrentTotal>2</maxConcurrentTotal>
      <throttleEnabled>true</throttleEnabled>
    </hudson.plugins.throttleconcurrents.ThrottleJobProperty>
  </properties>
  <definition class="org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition" plugin="workflow-cps@2.80">
    <script>echo 'old'</script>
    <sandbox>true</sandbox>
  </definition>
  <triggers/>
  <quietPeriod>30</quietPeriod>
</flow-definition>"#;

    const SCM_JOB: &str = r#"<flow-definition>
  <definition class="org.jenkinsci.plugins.workflow.cps.CpsScmFlowDefinition">
    <scriptPath>Jenkinsfile</scriptPath>
  </definition>
</flow-definition>"#;

    #[tokio::test]
    async fn test_missing_job_is_created_from_template() {
        let fake = FakeJenkins::new();

        let outcome = create_or_update(&fake, "echo 'hi'", "team/new").await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.job.full_name, "team/new");

        let created = fake.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "team/new");
        assert_eq!(read_script(&created[0].1).unwrap().as_deref(), Some("echo 'hi'"));
        assert!(created[0].1.contains("<quietPeriod>0</quietPeriod>"));
    }

    #[tokio::test]
    async fn test_existing_job_is_patched() {
        let fake = FakeJenkins::new().with_job(metadata("app", 12), WITH_THROTTLE);

        let outcome = create_or_update(&fake, "echo 'new'", "app").await.unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.job.next_build_number, 12);
        assert!(fake.created().is_empty());

        let xml = fake.config("app").unwrap();
        assert_eq!(read_script(&xml).unwrap().as_deref(), Some("echo 'new'"));
        assert!(xml.contains("<quietPeriod>0</quietPeriod>"));
        assert!(xml.contains(
            r#"<hudson.plugins.throttleconcurrents.ThrottleJobProperty plugin="throttle-concurrents@2.0">
      <maxConcurrentTotal>2</maxConcurrentTotal>
      <throttleEnabled>true</throttleEnabled>
    </hudson.plugins.throttleconcurrents.ThrottleJobProperty>"#
        ));
    }

    #[tokio::test]
    async fn test_twice_in_a_row_writes_identical_documents() {
        let fake = FakeJenkins::new().with_job(metadata("app", 1), WITH_THROTTLE);

        create_or_update(&fake, "echo 'same'", "app").await.unwrap();
        create_or_update(&fake, "echo 'same'", "app").await.unwrap();

        let writes = fake.config_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, writes[1].1);
    }

    #[tokio::test]
    async fn test_metadata_failure_aborts() {
        let fake = FakeJenkins::new().failing_metadata();

        let err = create_or_update(&fake, "echo 1", "app").await.unwrap_err();
        assert!(err.is_connectivity());
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_config_aborts_without_write() {
        let fake = FakeJenkins::new().with_job(metadata("app", 1), "<flow-definition><oops>");

        let err = create_or_update(&fake, "echo 1", "app").await.unwrap_err();
        assert!(matches!(err, JackError::Parse(_)));
        assert!(fake.config_writes().is_empty());
    }

    #[tokio::test]
    async fn test_scm_definition_round_trip() {
        let fake = FakeJenkins::new().with_job(metadata("scm", 3), SCM_JOB);

        let outcome = create_or_update(&fake, "echo 'inline'", "scm").await.unwrap();
        let definition = outcome.detached_definition.unwrap();
        assert!(!fake.config("scm").unwrap().contains("CpsScmFlowDefinition"));

        restore_scm(&fake, "scm", &definition).await.unwrap();
        let xml = fake.config("scm").unwrap();
        assert!(xml.contains(&definition));
        assert!(xml.contains("<quietPeriod>0</quietPeriod>"));
    }
}
