use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{
    Context as _,
    Result,
};
use clap::Subcommand;
use colored::Colorize;
use jenkins_jack_api::{
    BuildResult,
    BuildSummary,
    JenkinsApi,
};
use jenkins_jack_core::application::{
    follow_log,
    run_batch,
    StreamOutcome,
};
use jenkins_jack_core::PipelineConfig;

use super::{
    cancelled,
    finish_batch,
    interrupt_signal,
    targets_or_pick,
};
use crate::context::{
    Context,
    Session,
};

#[derive(Subcommand)]
pub enum BuildCommands {
    /// List recent builds of a job
    List {
        job: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a build's console output, following it while the build runs
    Log {
        job: String,

        /// Build number; the latest build when omitted
        number: Option<i64>,
    },
    /// Stop running builds
    Abort { job: String, numbers: Vec<i64> },
    /// Delete builds
    Delete { job: String, numbers: Vec<i64> },
    /// Save the pipeline script a build ran and link it to the job
    Replay {
        job: String,

        /// Build number; the latest build when omitted
        number: Option<i64>,

        /// Script path; `<job name>.groovy` in the current directory when
        /// omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn handle(command: BuildCommands, context: &Context) -> Result<()> {
    let session = context.session()?;

    match command {
        BuildCommands::List { job, limit } => list(&session, &job, limit).await,
        BuildCommands::Log { job, number } => log(&session, &job, number).await,
        BuildCommands::Abort { job, numbers } => abort(&session, &job, numbers).await,
        BuildCommands::Delete { job, numbers } => delete(context, &session, &job, numbers).await,
        BuildCommands::Replay {
            job,
            number,
            output,
        } => replay(&session, &job, number, output).await,
    }
}

fn describe(build: &BuildSummary) -> String {
    let status = match (build.building, build.result) {
        (true, _) => "running".blue().to_string(),
        (false, Some(result @ BuildResult::Success)) => result.symbol().green().to_string(),
        (false, Some(result @ (BuildResult::Failure | BuildResult::Aborted))) => {
            result.symbol().red().to_string()
        }
        (false, Some(result)) => result.symbol().yellow().to_string(),
        (false, None) => "?".dimmed().to_string(),
    };

    let started = build
        .started_at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let duration = build
        .duration_ms
        .filter(|ms| *ms > 0)
        .map(|ms| format!("{}s", ms / 1000))
        .unwrap_or_default();

    let mut line = format!("#{:<6} {:<8} {} {}", build.number, status, started, duration.dimmed());
    if let Some(description) = build.description.as_deref() {
        line.push_str(&format!(" {}", description.dimmed()));
    }
    line
}

async fn latest_build(session: &Session, job: &str) -> Result<i64> {
    session
        .client
        .list_builds(job)
        .await?
        .iter()
        .map(|build| build.number)
        .max()
        .with_context(|| format!("{job} has no builds"))
}

async fn list(session: &Session, job: &str, limit: usize) -> Result<()> {
    let builds = session.client.list_builds(job).await?;
    if builds.is_empty() {
        println!("{}", "No builds found.".yellow());
        return Ok(());
    }

    for build in builds.iter().take(limit) {
        println!("  {}", describe(build));
    }
    Ok(())
}

async fn log(session: &Session, job: &str, number: Option<i64>) -> Result<()> {
    let number = match number {
        Some(number) => number,
        None => latest_build(session, job).await?,
    };

    let mut cancel = interrupt_signal();
    let outcome = follow_log(
        session.client.as_ref(),
        job,
        number,
        Duration::from_millis(session.config.pipeline.log_poll_delay_ms),
        |text| {
            print!("{text}");
            let _ = std::io::stdout().flush();
        },
        &mut cancel,
    )
    .await;

    match outcome {
        StreamOutcome::Completed => Ok(()),
        StreamOutcome::Cancelled => cancelled(),
        StreamOutcome::Failed(e) => Err(e.into()),
    }
}

async fn abort(session: &Session, job: &str, numbers: Vec<i64>) -> Result<()> {
    let numbers = if numbers.is_empty() {
        let running: Vec<String> = session
            .client
            .list_builds(job)
            .await?
            .iter()
            .filter(|build| build.building)
            .map(|build| build.number.to_string())
            .collect();
        targets_or_pick(Vec::new(), running, "Builds to abort")?
    } else {
        numbers.iter().map(i64::to_string).collect()
    };
    if numbers.is_empty() {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(numbers, |number| async move {
        let parsed = parse_number(&number)?;
        client.stop_build(job, parsed).await.map(|_| "Abort signal sent")
    })
    .await;
    finish_batch(&items)
}

async fn delete(context: &Context, session: &Session, job: &str, numbers: Vec<i64>) -> Result<()> {
    let numbers = if numbers.is_empty() {
        let finished: Vec<String> = session
            .client
            .list_builds(job)
            .await?
            .iter()
            .filter(|build| !build.building)
            .map(|build| build.number.to_string())
            .collect();
        targets_or_pick(Vec::new(), finished, "Builds to delete")?
    } else {
        numbers.iter().map(i64::to_string).collect()
    };
    if numbers.is_empty() {
        return cancelled();
    }

    if !context.confirm(&format!("Delete {} build(s) of {job}?", numbers.len()))? {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(numbers, |number| async move {
        let parsed = parse_number(&number)?;
        client.delete_build(job, parsed).await.map(|_| "Deleted")
    })
    .await;
    finish_batch(&items)
}

fn parse_number(number: &str) -> jenkins_jack_api::JackResult<i64> {
    number
        .parse()
        .map_err(|_| jenkins_jack_api::JackError::Parse(format!("Not a build number: {number}")))
}

async fn replay(
    session: &Session, job: &str, number: Option<i64>, output: Option<PathBuf>,
) -> Result<()> {
    let number = match number {
        Some(number) => number,
        None => latest_build(session, job).await?,
    };

    let script = session.client.get_replay_script(job, number).await?;

    let leaf = job.trim_matches('/').rsplit('/').next().unwrap_or(job);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{leaf}.groovy")));
    std::fs::write(&path, &script).with_context(|| format!("Failed to write {}", path.display()))?;

    let config = PipelineConfig::link(&path, job)?;
    println!(
        "{} Saved {} #{} to {} (linked to {})",
        "✔".green(),
        job,
        number,
        path.display(),
        config.buildable_name()
    );
    Ok(())
}
