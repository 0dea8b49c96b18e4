use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use jenkins_jack_api::{
    JenkinsApi,
    JobDescriptor,
};
use jenkins_jack_core::application::{
    run_batch,
    JobResolver,
};

use super::{
    cancelled,
    finish_batch,
    targets_or_pick,
};
use crate::context::{
    Context,
    Session,
};

#[derive(Subcommand)]
pub enum JobCommands {
    /// List leaf jobs, expanding folders, multibranch projects and
    /// organization folders
    List {
        /// Start from this folder instead of the connection default
        #[arg(long)]
        folder: Option<String>,

        /// Only pipeline jobs
        #[arg(long)]
        pipelines: bool,
    },
    /// List folders
    Folders,
    /// Enable disabled jobs
    Enable { jobs: Vec<String> },
    /// Disable enabled jobs
    Disable { jobs: Vec<String> },
    /// Delete jobs
    Delete { jobs: Vec<String> },
}

pub async fn handle(command: JobCommands, context: &Context) -> Result<()> {
    let session = context.session()?;

    match command {
        JobCommands::List { folder, pipelines } => list(&session, folder, pipelines).await,
        JobCommands::Folders => folders(&session).await,
        JobCommands::Enable { jobs } => enable(&session, jobs).await,
        JobCommands::Disable { jobs } => disable(&session, jobs).await,
        JobCommands::Delete { jobs } => delete(context, &session, jobs).await,
    }
}

fn resolver(session: &Session) -> JobResolver {
    JobResolver::new(session.client.clone() as Arc<dyn JenkinsApi>)
}

async fn resolve(session: &Session, filter: impl Fn(&JobDescriptor) -> bool) -> Result<Vec<String>> {
    let root = session.job_root();
    let jobs = resolver(session)
        .resolve_filtered(root.as_deref(), filter)
        .await?;
    Ok(jobs.into_iter().map(|job| job.full_name).collect())
}

async fn list(session: &Session, folder: Option<String>, pipelines: bool) -> Result<()> {
    let resolver = resolver(session);
    let jobs = match folder {
        Some(folder) => resolver.resolve_folder(&folder).await?,
        None => resolver.resolve(session.job_root().as_deref()).await?,
    };

    let jobs: Vec<_> = jobs
        .into_iter()
        .filter(|job| !pipelines || job.is_pipeline())
        .collect();

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    for job in &jobs {
        let name = format!("{:<60}", job.full_name);
        let name = if job.buildable {
            name.normal()
        } else {
            name.dimmed()
        };
        println!("  {} {} {}", "▸".cyan(), name, job.job_type.to_string().dimmed());
    }
    println!();
    println!("{}", format!("{} job(s)", jobs.len()).bold());
    Ok(())
}

async fn folders(session: &Session) -> Result<()> {
    let root = session.job_root();
    for folder in resolver(session).folders(root.as_deref()).await? {
        println!("  {folder}");
    }
    Ok(())
}

async fn enable(session: &Session, jobs: Vec<String>) -> Result<()> {
    let candidates = if jobs.is_empty() {
        resolve(session, |job| !job.buildable).await?
    } else {
        Vec::new()
    };
    let targets = targets_or_pick(jobs, candidates, "Jobs to enable")?;
    if targets.is_empty() {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |job| async move {
        client.enable_job(&job).await.map(|_| "Enabled")
    })
    .await;
    finish_batch(&items)
}

async fn disable(session: &Session, jobs: Vec<String>) -> Result<()> {
    let candidates = if jobs.is_empty() {
        resolve(session, |job| job.buildable).await?
    } else {
        Vec::new()
    };
    let targets = targets_or_pick(jobs, candidates, "Jobs to disable")?;
    if targets.is_empty() {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |job| async move {
        client.disable_job(&job).await.map(|_| "Disabled")
    })
    .await;
    finish_batch(&items)
}

async fn delete(context: &Context, session: &Session, jobs: Vec<String>) -> Result<()> {
    let candidates = if jobs.is_empty() {
        resolve(session, |_| true).await?
    } else {
        Vec::new()
    };
    let targets = targets_or_pick(jobs, candidates, "Jobs to delete")?;
    if targets.is_empty() {
        return cancelled();
    }

    if !context.confirm(&format!("Delete {} job(s)? This cannot be undone", targets.len()))? {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |job| async move {
        client.delete_job(&job).await.map(|_| "Deleted")
    })
    .await;
    finish_batch(&items)
}
