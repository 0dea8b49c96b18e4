use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use anyhow::{
    Context as _,
    Result,
};
use clap::Subcommand;
use colored::Colorize;
use jenkins_jack_api::JenkinsApi;
use jenkins_jack_core::application::{
    PipelineOutcome,
    PipelineRunner,
    PipelineSettings,
    StreamOutcome,
    UpdateOutcome,
};
use tokio::sync::watch;

use super::cancelled;
use crate::context::{
    Context,
    Session,
};
use crate::prompt::TerminalPrompt;

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Push a script to its job, build it and stream the console
    Execute {
        script: PathBuf,

        /// Stop the remote build on Ctrl-C instead of only detaching
        #[arg(long)]
        abort_on_interrupt: bool,
    },
    /// Push a script to its job without building
    Update { script: PathBuf },
}

pub async fn handle(command: PipelineCommands, context: &Context) -> Result<()> {
    let session = context.session()?;

    match command {
        PipelineCommands::Execute {
            script,
            abort_on_interrupt,
        } => execute(context, &session, &script, abort_on_interrupt).await,
        PipelineCommands::Update { script } => update(context, &session, &script).await,
    }
}

fn runner(context: &Context, session: &Session) -> Arc<PipelineRunner> {
    Arc::new(PipelineRunner::new(
        session.client.clone(),
        Arc::new(TerminalPrompt {
            assume_yes: context.assume_yes(),
        }),
        PipelineSettings::from(&session.config.pipeline),
    ))
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn execute(
    context: &Context, session: &Session, script: &Path, abort_on_interrupt: bool,
) -> Result<()> {
    let source = read_script(script)?;
    let runner = runner(context, session);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = {
        let runner = runner.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if abort_on_interrupt {
                match runner.abort().await {
                    Ok(Some((job, number))) => {
                        tracing::info!(job = %job, build = number, "Abort signal sent");
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to abort build"),
                }
            }
            let _ = cancel_tx.send(true);
        })
    };

    let outcome = runner
        .execute(
            script,
            &source,
            |text| {
                print!("{text}");
                let _ = std::io::stdout().flush();
            },
            cancel_rx,
        )
        .await;
    interrupt.abort();

    match outcome? {
        PipelineOutcome::Cancelled => cancelled(),
        PipelineOutcome::Completed { build, stream } => match stream {
            None => {
                println!(
                    "{} {} #{} started: {}",
                    "▸".cyan(),
                    build.job,
                    build.number,
                    build.console_url()
                );
                Ok(())
            }
            Some(StreamOutcome::Completed) => {
                let summary = session.client.get_build(&build.job, build.number).await?;
                let result = summary
                    .result
                    .map(|result| format!("{} {:?}", result.symbol(), result))
                    .unwrap_or_else(|| "finished".to_string());
                println!();
                println!("{} #{} {}", build.job.bold(), build.number, result);
                Ok(())
            }
            Some(StreamOutcome::Cancelled) => {
                println!();
                println!(
                    "{}",
                    format!("Detached from {} #{}", build.job, build.number).dimmed()
                );
                Ok(())
            }
            Some(StreamOutcome::Failed(e)) => Err(e.into()),
        },
    }
}

async fn update(context: &Context, session: &Session, script: &Path) -> Result<()> {
    let source = read_script(script)?;

    match runner(context, session).update(script, &source).await? {
        UpdateOutcome::Created(job) => {
            println!("{} Created {} ({})", "✔".green(), job.full_name.bold(), job.url);
            Ok(())
        }
        UpdateOutcome::Updated(job) => {
            println!("{} Updated {} ({})", "✔".green(), job.full_name.bold(), job.url);
            Ok(())
        }
        UpdateOutcome::Cancelled => cancelled(),
    }
}
