//! Command definitions and their handlers.

mod build;
mod connection;
mod job;
mod node;
mod pipeline;
mod queue;

pub use build::BuildCommands;
pub use connection::ConnectionCommands;
pub use job::JobCommands;
pub use node::NodeCommands;
pub use pipeline::PipelineCommands;
pub use queue::QueueCommands;

use std::fmt::Display;

use anyhow::{
    bail,
    Result,
};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::MultiSelect;
use jenkins_jack_core::application::{
    render_report,
    BatchItem,
};
use tokio::sync::watch;

use crate::context::Context;

#[derive(Subcommand)]
pub enum Commands {
    /// Configured Jenkins hosts
    Connection {
        #[command(subcommand)]
        command: ConnectionCommands,
    },
    /// Run or push local pipeline scripts
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Jobs on the active host
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Builds of a job
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },
    /// Agents and the script console
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// The build queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

pub async fn handle_command(command: Commands, context: &Context) -> Result<()> {
    match command {
        Commands::Connection { command } => connection::handle(command, context).await,
        Commands::Pipeline { command } => pipeline::handle(command, context).await,
        Commands::Job { command } => job::handle(command, context).await,
        Commands::Build { command } => build::handle(command, context).await,
        Commands::Node { command } => node::handle(command, context).await,
        Commands::Queue { command } => queue::handle(command, context).await,
    }
}

/// Targets given on the command line, or picked interactively from
/// `candidates` when none were.
fn targets_or_pick(given: Vec<String>, candidates: Vec<String>, prompt: &str) -> Result<Vec<String>> {
    if !given.is_empty() {
        return Ok(given);
    }
    if candidates.is_empty() {
        bail!("Nothing to choose from");
    }

    let picked = MultiSelect::new()
        .with_prompt(prompt)
        .items(&candidates)
        .interact_opt()?
        .unwrap_or_default();

    Ok(picked
        .into_iter()
        .map(|index| candidates[index].clone())
        .collect())
}

/// Prints a batch report and fails when any item failed.
fn finish_batch<T: Display>(items: &[BatchItem<T>]) -> Result<()> {
    print!("{}", render_report(items));

    let failed = items.iter().filter(|item| !item.is_ok()).count();
    if failed > 0 {
        bail!("{failed} of {} operations failed", items.len());
    }
    Ok(())
}

/// Flips to `true` on the first Ctrl-C.
fn interrupt_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });
    rx
}

fn cancelled() -> Result<()> {
    println!("{}", "Cancelled.".dimmed());
    Ok(())
}
