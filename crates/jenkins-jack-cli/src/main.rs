//! Jenkins Jack CLI
//!
//! Runs local pipeline scripts on a Jenkins host and manages its jobs,
//! builds, nodes and queue from the terminal.

mod commands;
mod context;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use commands::{
    handle_command,
    Commands,
};
use context::Context;
use jenkins_jack_core::infrastructure::config::CONFIG_PATH_ENV;

#[derive(Parser)]
#[command(name = "jenkins-jack")]
#[command(about = "Jenkins pipeline and job tooling for the terminal", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Connection to use instead of the active one
    #[arg(short, long, global = true)]
    connection: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        jenkins_jack_core::logging::init_verbose();
    } else {
        jenkins_jack_core::logging::init();
    }

    let context = Context::new(cli.config, cli.connection, cli.yes);

    match handle_command(cli.command, &context).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(error = %e, "Command failed");
            eprintln!("{} {:#}", "warning:".yellow().bold(), e);
            ExitCode::FAILURE
        }
    }
}
