use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    Context as _,
    Result,
};
use clap::Subcommand;
use colored::Colorize;
use jenkins_jack_api::NodeInfo;
use jenkins_jack_core::application::run_batch;

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
pub enum NodeCommands {
    /// List agents with their executors and state
    List,
    /// Bring agents back online
    Online { nodes: Vec<String> },
    /// Take agents temporarily offline
    Offline {
        nodes: Vec<String>,

        /// Reason shown on the agent page
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Run a Groovy script in the script console of the controller or of
    /// each given agent
    Script {
        file: PathBuf,
        nodes: Vec<String>,
    },
}

pub async fn handle(command: NodeCommands, context: &Context) -> Result<()> {
    let session = context.session()?;

    match command {
        NodeCommands::List => list(&session).await,
        NodeCommands::Online { nodes } => online(&session, nodes).await,
        NodeCommands::Offline { nodes, message } => offline(&session, nodes, &message).await,
        NodeCommands::Script { file, nodes } => script(&session, &file, nodes).await,
    }
}

async fn agents(session: &Session, filter: impl Fn(&NodeInfo) -> bool) -> Result<Vec<String>> {
    Ok(session
        .client
        .list_nodes()
        .await?
        .into_iter()
        .filter(|node| !node.is_controller() && filter(node))
        .map(|node| node.display_name)
        .collect())
}

async fn list(session: &Session) -> Result<()> {
    for node in session.client.list_nodes().await? {
        let state = if node.temporarily_offline {
            format!("{:<20}", "offline (temporary)").yellow()
        } else if node.offline {
            format!("{:<20}", "offline").red()
        } else if node.idle {
            format!("{:<20}", "idle").green()
        } else {
            format!("{:<20}", "busy").blue()
        };

        println!(
            "  {} {:<40} {} {} executor(s)",
            "▸".cyan(),
            node.display_name,
            state,
            node.num_executors
        );
        if let Some(reason) = node.offline_reason.as_deref().filter(|r| !r.is_empty()) {
            println!("      {}", reason.dimmed());
        }
        for build in &node.running {
            let name = build.full_display_name.as_deref().unwrap_or(&build.url);
            println!("      {} {}", "⟳".blue(), name);
        }
    }
    Ok(())
}

async fn online(session: &Session, nodes: Vec<String>) -> Result<()> {
    let candidates = if nodes.is_empty() {
        agents(session, |node| node.offline).await?
    } else {
        Vec::new()
    };
    let targets = targets_or_pick(nodes, candidates, "Agents to bring online")?;
    if targets.is_empty() {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |node| async move {
        client.set_node_online(&node).await.map(|_| "Online")
    })
    .await;
    finish_batch(&items)
}

async fn offline(session: &Session, nodes: Vec<String>, message: &str) -> Result<()> {
    let candidates = if nodes.is_empty() {
        agents(session, |node| !node.offline).await?
    } else {
        Vec::new()
    };
    let targets = targets_or_pick(nodes, candidates, "Agents to take offline")?;
    if targets.is_empty() {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |node| async move {
        client
            .set_node_offline(&node, message)
            .await
            .map(|_| "Offline")
    })
    .await;
    finish_batch(&items)
}

async fn script(session: &Session, file: &Path, nodes: Vec<String>) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if nodes.is_empty() {
        let output = session.client.run_script(&source, None).await?;
        print!("{output}");
        return Ok(());
    }

    let client = &session.client;
    let source = source.as_str();
    let items = run_batch(nodes, |node| async move {
        client.run_script(source, Some(&node)).await
    })
    .await;
    finish_batch(&items)
}
