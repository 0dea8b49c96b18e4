use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
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
pub enum QueueCommands {
    /// List queued items
    List,
    /// Cancel queued items by id; prompts when none are given
    Cancel {
        ids: Vec<i64>,

        /// Cancel everything in the queue
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },
}

pub async fn handle(command: QueueCommands, context: &Context) -> Result<()> {
    let session = context.session()?;

    match command {
        QueueCommands::List => list(&session).await,
        QueueCommands::Cancel { ids, all } => cancel(context, &session, ids, all).await,
    }
}

async fn list(session: &Session) -> Result<()> {
    let items = session.client.list_queue().await?;
    if items.is_empty() {
        println!("{}", "Queue is empty.".dimmed());
        return Ok(());
    }

    for item in items {
        let flag = if item.stuck {
            " stuck".red().to_string()
        } else if item.blocked {
            " blocked".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {:<8} {}{}", item.id, item.name.bold(), flag);
        if let Some(why) = item.why.as_deref() {
            println!("           {}", why.dimmed());
        }
    }
    Ok(())
}

async fn cancel(context: &Context, session: &Session, ids: Vec<i64>, all: bool) -> Result<()> {
    let queue = session.client.list_queue().await?;
    let label = |id: i64| {
        queue
            .iter()
            .find(|item| item.id == id)
            .map(|item| format!("{id} {}", item.name))
            .unwrap_or_else(|| id.to_string())
    };

    let targets = if all {
        queue.iter().map(|item| label(item.id)).collect()
    } else {
        let given = ids.into_iter().map(label).collect();
        let candidates = queue.iter().map(|item| label(item.id)).collect();
        targets_or_pick(given, candidates, "Queue items to cancel")?
    };
    if targets.is_empty() {
        return cancelled();
    }

    if all && !context.confirm(&format!("Cancel all {} queued item(s)?", targets.len()))? {
        return cancelled();
    }

    let client = &session.client;
    let items = run_batch(targets, |target| async move {
        let id = target
            .split_whitespace()
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| jenkins_jack_api::JackError::Parse(format!("Not a queue id: {target}")))?;
        client.cancel_queue_item(id).await.map(|_| "Cancelled")
    })
    .await;
    finish_batch(&items)
}
