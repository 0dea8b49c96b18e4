use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Select;
use jenkins_jack_client::JenkinsClient;
use jenkins_jack_core::infrastructure::ConfigLoader;

use super::cancelled;
use crate::context::Context;

#[derive(Subcommand)]
pub enum ConnectionCommands {
    /// List configured connections
    List,
    /// Make a connection the active one and check that it answers
    Select {
        /// Connection name; prompts when omitted
        name: Option<String>,
    },
}

pub async fn handle(command: ConnectionCommands, context: &Context) -> Result<()> {
    match command {
        ConnectionCommands::List => list(context),
        ConnectionCommands::Select { name } => select(context, name).await,
    }
}

fn list(context: &Context) -> Result<()> {
    let config = context.load_config()?;
    let active = config.active_connection().map(|c| c.name.clone());

    for connection in &config.connections {
        let marker = if Some(&connection.name) == active.as_ref() {
            "●".green()
        } else {
            " ".normal()
        };
        println!(
            "{} {} {}",
            marker,
            connection.name.bold(),
            connection.uri.dimmed()
        );
    }
    Ok(())
}

async fn select(context: &Context, name: Option<String>) -> Result<()> {
    let config = context.load_config()?;

    let name = match name {
        Some(name) => name,
        None => {
            let names: Vec<String> = config.connections.iter().map(|c| c.name.clone()).collect();
            let Some(index) = Select::new()
                .with_prompt("Connection")
                .items(&names)
                .default(0)
                .interact_opt()?
            else {
                return cancelled();
            };
            names[index].clone()
        }
    };

    ConfigLoader::select_connection(context.config_path(), &name)?;

    let config = context.load_config()?;
    let connection = config
        .connection(&name)
        .ok_or_else(|| anyhow::anyhow!("No connection named '{name}'"))?;

    let client = JenkinsClient::connect(connection.client_settings())?;
    client.validate_connection().await?;

    println!(
        "{} Connected to {} ({})",
        "✔".green(),
        connection.name.bold(),
        connection.uri
    );
    Ok(())
}
