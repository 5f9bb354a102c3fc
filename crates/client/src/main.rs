// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use trackline::config::ClientConfig;
use trackline::shipment::NewShipment;
use trackline::{ApiClient, EndReason, SessionEvent};

#[derive(Debug, Parser)]
#[command(name = "trackline", version, about = "Shipment tracking API client")]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session credential.
    Login {
        #[arg(long, env = "TRACKLINE_EMAIL")]
        email: String,
        #[arg(long, env = "TRACKLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session credential.
    Logout,
    /// Show whether a session credential is stored.
    Status,
    /// Book a shipment from a JSON file.
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Look up a shipment by tracking id.
    Track { tracking_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = trackline::connect(&cli.config)?;
    let mut events = client.subscribe();

    let result = dispatch(&client, cli.command).await;

    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Ended { reason: EndReason::RefreshFailed { error } } = event {
            warn!(err = %error, "session ended, run `trackline login` to sign in again");
        }
    }
    result
}

async fn dispatch(client: &ApiClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            client.login(&email, &password).await?;
            println!("logged in");
        }
        Command::Logout => {
            client.logout();
            println!("logged out");
        }
        Command::Status => {
            let store = client.store();
            let status = serde_json::json!({
                "authenticated": store.is_authenticated(),
                "has_refresh_token": store.has_refresh_token(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Create { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let new: NewShipment = serde_json::from_str(&contents)?;
            let shipment = client.create_shipment(&new).await?;
            println!("{}", serde_json::to_string_pretty(&shipment)?);
        }
        Command::Track { tracking_id } => {
            let shipment = client.track(&tracking_id).await?;
            println!("{}", serde_json::to_string_pretty(&shipment)?);
        }
    }
    Ok(())
}
