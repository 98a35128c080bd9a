use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_core::{
    websocket_url, ClientEvent, ConnectionStatus, EventStreamClient, Synchronizer, Visibility,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{sleep, timeout, Instant},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{info, warn};

mod config;
mod surface;

use config::{load_settings, split_classes, KioskSettings, DEFAULT_CONFIG_PATH};
use surface::{CoverageLog, TracingSurface};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(about = "Headless access-control kiosk display")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,
    /// Comma-separated classes required until the backend sends its own.
    #[arg(long)]
    required_classes: Option<String>,
}

impl Args {
    fn apply(&self, settings: &mut KioskSettings) {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.log_filter {
            settings.log_filter = v.clone();
        }
        if let Some(v) = self.reconnect_delay_ms {
            settings.reconnect_delay_ms = v;
        }
        if let Some(v) = &self.required_classes {
            settings.initial_required_classes = split_classes(v);
        }
    }
}

enum Command {
    Show,
    Hide,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "show" => Some(Command::Show),
        "hide" => Some(Command::Hide),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

async fn connect_within(client: &Arc<EventStreamClient>, limit: Duration) -> Result<()> {
    timeout(limit, client.connect())
        .await
        .with_context(|| format!("connect timed out after {}ms", limit.as_millis()))?
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    args.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    run(settings).await
}

async fn run(settings: KioskSettings) -> Result<()> {
    let ws_url = websocket_url(&settings.server_url, &settings.ws_path)
        .context("invalid server_url setting")?;
    let reconnect_delay = Duration::from_millis(settings.reconnect_delay_ms);

    let synchronizer = Synchronizer::new_with_dependencies(
        Arc::new(TracingSurface),
        settings.initial_required_classes.clone(),
        Arc::new(CoverageLog),
    );
    synchronizer.initialize();
    let client = EventStreamClient::new(ws_url, Arc::clone(&synchronizer));
    info!(url = %client.ws_url(), "kiosk: starting");

    let mut events = BroadcastStream::new(client.subscribe_events());
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let reconnect = sleep(Duration::ZERO);
    tokio::pin!(reconnect);
    let mut reconnect_pending = true;

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            () = &mut reconnect, if reconnect_pending => {
                reconnect_pending = false;
                if let Err(err) = connect_within(&client, CONNECT_TIMEOUT).await {
                    warn!(
                        error = %format!("{err:#}"),
                        retry_ms = settings.reconnect_delay_ms,
                        "stream: connect failed"
                    );
                    reconnect.as_mut().reset(Instant::now() + reconnect_delay);
                    reconnect_pending = true;
                }
            }
            event = events.next() => match event {
                Some(Ok(ClientEvent::ConnectionChanged(ConnectionStatus::Disconnected))) => {
                    if !reconnect_pending {
                        reconnect.as_mut().reset(Instant::now() + reconnect_delay);
                        reconnect_pending = true;
                    }
                }
                Some(Ok(ClientEvent::Error(message))) => warn!(%message, "stream: error"),
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "kiosk: event observer lagged");
                }
                None => break,
            },
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Command::Show) => client.set_visibility(Visibility::Visible).await,
                    Some(Command::Hide) => client.set_visibility(Visibility::Hidden).await,
                    Some(Command::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => warn!(command = line.trim(), "kiosk: unknown command, expected show, hide or quit"),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "kiosk: stdin closed");
                    stdin_open = false;
                }
            },
            result = &mut interrupted => {
                result.context("failed to listen for ctrl-c")?;
                info!("kiosk: interrupted");
                break;
            }
        }
    }

    client.shutdown().await;
    info!("kiosk: stopped");
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
