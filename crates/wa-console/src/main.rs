//! # wa-console
//!
//! Command-line presenter for a WhatsApp gateway session. Mounts one
//! [`SessionView`], runs a single command against it, prints store changes,
//! and tears the view down on exit or Ctrl-C.

#![deny(unsafe_code)]

mod render;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use wa_core::{Field, SessionStatus, UiState};
use wa_engine::{Confirmer, OperationOutcome, SessionView};
use wa_gateway::HttpGatewayClient;
use wa_settings::ConsoleSettings;

/// Operator console for a WhatsApp gateway session.
#[derive(Parser, Debug)]
#[command(name = "wa-console", version, about)]
struct Cli {
    /// Gateway base URL (overrides settings), e.g. `http://localhost:8080/api/wa`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Settings file (default: `~/.wa-console/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level filter (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current session status.
    Status,
    /// Start the session and follow it until it is connected.
    Start,
    /// Stop the session.
    Stop {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Log the account out of the session.
    Logout {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Send a text message.
    Send {
        /// Recipient phone number, local (`0812...`) or international form.
        phone: String,
        /// Message text.
        message: String,
    },
    /// Print the login QR code as an image reference.
    Qr,
    /// Probe gateway reachability.
    Ping,
    /// Follow status, QR, notices and inbound messages until Ctrl-C.
    Watch,
}

/// Asks on the terminal.
struct PromptConfirmer;

impl Confirmer for PromptConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn load_settings(cli: &Cli) -> Result<ConsoleSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(wa_settings::settings_path);
    let mut settings = wa_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(url) = &cli.base_url {
        settings.gateway.base_url.clone_from(url);
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    wa_core::logging::init_subscriber(&settings.logging.level);

    let gateway = HttpGatewayClient::new(&settings.gateway).context("Invalid gateway URL")?;
    info!(base_url = %gateway.base_url(), "using gateway");

    let view = SessionView::mount(Arc::new(gateway), &settings);
    wait_for_probe(&view, settings.gateway.request_timeout() + Duration::from_secs(1)).await;

    let result = run(&cli.command, &view).await;
    if let Some(line) = render::notice_line(&view.snapshot()) {
        println!("{line}");
    }
    view.teardown();
    result
}

async fn run(command: &Command, view: &SessionView) -> Result<()> {
    let controller = view.controller();
    match command {
        Command::Status => {
            println!("{}", render::status_line(&view.snapshot()));
        }
        Command::Start => {
            let _ = controller.start_session().await?;
            follow(view, |state| state.status.is_working()).await?;
        }
        Command::Stop { yes } => {
            let outcome = controller.stop_session(&*confirmer(*yes)).await?;
            report(outcome, "stop");
        }
        Command::Logout { yes } => {
            let outcome = controller.logout(&*confirmer(*yes)).await?;
            report(outcome, "logout");
        }
        Command::Send { phone, message } => {
            controller.send_message(phone, message).await?;
        }
        Command::Qr => {
            controller.show_qr().await?;
            if let Some(qr) = view.snapshot().qr {
                println!("{}", qr.image_ref.as_str());
            }
        }
        Command::Ping => {
            let text = controller.ping().await?;
            println!("{text}");
        }
        Command::Watch => {
            println!("{}", render::status_line(&view.snapshot()));
            println!("{}", render::bridge_line(view.bridge_state()));
            follow(view, |_| false).await?;
        }
    }
    Ok(())
}

fn confirmer(yes: bool) -> Box<dyn Confirmer> {
    if yes {
        Box::new(|_: &str| true)
    } else {
        Box::new(PromptConfirmer)
    }
}

fn report(outcome: OperationOutcome, operation: &str) {
    if outcome == OperationOutcome::Declined {
        println!("{operation} cancelled");
    }
}

/// Wait until the mount-time probe has replaced `Checking`.
async fn wait_for_probe(view: &SessionView, limit: Duration) {
    let mut changes = view.subscribe(&[Field::Status]);
    if view.snapshot().status != SessionStatus::Checking {
        return;
    }
    let _ = tokio::time::timeout(limit, changes.recv()).await;
}

/// Print store and push-channel changes until `done` holds, the view closes,
/// or Ctrl-C.
async fn follow<F>(view: &SessionView, done: F) -> Result<()>
where
    F: Fn(&UiState) -> bool,
{
    let mut changes = view.subscribe(&[
        Field::Status,
        Field::ShowQr,
        Field::Notice,
        Field::LastMessage,
    ]);
    let mut bridge = view.watch_bridge();
    if done(&view.snapshot()) {
        return Ok(());
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl-c")?;
                info!("interrupted");
                return Ok(());
            }
            Ok(()) = bridge.changed() => {
                let state = *bridge.borrow_and_update();
                println!("{}", render::bridge_line(state));
            }
            change = changes.recv() => {
                let Some(change) = change else { return Ok(()) };
                if let Some(line) = render::change_line(&change) {
                    println!("{line}");
                }
                if done(&change.state) {
                    return Ok(());
                }
            }
        }
    }
}
