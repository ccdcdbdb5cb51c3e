//! contact-relay CLI entry point.
//!
//! Provides `send`, `draft`, and `check-config` subcommands for submitting a
//! message, inspecting the saved draft, or reporting which delivery channel
//! is active.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::warn;

use contact_relay::config::ContactConfig;
use contact_relay::form::{ContactForm, SubmitOutcome};
use contact_relay::providers::ProviderConfig;
use contact_relay::validation::Field;

/// contact-relay: deliver a contact-form message through the configured channel.
#[derive(Parser)]
#[command(name = "contact-relay", version, about)]
struct Cli {
    /// Also write JSON logs to this directory (overrides `[logging] dir`).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Fill in the form and submit it once.
    Send {
        /// Sender name. Falls back to the saved draft.
        #[arg(long)]
        name: Option<String>,
        /// Sender email. Falls back to the saved draft.
        #[arg(long)]
        email: Option<String>,
        /// Message body. Falls back to the saved draft.
        #[arg(long)]
        message: Option<String>,
    },
    /// Inspect or discard the saved draft.
    Draft {
        /// Draft action.
        #[command(subcommand)]
        action: DraftAction,
    },
    /// Report the active channel and any setup warnings.
    CheckConfig,
}

/// Draft subcommands.
#[derive(Subcommand)]
enum DraftAction {
    /// Print the saved draft as JSON.
    Show,
    /// Delete the saved draft.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ContactConfig::load()?;
    if let Some(dir) = cli.log_dir {
        config.logging.dir = Some(dir);
    }
    let _logging_guard = contact_relay::logging::init(&config.logging)?;

    for warning in config.environment_warnings() {
        warn!("{warning}");
    }

    match cli.command {
        Command::Send {
            name,
            email,
            message,
        } => handle_send(&config, name, email, message).await,
        Command::Draft { action } => handle_draft(&config, action),
        Command::CheckConfig => Ok(handle_check_config(&config)),
    }
}

/// Submit one message and print the resulting notification.
async fn handle_send(
    config: &ContactConfig,
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
) -> anyhow::Result<ExitCode> {
    let form = ContactForm::from_config(config)?;
    for (field, value) in [
        (Field::Name, name),
        (Field::Email, email),
        (Field::Message, message),
    ] {
        if let Some(value) = value {
            form.update_field(field, &value);
        }
    }

    let outcome = form.submit().await;
    if let Some(entry) = form
        .toasts()
        .entries()
        .into_iter()
        .find(|e| e.id == outcome.toast())
    {
        println!("{}", entry.message);
    }

    match outcome {
        SubmitOutcome::Delivered { .. } => Ok(ExitCode::SUCCESS),
        SubmitOutcome::Invalid { errors, .. } => {
            for (field, error) in errors {
                eprintln!("  {field}: {error}");
            }
            Ok(ExitCode::from(2))
        }
        SubmitOutcome::RateLimited { .. } | SubmitOutcome::Failed { .. } => Ok(ExitCode::FAILURE),
    }
}

/// Show or clear the saved draft.
fn handle_draft(config: &ContactConfig, action: DraftAction) -> anyhow::Result<ExitCode> {
    let drafts = contact_relay::draft::DraftStore::in_dir(config.draft_dir()?);
    match action {
        DraftAction::Show => {
            println!("{}", serde_json::to_string_pretty(&drafts.load())?);
        }
        DraftAction::Clear => {
            drafts.clear();
            println!("draft cleared");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the active channel and setup warnings.
fn handle_check_config(config: &ContactConfig) -> ExitCode {
    let selected = ProviderConfig::select(&config.channels);
    match &selected {
        Some(provider) => println!("active channel: {}", provider.channel()),
        None => println!("active channel: none"),
    }
    for warning in config.environment_warnings() {
        println!("warning: {warning}");
    }
    if selected.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
