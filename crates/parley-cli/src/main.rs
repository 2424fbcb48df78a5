//! Parley CLI: attach files to a message, inspect extraction and send it.
//!
//! Set PARLEY_WEBHOOK_URL (or N8N_WEBHOOK_URL) and optionally
//! PARLEY_ACCESS_TOKEN to send messages with `attach --send`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parley_api_client::WebhookClient;
use parley_cli::{describe_record, describe_rejection, format_file_size, init_tracing};
use parley_core::models::AttachmentRecord;
use parley_core::{AppError, ErrorMetadata, LogLevel, ParleyConfig, SessionError};
use parley_processing::{
    read_candidate, read_candidates, validate_single, AdmittedTotals, AttachmentValidator,
    ComposeSession, Extractor, SnapshotObserver,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "parley", about = "Parley attachment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach files to a message and print (or send) the resulting request
    Attach {
        /// Files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Message text
        #[arg(long, short, default_value = "")]
        message: String,
        /// Conversation session id
        #[arg(long, default_value = "")]
        session: String,
        /// User id forwarded to the relay
        #[arg(long)]
        user: Option<String>,
        /// MIME type applied to every file instead of guessing from the extension
        #[arg(long)]
        mime: Option<String>,
        /// Extraction timeout in seconds (0 disables it)
        #[arg(long)]
        timeout: Option<u64>,
        /// Post the message to the configured webhook
        #[arg(long)]
        send: bool,
    },
    /// Check whether files would be accepted, without extracting them
    Check {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// MIME type applied to every file instead of guessing from the extension
        #[arg(long)]
        mime: Option<String>,
    },
    /// Print the text extracted from one file
    Extract {
        /// File to extract
        file: PathBuf,
        /// MIME type instead of guessing from the extension
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Serialize)]
struct CheckReport {
    accepted: Vec<CheckedFile>,
    rejected: Vec<RejectedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_error: Option<String>,
}

#[derive(Serialize)]
struct CheckedFile {
    name: String,
    mime_type: String,
    size: String,
}

#[derive(Serialize)]
struct RejectedFile {
    name: String,
    reason: String,
}

/// Logs every record change at debug level.
struct StatusLog;

impl SnapshotObserver for StatusLog {
    fn on_snapshot(&self, records: &[AttachmentRecord]) {
        for record in records {
            tracing::debug!(attachment = %describe_record(record), "Attachment status");
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn report_error(err: &anyhow::Error) {
    let Some(app) = err.downcast_ref::<AppError>() else {
        tracing::error!(error = ?err, "Command failed");
        eprintln!("error: {:#}", err);
        return;
    };

    match app.log_level() {
        LogLevel::Debug => tracing::debug!(code = app.error_code(), error = %app.detailed_message()),
        LogLevel::Warn => tracing::warn!(code = app.error_code(), error = %app.detailed_message()),
        LogLevel::Error => tracing::error!(code = app.error_code(), error = %app.detailed_message()),
    }

    eprintln!("error: {}", app.client_message());
    if let Some(action) = app.suggested_action() {
        eprintln!("hint: {}", action);
    }
}

async fn attach(
    config: ParleyConfig,
    files: Vec<PathBuf>,
    message: String,
    session_id: String,
    user: Option<String>,
    mime: Option<String>,
    send: bool,
) -> anyhow::Result<()> {
    let candidates = read_candidates(&files, mime.as_deref()).await?;

    let session = ComposeSession::new(config.session_config());
    session.observe(Arc::new(StatusLog)).map_err(AppError::from)?;

    let admission = match session.attach(candidates).await {
        Ok(admission) => admission,
        Err(SessionError::BatchRejected { error, rejected }) => {
            for rejection in &rejected {
                eprintln!("{}", describe_rejection(rejection));
            }
            return Err(AppError::Validation(error).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    };
    for rejection in &admission.rejected {
        eprintln!("{}", describe_rejection(rejection));
    }

    let settled = session.wait_until_settled().await.map_err(AppError::from)?;
    for record in settled.iter() {
        eprintln!("{}", describe_record(record));
    }

    let mut request = session
        .submit(&message, &session_id)
        .await
        .map_err(AppError::from)?;
    if let Some(user) = user {
        request = request.with_user_id(user);
    }

    if send {
        let client = WebhookClient::from_config(&config)?;
        let response = client.send_message(&request).await?;
        print_json(&response)?;
    } else {
        print_json(&request)?;
    }

    Ok(())
}

async fn check(files: Vec<PathBuf>, mime: Option<String>) -> anyhow::Result<()> {
    let candidates = read_candidates(&files, mime.as_deref()).await?;
    let validator = AttachmentValidator::standard();
    let screening = validator.screen_files(candidates);
    let batch_error = validator
        .validate_batch(AdmittedTotals::default(), &screening.accepted)
        .err()
        .map(|e| e.to_string());

    let report = CheckReport {
        accepted: screening
            .accepted
            .iter()
            .map(|file| CheckedFile {
                name: file.name().to_string(),
                mime_type: file.mime_type().to_string(),
                size: format_file_size(file.byte_size()),
            })
            .collect(),
        rejected: screening
            .rejected
            .iter()
            .map(|r| RejectedFile {
                name: r.file_name.clone(),
                reason: r.error.to_string(),
            })
            .collect(),
        batch_error,
    };
    print_json(&report)
}

async fn extract(config: ParleyConfig, file: PathBuf, mime: Option<String>) -> anyhow::Result<()> {
    let candidate = read_candidate(&file, mime.as_deref()).await?;
    validate_single(&candidate).map_err(AppError::from)?;

    let extractor = Extractor::new().with_timeout(config.extraction_timeout());
    let text = extractor.extract(&candidate).await.map_err(AppError::from)?;
    println!("{}", text);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        ParleyConfig::from_env().map_err(|e| AppError::Config(format!("{:#}", e)))?;

    match cli.command {
        Commands::Attach {
            files,
            message,
            session,
            user,
            mime,
            timeout,
            send,
        } => {
            if let Some(secs) = timeout {
                config.extraction_timeout_secs = secs;
            }
            attach(config, files, message, session, user, mime, send).await
        }
        Commands::Check { files, mime } => check(files, mime).await,
        Commands::Extract { file, mime } => extract(config, file, mime).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
