use anyhow::{Context, Result, anyhow, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use scriptoria::client::{Backend, HttpBackend};
use scriptoria::config::ClientConfig;
use scriptoria::conversation::ConversationLog;
use scriptoria::error::ClientError;
use scriptoria::metrics::STREAM_METRICS;
use scriptoria::normalize::normalize;
use scriptoria::render::RendererConfig;
use scriptoria::session::{Outcome, Progress, SessionKind, SessionState};
use scriptoria::validation::{validate_document, validate_question};
use scriptoria::{SessionStream, StreamConsumer};

#[derive(Debug, Parser)]
#[command(name = "scriptoria", version, about = "Ask questions about a PDF document")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Service base URL, overriding configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the service is up
    Health,
    /// Upload a PDF document
    Upload { file: PathBuf },
    /// Ask a single question about the uploaded document
    Ask { question: String },
    /// Upload a document, then ask questions interactively
    Chat { file: PathBuf },
    /// Normalize math markup from a file or stdin
    Normalize { file: Option<PathBuf> },
    /// Print the typesetter configuration as JSON
    RendererConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Normalize { file } => normalize_command(file.as_deref()).await,
        Command::RendererConfig => {
            println!("{}", RendererConfig::default().to_json()?);
            Ok(())
        }
        command => {
            let config = load_config(&cli)?;
            let consumer = StreamConsumer::new(config.stream.clone());
            let backend = HttpBackend::new(config)?;

            match command {
                Command::Health => health(&backend).await,
                Command::Upload { file } => upload(&backend, &consumer, file).await,
                Command::Ask { question } => {
                    let mut log = ConversationLog::new();
                    ask(&backend, &consumer, &mut log, question).await
                }
                Command::Chat { file } => chat(&backend, &consumer, file).await,
                Command::Normalize { .. } | Command::RendererConfig => Ok(()),
            }
        }
    };

    tracing::debug!("{}", STREAM_METRICS.snapshot());
    result
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("Config path is not valid UTF-8"))?;
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::from_env()?,
    };

    if let Some(base_url) = &cli.base_url {
        config.server.base_url = base_url.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn health(backend: &HttpBackend) -> Result<()> {
    let report = backend.health().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_healthy() {
        bail!("Service reported status: {}", report.status);
    }
    Ok(())
}

async fn upload(backend: &HttpBackend, consumer: &StreamConsumer, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid document path: {}", path.display()))?;

    let document = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    validate_document(file_name, document.len() as u64)?;

    let source = backend.upload(file_name, Bytes::from(document)).await?;
    match drive(consumer.open(SessionKind::Upload, source)).await?.into_outcome()? {
        Outcome::Uploaded { message } if !message.is_empty() => println!("{}", message),
        Outcome::Uploaded { .. } => println!("Document processed"),
        Outcome::Answered(_) => bail!("Upload session produced an answer"),
    }
    Ok(())
}

async fn ask(
    backend: &HttpBackend,
    consumer: &StreamConsumer,
    log: &mut ConversationLog,
    question: &str,
) -> Result<()> {
    let question = validate_question(question)?;

    let source = backend.ask(&log.request(question)).await?;
    match drive(consumer.open(SessionKind::Query, source)).await?.into_outcome()? {
        Outcome::Answered(answer) => {
            println!("{}", answer);
            log.record_exchange(question, &answer);
        }
        Outcome::Uploaded { .. } => bail!("Query session produced no answer"),
    }
    Ok(())
}

async fn chat(backend: &HttpBackend, consumer: &StreamConsumer, path: &Path) -> Result<()> {
    upload(backend, consumer, path).await?;
    eprintln!("Ask a question, /new to start over, /quit to exit.");

    let mut log = ConversationLog::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/new" => {
                log.clear();
                eprintln!("Started a new conversation.");
            }
            question => {
                if let Err(e) = ask(backend, consumer, &mut log, question).await {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    Ok(())
}

async fn normalize_command(path: Option<&Path>) -> Result<()> {
    let text = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    print!("{}", normalize(&text));
    Ok(())
}

/// Report progress until the session ends; Ctrl-C cancels it.
async fn drive<S>(mut session: SessionStream<S>) -> Result<SessionState>
where
    S: Stream<Item = std::result::Result<Bytes, ClientError>> + Unpin,
{
    loop {
        tokio::select! {
            snapshot = session.next() => match snapshot {
                Some(SessionState::Active(progress)) => report(&progress),
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                bail!("Cancelled");
            }
        }
    }

    Ok(session.state().clone())
}

fn report(progress: &Progress) {
    let label = progress
        .status
        .label()
        .filter(|_| progress.message.is_empty())
        .unwrap_or(progress.message.as_str());
    eprintln!("[{:>3}%] {}", progress.progress, label);
}
