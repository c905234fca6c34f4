use agent_chat_stream::chat::ChatTranscript;
use agent_chat_stream::client::{BackendClient, ChatRequest};
use agent_chat_stream::config::ClientConfig;
use agent_chat_stream::progress::ProgressTracker;
use agent_chat_stream::source::CancelHandle;
use agent_chat_stream::streaming::StreamEvent;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agent-chat", about = "Stream chat replies and model pulls from a local backend")]
struct Cli {
    /// TOML config file; environment variables are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message and print the streamed reply
    Chat {
        #[arg(short, long)]
        session: String,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        agent: Option<String>,
        message: String,
    },
    /// Download a model and report progress
    Pull { model: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agent_chat_stream=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::from_env()?,
    };
    config.validate()?;

    info!("Backend: {}", config.backend.base_url);
    let client = BackendClient::new(config.backend, config.stream)?;

    match cli.command {
        Command::Chat {
            session,
            model,
            agent,
            message,
        } => {
            let mut request = ChatRequest::new(session, message);
            request.model = model;
            request.agent_id = agent;
            chat(&client, &request).await
        }
        Command::Pull { model } => pull(&client, &model).await,
    }
}

fn cancel_on_ctrl_c(handle: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling stream");
            handle.cancel();
        }
    });
}

async fn chat(client: &BackendClient, request: &ChatRequest) -> Result<()> {
    let mut session = client.chat(request);
    cancel_on_ctrl_c(session.cancel_handle());

    let mut transcript = ChatTranscript::new();
    let mut stdout = std::io::stdout();

    while let Some(event) = session.next_event().await {
        match event.context("chat stream failed")? {
            StreamEvent::Data(event) => match transcript.apply(&event) {
                Ok(Some(token)) => {
                    write!(stdout, "{}", token)?;
                    stdout.flush()?;
                }
                Ok(None) => {}
                Err(e) => warn!("Unexpected chat payload {}: {}", event.payload, e),
            },
            StreamEvent::Done => writeln!(stdout)?,
        }
    }

    if let Some(message) = transcript.error() {
        error!("Backend reported: {}", message);
        bail!("chat failed: {}", message);
    }

    info!(
        tokens = transcript.token_count(),
        state = %session.state(),
        "Chat finished"
    );
    Ok(())
}

async fn pull(client: &BackendClient, model: &str) -> Result<()> {
    let mut session = client.pull_model(model);
    cancel_on_ctrl_c(session.cancel_handle());

    let mut tracker = ProgressTracker::new();

    while let Some(event) = session.next_event().await {
        let StreamEvent::Data(event) = event.context("pull stream failed")? else {
            continue;
        };
        match tracker.apply(&event) {
            Ok(update) => {
                let status = update.status.as_deref().unwrap_or("downloading");
                match tracker.percent() {
                    Some(percent) => println!("{} {:>6.2}%", status, percent),
                    None => println!("{}", status),
                }
            }
            Err(e) => warn!("Unexpected progress payload {}: {}", event.payload, e),
        }
    }

    if let Some(message) = tracker.error() {
        bail!("pull failed: {}", message);
    }

    info!(
        success = tracker.is_success(),
        state = %session.state(),
        "Pull finished"
    );
    Ok(())
}
