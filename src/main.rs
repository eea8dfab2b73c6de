use anyhow::Result;
use clap::{Parser, Subcommand};
use habla::{
    environment_check, BatchClient, Config, MicrophoneCapture, SessionConfig, SessionController,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "habla", about = "Live dictation client")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/habla")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dictate live from the microphone until Ctrl-C
    Live,
    /// Transcribe a complete audio file in one request
    Batch {
        /// Audio file to upload
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Live => run_live(&cfg).await,
        Command::Batch { file } => run_batch(&cfg, &file).await,
    }
}

async fn run_live(cfg: &Config) -> Result<()> {
    environment_check()?;

    let session_config = SessionConfig::from_config(cfg);
    let controller = SessionController::new(session_config, Box::new(MicrophoneCapture::new()));

    let mut status_rx = controller.status();
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            println!("[{:?}] {}", status.state, status.message);
        }
    });

    controller.start().await?;

    tokio::signal::ctrl_c().await?;
    println!();

    controller.stop().await;
    status_task.abort();

    let transcript = controller.transcript_text().await;
    if transcript.is_empty() {
        println!("(no transcript)");
    } else {
        print!("{}", transcript);
    }

    Ok(())
}

async fn run_batch(cfg: &Config, file: &PathBuf) -> Result<()> {
    let client = BatchClient::new(&cfg.service.batch_url)?;
    let transcript = client.transcribe_file(file).await?;

    if transcript.is_empty() {
        println!("(no transcript)");
    } else {
        println!("{}", transcript);
    }

    Ok(())
}
