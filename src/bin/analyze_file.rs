//! Analyze a local recording without starting the HTTP server.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

use call_sentiment::infrastructure::observability::init_tracing;
use call_sentiment::presentation::{Environment, ServiceStatus, Settings, bootstrap_from_settings};

/// Transcribe an audio file and classify the sentiment of the transcript.
#[derive(Parser, Debug)]
#[command(name = "analyze-file", about = "Transcribe a recording and report its sentiment")]
struct Cli {
    /// Path to the audio file (WAV or any format the decoder supports).
    audio_path: PathBuf,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        settings.logging.format,
        &settings.logging.filter,
        settings.server.port,
    );

    if !cli.audio_path.is_file() {
        bail!("Audio file not found at '{}'", cli.audio_path.display());
    }

    let status = tokio::task::spawn_blocking(move || bootstrap_from_settings(&settings))
        .await
        .context("Model loading task panicked")?;

    let service = match status {
        ServiceStatus::Ready(service) => service,
        ServiceStatus::Unavailable(reason) => bail!("Models failed to load: {}", reason),
    };

    let analysis = service
        .analyze_file(&cli.audio_path)
        .await
        .context("Could not analyze the audio file")?;

    let output = if cli.compact {
        serde_json::to_string(&analysis)?
    } else {
        serde_json::to_string_pretty(&analysis)?
    };
    println!("{}", output);

    Ok(())
}
