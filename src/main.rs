use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use longscribe_core::{AppConfig, AudioInput};
use longscribe_engine::GoogleSpeechService;
use longscribe_pipeline::Pipeline;
use longscribe_storage::StagingBucket;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

const TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

#[derive(Parser)]
#[command(name = "longscribe")]
#[command(about = "Transcribe long audio with Google Speech")]
struct Cli {
    /// Path to the configuration file (built-in defaults if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a local audio file or a gs:// object into a CSV transcript
    Run {
        /// Local audio path or gs://bucket/object URI
        audio: String,

        /// Where to write the CSV (defaults to the input name with .csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => AppConfig::default(),
    };

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Stdout carries transcript rows only.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);
    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    if config.recognition.access_token.is_empty() {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.recognition.access_token = token;
        }
    }

    match cli.command {
        Command::Run { audio, out } => run(config, &audio, out).await,
    }
}

async fn run(config: AppConfig, audio: &str, out: Option<PathBuf>) -> Result<()> {
    let input = AudioInput::from_arg(audio);
    let input = input.with_context(|| format!("invalid input {audio:?}"))?;
    let output = out.unwrap_or_else(|| input.default_output_path());

    tracing::info!(input = audio, output = %output.display(), "longscribe starting");

    let service = GoogleSpeechService::new(
        &config.recognition.endpoint,
        &config.recognition.access_token,
    )
    .context("failed to create speech client")?;

    let staging = match &input {
        AudioInput::Local(_) => {
            let name = &config.storage.bucket;
            let bucket = StagingBucket::gcs(name)
                .with_context(|| format!("failed to open staging bucket {name}"))?;
            Some(bucket)
        }
        AudioInput::Remote(_) => None,
    };

    let mut pipeline = Pipeline::new(config, Arc::new(service));
    if let Some(bucket) = staging {
        pipeline = pipeline.with_staging(bucket);
    }

    let summary = pipeline
        .run(&input, &output)
        .await
        .with_context(|| format!("transcription of {audio} failed"))?;

    tracing::info!(
        operation = %summary.operation,
        rows = summary.rows,
        output = %summary.output_path.display(),
        "transcript saved"
    );
    Ok(())
}
