use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_relay::llm::OpenAiCompatibleProvider;
use voice_relay::{ApiServerBuilder, Config, ResponseGenerator, SUPPORTED_LANGUAGES, Synthesizer};

/// Voice Relay - multilingual chat and speech backend
#[derive(Parser)]
#[command(name = "voice-relay", version, about)]
struct Cli {
    /// Address to bind (overrides RELAY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides RELAY_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the upstream model and exit
    Check,
    /// Print the supported languages
    Languages,
    /// Synthesize text into an MP3 file
    Speak {
        /// Text to speak
        text: String,
        /// Language code
        #[arg(short, long, default_value = voice_relay::languages::DEFAULT_LANGUAGE)]
        language: String,
        /// Output file
        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,voice_relay=info",
        1 => "info,voice_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Check => cmd_check(&config).await,
            Command::Languages => {
                cmd_languages();
                Ok(())
            }
            Command::Speak {
                text,
                language,
                output,
            } => cmd_speak(&config, &text, &language, &output).await,
        };
    }

    tracing::info!(
        addr = %config.bind_addr(),
        model = %config.llm.model,
        base_url = %config.llm.base_url,
        tts = ?config.speech.provider,
        "starting voice relay"
    );

    if config.llm.api_key.is_none() {
        tracing::warn!("no LLM API key configured (set LLM_API_KEY or GROQ_API_KEY)");
    }

    let server = ApiServerBuilder::from_config(&config)?.build();

    if !server.state().generator.check_connectivity().await {
        tracing::warn!("upstream model unreachable, chat will return fallback replies until it recovers");
    }

    server.run().await?;
    Ok(())
}

/// Probe the upstream model
async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let provider = OpenAiCompatibleProvider::new(&config.llm)?;
    let generator = ResponseGenerator::new(Arc::new(provider), &config.llm, config.conversation.context_turns);

    println!("Checking {} ({})...", config.llm.base_url, generator.model());
    if generator.check_connectivity().await {
        println!("Upstream connected");
        Ok(())
    } else {
        anyhow::bail!("upstream at {} is unreachable", config.llm.base_url)
    }
}

/// Print the supported languages
fn cmd_languages() {
    for lang in SUPPORTED_LANGUAGES {
        println!("{}  {} {:<8} {}", lang.code, lang.flag, lang.name, lang.greeting);
    }
}

/// Synthesize `text` and copy the audio to `output`
async fn cmd_speak(config: &Config, text: &str, language: &str, output: &Path) -> anyhow::Result<()> {
    let synthesizer = Synthesizer::from_config(&config.speech)?;

    let artifact = synthesizer.synthesize(text, language).await?;
    tokio::fs::copy(artifact.path(), output)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {} bytes to {}", artifact.len(), output.display());
    Ok(())
}
