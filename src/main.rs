use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use parley::api::{ApiServer, ApiState};
use parley::config::SpeechBackend;
use parley::speech::{AudioPlayback, ENERGY_THRESHOLD, Microphone, TextToSpeech, rms_energy};
use parley::{
    Config, ConsoleSpeech, DialogueRunner, LocalSpeech, ModelDirectory, OllamaClient,
    SpeechAdapter,
};

/// Parley - talk to a local language model
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/parley/config.toml)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Type instead of speaking (stdin/stdout speech adapter)
    #[arg(long)]
    console: bool,

    /// Don't start the status page / click server
    #[arg(long)]
    no_server: bool,

    /// Port for the status page
    #[arg(long)]
    port: Option<u16>,

    /// Start the conversation without waiting for a click
    #[arg(long)]
    auto_start: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// List the models on the Ollama server
    Models,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.console {
        config.speech.backend = SpeechBackend::Console;
    }
    if cli.no_server {
        config.server.enabled = false;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Models => list_models(config).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    tracing::info!(
        model = %config.ollama.model,
        ollama = %config.ollama.base_url,
        backend = ?config.speech.backend,
        server = config.server.enabled,
        "starting parley"
    );

    let backend = config.speech.backend;
    let speech: Box<dyn SpeechAdapter> = match backend {
        SpeechBackend::Local => Box::new(LocalSpeech::new(&config.speech)),
        SpeechBackend::Console => Box::new(ConsoleSpeech::stdio(config.speech.no_input_timeout)),
    };

    let ollama = Arc::new(OllamaClient::from_config(config.ollama));
    let mut runner = DialogueRunner::new(config.dialogue, speech, ollama.clone(), ollama)
        .with_timeouts(config.timeouts)
        .with_adapter_retries(config.adapter_retries)
        .with_auto_start(cli.auto_start || backend == SpeechBackend::Console);

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    if config.server.enabled {
        let state = ApiState {
            triggers: trigger_tx.clone(),
            status: runner.subscribe(),
        };
        ApiServer::new(state, config.server.host.clone(), config.server.port).spawn();
        println!(
            "Open http://{}:{} and click to start",
            config.server.host, config.server.port
        );
    }

    // The console adapter owns stdin
    if backend == SpeechBackend::Local {
        spawn_enter_trigger(trigger_tx.clone());
        if !cli.auto_start {
            println!("Press Enter to start");
        }
    }
    drop(trigger_tx);

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            let _ = ctrl_c_tx.send(()).await;
        }
    });

    let outcome = runner.run(trigger_rx, shutdown_rx).await;
    drop(shutdown_tx);

    tracing::info!(
        turns = runner.machine().turns(),
        messages = runner.machine().transcript().len(),
        "dialogue ended"
    );
    outcome?;
    Ok(())
}

/// Send a trigger for every line typed on stdin
fn spawn_enter_trigger(triggers: mpsc::Sender<()>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if triggers.send(()).await.is_err() {
                break;
            }
        }
    });
}

/// Print the model directory
async fn list_models(config: Config) -> anyhow::Result<()> {
    let client = OllamaClient::from_config(config.ollama);
    let models = client.list_models().await?;

    if models.is_empty() {
        println!("No models installed");
    }
    for name in models {
        println!("{name}");
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut microphone = Microphone::open()?;
    let mut recording = microphone.record()?;

    println!("Sample rate: {} Hz", parley::speech::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        let samples = recording.next_chunk(Duration::from_secs(1)).await;
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    drop(recording);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("Speech above an RMS of {ENERGY_THRESHOLD} is picked up as an utterance.");

    Ok(())
}

/// Test speaker output with a sine wave
#[allow(clippy::future_not_send)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    // 2 seconds of 440Hz at the 24kHz playback rate
    let sample_rate = 24000_u16;
    let frequency = 440.0_f32;
    let num_samples = usize::from(sample_rate) * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / f32::from(sample_rate);
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Synthesize `text` through the configured speech API and play it
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::from_config(&config.speech);

    let audio = tts.synthesize(text).await?;
    println!("Received {} bytes of audio", audio.len());

    let playback = AudioPlayback::new()?;
    playback.play_mp3(&audio).await?;

    println!("Done!");
    Ok(())
}
