use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use drishti::playback::{self, CpalSink};
use drishti::speech::{NullSpeaker, Speaker, SpeechClient};
use drishti::translate::{MbartTranslator, SOURCE_LANGUAGE};
use drishti::{
    Announcer, BackendClient, Config, Daemon, FileSource, FrameSource, ProfileStore, profile,
};

/// Drishti - camera-to-speech narration for assistive vision backends
#[derive(Parser)]
#[command(name = "drishti", version, about)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "DRISHTI_BACKEND_URL")]
    backend_url: Option<String>,

    /// Directory of JPEG frames to replay instead of a camera
    #[arg(long, env = "DRISHTI_FRAMES_DIR")]
    frames_dir: Option<PathBuf>,

    /// V4L2 device to capture from (requires the camera-v4l2 feature)
    #[arg(long, env = "DRISHTI_CAMERA")]
    camera: Option<String>,

    /// Log announcements instead of playing audio
    #[arg(long, env = "DRISHTI_NO_AUDIO")]
    no_audio: bool,

    /// Override the profile's announcement language (en, te, hi)
    #[arg(short, long)]
    language: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show backend model readiness
    Status,
    /// Speak a phrase through the full translate-and-play path
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the narration system.")]
        text: String,
    },
    /// Read a currency note from a still image
    Currency {
        /// Path to a JPEG of the note
        image: PathBuf,
    },
    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Test speaker output with a tone
    TestSpeaker,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Print the stored profile
    Show,
    /// Update profile fields
    Set {
        /// User name
        #[arg(long)]
        name: Option<String>,
        /// User phone number
        #[arg(long)]
        phone: Option<String>,
        /// Announcement language code (en, te, hi)
        #[arg(long)]
        language: Option<String>,
        /// Emergency contact name
        #[arg(long)]
        contact_name: Option<String>,
        /// Emergency contact relationship
        #[arg(long)]
        contact_relationship: Option<String>,
        /// Emergency contact phone number
        #[arg(long)]
        contact_phone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,drishti=info",
        1 => "info,drishti=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(dir) = cli.frames_dir {
        config.frames_dir = Some(dir);
    }
    if let Some(device) = cli.camera {
        config.camera_device = device;
    }

    let backend = Arc::new(BackendClient::new(
        &config.backend_url,
        config.request_timeout,
    )?);

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Status => cmd_status(&backend).await,
            Command::Say { text } => {
                cmd_say(&config, &backend, cli.language.as_deref(), cli.no_audio, text).await
            }
            Command::Currency { image } => {
                let phrase = drishti::currency::read_note(&backend, &image).await?;
                println!("{phrase}");
                cmd_say(&config, &backend, cli.language.as_deref(), cli.no_audio, phrase).await
            }
            Command::Profile { action } => cmd_profile(&config, &backend, action).await,
            Command::TestSpeaker => cmd_test_speaker(),
        };
    }

    let language = resolve_language(&config, &backend, cli.language.as_deref()).await;
    tracing::info!(
        backend = %config.backend_url,
        language,
        no_audio = cli.no_audio,
        "starting drishti"
    );

    let speaker = build_speaker(&backend, cli.no_audio)?;
    let translator = Arc::new(MbartTranslator::new(
        Arc::clone(&backend),
        config.translate_warmup_timeout,
        config.request_timeout,
    ));
    let announcer = Announcer::new(speaker, translator, language, config.speech_gap);

    let frames = build_frames(&config)?;

    // Set up shutdown signal
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let daemon = Daemon::new(config, backend, announcer);
    daemon.run(frames, shutdown_rx).await?;

    Ok(())
}

/// Pick the announcement language: CLI override, then profile, then English
async fn resolve_language(
    config: &Config,
    backend: &Arc<BackendClient>,
    override_code: Option<&str>,
) -> String {
    if let Some(code) = override_code {
        if profile::is_supported_language(code) {
            return code.to_string();
        }
        tracing::warn!(code, "unsupported language override, using profile");
    }

    let store = ProfileStore::new(Arc::clone(backend), &config.data_dir);
    let stored = store.load().await.language;
    if profile::is_supported_language(&stored) {
        stored
    } else {
        tracing::warn!(language = %stored, "unsupported profile language, using English");
        SOURCE_LANGUAGE.to_string()
    }
}

fn build_speaker(backend: &Arc<BackendClient>, no_audio: bool) -> drishti::Result<Arc<dyn Speaker>> {
    if no_audio {
        return Ok(Arc::new(NullSpeaker));
    }
    let sink = Arc::new(CpalSink::new()?);
    Ok(Arc::new(SpeechClient::new(Arc::clone(backend), sink)))
}

fn build_frames(config: &Config) -> anyhow::Result<Box<dyn FrameSource>> {
    if let Some(dir) = &config.frames_dir {
        return Ok(Box::new(FileSource::new(dir, config.loop_frames)?));
    }

    #[cfg(feature = "camera-v4l2")]
    {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let fps = (1.0 / config.frame_interval.as_secs_f64()).round() as u32;
        let source = drishti::V4l2Source::open(&config.camera_device, 640, 480, fps.max(1))?;
        Ok(Box::new(source))
    }

    #[cfg(not(feature = "camera-v4l2"))]
    anyhow::bail!(
        "no frame source: pass --frames-dir, or build with the camera-v4l2 feature for {}",
        config.camera_device
    )
}

/// Show backend model readiness
async fn cmd_status(backend: &BackendClient) -> anyhow::Result<()> {
    let status = backend.model_status().await?;
    if status.is_ready {
        println!("Backend models: ready");
    } else {
        println!("Backend models: not ready");
    }
    if let Some(message) = status.message {
        println!("{message}");
    }
    Ok(())
}

/// Speak one phrase through the queue, then drain and exit
async fn cmd_say(
    config: &Config,
    backend: &Arc<BackendClient>,
    language_override: Option<&str>,
    no_audio: bool,
    text: String,
) -> anyhow::Result<()> {
    let language = resolve_language(config, backend, language_override).await;
    let speaker = build_speaker(backend, no_audio)?;
    let translator = Arc::new(MbartTranslator::new(
        Arc::clone(backend),
        config.translate_warmup_timeout,
        config.request_timeout,
    ));
    let announcer = Announcer::new(speaker, translator, language, config.speech_gap);

    announcer.enqueue_forced(text);
    if !announcer.wait_idle(Duration::from_secs(180)).await {
        anyhow::bail!("announcement did not finish");
    }
    announcer.shutdown().await;
    Ok(())
}

/// Show or edit the stored profile
async fn cmd_profile(
    config: &Config,
    backend: &Arc<BackendClient>,
    action: ProfileCommand,
) -> anyhow::Result<()> {
    let store = ProfileStore::new(Arc::clone(backend), &config.data_dir);

    match action {
        ProfileCommand::Show => {
            let p = store.load().await;
            let language = profile::language_name(&p.language).unwrap_or(&p.language);
            println!("Name:      {}", p.name);
            println!("Phone:     {}", p.phone);
            println!("Language:  {language} ({})", p.language);
            println!("Emergency contact:");
            println!("  Name:         {}", p.emergency_contact.name);
            println!("  Relationship: {}", p.emergency_contact.relationship);
            println!("  Phone:        {}", p.emergency_contact.phone);
        }
        ProfileCommand::Set {
            name,
            phone,
            language,
            contact_name,
            contact_relationship,
            contact_phone,
        } => {
            if let Some(ref code) = language {
                if !profile::is_supported_language(code) {
                    anyhow::bail!(
                        "unsupported language {code:?}; supported: {}",
                        profile::LANGUAGES
                            .iter()
                            .map(|(c, _)| *c)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }

            let mut p = store.load().await;
            if let Some(v) = name {
                p.name = v;
            }
            if let Some(v) = phone {
                p.phone = v;
            }
            if let Some(v) = language {
                p.language = v;
            }
            if let Some(v) = contact_name {
                p.emergency_contact.name = v;
            }
            if let Some(v) = contact_relationship {
                p.emergency_contact.relationship = v;
            }
            if let Some(v) = contact_phone {
                p.emergency_contact.phone = v;
            }

            store.save(&p).await?;
            println!("Profile saved");
        }
    }

    Ok(())
}

/// Play a short tone through the same audio path announcements use
fn cmd_test_speaker() -> anyhow::Result<()> {
    const TONE_HZ: f32 = 440.0;
    const TONE_SECS: f32 = 2.0;

    println!("Playing a {TONE_HZ} Hz tone for {TONE_SECS} seconds...");

    let sink = CpalSink::new()?;
    let tone = playback::sine_tone(TONE_HZ, TONE_SECS, 0.2);
    sink.play_samples(tone, &AtomicBool::new(false))?;

    println!("Tone finished.");
    println!("Silence means announcements will be silent too: check the");
    println!("system's default output device and its volume before running.");

    Ok(())
}
