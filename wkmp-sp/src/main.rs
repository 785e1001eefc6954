//! Stream Player (wkmp-sp) - Main entry point
//!
//! Plays Ogg Opus files in order on the configured output device. Each
//! track is primed with a queued start before it is made audible.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wkmp_sp::audio::{CpalOutput, OpusFiles};
use wkmp_sp::{Config, Error, StreamPlayer};

/// Upper bound for priming one track
const QUEUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Command-line arguments for wkmp-sp
#[derive(Parser, Debug)]
#[command(name = "wkmp-sp")]
#[command(about = "Ogg Opus stream player for WKMP")]
#[command(version)]
struct Args {
    /// Config file path (overrides WKMP_SP_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Loop each track (a looping track plays until interrupted)
    #[arg(short = 'l', long = "loop")]
    looping: bool,

    /// Volume, 0-255
    #[arg(short, long)]
    volume: Option<u8>,

    /// Output device name
    #[arg(short, long, env = "WKMP_SP_DEVICE")]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Ogg Opus files to play
    #[arg(required_unless_present = "list_devices")]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config file lookup logs through a bootstrap subscriber; the level it
    // configures applies from then on
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wkmp_sp=info,wkmp_common=info".into()),
        )
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || Config::load(args.config.clone()))
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wkmp_sp={0},wkmp_common={0}", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in CpalOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    if let Some(device) = args.device {
        config.output.device = Some(device);
    }
    if let Some(volume) = args.volume {
        config.player.initial_volume = volume;
    }

    info!("Starting WKMP Stream Player ({} tracks)", args.files.len());

    let output = Arc::new(CpalOutput::new(&config.output));
    let mut player = StreamPlayer::new(output, Arc::new(OpusFiles), config.player.clone());
    player.init().context("Failed to initialize stream player")?;
    player.queue_enable();

    let mut played = 0;
    for file in &args.files {
        match player.play(file, args.looping) {
            Ok(()) => {}
            Err(e @ Error::Open { .. }) => {
                warn!("Skipping track: {}", e);
                continue;
            }
            Err(e) => bail!("Cannot play {}: {}", file.display(), e),
        }

        if let Err(e) = player.queue_wait_timeout(QUEUE_TIMEOUT) {
            warn!("{} did not become ready: {}", file.display(), e);
            continue;
        }
        if let Err(e) = player.queue_go() {
            warn!("{} could not be started: {}", file.display(), e);
            continue;
        }
        played += 1;

        // Returns once the track has ended and the player is idle again
        player.wait_start().context("Stream worker stopped")?;
    }

    player.shutdown();
    info!("Played {} of {} tracks", played, args.files.len());

    if played == 0 {
        bail!("No tracks could be played");
    }
    Ok(())
}
