use anyhow::Result;
use clap::Parser;
use log::info;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pose2osc::app;
use pose2osc::config::{Config, DEFAULT_CONFIG_PATH};
use pose2osc::osc::AddressStyle;

/// Stream single-person pose keypoints from a camera as OSC over UDP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file; missing file means defaults
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// OSC receiver "host:port"
    #[arg(short, long)]
    target: Option<String>,

    /// Camera device index
    #[arg(long)]
    camera: Option<i32>,

    /// Play a video file instead of a camera
    #[arg(long, conflicts_with = "camera")]
    video: Option<PathBuf>,

    /// Restart the video file when it ends
    #[arg(long = "loop")]
    loop_playback: bool,

    /// ONNX model path
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// OSC address layout
    #[arg(long, value_parser = parse_style)]
    style: Option<AddressStyle>,

    /// Run without the preview window
    #[arg(long)]
    no_preview: bool,
}

fn parse_style(s: &str) -> Result<AddressStyle, String> {
    match s {
        "indexed" => Ok(AddressStyle::Indexed),
        "named" => Ok(AddressStyle::Named),
        other => Err(format!("unknown address style '{}' (indexed|named)", other)),
    }
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(target) = self.target {
            config.osc.target = target;
        }
        if let Some(style) = self.style {
            config.osc.address_style = style;
        }
        if let Some(index) = self.camera {
            config.camera.index = index;
            config.camera.file = None;
        }
        if let Some(video) = self.video {
            config.camera.file = Some(video);
        }
        if self.loop_playback {
            config.camera.loop_playback = true;
        }
        if let Some(model) = self.model {
            config.model.path = model;
        }
        if self.no_preview {
            config.preview.enabled = false;
        }
        config
    }
}

/// SIGINT/SIGTERM set the returned flag; a second one exits at once.
fn install_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        // Must be registered before the flag setter so it sees the old value.
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown))?;
        signal_hook::flag::register(signal, Arc::clone(&shutdown))?;
    }
    Ok(shutdown)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config)?;
    let config = args.apply(config);

    info!("Starting pose2osc ({})", env!("GIT_VERSION"));
    info!("source: {}, model: {}", config.camera.source(), config.model.path.display());

    let shutdown = install_shutdown_flag()?;

    let summary = app::run(&config, &shutdown)?;
    info!(
        "stopped ({:?}) after {} frames, {} failed sends",
        summary.reason, summary.frames, summary.send_failures
    );
    info!("Bye!");
    Ok(())
}
