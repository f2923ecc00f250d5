//! Send a slowly wandering synthetic pose in the pose2osc message format,
//! for testing a receiver without a camera or model.

use anyhow::Result;
use clap::Parser;
use log::info;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pose2osc::osc::{AddressStyle, OscSender};
use pose2osc::pose::{FrameSize, Keypoint, KeypointIndex, Pose};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send random-walk pose data over OSC", long_about = None)]
struct Args {
    /// OSC receiver "host:port"
    #[arg(short, long, default_value = "127.0.0.1:5005")]
    target: String,

    /// Use /p1/{name} addresses
    #[arg(long)]
    named: bool,

    /// Delay between frames in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many frames (0 = until Ctrl+C)
    #[arg(short, long, default_value_t = 0)]
    frames: u64,
}

const FRAME: FrameSize = FrameSize { width: 640, height: 480 };

fn random_pose(rng: &mut impl Rng) -> Pose {
    let keypoints = std::array::from_fn(|_| {
        Keypoint::new(
            rng.gen_range(0.0..FRAME.width as f32),
            rng.gen_range(0.0..FRAME.height as f32),
            rng.gen_range(-5.0..5.0),
        )
    });
    Pose::new(keypoints)
}

/// Move every joint up to 10 px and the confidence up to 1.0, clamped to the frame
fn wander(pose: &mut Pose, rng: &mut impl Rng) {
    for kp in pose.keypoints.iter_mut() {
        kp.x = (kp.x + rng.gen_range(-10.0..10.0)).clamp(0.0, FRAME.width as f32);
        kp.y = (kp.y + rng.gen_range(-10.0..10.0)).clamp(0.0, FRAME.height as f32);
        kp.confidence = (kp.confidence + rng.gen_range(-1.0..1.0)).clamp(-10.0, 10.0);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let style = if args.named { AddressStyle::Named } else { AddressStyle::Indexed };
    let sender = OscSender::new(&args.target, style)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;

    let mut rng = rand::thread_rng();
    let mut pose = random_pose(&mut rng);
    info!("sending {} landmarks to {} every {} ms", KeypointIndex::COUNT, sender.target(), args.interval_ms);

    let mut step = 0u64;
    while !shutdown.load(Ordering::Relaxed) && (args.frames == 0 || step < args.frames) {
        step += 1;
        wander(&mut pose, &mut rng);
        let stats = sender.publish(FRAME, &pose);
        let nose = pose.get(KeypointIndex::Nose);
        info!(
            "step {} sent {} (failed {}) nose=({:.1}, {:.1}, {:.2})",
            step, stats.sent, stats.failed, nose.x, nose.y, nose.confidence
        );
        std::thread::sleep(Duration::from_millis(args.interval_ms));
    }

    Ok(())
}
