use clap::Parser;

use pose2osc::camera;

/// List camera indices OpenCV can open, for `camera.index` / `--camera`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Probe indices 0..max
    #[arg(short, long, default_value_t = 5)]
    max: i32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    println!("=== camera probe ===");
    let found = camera::probe(args.max);
    if found.is_empty() {
        println!("no cameras found below index {}", args.max);
        return;
    }
    for (index, size) in found {
        println!("index {}: {}x{}", index, size.width, size.height);
    }
}
