//! Listen for OSC datagrams and log every message, e.g. to check what
//! pose2osc is sending before wiring up a real receiver.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rosc::{decoder, OscPacket};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print incoming OSC messages", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5005")]
    listen: String,
}

fn log_packet(packet: &OscPacket, from: std::net::SocketAddr) {
    match packet {
        OscPacket::Message(msg) => {
            let args: Vec<String> = msg.args.iter().map(|a| format!("{:?}", a)).collect();
            info!("{} {} {}", from, msg.addr, args.join(", "));
        }
        OscPacket::Bundle(bundle) => {
            for inner in &bundle.content {
                log_packet(inner, from);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind(&args.listen)
        .with_context(|| format!("failed to bind {}", args.listen))?;
    // Wake up periodically to notice Ctrl+C.
    socket.set_read_timeout(Some(Duration::from_millis(250)))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;

    info!("listening on {}", args.listen);

    let mut buf = [0u8; decoder::MTU];
    while !shutdown.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("receive failed"),
        };
        match decoder::decode_udp(&buf[..len]) {
            Ok((_, packet)) => log_packet(&packet, from),
            Err(e) => warn!("{} sent {} bytes that are not OSC: {:?}", from, len, e),
        }
    }

    info!("bye");
    Ok(())
}
