//! OSC output: report-space transform, message layout and UDP transmission.
//!
//! Every value goes out as its own datagram. There is no acknowledgment,
//! ordering or retry; a failed send is logged and counted.

use anyhow::{Context, Result};
use log::{trace, warn};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::pose::{FrameSize, Keypoint, KeypointIndex, Pose};

/// Joints below this activation are not sent.
pub const CONFIDENCE_FLOOR: f32 = -1.0;

/// OSC address layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStyle {
    /// `/landmark-{i}-x`, `/landmark-{i}-y`, `/landmark-{i}-z`
    #[default]
    Indexed,
    /// `/p1/{name}` [x, y, z], then `/p1/{name}:tx`, `:ty`, `:tz`
    Named,
}

/// Map a pixel keypoint into the receiver's space
///
/// x is normalized to [0, 1]; y is normalized, flipped so up is positive and
/// divided by the frame aspect (height / width).
pub fn report_coordinates(kp: &Keypoint, frame: FrameSize) -> (f32, f32) {
    let x = kp.x / frame.width as f32;
    let y = kp.y / frame.height as f32;
    (x, (1.0 - y) / frame.aspect())
}

fn message(addr: String, args: Vec<OscType>) -> OscMessage {
    OscMessage { addr, args }
}

/// `/image-width`, `/image-height`, `/numLandmarks`
pub fn build_frame_info_messages(frame: FrameSize) -> Vec<OscMessage> {
    vec![
        message("/image-width".to_string(), vec![OscType::Int(frame.width as i32)]),
        message("/image-height".to_string(), vec![OscType::Int(frame.height as i32)]),
        message("/numLandmarks".to_string(), vec![OscType::Int(KeypointIndex::COUNT as i32)]),
    ]
}

/// Messages for one joint; x/y already in report space, z is the confidence
pub fn build_landmark_messages(
    index: KeypointIndex,
    x: f32,
    y: f32,
    z: f32,
    style: AddressStyle,
) -> Vec<OscMessage> {
    match style {
        AddressStyle::Indexed => {
            let i = index as usize;
            vec![
                message(format!("/landmark-{}-x", i), vec![OscType::Float(x)]),
                message(format!("/landmark-{}-y", i), vec![OscType::Float(y)]),
                message(format!("/landmark-{}-z", i), vec![OscType::Float(z)]),
            ]
        }
        AddressStyle::Named => {
            let name = index.osc_name();
            vec![
                message(
                    format!("/p1/{}", name),
                    vec![OscType::Float(x), OscType::Float(y), OscType::Float(z)],
                ),
                message(format!("/p1/{}:tx", name), vec![OscType::Float(x)]),
                message(format!("/p1/{}:ty", name), vec![OscType::Float(y)]),
                message(format!("/p1/{}:tz", name), vec![OscType::Float(z)]),
            ]
        }
    }
}

/// Everything sent for one frame, in transmission order
pub fn build_pose_messages(frame: FrameSize, pose: &Pose, style: AddressStyle) -> Vec<OscMessage> {
    let mut messages = build_frame_info_messages(frame);
    for (index, kp) in pose.iter() {
        if kp.confidence < CONFIDENCE_FLOOR {
            continue;
        }
        let (x, y) = report_coordinates(kp, frame);
        messages.extend(build_landmark_messages(index, x, y, kp.confidence, style));
    }
    messages
}

pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// Per-frame transmission result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
    pub sent: usize,
    pub failed: usize,
}

/// Fire-and-forget OSC client
pub struct OscSender {
    socket: UdpSocket,
    target: SocketAddr,
    style: AddressStyle,
}

impl OscSender {
    /// Bind an ephemeral local socket and resolve `target` ("host:port")
    pub fn new(target: &str, style: AddressStyle) -> Result<Self> {
        let target = target
            .to_socket_addrs()
            .with_context(|| format!("invalid OSC target '{}'", target))?
            .next()
            .with_context(|| format!("OSC target '{}' did not resolve", target))?;
        let bind_addr = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr).context("failed to create UDP socket")?;
        Ok(Self { socket, target, style })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn style(&self) -> AddressStyle {
        self.style
    }

    /// Send one message as one datagram
    pub fn send(&self, msg: &OscMessage) -> Result<()> {
        let data = encode_osc_message(msg)?;
        self.socket
            .send_to(&data, self.target)
            .with_context(|| format!("send {} to {}", msg.addr, self.target))?;
        Ok(())
    }

    /// Send a list of messages, logging failures instead of returning them
    pub fn send_all(&self, messages: &[OscMessage]) -> SendStats {
        let mut stats = SendStats::default();
        for msg in messages {
            match self.send(msg) {
                Ok(()) => {
                    trace!("{} {:?}", msg.addr, msg.args);
                    stats.sent += 1;
                }
                Err(e) => {
                    // Only the first failure per batch is worth a line.
                    if stats.failed == 0 {
                        warn!("OSC send failed: {:#}", e);
                    }
                    stats.failed += 1;
                }
            }
        }
        stats
    }

    /// Frame metadata followed by every joint above the floor
    pub fn publish(&self, frame: FrameSize, pose: &Pose) -> SendStats {
        self.send_all(&build_pose_messages(frame, pose, self.style))
    }
}
