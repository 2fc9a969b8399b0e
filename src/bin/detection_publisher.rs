//! detection_publisher - detector-side stand-in for the follow engine.
//!
//! Publishes frame detection sets at a fixed rate to the detections topic,
//! from a synthetic scene (`stub://walk`) or a JSON-lines recording, and logs
//! the most recent PTZ state the follow engine publishes back.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ptz_follow::config::FollowConfig;
use ptz_follow::relay::mqtt::{connect_mqtt, MqttRuntime};
use ptz_follow::relay::payload::{decode_gimbal, decode_ptz, encode_detections, PtzPayload};
use ptz_follow::{open_source, DetectionStream, GimbalCommand, Mailbox};

#[derive(Parser, Debug)]
#[command(author, version, about = "Publish detections for the PTZ follow engine")]
struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "PTZ_CONFIG")]
    config: Option<PathBuf>,

    /// Detection source: `stub://<name>` or a recording path.
    #[arg(long, env = "PTZ_DETECTION_SOURCE", default_value = "stub://walk")]
    source: String,

    /// Frames per second to publish.
    #[arg(long, default_value_t = 15)]
    fps: u32,

    /// Stop after this many frames (synthetic source only).
    #[arg(long)]
    max_frames: Option<u64>,

    /// MQTT broker address override.
    #[arg(long)]
    mqtt_broker_addr: Option<String>,

    /// Allow non-loopback MQTT connections.
    #[arg(long, env = "PTZ_ALLOW_REMOTE_MQTT")]
    allow_remote_mqtt: bool,

    /// Seconds between logs of the received PTZ state.
    #[arg(long, default_value_t = 2)]
    report_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = FollowConfig::load_from(args.config.as_deref())?;
    if let Some(addr) = args.mqtt_broker_addr.clone() {
        cfg.mqtt.broker_addr = addr;
    }
    cfg.mqtt.allow_remote |= args.allow_remote_mqtt;
    let topics = cfg.mqtt.topics.clone();

    let crops: Mailbox<PtzPayload> = Mailbox::new();
    let gimbal: Mailbox<GimbalCommand> = Mailbox::new();
    let (client, connection) = connect_mqtt(&cfg.mqtt, "publisher")?;
    let runtime = {
        let topics = topics.clone();
        let crops = crops.clone();
        let gimbal = gimbal.clone();
        MqttRuntime::start(
            client,
            connection,
            vec![topics.ptz.clone(), topics.gimbal.clone()],
            move |topic, payload| {
                if topic == topics.ptz {
                    match decode_ptz(payload) {
                        Ok(ptz) => {
                            crops.publish(ptz);
                        }
                        Err(e) => log::warn!("Dropping ptz payload: {:#}", e),
                    }
                } else if topic == topics.gimbal {
                    match decode_gimbal(payload) {
                        Ok(cmd) => {
                            gimbal.publish(cmd);
                        }
                        Err(e) => log::warn!("Dropping gimbal payload: {:#}", e),
                    }
                }
            },
        )
    };

    let source = open_source(
        &args.source,
        cfg.video.width,
        cfg.video.height,
        args.max_frames,
    )?;
    let mut stream = DetectionStream::new(source);
    let cancel = stream.cancel_token();
    ctrlc::set_handler(move || cancel.cancel())?;

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let report_interval = Duration::from_secs(args.report_secs.max(1));
    let mut last_report = Instant::now();
    log::info!(
        "Publishing {} to {} at {} fps",
        args.source,
        topics.detections,
        args.fps.max(1)
    );

    let mut published = 0u64;
    for frame in stream.by_ref() {
        let started = Instant::now();
        match encode_detections(&frame) {
            Ok(payload) => {
                if runtime.publish_latest(&topics.detections, payload, false) {
                    published += 1;
                }
            }
            Err(e) => log::warn!("Failed to encode detections: {}", e),
        }

        if last_report.elapsed() >= report_interval {
            last_report = Instant::now();
            report(&crops, &gimbal);
        }
        if let Some(rest) = frame_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    stream.close();
    log::info!(
        "Published {} of {} frames",
        published,
        stream.frames_yielded()
    );
    report(&crops, &gimbal);
    runtime.shutdown();
    Ok(())
}

fn report(crops: &Mailbox<PtzPayload>, gimbal: &Mailbox<GimbalCommand>) {
    if let Some(ptz) = crops.take() {
        log::info!(
            "PTZ crop x={} y={} w={} h={} zoom={:.2} target={:?}",
            ptz.x,
            ptz.y,
            ptz.w,
            ptz.h,
            ptz.zoom,
            ptz.target_id
        );
    }
    if let Some(cmd) = gimbal.take() {
        log::info!(
            "Gimbal pan={:.2} tilt={:.2}",
            cmd.pan_degrees,
            cmd.tilt_degrees
        );
    }
}
