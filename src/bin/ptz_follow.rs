//! ptz_follow - keep one subject in view from relayed detections.
//!
//! Subscribes to the detections and control topics, runs the follow engine
//! once per frame and publishes the result:
//! - virtual mode: a 9:16 crop rectangle on the ptz topic
//! - gimbal mode: a pan/tilt offset on the gimbal topic
//!
//! Detections can also be read from a local source (`--source stub://walk`
//! or a JSON-lines recording) instead of the broker.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use ptz_follow::config::{FollowConfig, TopicSettings, VideoSettings};
use ptz_follow::relay::mqtt::{connect_mqtt, MqttRuntime};
use ptz_follow::relay::payload::{decode_control, decode_frame, encode_command};
use ptz_follow::{
    open_source, DetectionSource, DetectionStream, FollowCommand, FollowController, FollowMode,
    FrameDetections, Mailbox, MailboxSource, PtzState, SharedPtz, VirtualPtz,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Follow a subject with a virtual PTZ crop or a gimbal")]
struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "PTZ_CONFIG")]
    config: Option<PathBuf>,

    /// Follow mode override (virtual|gimbal).
    #[arg(long)]
    mode: Option<String>,

    /// MQTT broker address override.
    #[arg(long)]
    mqtt_broker_addr: Option<String>,

    /// Allow non-loopback MQTT connections.
    #[arg(long, env = "PTZ_ALLOW_REMOTE_MQTT")]
    allow_remote_mqtt: bool,

    /// Read detections from a local source instead of the detections topic
    /// (`stub://<name>` or a recording path).
    #[arg(long)]
    source: Option<String>,

    /// Frame limit for the synthetic source.
    #[arg(long)]
    max_frames: Option<u64>,

    /// How long the frame loop waits for a relayed frame before re-checking
    /// for shutdown, in milliseconds.
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = FollowConfig::load_from(args.config.as_deref())?;
    if let Some(mode) = args.mode.as_deref() {
        cfg.mode = mode.parse()?;
    }
    if let Some(addr) = args.mqtt_broker_addr.clone() {
        cfg.mqtt.broker_addr = addr;
    }
    cfg.mqtt.allow_remote |= args.allow_remote_mqtt;

    let shared = SharedPtz::new(VirtualPtz::new(PtzState::new(cfg.ptz.zoom_limits()?)));
    let mut controller = FollowController::new(cfg.mode, shared.clone(), cfg.gimbal.fov()?);
    let detections: Mailbox<FrameDetections> = Mailbox::new();
    let topics = cfg.mqtt.topics.clone();

    let mut subscriptions = vec![topics.control.clone()];
    if args.source.is_none() {
        subscriptions.push(topics.detections.clone());
    }
    let (client, connection) = connect_mqtt(&cfg.mqtt, "follow")?;
    let runtime = {
        let router = InboundRouter {
            topics: topics.clone(),
            video: cfg.video,
            detections: detections.clone(),
            shared: shared.clone(),
        };
        MqttRuntime::start(client, connection, subscriptions, move |topic, payload| {
            router.route(topic, payload)
        })
    };

    let source: Box<dyn DetectionSource> = match args.source.as_deref() {
        Some(uri) => open_source(uri, cfg.video.width, cfg.video.height, args.max_frames)?,
        None => Box::new(MailboxSource::new(
            detections.clone(),
            Duration::from_millis(args.poll_ms.max(1)),
        )),
    };
    let mut stream = DetectionStream::new(source);
    {
        let cancel = stream.cancel_token();
        let detections = detections.clone();
        ctrlc::set_handler(move || {
            log::info!("Shutdown requested");
            cancel.cancel();
            detections.close();
        })?;
    }

    let command_topic = match cfg.mode {
        FollowMode::Virtual => topics.ptz.clone(),
        FollowMode::Gimbal => topics.gimbal.clone(),
    };
    log::info!(
        "Following in {} mode: {} -> {}",
        cfg.mode,
        args.source.as_deref().unwrap_or(&topics.detections),
        command_topic
    );

    for frame in stream.by_ref() {
        let command = controller.process(&frame);
        log_command(&command);
        match encode_command(&command) {
            Ok(payload) => {
                runtime.publish_latest(&command_topic, payload, true);
            }
            Err(e) => log::warn!("Failed to encode command: {}", e),
        }
    }

    stream.close();
    detections.close();
    log::info!(
        "Processed {} frames ({} relayed frames superseded before use)",
        controller.frames_processed(),
        detections.stats().superseded
    );
    runtime.shutdown();
    Ok(())
}

fn log_command(command: &FollowCommand) {
    match command {
        FollowCommand::Crop {
            rect,
            zoom,
            target_id,
        } => log::debug!(
            "crop x={} y={} w={} h={} zoom={:.2} target={:?}",
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            zoom,
            target_id
        ),
        FollowCommand::Gimbal(cmd) => log::debug!(
            "gimbal pan={:.3} tilt={:.3}",
            cmd.pan_degrees,
            cmd.tilt_degrees
        ),
    }
}

/// Dispatches inbound publishes on the MQTT connection thread.
struct InboundRouter {
    topics: TopicSettings,
    video: VideoSettings,
    detections: Mailbox<FrameDetections>,
    shared: SharedPtz,
}

impl InboundRouter {
    fn route(&self, topic: &str, payload: &[u8]) {
        if topic == self.topics.control {
            match decode_control(payload) {
                Ok(Some(event)) => {
                    let state = self.shared.apply_event(event);
                    log::info!(
                        "Operator {} -> zoom {:.2}, target {:?}",
                        event,
                        state.zoom(),
                        state.target_id()
                    );
                }
                Ok(None) => {}
                Err(e) => log::warn!("Dropping control payload: {:#}", e),
            }
        } else if topic == self.topics.detections {
            match decode_frame(payload, self.video.width, self.video.height) {
                Ok(frame) => {
                    self.detections.publish(frame);
                }
                Err(e) => log::warn!("Dropping detections payload: {:#}", e),
            }
        } else {
            log::debug!("Ignoring publish on {}", topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> InboundRouter {
        InboundRouter {
            topics: TopicSettings {
                detections: "ptz/detections".to_string(),
                ptz: "ptz/crop".to_string(),
                gimbal: "ptz/gimbal".to_string(),
                control: "ptz/control".to_string(),
            },
            video: VideoSettings {
                width: 1280,
                height: 720,
            },
            detections: Mailbox::new(),
            shared: SharedPtz::default(),
        }
    }

    #[test]
    fn routes_detections_into_mailbox() {
        let router = router();
        router.route(
            "ptz/detections",
            br#"{"detections": [{"box": [0, 0, 4, 4], "id": 3}]}"#,
        );
        let frame = router.detections.take().unwrap();
        assert_eq!((frame.width, frame.height), (1280, 720));
        assert!(frame.find_track(3).is_some());
    }

    #[test]
    fn drops_malformed_payloads() {
        let router = router();
        router.route("ptz/detections", b"{");
        router.route("ptz/control", br#"{"event": 5}"#);
        router.route("elsewhere", b"ignored");
        assert!(router.detections.take().is_none());
        assert_eq!(router.shared.snapshot(), PtzState::default());
    }

    #[test]
    fn applies_control_events() {
        let router = router();
        router.route("ptz/control", br#"{"direction": "up", "action": "pressed"}"#);
        assert!((router.shared.snapshot().zoom() - 1.2).abs() < 1e-9);
    }
}
