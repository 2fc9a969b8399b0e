//! ptz_joystick - operator input for the follow engine.
//!
//! Events given on the command line are sent once; otherwise each line of
//! stdin is read as `<event>` (`zoom_in`, `cycle_next`, ...) or
//! `<direction> <action>` (`up pressed`, `left held`). Released keys send
//! nothing.

use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;

use ptz_follow::config::FollowConfig;
use ptz_follow::ptz::parse_operator_input;
use ptz_follow::relay::mqtt::{connect_mqtt, MqttRuntime};
use ptz_follow::relay::payload::encode_control;
use ptz_follow::PtzEvent;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send manual PTZ events to the follow engine")]
struct Args {
    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "PTZ_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker address override.
    #[arg(long)]
    mqtt_broker_addr: Option<String>,

    /// Allow non-loopback MQTT connections.
    #[arg(long, env = "PTZ_ALLOW_REMOTE_MQTT")]
    allow_remote_mqtt: bool,

    /// Events to send, then exit (reads stdin when empty).
    events: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = FollowConfig::load_from(args.config.as_deref())?;
    if let Some(addr) = args.mqtt_broker_addr.clone() {
        cfg.mqtt.broker_addr = addr;
    }
    cfg.mqtt.allow_remote |= args.allow_remote_mqtt;
    let topic = cfg.mqtt.topics.control.clone();

    // parse everything up front so a typo sends nothing
    let queued = args
        .events
        .iter()
        .map(|event| event.parse::<PtzEvent>())
        .collect::<Result<Vec<_>>>()?;

    let (client, connection) = connect_mqtt(&cfg.mqtt, "joystick")?;
    let runtime = MqttRuntime::start(client, connection, Vec::new(), |_, _| {});
    let send = |event: PtzEvent| match encode_control(event) {
        Ok(payload) => {
            if runtime.publish_latest(&topic, payload, false) {
                log::info!("Sent {}", event);
            } else {
                log::warn!("Dropped {} (MQTT request queue full)", event);
            }
        }
        Err(e) => log::warn!("Failed to encode {}: {}", event, e),
    };

    if !queued.is_empty() {
        queued.into_iter().for_each(send);
    } else {
        log::info!("Reading operator events from stdin ({})", topic);
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            match parse_operator_input(&line) {
                Ok(Some(event)) => send(event),
                Ok(None) => {}
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    runtime.shutdown();
    Ok(())
}
