use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::controller::FollowMode;
use crate::ptz::{GimbalFov, ZoomLimits, DEFAULT_MAX_ZOOM, DEFAULT_ZOOM_STEP};
use crate::relay::mqtt::BrokerEndpoint;

const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:1883";
const DEFAULT_CLIENT_ID: &str = "ptz-follow";
const DEFAULT_DETECTIONS_TOPIC: &str = "ptz/detections";
const DEFAULT_PTZ_TOPIC: &str = "ptz/crop";
const DEFAULT_GIMBAL_TOPIC: &str = "ptz/gimbal";
const DEFAULT_CONTROL_TOPIC: &str = "ptz/control";
const DEFAULT_FRAME_WIDTH: u32 = 1920;
const DEFAULT_FRAME_HEIGHT: u32 = 1080;
const DEFAULT_PAN_RANGE_DEG: f64 = 60.0;
const DEFAULT_TILT_RANGE_DEG: f64 = 45.0;

#[derive(Debug, Deserialize, Default)]
struct FollowConfigFile {
    mode: Option<FollowMode>,
    mqtt: Option<MqttConfigFile>,
    video: Option<VideoConfigFile>,
    ptz: Option<PtzConfigFile>,
    gimbal: Option<GimbalConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct MqttConfigFile {
    broker_addr: Option<String>,
    client_id: Option<String>,
    allow_remote: Option<bool>,
    username: Option<String>,
    password: Option<String>,
    use_tls: Option<bool>,
    tls_ca_path: Option<PathBuf>,
    tls_client_cert_path: Option<PathBuf>,
    tls_client_key_path: Option<PathBuf>,
    topics: Option<TopicConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TopicConfigFile {
    detections: Option<String>,
    ptz: Option<String>,
    gimbal: Option<String>,
    control: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PtzConfigFile {
    max_zoom: Option<f64>,
    zoom_step: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct GimbalConfigFile {
    pan_range_deg: Option<f64>,
    tilt_range_deg: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FollowConfig {
    pub mode: FollowMode,
    pub mqtt: MqttSettings,
    pub video: VideoSettings,
    pub ptz: PtzSettings,
    pub gimbal: GimbalSettings,
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub broker_addr: String,
    pub client_id: String,
    pub allow_remote: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub tls_ca_path: Option<PathBuf>,
    pub tls_client_cert_path: Option<PathBuf>,
    pub tls_client_key_path: Option<PathBuf>,
    pub topics: TopicSettings,
}

impl MqttSettings {
    /// Client id for one process of the system; brokers drop duplicate ids.
    pub fn client_id_for(&self, role: &str) -> String {
        format!("{}-{}", self.client_id, role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSettings {
    pub detections: String,
    pub ptz: String,
    pub gimbal: String,
    pub control: String,
}

/// Frame size assumed for detections that do not carry their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtzSettings {
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl PtzSettings {
    pub fn zoom_limits(&self) -> Result<ZoomLimits> {
        ZoomLimits::new(self.max_zoom, self.zoom_step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GimbalSettings {
    pub pan_range_deg: f64,
    pub tilt_range_deg: f64,
}

impl GimbalSettings {
    pub fn fov(&self) -> Result<GimbalFov> {
        GimbalFov::new(self.pan_range_deg, self.tilt_range_deg)
    }
}

impl FollowConfig {
    /// Load from the file named by `PTZ_CONFIG` (if set), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PTZ_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty());
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => FollowConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FollowConfigFile) -> Self {
        let mqtt = file.mqtt.unwrap_or_default();
        let topics = mqtt.topics.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let ptz = file.ptz.unwrap_or_default();
        let gimbal = file.gimbal.unwrap_or_default();

        Self {
            mode: file.mode.unwrap_or_default(),
            mqtt: MqttSettings {
                broker_addr: mqtt
                    .broker_addr
                    .unwrap_or_else(|| DEFAULT_BROKER_ADDR.to_string()),
                client_id: mqtt
                    .client_id
                    .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
                allow_remote: mqtt.allow_remote.unwrap_or(false),
                username: mqtt.username,
                password: mqtt.password,
                use_tls: mqtt.use_tls.unwrap_or(false),
                tls_ca_path: mqtt.tls_ca_path,
                tls_client_cert_path: mqtt.tls_client_cert_path,
                tls_client_key_path: mqtt.tls_client_key_path,
                topics: TopicSettings {
                    detections: topics
                        .detections
                        .unwrap_or_else(|| DEFAULT_DETECTIONS_TOPIC.to_string()),
                    ptz: topics
                        .ptz
                        .unwrap_or_else(|| DEFAULT_PTZ_TOPIC.to_string()),
                    gimbal: topics
                        .gimbal
                        .unwrap_or_else(|| DEFAULT_GIMBAL_TOPIC.to_string()),
                    control: topics
                        .control
                        .unwrap_or_else(|| DEFAULT_CONTROL_TOPIC.to_string()),
                },
            },
            video: VideoSettings {
                width: video.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                height: video.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
            },
            ptz: PtzSettings {
                max_zoom: ptz.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM),
                zoom_step: ptz.zoom_step.unwrap_or(DEFAULT_ZOOM_STEP),
            },
            gimbal: GimbalSettings {
                pan_range_deg: gimbal.pan_range_deg.unwrap_or(DEFAULT_PAN_RANGE_DEG),
                tilt_range_deg: gimbal.tilt_range_deg.unwrap_or(DEFAULT_TILT_RANGE_DEG),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("PTZ_MQTT_BROKER_ADDR") {
            if !addr.trim().is_empty() {
                self.mqtt.broker_addr = addr;
            }
        }
        if let Ok(mode) = std::env::var("PTZ_MODE") {
            if !mode.trim().is_empty() {
                self.mode = mode.parse()?;
            }
        }
        if let Some(width) = env_number::<u32>("PTZ_FRAME_WIDTH")? {
            self.video.width = width;
        }
        if let Some(height) = env_number::<u32>("PTZ_FRAME_HEIGHT")? {
            self.video.height = height;
        }
        if let Some(max_zoom) = env_number::<f64>("PTZ_MAX_ZOOM")? {
            self.ptz.max_zoom = max_zoom;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(anyhow!(
                "video dimensions must be non-zero, got {}x{}",
                self.video.width,
                self.video.height
            ));
        }
        self.ptz.zoom_limits()?;
        self.gimbal.fov()?;
        BrokerEndpoint::parse(&self.mqtt.broker_addr, self.mqtt.use_tls)?;
        if self.mqtt.client_id.trim().is_empty() {
            return Err(anyhow!("mqtt client_id must not be empty"));
        }

        let topics = &self.mqtt.topics;
        for (name, topic) in [
            ("detections", &topics.detections),
            ("ptz", &topics.ptz),
            ("gimbal", &topics.gimbal),
            ("control", &topics.control),
        ] {
            if topic.trim().is_empty() {
                return Err(anyhow!("mqtt topic '{}' must not be empty", name));
            }
            if topic.contains(['+', '#']) {
                return Err(anyhow!(
                    "mqtt topic '{}' must not contain wildcards: {}",
                    name,
                    topic
                ));
            }
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number, got '{}'", name, value)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<FollowConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
