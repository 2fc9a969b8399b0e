use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use ptz_follow::config::FollowConfig;
use ptz_follow::FollowMode;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PTZ_CONFIG",
        "PTZ_MQTT_BROKER_ADDR",
        "PTZ_MODE",
        "PTZ_FRAME_WIDTH",
        "PTZ_FRAME_HEIGHT",
        "PTZ_MAX_ZOOM",
    ] {
        std::env::remove_var(key);
    }
}

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn defaults_without_file() {
    let _guard = lock_env();
    clear_env();

    let cfg = FollowConfig::load().expect("load defaults");
    assert_eq!(cfg.mode, FollowMode::Virtual);
    assert_eq!(cfg.mqtt.broker_addr, "127.0.0.1:1883");
    assert!(!cfg.mqtt.allow_remote);
    assert_eq!(cfg.mqtt.topics.detections, "ptz/detections");
    assert_eq!(cfg.mqtt.topics.ptz, "ptz/crop");
    assert_eq!(cfg.mqtt.topics.gimbal, "ptz/gimbal");
    assert_eq!(cfg.mqtt.topics.control, "ptz/control");
    assert_eq!((cfg.video.width, cfg.video.height), (1920, 1080));
    assert_eq!(cfg.ptz.max_zoom, 4.0);
    assert_eq!(cfg.ptz.zoom_step, 0.2);
    assert_eq!(cfg.gimbal.pan_range_deg, 60.0);
    assert_eq!(cfg.gimbal.tilt_range_deg, 45.0);
    assert_eq!(cfg.mqtt.client_id_for("follow"), "ptz-follow-follow");
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = lock_env();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "mode": "gimbal",
        "mqtt": {
            "broker_addr": "mqtt://localhost:1884",
            "client_id": "stage-left",
            "topics": { "ptz": "studio/crop", "control": "studio/control" }
        },
        "video": { "width": 1280, "height": 720 },
        "ptz": { "max_zoom": 3.0, "zoom_step": 0.5 },
        "gimbal": { "pan_range_deg": 90.0 },
        "unknown_section": { "ignored": true }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("PTZ_CONFIG", file.path());
    std::env::set_var("PTZ_MODE", "virtual");
    std::env::set_var("PTZ_FRAME_HEIGHT", "1080");
    std::env::set_var("PTZ_MAX_ZOOM", "2.5");

    let cfg = FollowConfig::load().expect("load config");
    assert_eq!(cfg.mode, FollowMode::Virtual);
    assert_eq!(cfg.mqtt.broker_addr, "mqtt://localhost:1884");
    assert_eq!(cfg.mqtt.client_id, "stage-left");
    assert_eq!(cfg.mqtt.topics.ptz, "studio/crop");
    assert_eq!(cfg.mqtt.topics.control, "studio/control");
    assert_eq!(cfg.mqtt.topics.detections, "ptz/detections");
    assert_eq!((cfg.video.width, cfg.video.height), (1280, 1080));
    assert_eq!(cfg.ptz.max_zoom, 2.5);
    assert_eq!(cfg.ptz.zoom_step, 0.5);
    assert_eq!(cfg.gimbal.pan_range_deg, 90.0);
    assert_eq!(cfg.gimbal.tilt_range_deg, 45.0);

    let limits = cfg.ptz.zoom_limits().unwrap();
    assert_eq!(limits.max_zoom(), 2.5);

    clear_env();
}

#[test]
fn loads_toml_by_extension() {
    let _guard = lock_env();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
mode = "gimbal"

[mqtt]
broker_addr = "127.0.0.1:1883"
use_tls = false

[mqtt.topics]
gimbal = "rig/gimbal"

[gimbal]
tilt_range_deg = 30.0
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = FollowConfig::load_from(Some(file.path())).expect("load toml");
    assert_eq!(cfg.mode, FollowMode::Gimbal);
    assert_eq!(cfg.mqtt.topics.gimbal, "rig/gimbal");
    assert_eq!(cfg.gimbal.tilt_range_deg, 30.0);
}

#[test]
fn rejects_invalid_configuration() {
    let _guard = lock_env();
    clear_env();

    let cases = [
        r#"{"ptz": {"max_zoom": 0.5}}"#,
        r#"{"ptz": {"zoom_step": 0}}"#,
        r#"{"video": {"width": 0}}"#,
        r#"{"gimbal": {"tilt_range_deg": -1}}"#,
        r#"{"mqtt": {"topics": {"detections": ""}}}"#,
        r#"{"mqtt": {"topics": {"control": "ptz/#"}}}"#,
        r#"{"mqtt": {"broker_addr": "localhost"}}"#,
        r#"{"mode": "orbit"}"#,
        r#"not json"#,
    ];
    for json in cases {
        let mut file = NamedTempFile::new().expect("temp config");
        file.write_all(json.as_bytes()).expect("write config");
        assert!(
            FollowConfig::load_from(Some(file.path())).is_err(),
            "accepted {}",
            json
        );
    }
}

#[test]
fn rejects_bad_env_values() {
    let _guard = lock_env();
    clear_env();

    std::env::set_var("PTZ_FRAME_WIDTH", "wide");
    assert!(FollowConfig::load().is_err());
    clear_env();

    std::env::set_var("PTZ_MODE", "sideways");
    assert!(FollowConfig::load().is_err());
    clear_env();

    std::env::set_var("PTZ_CONFIG", "/nonexistent/ptz.json");
    assert!(FollowConfig::load().is_err());
    clear_env();
}
