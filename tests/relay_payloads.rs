//! Wire payload fixtures for the relay topics.
//!
//! These tests verify that:
//! 1. Detector payloads in the shapes seen on the wire normalize correctly
//! 2. Malformed payloads are rejected instead of panicking, while a bad
//!    entry only costs that entry
//! 3. Published commands keep the keys consumers read

use ptz_follow::relay::payload::{
    decode_control, decode_detections, decode_frame, decode_ptz, encode_command,
    encode_control, encode_detections, PtzPayload,
};
use ptz_follow::{BoundingBox, CropRect, Detection, FollowCommand, FrameDetections, PtzEvent};

/// Detector output with a tracked person, an untracked detection and an
/// entry without a box.
const DETECTIONS_MIXED: &str = r#"{
    "width": 1920,
    "height": 1080,
    "detections": [
        {"box": [860.0, 440.0, 1060.0, 640.0], "conf": 0.91, "cls": 0, "id": 7},
        {"box": [10, 10, 50, 90], "conf": 0.42, "cls": 0},
        {"conf": 0.99, "cls": 0, "id": 8}
    ],
    "model": "yolov8n"
}"#;

/// Minimal payload: no frame size, untracked detection.
const DETECTIONS_MINIMAL: &str = r#"{"detections": [{"box": [0, 0, 100, 200], "conf": 0.5, "cls": 0}]}"#;

const MALFORMED: &[&str] = &[
    "",
    "[]",
    "null",
    r#"{"detections": null}"#,
    r#"{"width": -1, "detections": []}"#,
    r#"{"height": 0, "detections": []}"#,
];

#[test]
fn mixed_detections_normalize() {
    let frame = decode_frame(DETECTIONS_MIXED.as_bytes(), 640, 480).unwrap();
    assert_eq!((frame.width, frame.height), (1920, 1080));
    assert_eq!(frame.len(), 2);

    let tracked = frame.find_track(7).unwrap();
    assert_eq!(tracked.bbox.center(), (960.0, 540.0));
    assert_eq!(tracked.class_id, 0);

    let untracked = &frame.detections[1];
    assert_eq!(untracked.track_id, None);
    assert!((untracked.confidence - 0.42).abs() < 1e-6);
}

#[test]
fn minimal_detections_use_configured_size() {
    let frame = decode_frame(DETECTIONS_MINIMAL.as_bytes(), 1280, 720).unwrap();
    assert_eq!((frame.width, frame.height), (1280, 720));
    assert_eq!(frame.detections[0].track_id, None);
}

/// One good person among entries a sloppy detector might emit.
const DETECTIONS_PARTLY_BROKEN: &str = r#"{
    "width": 1920,
    "height": 1080,
    "detections": [
        {"box": "0,0,1,1", "id": 1},
        {"box": [0, 0, 10, null], "id": 2},
        {"box": [0, 0, 10, 10], "id": "seven"},
        {"box": [100, 100, 300, 500], "conf": 0.8, "id": 3},
        [0, 0, 5, 5]
    ]
}"#;

#[test]
fn broken_entries_are_skipped_individually() {
    let frame = decode_frame(DETECTIONS_PARTLY_BROKEN.as_bytes(), 640, 480).unwrap();
    assert_eq!((frame.width, frame.height), (1920, 1080));
    assert_eq!(frame.len(), 1);
    assert_eq!(frame.detections[0].track_id, Some(3));
    assert_eq!(frame.detections[0].bbox.center(), (200.0, 300.0));
}

#[test]
fn malformed_detections_are_rejected() {
    for payload in MALFORMED {
        assert!(
            decode_detections(payload.as_bytes()).is_err(),
            "accepted {:?}",
            payload
        );
    }
}

#[test]
fn encoded_detections_decode_to_same_frame() {
    let frame = FrameDetections::new(
        1920,
        1080,
        vec![
            Detection::tracked(3, BoundingBox::new(1.0, 2.0, 30.0, 40.0))
                .with_confidence(0.5)
                .with_class(0),
            Detection::untracked(BoundingBox::new(5.0, 5.0, 6.0, 6.0)),
        ],
    );
    let bytes = encode_detections(&frame).unwrap();
    assert_eq!(decode_frame(&bytes, 1, 1).unwrap(), frame);
}

#[test]
fn crop_command_uses_consumer_keys() {
    let cmd = FollowCommand::Crop {
        rect: CropRect {
            x: 656,
            y: 0,
            w: 607,
            h: 1080,
        },
        zoom: 1.0,
        target_id: Some(7),
    };
    let bytes = encode_command(&cmd).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"x": 656, "y": 0, "w": 607, "h": 1080, "zoom": 1.0, "target_id": 7})
    );

    let decoded: PtzPayload = decode_ptz(&bytes).unwrap();
    assert_eq!(decoded.rect().w, 607);
    assert_eq!(decoded.target_id, Some(7));
}

#[test]
fn control_events_round_trip() {
    for event in PtzEvent::ALL {
        let bytes = encode_control(event).unwrap();
        assert_eq!(decode_control(&bytes).unwrap(), Some(event));
    }
    assert!(decode_control(b"zoom_in").is_err());
}
