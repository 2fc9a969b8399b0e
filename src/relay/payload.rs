//! Wire payloads exchanged over the relay topics.
//!
//! All payloads are JSON objects. Unknown fields are ignored; missing
//! optional fields take their defaults. Decoders return an error for
//! malformed input and the caller logs and drops the message.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::FollowCommand;
use crate::detect::{normalize_detections, FrameDetections, RawDetection};
use crate::ptz::{
    CropRect, GimbalCommand, JoystickAction, JoystickDirection, JoystickEvent, PtzEvent,
};

/// `detections` topic: one detector invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub detections: Vec<RawDetection>,
}

impl DetectionsPayload {
    pub fn from_frame(frame: &FrameDetections) -> Self {
        Self {
            width: Some(frame.width),
            height: Some(frame.height),
            detections: frame.detections.iter().map(RawDetection::from).collect(),
        }
    }

    /// Normalize into a frame set, using the defaults for missing dimensions.
    pub fn into_frame(self, default_width: u32, default_height: u32) -> FrameDetections {
        normalize_detections(
            &self.detections,
            self.width.unwrap_or(default_width),
            self.height.unwrap_or(default_height),
        )
    }
}

// Entries stay untyped until each one is converted on its own.
#[derive(Deserialize)]
struct DetectionsEnvelope {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    detections: Vec<serde_json::Value>,
}

/// Decode a detections payload.
///
/// Only the envelope must be well formed. An entry that does not decode (a
/// string id, a `null` coordinate, a non-object) is skipped and the rest of
/// the frame is kept.
pub fn decode_detections(payload: &[u8]) -> Result<DetectionsPayload> {
    let envelope: DetectionsEnvelope =
        serde_json::from_slice(payload).context("malformed detections payload")?;
    if envelope.width == Some(0) || envelope.height == Some(0) {
        return Err(anyhow!("detections payload has a zero frame dimension"));
    }

    let mut detections = Vec::with_capacity(envelope.detections.len());
    for (index, entry) in envelope.detections.into_iter().enumerate() {
        match serde_json::from_value::<RawDetection>(entry) {
            Ok(raw) => detections.push(raw),
            Err(e) => log::debug!("skipping malformed detection #{}: {}", index, e),
        }
    }
    Ok(DetectionsPayload {
        width: envelope.width,
        height: envelope.height,
        detections,
    })
}

pub fn decode_frame(
    payload: &[u8],
    default_width: u32,
    default_height: u32,
) -> Result<FrameDetections> {
    Ok(decode_detections(payload)?.into_frame(default_width, default_height))
}

/// `ptz` topic: crop rectangle plus the state that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PtzPayload {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub zoom: f64,
    #[serde(default)]
    pub target_id: Option<i64>,
}

impl PtzPayload {
    pub fn new(rect: CropRect, zoom: f64, target_id: Option<i64>) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            zoom,
            target_id,
        }
    }

    pub fn rect(&self) -> CropRect {
        CropRect {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

pub fn decode_ptz(payload: &[u8]) -> Result<PtzPayload> {
    let decoded: PtzPayload = serde_json::from_slice(payload).context("malformed ptz payload")?;
    if !decoded.zoom.is_finite() || decoded.zoom < 1.0 {
        return Err(anyhow!("ptz payload zoom out of range: {}", decoded.zoom));
    }
    Ok(decoded)
}

/// `gimbal` topic: angular offset in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GimbalPayload {
    pub pan: f64,
    pub tilt: f64,
}

impl From<GimbalCommand> for GimbalPayload {
    fn from(cmd: GimbalCommand) -> Self {
        Self {
            pan: cmd.pan_degrees,
            tilt: cmd.tilt_degrees,
        }
    }
}

impl From<GimbalPayload> for GimbalCommand {
    fn from(payload: GimbalPayload) -> Self {
        Self {
            pan_degrees: payload.pan,
            tilt_degrees: payload.tilt,
        }
    }
}

pub fn decode_gimbal(payload: &[u8]) -> Result<GimbalCommand> {
    let decoded: GimbalPayload =
        serde_json::from_slice(payload).context("malformed gimbal payload")?;
    if !decoded.pan.is_finite() || !decoded.tilt.is_finite() {
        return Err(anyhow!("gimbal payload has non-finite angles"));
    }
    Ok(decoded.into())
}

/// `control` topic: a named event or a raw joystick event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlPayload {
    Event {
        event: PtzEvent,
    },
    Joystick {
        direction: JoystickDirection,
        action: JoystickAction,
    },
}

impl ControlPayload {
    pub fn to_ptz_event(&self) -> Option<PtzEvent> {
        match *self {
            ControlPayload::Event { event } => Some(event),
            ControlPayload::Joystick { direction, action } => {
                JoystickEvent::new(direction, action).to_ptz_event()
            }
        }
    }
}

/// Decode a control payload. `Ok(None)` for joystick releases.
pub fn decode_control(payload: &[u8]) -> Result<Option<PtzEvent>> {
    let decoded: ControlPayload =
        serde_json::from_slice(payload).context("malformed control payload")?;
    Ok(decoded.to_ptz_event())
}

pub fn encode_control(event: PtzEvent) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&ControlPayload::Event { event })?)
}

pub fn encode_detections(frame: &FrameDetections) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&DetectionsPayload::from_frame(frame))?)
}

pub fn encode_command(command: &FollowCommand) -> Result<Vec<u8>> {
    let bytes = match command {
        FollowCommand::Crop {
            rect,
            zoom,
            target_id,
        } => serde_json::to_vec(&PtzPayload::new(*rect, *zoom, *target_id))?,
        FollowCommand::Gimbal(cmd) => serde_json::to_vec(&GimbalPayload::from(*cmd))?,
    };
    Ok(bytes)
}
