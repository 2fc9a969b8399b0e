//! Subject-following PTZ engine.
//!
//! This crate turns per-frame object detections into a camera response that
//! keeps one human subject in view.
//!
//! # Architecture
//!
//! Detections flow through the engine in one direction:
//!
//! 1. **Normalize**: an opaque detector result becomes a `FrameDetections` set.
//! 2. **Select**: the primary target is acquired once and then held by track id.
//! 3. **Respond**: either a 9:16 crop rectangle (virtual PTZ) or an angular
//!    pan/tilt offset (physical gimbal) is computed for the held target.
//! 4. **Relay**: commands leave over a last-value-wins MQTT topic.
//!
//! Operator input (zoom, reset, target cycling) mutates the same PTZ state from
//! a second timing domain; both domains serialize through `SharedPtz`.
//!
//! # Module Structure
//!
//! - `detect`: detection model, normalizer, sources and the pull-based stream
//! - `select`: primary target selection and continuity
//! - `ptz`: PTZ state, crop engine, gimbal engine, manual override
//! - `relay`: single-slot mailboxes, wire payloads, MQTT plumbing
//! - `controller`: per-frame glue producing one `FollowCommand` per frame
//! - `config`: file + environment configuration

pub mod config;
pub mod controller;
pub mod detect;
pub mod ptz;
pub mod relay;
pub mod select;

pub use controller::{FollowCommand, FollowController, FollowMode};
pub use detect::{
    normalize_detections, open_source, BoundingBox, CancelToken, Detection, DetectionSource,
    DetectionStream, FrameDetections, MailboxSource, Pull, RawDetection, ReplaySource,
    SyntheticSource, UNKNOWN_CLASS,
};
pub use ptz::{
    apply_event, compute_command, compute_crop, CropRect, GimbalCommand, GimbalFov,
    JoystickAction, JoystickDirection, JoystickEvent, PtzEvent, PtzState, SharedPtz, VirtualPtz,
    ZoomLimits, TARGET_ASPECT,
};
pub use relay::{Mailbox, MailboxStats, Recv};
pub use select::{select_primary, TargetSelector};
