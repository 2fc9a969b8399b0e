//! PTZ state and the two response engines.
//!
//! - `state`: `PtzState` with clamped zoom and the held target id
//! - `crop`: virtual PTZ (9:16 crop rectangle)
//! - `gimbal`: angular pan/tilt command for a physical head
//! - `control`: manual override events and joystick mapping
//! - `shared`: mutex-guarded state shared by the frame and operator paths

pub mod control;
pub mod crop;
pub mod gimbal;
pub mod shared;
pub mod state;

pub use control::{
    apply_event, distinct_track_ids, parse_operator_input, JoystickAction, JoystickDirection,
    JoystickEvent, PtzEvent,
};
pub use crop::{compute_crop, crop_around, target_center, CropRect, VirtualPtz, TARGET_ASPECT};
pub use gimbal::{compute_command, GimbalCommand, GimbalFov};
pub use shared::SharedPtz;
pub use state::{PtzState, ZoomLimits, DEFAULT_MAX_ZOOM, DEFAULT_ZOOM_STEP, MIN_ZOOM};
