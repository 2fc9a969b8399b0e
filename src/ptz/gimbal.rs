use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::Detection;

/// Angular offset request for a physical pan/tilt head.
///
/// `(0.0, 0.0)` means "no change requested", not "move to center".
/// Positive tilt is up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GimbalCommand {
    pub pan_degrees: f64,
    pub tilt_degrees: f64,
}

impl GimbalCommand {
    pub const HOLD: GimbalCommand = GimbalCommand {
        pan_degrees: 0.0,
        tilt_degrees: 0.0,
    };

    pub fn is_hold(&self) -> bool {
        *self == Self::HOLD
    }
}

/// Total angular range mapped onto the full frame width/height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GimbalFov {
    pan_range_deg: f64,
    tilt_range_deg: f64,
}

impl Default for GimbalFov {
    fn default() -> Self {
        Self {
            pan_range_deg: 60.0,
            tilt_range_deg: 45.0,
        }
    }
}

impl GimbalFov {
    pub fn new(pan_range_deg: f64, tilt_range_deg: f64) -> Result<Self> {
        for (name, value) in [("pan", pan_range_deg), ("tilt", tilt_range_deg)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(anyhow!("{} range must be > 0 degrees, got {}", name, value));
            }
        }
        Ok(Self {
            pan_range_deg,
            tilt_range_deg,
        })
    }

    pub fn pan_range_deg(&self) -> f64 {
        self.pan_range_deg
    }

    pub fn tilt_range_deg(&self) -> f64 {
        self.tilt_range_deg
    }
}

/// Pan/tilt offset that would bring `target` to the frame center.
///
/// The bbox center's offset from the frame center is normalized by the frame
/// dimension and scaled to the field of view. Image Y grows downward, so tilt
/// is negated. No target or a zero-sized frame yields `GimbalCommand::HOLD`.
pub fn compute_command(
    target: Option<&Detection>,
    width: u32,
    height: u32,
    fov: &GimbalFov,
) -> GimbalCommand {
    let Some(det) = target else {
        return GimbalCommand::HOLD;
    };
    if width == 0 || height == 0 {
        return GimbalCommand::HOLD;
    }
    let (fw, fh) = (f64::from(width), f64::from(height));
    let (cx, cy) = det.bbox.center();
    let offset_x = cx - fw / 2.0;
    let offset_y = cy - fh / 2.0;

    let pan = offset_x / fw * fov.pan_range_deg;
    let tilt = -(offset_y / fh) * fov.tilt_range_deg;
    if !pan.is_finite() || !tilt.is_finite() {
        return GimbalCommand::HOLD;
    }
    GimbalCommand {
        pan_degrees: pan,
        tilt_degrees: tilt,
    }
}
