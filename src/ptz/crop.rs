use serde::{Deserialize, Serialize};

use super::control::{apply_event, PtzEvent};
use super::state::{PtzState, MIN_ZOOM};
use crate::detect::{Detection, FrameDetections};

/// Portrait output aspect (width / height).
pub const TARGET_ASPECT: f64 = 9.0 / 16.0;

/// Crop rectangle in source-frame pixels. Always inside the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CropRect {
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.w) / 2.0,
            f64::from(self.y) + f64::from(self.h) / 2.0,
        )
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.w) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.h) <= u64::from(height)
    }
}

/// Center of the held target's box, if the target is in `frame`.
pub fn target_center(state: &PtzState, frame: &FrameDetections) -> Option<(f64, f64)> {
    let id = state.target_id()?;
    frame.find_track(id).map(|det| det.bbox.center())
}

/// Stateless crop: centered on the held target when present in `frame`,
/// otherwise on the frame center.
pub fn compute_crop(state: &PtzState, frame: &FrameDetections) -> CropRect {
    let center = target_center(state, frame).unwrap_or_else(|| frame.center());
    crop_around(center, state.zoom(), frame.width, frame.height)
}

/// 9:16 crop of `height / zoom` pixels (width-limited on narrow frames),
/// centered on `center` and clamped into the frame.
///
/// Sizes and offsets round to the nearest pixel with halves toward zero, so a
/// 1080p frame gives a 607 px crop at zoom 1 and 304 px at zoom 2. Plain
/// truncation would give 303 at zoom 2.
///
/// Zero frame dimensions yield an all-zero rectangle.
pub fn crop_around(center: (f64, f64), zoom: f64, width: u32, height: u32) -> CropRect {
    if width == 0 || height == 0 {
        return CropRect::default();
    }
    let fw = f64::from(width);
    let fh = f64::from(height);
    let zoom = if zoom.is_finite() && zoom >= MIN_ZOOM {
        zoom
    } else {
        MIN_ZOOM
    };

    let mut crop_h = fh / zoom;
    let mut crop_w = crop_h * TARGET_ASPECT;
    if crop_w > fw {
        crop_w = fw;
        crop_h = crop_w / TARGET_ASPECT;
    }

    let (cx, cy) = if center.0.is_finite() && center.1.is_finite() {
        center
    } else {
        (fw / 2.0, fh / 2.0)
    };
    let x = (cx - crop_w / 2.0).clamp(0.0, (fw - crop_w).max(0.0));
    let y = (cy - crop_h / 2.0).clamp(0.0, (fh - crop_h).max(0.0));

    let w = snap(crop_w).clamp(1, width);
    let h = snap(crop_h).clamp(1, height);
    CropRect {
        x: snap(x).min(width - w),
        y: snap(y).min(height - h),
        w,
        h,
    }
}

/// Nearest integer, halves toward zero.
fn snap(value: f64) -> u32 {
    (value - 0.5).ceil().max(0.0) as u32
}

/// Stateful virtual PTZ for one camera session.
///
/// Owns the `PtzState` and the last detection cache used by target cycling.
/// While a held target is missing from the frame, the crop stays where it
/// was last centered, even if the held id changed since then.
#[derive(Clone, Debug, Default)]
pub struct VirtualPtz {
    state: PtzState,
    last_detections: Vec<Detection>,
    // center of the last crop that followed a detection
    last_center: Option<(f64, f64)>,
}

impl VirtualPtz {
    pub fn new(state: PtzState) -> Self {
        Self {
            state,
            last_detections: Vec::new(),
            last_center: None,
        }
    }

    pub fn state(&self) -> &PtzState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PtzState {
        &mut self.state
    }

    pub fn last_detections(&self) -> &[Detection] {
        &self.last_detections
    }

    /// Crop for `frame`, following the held target.
    pub fn update(&mut self, frame: &FrameDetections) -> CropRect {
        let target = self
            .state
            .target_id()
            .and_then(|id| frame.find_track(id));
        self.follow(frame, target)
    }

    /// Crop for `frame` centered on `target`.
    ///
    /// With no `target`, a held target id keeps the crop at the last followed
    /// center; without a held id the crop returns to the frame center.
    pub fn follow(&mut self, frame: &FrameDetections, target: Option<&Detection>) -> CropRect {
        self.last_detections.clear();
        self.last_detections.extend(frame.detections.iter().cloned());

        let center = match (target, self.state.target_id()) {
            (Some(det), _) => {
                let center = det.bbox.center();
                self.last_center = Some(center);
                center
            }
            (None, Some(id)) => match self.last_center {
                Some(center) => center,
                None => {
                    log::debug!("target {} not seen yet, using frame center", id);
                    frame.center()
                }
            },
            (None, None) => {
                self.last_center = None;
                frame.center()
            }
        };
        crop_around(center, self.state.zoom(), frame.width, frame.height)
    }

    /// Apply an operator event against the last detection cache.
    pub fn apply_event(&mut self, event: PtzEvent) {
        apply_event(&mut self.state, &self.last_detections, event);
    }
}
