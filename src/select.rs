//! Primary target selection and continuity.

use crate::detect::{Detection, FrameDetections};
use crate::ptz::PtzState;

/// The detection with the largest bounding-box area.
///
/// Only boxes with a positive area qualify. Ties go to the earliest entry in
/// input order, so the result is deterministic for a given frame.
pub fn select_primary(frame: &FrameDetections) -> Option<&Detection> {
    let mut best: Option<(&Detection, f64)> = None;
    for det in &frame.detections {
        let area = det.bbox.area();
        if area.is_nan() || area <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((det, area)),
        }
    }
    best.map(|(det, _)| det)
}

/// Holds the followed subject across frames.
///
/// Area-based selection runs only while acquiring (from a cold start until a
/// tracked winner is found). After that the held `track_id` is only looked up;
/// a frame without it yields `None` and the held id is kept. Manual cycling
/// writes a new id into `PtzState` directly.
#[derive(Debug)]
pub struct TargetSelector {
    acquiring: bool,
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetSelector {
    pub fn new() -> Self {
        Self { acquiring: true }
    }

    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    /// The target detection for this frame, updating `state.target_id` when a
    /// tracked subject is acquired.
    pub fn select<'f>(
        &mut self,
        state: &mut PtzState,
        frame: &'f FrameDetections,
    ) -> Option<&'f Detection> {
        if let Some(id) = state.target_id() {
            self.acquiring = false;
            let found = frame.find_track(id);
            if found.is_none() {
                log::debug!("target {} absent from frame, holding", id);
            }
            return found;
        }

        if !self.acquiring {
            return None;
        }

        let winner = select_primary(frame)?;
        match winner.track_id {
            Some(id) => {
                log::debug!("acquired target {}", id);
                state.set_target(Some(id));
                self.acquiring = false;
            }
            None => log::debug!("largest detection is untracked, still acquiring"),
        }
        Some(winner)
    }
}
