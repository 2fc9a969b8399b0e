use anyhow::Result;

use crate::detect::result::{BoundingBox, Detection, FrameDetections};
use crate::detect::source::{DetectionSource, Pull};

/// Track id of the walking subject.
pub const SUBJECT_TRACK_ID: i64 = 1;
/// Track id of the stationary bystander.
pub const BYSTANDER_TRACK_ID: i64 = 2;

const PERSON_CLASS: i32 = 0;
const WALK_PERIOD: u64 = 240;
const OCCLUSION_PERIOD: u64 = 120;
const OCCLUDED_FRAMES: std::ops::Range<u64> = 100..110;
const FLICKER_EVERY: u64 = 7;

/// Synthetic scene for running the engine without a detector.
///
/// A subject walks back and forth across the frame and disappears for a few
/// frames every `OCCLUSION_PERIOD`. A smaller bystander stands still, and an
/// untracked flicker detection appears every few frames.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    max_frames: Option<u64>,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, max_frames: Option<u64>) -> Self {
        Self {
            width,
            height,
            max_frames,
            frame_count: 0,
        }
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_count
    }

    fn scene(&self, n: u64) -> Vec<Detection> {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let mut out = Vec::with_capacity(3);

        let phase = (n % WALK_PERIOD) as f64 / WALK_PERIOD as f64;
        let sweep = if phase < 0.5 {
            phase * 2.0
        } else {
            2.0 - phase * 2.0
        };
        let cx = w * (0.15 + 0.7 * sweep);
        let cy = h * 0.55;
        if !OCCLUDED_FRAMES.contains(&(n % OCCLUSION_PERIOD)) {
            push_box(&mut out, Some(SUBJECT_TRACK_ID), cx, cy, w * 0.06, h * 0.275, 0.91);
        }

        push_box(&mut out, Some(BYSTANDER_TRACK_ID), w * 0.8, h * 0.3, w * 0.025, h * 0.075, 0.64);

        if n % FLICKER_EVERY == 0 {
            push_box(&mut out, None, w * 0.1, h * 0.2, w * 0.01, h * 0.02, 0.31);
        }
        out
    }
}

fn push_box(
    out: &mut Vec<Detection>,
    track_id: Option<i64>,
    cx: f64,
    cy: f64,
    half_w: f64,
    half_h: f64,
    confidence: f32,
) {
    let Some(bbox) =
        BoundingBox::from_corners([cx - half_w, cy - half_h, cx + half_w, cy + half_h])
    else {
        return;
    };
    let det = match track_id {
        Some(id) => Detection::tracked(id, bbox),
        None => Detection::untracked(bbox),
    };
    out.push(det.with_confidence(confidence).with_class(PERSON_CLASS));
}

impl DetectionSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn pull(&mut self) -> Result<Pull> {
        if let Some(max) = self.max_frames {
            if self.frame_count >= max {
                return Ok(Pull::Finished);
            }
        }
        self.frame_count += 1;
        let detections = self.scene(self.frame_count);
        Ok(Pull::Frame(FrameDetections::new(
            self.width,
            self.height,
            detections,
        )))
    }
}
