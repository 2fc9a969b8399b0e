use serde::{Deserialize, Serialize};

/// Class id used when the detector did not report one.
pub const UNKNOWN_CLASS: i32 = -1;

/// Axis-aligned box in source-frame pixel coordinates (`x1 < x2`, `y1 < y2`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from `[x1, y1, x2, y2]`.
    ///
    /// Returns `None` unless every coordinate is finite and the box has a
    /// positive extent on both axes.
    pub fn from_corners(corners: [f64; 4]) -> Option<Self> {
        let [x1, y1, x2, y2] = corners;
        if !corners.iter().all(|c| c.is_finite()) {
            return None;
        }
        if x1 >= x2 || y1 >= y2 {
            return None;
        }
        Some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// `(x2 - x1) * (y2 - y1)`. Zero or negative for degenerate boxes.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One detected object in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Detector-assigned identity, stable while the detector keeps tracking.
    /// `None` when continuity was lost (or for single-shot detections).
    pub track_id: Option<i64>,
    pub bbox: BoundingBox,
    /// Confidence as reported by the detector (0.0 when absent).
    pub confidence: f32,
    /// Class id as reported by the detector (`UNKNOWN_CLASS` when absent).
    pub class_id: i32,
}

impl Detection {
    pub fn tracked(track_id: i64, bbox: BoundingBox) -> Self {
        Self {
            track_id: Some(track_id),
            bbox,
            confidence: 0.0,
            class_id: UNKNOWN_CLASS,
        }
    }

    pub fn untracked(bbox: BoundingBox) -> Self {
        Self {
            track_id: None,
            bbox,
            confidence: 0.0,
            class_id: UNKNOWN_CLASS,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_class(mut self, class_id: i32) -> Self {
        self.class_id = class_id;
        self
    }
}

/// Detections produced by exactly one detector invocation, plus the frame size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDetections {
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
}

impl FrameDetections {
    pub fn new(width: u32, height: u32, detections: Vec<Detection>) -> Self {
        Self {
            width,
            height,
            detections,
        }
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// First detection carrying `track_id`.
    pub fn find_track(&self, track_id: i64) -> Option<&Detection> {
        self.detections
            .iter()
            .find(|det| det.track_id == Some(track_id))
    }

    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}
