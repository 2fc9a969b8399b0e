use serde::{Deserialize, Serialize};

use super::result::{BoundingBox, Detection, FrameDetections, UNKNOWN_CLASS};

/// Detector output for one object, as loosely shaped as detectors emit it.
///
/// Every field is optional. Key aliases cover the spellings seen on the wire
/// (`box`/`bbox`/`xyxy`, `id`/`track_id`, `conf`/`confidence`, `cls`/`class`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(
        default,
        rename = "box",
        alias = "bbox",
        alias = "xyxy",
        skip_serializing_if = "Option::is_none"
    )]
    pub bbox: Option<Vec<f64>>,

    #[serde(default, alias = "track_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, alias = "confidence", skip_serializing_if = "Option::is_none")]
    pub conf: Option<f32>,

    #[serde(default, alias = "class", skip_serializing_if = "Option::is_none")]
    pub cls: Option<i32>,
}

impl RawDetection {
    fn to_detection(&self) -> Option<Detection> {
        let coords = self.bbox.as_deref()?;
        let corners: [f64; 4] = coords.try_into().ok()?;
        let bbox = BoundingBox::from_corners(corners)?;
        Some(Detection {
            track_id: self.id,
            bbox,
            confidence: self.conf.unwrap_or(0.0),
            class_id: self.cls.unwrap_or(UNKNOWN_CLASS),
        })
    }
}

impl From<&Detection> for RawDetection {
    fn from(det: &Detection) -> Self {
        Self {
            bbox: Some(det.bbox.corners().to_vec()),
            id: det.track_id,
            conf: Some(det.confidence),
            cls: Some(det.class_id),
        }
    }
}

/// Convert one frame of raw detector output into a `FrameDetections` set.
///
/// Entries without a usable bounding box (missing, wrong arity, non-finite or
/// inverted) are skipped. Order of the remaining entries is preserved.
pub fn normalize_detections(raw: &[RawDetection], width: u32, height: u32) -> FrameDetections {
    let mut detections = Vec::with_capacity(raw.len());
    for (index, entry) in raw.iter().enumerate() {
        match entry.to_detection() {
            Some(det) => detections.push(det),
            None => log::debug!("skipping detection #{} without a usable bbox", index),
        }
    }
    FrameDetections::new(width, height, detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> Vec<RawDetection> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults_missing_confidence_and_class() {
        let frame = normalize_detections(&raw(r#"[{"box": [1, 2, 3, 4]}]"#), 640, 480);
        assert_eq!(frame.len(), 1);
        let det = &frame.detections[0];
        assert_eq!(det.track_id, None);
        assert_eq!(det.confidence, 0.0);
        assert_eq!(det.class_id, UNKNOWN_CLASS);
        assert_eq!((frame.width, frame.height), (640, 480));
    }

    #[test]
    fn skips_entries_without_bbox() {
        let frame = normalize_detections(
            &raw(
                r#"[
                    {"id": 1, "conf": 0.9},
                    {"id": 2, "box": [0, 0, 10]},
                    {"id": 3, "box": [5, 5, 1, 1]},
                    {"id": 4, "box": null},
                    {"id": 5, "bbox": [0, 0, 10, 10], "confidence": 0.4, "class": 0}
                ]"#,
            ),
            100,
            100,
        );
        assert_eq!(frame.len(), 1);
        let det = &frame.detections[0];
        assert_eq!(det.track_id, Some(5));
        assert!((det.confidence - 0.4).abs() < f32::EPSILON);
        assert_eq!(det.class_id, 0);
    }

    #[test]
    fn accepts_key_aliases() {
        let frame = normalize_detections(
            &raw(r#"[{"xyxy": [0, 0, 2, 2], "track_id": 9, "cls": 3, "conf": 0.5}]"#),
            10,
            10,
        );
        assert_eq!(frame.detections[0].track_id, Some(9));
        assert_eq!(frame.detections[0].class_id, 3);
    }

    #[test]
    fn preserves_input_order() {
        let frame = normalize_detections(
            &raw(r#"[{"id": 3, "box": [0,0,1,1]}, {"id": 1, "box": [0,0,1,1]}]"#),
            10,
            10,
        );
        let ids: Vec<_> = frame.detections.iter().map(|d| d.track_id).collect();
        assert_eq!(ids, vec![Some(3), Some(1)]);
    }

    #[test]
    fn raw_from_detection_keeps_fields() {
        let det = Detection::tracked(7, BoundingBox::new(1.0, 2.0, 3.0, 4.0))
            .with_confidence(0.75)
            .with_class(0);
        let raw = RawDetection::from(&det);
        assert_eq!(raw.bbox, Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert_eq!(raw.id, Some(7));
        assert_eq!(raw.cls, Some(0));
    }
}
