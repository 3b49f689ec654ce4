use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// A single per-frame observation produced by the upstream detector.
///
/// The core never constructs or mutates one of these; they arrive fully
/// formed and flow into tracks unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Semantic class reported by the detector.
    pub label: String,
    pub bbox: BoundingBox,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    /// Index of the source frame, monotonic per stream.
    pub frame_index: u64,
    /// Timestamp of the source frame in seconds.
    pub timestamp: f64,
    /// Auxiliary state reported alongside the class, e.g. the object is
    /// currently in use.
    pub active: bool,
    /// Fraction of the box the appearance analyzer attributes to the wrong
    /// subject, `None` when the analyzer was unavailable.
    #[serde(default)]
    pub exclusion: Option<f32>,
}

impl Detection {
    /// Rejects detections the tracker must never ingest. Called before any
    /// track state is touched.
    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        if let Some(exclusion) = self.exclusion {
            if !(0.0..=1.0).contains(&exclusion) {
                bail!("exclusion signal {exclusion} outside [0, 1]");
            }
        }
        Ok(())
    }
}

/// Frame index to timestamp mapping supplied by the frame sampling
/// collaborator. Lets the batch driver step through detection-free frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub frame_index: u64,
    pub timestamp: f64,
}

/// Canonical form of a class label, used both as the consolidation group
/// key and for the matching class gate.
pub fn canonical_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Whether two labels name the same class under canonicalization.
pub(crate) fn same_label(a: &str, b: &str) -> bool {
    canonical_label(a) == canonical_label(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_detector_payload_without_exclusion() {
        let payload = r#"{
            "label": "guitar",
            "bbox": { "x": 10.0, "y": 20.0, "width": 120.0, "height": 60.0 },
            "confidence": 0.87,
            "frame_index": 3,
            "timestamp": 1.5,
            "active": true
        }"#;

        let detection: Detection = serde_json::from_str(payload).unwrap();

        assert_eq!(detection.label, "guitar");
        assert_eq!(detection.frame_index, 3);
        assert_eq!(detection.exclusion, None);
        assert!(detection.validate().is_ok());
    }

    #[test]
    fn deserialization_rejects_missing_fields() {
        let payload = r#"{ "label": "guitar", "confidence": 0.5 }"#;

        assert!(serde_json::from_str::<Detection>(payload).is_err());
    }

    #[test]
    fn validate_rejects_non_positive_geometry() {
        let detection = Detection {
            label: "guitar".to_string(),
            bbox: BoundingBox::new(0.0, 0.0, 0.0, 10.0),
            confidence: 0.9,
            frame_index: 0,
            timestamp: 0.0,
            active: false,
            exclusion: None,
        };

        assert!(detection.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_exclusion() {
        let detection = Detection {
            label: "guitar".to_string(),
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            confidence: 0.9,
            frame_index: 0,
            timestamp: 0.0,
            active: false,
            exclusion: Some(1.5),
        };

        assert!(detection.validate().is_err());
    }

    #[test]
    fn canonical_label_trims_and_folds_case() {
        assert_eq!(canonical_label("  Guitar "), "guitar");
        assert!(same_label("Guitar ", "guitar"));
        assert!(!same_label("guitar", "violin"));
    }
}
