use log::debug;
use serde::Serialize;
use strum::Display;

use crate::detection::Detection;

/// Lifecycle stage of a track. `Expired` is terminal.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum TrackState {
    Active,
    Expired,
}

/// A track still owned by the tracker, accumulating detections of one
/// physical object.
#[derive(Clone, Debug)]
pub(crate) struct ActiveTrack {
    track_id: u64,
    label: String,
    detections: Vec<Detection>,
    frames_since_last_match: u32,
    state: TrackState,
}

impl ActiveTrack {
    /// Births a track from an unmatched detection. Tracks are usable
    /// immediately; there is no tentative phase.
    pub(crate) fn new(track_id: u64, detection: Detection) -> Self {
        debug!(
            target: "tracker",
            "track {track_id} created for {} at frame {}",
            detection.label,
            detection.frame_index
        );
        Self {
            track_id,
            label: detection.label.clone(),
            detections: vec![detection],
            frames_since_last_match: 0,
            state: TrackState::Active,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn last_detection(&self) -> &Detection {
        self.detections
            .last()
            .expect("tracks hold at least one detection")
    }

    pub(crate) fn record_match(&mut self, detection: Detection) {
        debug_assert!(detection.frame_index > self.last_detection().frame_index);
        self.detections.push(detection);
        self.frames_since_last_match = 0;
    }

    pub(crate) fn record_miss(&mut self) {
        self.frames_since_last_match += 1;
    }

    pub(crate) fn frames_since_last_match(&self) -> u32 {
        self.frames_since_last_match
    }

    pub(crate) fn expire(&mut self) {
        self.state = TrackState::Expired;
        debug!(
            target: "tracker",
            "track {} -> {} after {} detections",
            self.track_id,
            self.state,
            self.detections.len()
        );
    }

    /// Summarizes an expired track into its immutable output record.
    pub(crate) fn finalize(self) -> Track {
        let start_time = self
            .detections
            .iter()
            .map(|detection| detection.timestamp)
            .fold(f64::INFINITY, f64::min);
        let end_time = self
            .detections
            .iter()
            .map(|detection| detection.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);
        let total = self.detections.len();
        let active_count = self
            .detections
            .iter()
            .filter(|detection| detection.active)
            .count();
        let avg_confidence = self
            .detections
            .iter()
            .map(|detection| detection.confidence)
            .sum::<f32>()
            / total as f32;

        Track {
            track_id: self.track_id,
            label: self.label,
            start_time,
            end_time,
            duration: end_time - start_time,
            active_percentage: 100.0 * active_count as f32 / total as f32,
            avg_confidence,
            detections: self.detections,
        }
    }
}

/// A finalized, time-summarized track. Immutable once produced by the
/// tracker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Track {
    pub track_id: u64,
    pub label: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    /// Percentage of detections whose auxiliary active flag was set.
    pub active_percentage: f32,
    pub avg_confidence: f32,
    /// Member detections in strictly increasing frame order.
    pub detections: Vec<Detection>,
}

/// A maximal run of consecutive detections sharing one active state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub active: bool,
}

impl Track {
    /// Splits the track wherever the active flag flips.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut iter = self.detections.iter();
        let Some(first) = iter.next() else {
            return segments;
        };

        let mut start_time = first.timestamp;
        let mut end_time = first.timestamp;
        let mut active = first.active;
        for detection in iter {
            if detection.active == active {
                end_time = detection.timestamp;
            } else {
                segments.push(Segment {
                    start_time,
                    end_time,
                    duration: end_time - start_time,
                    active,
                });
                start_time = detection.timestamp;
                end_time = detection.timestamp;
                active = detection.active;
            }
        }
        segments.push(Segment {
            start_time,
            end_time,
            duration: end_time - start_time,
            active,
        });
        segments
    }

    /// Segments during which the object was in its active state.
    pub fn active_segments(&self) -> Vec<Segment> {
        self.segments()
            .into_iter()
            .filter(|segment| segment.active)
            .collect()
    }
}
