//! Stitches per-frame object detections into temporal tracks and merges
//! tracks of the same class into deduplicated entities.
//!
//! Detection production (video decoding, the detector itself, appearance
//! analysis) and output consumption (export writers, overlay renderers) are
//! external collaborators; this crate is the pure transformation between
//! them.

mod assignment;
mod bbox;
mod consolidator;
mod detection;
mod track;
mod tracker;

pub use {
    bbox::BoundingBox,
    consolidator::{Entity, consolidate, detection_score},
    detection::{Detection, FrameMetadata, canonical_label},
    track::{Segment, Track, TrackState},
    tracker::{Tracker, TrackerConfig},
};
