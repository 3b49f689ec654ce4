use log::debug;
use ordered_hash_map::OrderedHashMap;
use serde::Serialize;

use crate::{
    bbox::BoundingBox,
    detection::{Detection, canonical_label},
    track::Track,
};

const CONFIDENCE_WEIGHT: f32 = 0.35;
const ASPECT_WEIGHT: f32 = 0.30;
const SIZE_WEIGHT: f32 = 0.10;
const EXCLUSION_WEIGHT: f32 = 0.25;

/// One deduplicated object class, merged from every track sharing its
/// canonical label. Created once during consolidation and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entity {
    /// Canonical (trimmed, case-folded) class label.
    pub label: String,
    /// Ids of the merged tracks; the entity never owns track storage.
    pub member_track_ids: Vec<u64>,
    pub num_tracks: usize,
    pub total_detections: usize,
    pub first_seen: f64,
    pub last_seen: f64,
    /// `last_seen - first_seen`.
    pub time_span: f64,
    /// Sum of the member track durations.
    pub total_duration: f64,
    /// Equal-weight mean of each member track's own average confidence,
    /// regardless of how many detections each track has.
    pub avg_confidence: f32,
    /// Equal-weight mean of each member track's active percentage.
    pub active_percentage: f32,
    /// Highest-scoring detection across all member tracks, if any.
    pub best_detection: Option<Detection>,
}

/// Merges finalized tracks into one entity per canonical class label.
///
/// The returned map iterates in first-encountered label order; that order
/// is also the documented tie-break for the best-detection selection.
pub fn consolidate(tracks: &[Track]) -> OrderedHashMap<String, Entity> {
    let mut groups: OrderedHashMap<String, Vec<&Track>> = OrderedHashMap::new();
    for track in tracks {
        let key = canonical_label(&track.label);
        if let Some(group) = groups.get_mut(&key) {
            group.push(track);
        } else {
            groups.insert(key, vec![track]);
        }
    }

    let mut entities = OrderedHashMap::new();
    for (label, group) in groups.iter() {
        let entity = merge_group(label, group);
        debug!(
            target: "consolidator",
            "{label}: merged {} tracks with {} detections",
            entity.num_tracks,
            entity.total_detections
        );
        entities.insert(label.clone(), entity);
    }
    entities
}

fn merge_group(label: &str, group: &[&Track]) -> Entity {
    let num_tracks = group.len();
    let first_seen = group
        .iter()
        .map(|track| track.start_time)
        .fold(f64::INFINITY, f64::min);
    let last_seen = group
        .iter()
        .map(|track| track.end_time)
        .fold(f64::NEG_INFINITY, f64::max);
    let avg_confidence = group
        .iter()
        .map(|track| track.avg_confidence)
        .sum::<f32>()
        / num_tracks as f32;
    let active_percentage = group
        .iter()
        .map(|track| track.active_percentage)
        .sum::<f32>()
        / num_tracks as f32;

    // Strict comparison keeps the first-encountered maximum: tracks in
    // input order, detections in frame order.
    let mut best: Option<(&Detection, f32)> = None;
    for track in group {
        for detection in &track.detections {
            let score = detection_score(detection);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((detection, score));
            }
        }
    }

    Entity {
        label: label.to_owned(),
        member_track_ids: group.iter().map(|track| track.track_id).collect(),
        num_tracks,
        total_detections: group.iter().map(|track| track.detections.len()).sum(),
        first_seen,
        last_seen,
        time_span: last_seen - first_seen,
        total_duration: group.iter().map(|track| track.duration).sum(),
        avg_confidence,
        active_percentage,
        best_detection: best.map(|(detection, _)| detection.clone()),
    }
}

/// Composite score for how well a detection frames the object alone.
///
/// Confidence alone over-selects on detector certainty; the geometric and
/// exclusion terms bias the pick toward a tightly framed, object-only
/// observation.
pub fn detection_score(detection: &Detection) -> f32 {
    CONFIDENCE_WEIGHT * detection.confidence
        + ASPECT_WEIGHT * aspect_score(&detection.bbox)
        + SIZE_WEIGHT * size_score(&detection.bbox)
        + EXCLUSION_WEIGHT * exclusion_score(detection.exclusion)
}

/// Elongated boxes frame the object tightly; near-square ones tend to pull
/// in the surroundings.
fn aspect_score(bbox: &BoundingBox) -> f32 {
    let ratio = bbox.aspect_ratio();
    if ratio < 1.2 {
        0.2
    } else if ratio < 1.5 {
        0.4
    } else if ratio < 2.5 {
        1.0
    } else if ratio < 4.0 {
        0.9
    } else {
        0.6
    }
}

/// Medium-sized boxes are ideal; very large ones usually include more than
/// the object.
fn size_score(bbox: &BoundingBox) -> f32 {
    let area = bbox.area();
    if area < 5_000.0 {
        0.6
    } else if area < 30_000.0 {
        1.0
    } else if area < 100_000.0 {
        0.8
    } else {
        0.4
    }
}

/// An unavailable signal never penalizes the detection.
fn exclusion_score(exclusion: Option<f32>) -> f32 {
    match exclusion {
        Some(signal) if signal > 0.30 => 0.1,
        Some(signal) if signal > 0.20 => 0.3,
        Some(signal) if signal > 0.10 => 0.6,
        _ => 1.0,
    }
}
