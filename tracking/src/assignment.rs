use lapjv::{Matrix, lapjv};

use crate::{
    detection::{Detection, same_label},
    track::ActiveTrack,
};

/// Cost of a class-incompatible pairing. In-class costs live in `[-1, 0]`,
/// so this can never survive the acceptance threshold.
const CLASS_MISMATCH_COST: f32 = 1.0;

/// Cost filling the square-padding slots of the solver matrix.
const PADDING_COST: f32 = 1_000_000.0;

/// Matches current-frame detections to active tracks.
///
/// Builds a detections-by-tracks cost matrix of negated IoU against each
/// track's most recent detection (cross-class pairs are gated out), pads it
/// square, solves the rectangular assignment with Jonker-Volgenant and keeps
/// only pairs whose IoU clears `iou_threshold`.
///
/// Returns `(matches, unmatched_detections, unmatched_tracks)` as index
/// pairs and pools into the input slices.
pub(crate) fn match_detections(
    detections: &[Detection],
    tracks: &[ActiveTrack],
    iou_threshold: f32,
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    let n = detections.len();
    let m = tracks.len();
    if n == 0 || m == 0 {
        return (Vec::new(), (0..n).collect(), (0..m).collect());
    }

    let mut costs = vec![vec![0.0f32; m]; n];
    for (i, detection) in detections.iter().enumerate() {
        for (j, track) in tracks.iter().enumerate() {
            costs[i][j] = if same_label(&detection.label, track.label()) {
                -detection.bbox.iou(&track.last_detection().bbox)
            } else {
                CLASS_MISMATCH_COST
            };
        }
    }

    let k = n.max(m);
    let mut data = vec![PADDING_COST; k * k];
    for i in 0..n {
        for j in 0..m {
            data[i * k + j] = costs[i][j];
        }
    }

    let mat = Matrix::from_shape_vec((k, k), data).unwrap();
    let (rows, _) = lapjv(&mat).expect("lapjv failed");

    let mut matches = Vec::new();
    let mut unmatched_detections = Vec::new();
    let mut matched_tracks = vec![false; m];
    for (i, &j) in rows.iter().enumerate().take(n) {
        if j < m && -costs[i][j] >= iou_threshold {
            matches.push((i, j));
            matched_tracks[j] = true;
        } else {
            unmatched_detections.push(i);
        }
    }
    let unmatched_tracks = matched_tracks
        .iter()
        .enumerate()
        .filter_map(|(j, &matched)| if matched { None } else { Some(j) })
        .collect();

    (matches, unmatched_detections, unmatched_tracks)
}
