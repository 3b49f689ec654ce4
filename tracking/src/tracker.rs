use std::{collections::BTreeMap, mem};

use anyhow::{Result, bail};
use log::debug;

use crate::{
    assignment::match_detections,
    detection::{Detection, FrameMetadata},
    track::{ActiveTrack, Track},
};

/// Tuning knobs for the per-frame matching loop.
#[derive(Clone, Copy, Debug)]
pub struct TrackerConfig {
    /// Minimum IoU for a solver-proposed pair to be accepted.
    pub iou_threshold: f32,
    /// Consecutive missed frames a track survives before expiring.
    pub max_frames_to_skip: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_frames_to_skip: 5,
        }
    }
}

/// Stitches per-frame detections into temporal tracks.
///
/// One tracker owns the active track registry and the id counter for one
/// run. Frames must arrive fully populated and in strictly ascending frame
/// order, either one at a time through [`Tracker::observe_frame`] or in a
/// single batch through [`Tracker::run`]; reordering would break the
/// "last detection is most recent" assumption the matcher relies on.
#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    next_track_id: u64,
    active: Vec<ActiveTrack>,
    completed: Vec<ActiveTrack>,
    last_frame_index: Option<u64>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            next_track_id: 0,
            active: Vec::new(),
            completed: Vec::new(),
            last_frame_index: None,
        }
    }

    /// Ingests one fully populated frame.
    ///
    /// Every detection is validated before any track is touched, so a
    /// failed call leaves the tracker unchanged. An empty `detections`
    /// list advances the miss counter of every active track.
    pub fn observe_frame(&mut self, frame_index: u64, detections: Vec<Detection>) -> Result<()> {
        if let Some(last) = self.last_frame_index {
            if frame_index <= last {
                bail!("frame {frame_index} delivered after frame {last}; frames must ascend");
            }
        }
        for detection in &detections {
            detection.validate()?;
            if detection.frame_index != frame_index {
                bail!(
                    "detection for frame {} delivered in frame {frame_index}",
                    detection.frame_index
                );
            }
        }
        self.last_frame_index = Some(frame_index);

        let (matches, unmatched_detections, unmatched_tracks) =
            match_detections(&detections, &self.active, self.config.iou_threshold);

        let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
        for (detection_index, track_index) in matches {
            let detection = slots[detection_index]
                .take()
                .expect("solver pairs each detection at most once");
            self.active[track_index].record_match(detection);
        }
        for track_index in unmatched_tracks {
            self.active[track_index].record_miss();
        }
        for detection_index in unmatched_detections {
            let detection = slots[detection_index]
                .take()
                .expect("solver pairs each detection at most once");
            self.active.push(ActiveTrack::new(self.next_track_id, detection));
            self.next_track_id += 1;
        }

        let max_frames_to_skip = self.config.max_frames_to_skip;
        for mut track in mem::take(&mut self.active) {
            if track.frames_since_last_match() > max_frames_to_skip {
                track.expire();
                self.completed.push(track);
            } else {
                self.active.push(track);
            }
        }
        Ok(())
    }

    /// Force-expires every remaining active track and produces the
    /// finalized output, sorted by start time.
    pub fn finish(mut self) -> Vec<Track> {
        for mut track in self.active.drain(..) {
            track.expire();
            self.completed.push(track);
        }

        let mut tracks: Vec<Track> = self
            .completed
            .into_iter()
            .map(ActiveTrack::finalize)
            .collect();
        tracks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        debug!(target: "tracker", "run finished with {} tracks", tracks.len());
        tracks
    }

    /// Batch entry point: groups detections by frame, unions them with the
    /// sampled frame metadata and folds [`Tracker::observe_frame`] over the
    /// frames in ascending order.
    ///
    /// The union matters: a detection whose frame is missing from `frames`
    /// is still tracked, and a metadata frame without detections still ages
    /// active tracks.
    pub fn run(mut self, detections: Vec<Detection>, frames: &[FrameMetadata]) -> Result<Vec<Track>> {
        let mut by_frame: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for frame in frames {
            by_frame.entry(frame.frame_index).or_default();
        }
        for detection in detections {
            by_frame.entry(detection.frame_index).or_default().push(detection);
        }

        for (frame_index, frame_detections) in by_frame {
            self.observe_frame(frame_index, frame_detections)?;
        }
        Ok(self.finish())
    }
}
