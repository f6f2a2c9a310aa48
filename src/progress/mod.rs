pub mod json_store;

pub use json_store::JsonProgressStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("progress file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("progress encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Watch state for one video, keyed by video id in a [`ProgressMap`].
///
/// `position` is the resume point and only honored while `seen` is false;
/// completed or failed videos restart from zero. `error` is present only on
/// records written by the fault path. Writes replace the whole record, so a
/// clean replay of a previously failed video clears its error mark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub seen: bool,
    #[serde(rename = "progress", default)]
    pub position: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(default = "unix_epoch")]
    pub updated_at: DateTime<Utc>,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl ProgressRecord {
    /// Live playback tick. Keeps the caller-provided `seen` flag so replays
    /// of an already watched video stay watched.
    pub fn at_position(position: f64, seen: bool) -> Self {
        Self {
            seen,
            position,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Video played to its natural end.
    pub fn completed() -> Self {
        Self {
            seen: true,
            position: 0.0,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Video terminated by a playback fault.
    pub fn faulted() -> Self {
        Self {
            seen: true,
            position: 0.0,
            error: Some(true),
            updated_at: Utc::now(),
        }
    }
}

/// Whole persisted watch state, one record per video id. Entries for videos
/// that have left the catalog are kept so their state survives re-adds.
pub type ProgressMap = HashMap<String, ProgressRecord>;

pub fn is_seen(progress: &ProgressMap, video_id: &str) -> bool {
    progress.get(video_id).map(|r| r.seen).unwrap_or(false)
}

/// Position to resume from when selecting `video_id`: the stored position for
/// an unseen video, zero otherwise.
pub fn resume_position(progress: &ProgressMap, video_id: &str) -> f64 {
    progress
        .get(video_id)
        .filter(|r| !r.seen)
        .map(|r| r.position)
        .unwrap_or(0.0)
}

/// Persistence seam for the watch state. Whole-map read and write; the
/// service owns the in-memory map and pushes snapshots down, so stores never
/// merge.
#[async_trait::async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self) -> Result<ProgressMap, ProgressError>;
    async fn save(&self, progress: &ProgressMap) -> Result<(), ProgressError>;
}
