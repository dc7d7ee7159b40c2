//! Data models for the annotation task engine

use chrono::{DateTime, Utc};
use earmark_common::events::ScoreTrend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A user-drawn time interval with assigned tags
///
/// Owned exclusively by the region store; everything handed out is a copy.
/// Invariant: `0 <= start_time < end_time <= track_duration`, enforced at
/// creation and on every bounds update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Region UUID
    pub id: Uuid,
    /// Start in seconds
    pub start_time: f64,
    /// End in seconds
    pub end_time: f64,
    /// Committed tags; empty until the first commit
    pub tags: BTreeSet<String>,
    /// When the region was created
    pub created_at: DateTime<Utc>,
}

impl Region {
    /// Interval length in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether this region's interval intersects `[start, end)` with
    /// positive length (touching endpoints do not intersect)
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Ordered snapshot of the regions at a point in time
///
/// The unit compared against the solution set. Order is creation order;
/// scoring does not depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationSet {
    regions: Vec<Region>,
}

impl AnnotationSet {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

/// One entry of the append-only score log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Aggregate score in [0, 1]
    pub score: f64,
    /// When the score was computed
    pub timestamp: DateTime<Utc>,
    /// Movement relative to the immediately preceding record
    pub trend: ScoreTrend,
}

/// Region as it appears in the submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRegion {
    pub start_time: f64,
    pub end_time: f64,
    pub tags: BTreeSet<String>,
}

/// Read-only projection handed to the network-submission collaborator
///
/// Reflects committed state only; pending tag edits in the presentation
/// layer are invisible here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Regions in creation order
    pub regions: Vec<SubmittedRegion>,
    /// Full score history, oldest first (empty when feedback is `none`)
    pub score_history: Vec<ScoreRecord>,
}

/// Discrete interaction event from the rendering collaborator
///
/// Tag names mirror the gesture names the renderer emits, so recorded
/// sessions deserialize directly into replay scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InteractionEvent {
    /// Pointer down on empty timeline: begin defining a region
    DrawStart,
    /// Drag in progress; bounds are provisional
    #[serde(rename_all = "camelCase")]
    DrawUpdate { start_time: f64, end_time: f64 },
    /// Drag finished with final bounds
    #[serde(rename_all = "camelCase")]
    DrawComplete { start_time: f64, end_time: f64 },
    /// Drag aborted (e.g. zero-length)
    DrawCancel,
    /// Click on an existing region
    #[serde(rename_all = "camelCase")]
    RegionSelect { region_id: Uuid },
    /// Click away from the selected region
    RegionDeselect,
    /// Boundary drag on an existing region
    #[serde(rename_all = "camelCase")]
    RegionResize {
        region_id: Uuid,
        start_time: f64,
        end_time: f64,
    },
    /// Tag entry confirmed for the selected region
    TagsCommitted { tags: BTreeSet<String> },
    /// Delete request for a region
    #[serde(rename_all = "camelCase")]
    RegionDeleteRequested { region_id: Uuid },
}
