//! Event types for the Earmark event system
//!
//! Provides the shared event definitions and EventBus connecting the
//! annotation engine to the presentation collaborator. Every region store
//! mutation, workflow stage change, score update, feedback directive, and
//! surfaced error is observable here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::sync::broadcast;
use uuid::Uuid;

// ========================================
// Shared Enums
// ========================================

/// Workflow interaction stage
///
/// Exactly one stage is active at any time; owned by the workflow state
/// machine. `Idle` is the initial stage and the safe stage every completed
/// or failed action returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// No region selected
    Idle,
    /// User is actively defining a new region's bounds
    Drawing,
    /// A completed region is chosen, tag entry is active
    Selected,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStage::Idle => "Idle",
            WorkflowStage::Drawing => "Drawing",
            WorkflowStage::Selected => "Selected",
        };
        write!(f, "{}", s)
    }
}

/// Score movement relative to the immediately preceding score record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreTrend {
    /// New score is strictly greater than the previous one
    Improving,
    /// New score is strictly less than the previous one
    Worsening,
    /// New score equals the previous one
    Unchanged,
    /// First evaluation in the task, nothing to compare against
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl std::fmt::Display for ScoreTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScoreTrend::Improving => "improving",
            ScoreTrend::Worsening => "worsening",
            ScoreTrend::Unchanged => "unchanged",
            ScoreTrend::NotApplicable => "n/a",
        };
        write!(f, "{}", s)
    }
}

/// Presentation directive produced per scoring event
///
/// Ephemeral: consumed by the presentation collaborator, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedbackDirective {
    /// Nothing to present
    None,
    /// Show a toast message derived from the score trend
    ToastMessage {
        /// Trend the message was derived from
        trend: ScoreTrend,
        /// Deterministic message text for that trend
        message: String,
    },
    /// Uncover a portion of the hidden reference image
    ImageReveal {
        /// Proportion of the image to uncover (0.0-1.0), never decreasing
        reveal_fraction: f64,
    },
}

// ========================================
// Event Enum
// ========================================

/// Earmark event types
///
/// Events are broadcast via EventBus; the presentation collaborator renders
/// them and the submission collaborator may audit them. The engine never
/// consumes its own events within a transition, so subscribers cannot feed
/// back into the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EarmarkEvent {
    /// Task configuration validated and engine wired up
    TaskLoaded {
        /// Audio reference the task annotates
        audio_url: String,
        /// Feedback mode the task runs under
        feedback: String,
        /// Track duration in seconds, read from the playback collaborator
        track_duration: f64,
        /// When the task was loaded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Workflow stage changed
    StageChanged {
        /// Stage before the transition
        old_stage: WorkflowStage,
        /// Stage after the transition
        new_stage: WorkflowStage,
        /// When the stage changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// New region created from a completed draw gesture
    RegionCreated {
        /// Region UUID
        region_id: Uuid,
        /// Region start in seconds
        start_time: f64,
        /// Region end in seconds
        end_time: f64,
        /// When the region was created
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Region bounds changed (boundary drag on an existing region)
    RegionIntervalChanged {
        /// Region UUID
        region_id: Uuid,
        /// New start in seconds
        start_time: f64,
        /// New end in seconds
        end_time: f64,
        /// When the bounds changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Tags committed onto a region
    RegionTagsAssigned {
        /// Region UUID
        region_id: Uuid,
        /// Full replacement tag set
        tags: BTreeSet<String>,
        /// When the tags were assigned
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Region removed from the store
    RegionDeleted {
        /// Region UUID
        region_id: Uuid,
        /// When the region was deleted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Score recomputed after a committed tag assignment
    ScoreUpdated {
        /// Aggregate score in [0, 1]
        score: f64,
        /// Movement relative to the previous score record
        trend: ScoreTrend,
        /// When the score was computed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Feedback directive issued to the presentation collaborator
    FeedbackIssued {
        /// The directive to render
        directive: FeedbackDirective,
        /// When the directive was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A workflow action failed; state reverted to Idle
    ///
    /// Carries the stable error kind plus the human-readable message so the
    /// presentation collaborator can render it. No failure is silent.
    WorkflowError {
        /// Stable error kind (e.g. "InvalidInterval", "UnknownRegion")
        kind: String,
        /// Human-readable error message
        message: String,
        /// When the failure occurred
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl EarmarkEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            EarmarkEvent::TaskLoaded { .. } => "TaskLoaded",
            EarmarkEvent::StageChanged { .. } => "StageChanged",
            EarmarkEvent::RegionCreated { .. } => "RegionCreated",
            EarmarkEvent::RegionIntervalChanged { .. } => "RegionIntervalChanged",
            EarmarkEvent::RegionTagsAssigned { .. } => "RegionTagsAssigned",
            EarmarkEvent::RegionDeleted { .. } => "RegionDeleted",
            EarmarkEvent::ScoreUpdated { .. } => "ScoreUpdated",
            EarmarkEvent::FeedbackIssued { .. } => "FeedbackIssued",
            EarmarkEvent::WorkflowError { .. } => "WorkflowError",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// The engine only ever publishes; it never blocks on subscribers, so all
/// workflow transitions stay synchronous.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EarmarkEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Capacity bounds how many events a slow subscriber may lag behind
    /// before it starts missing events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EarmarkEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EarmarkEvent,
    ) -> Result<usize, broadcast::error::SendError<EarmarkEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// The engine runs headless in tests and the replay CLI, where no
    /// presentation collaborator is attached.
    pub fn emit_lossy(&self, event: EarmarkEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
