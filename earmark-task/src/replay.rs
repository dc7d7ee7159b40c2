//! Interaction script replay
//!
//! Runs a recorded interaction session against a task configuration and
//! collects the feedback directives, surfaced errors, and the final
//! submission. Backs the CLI binary and end-to-end tests; a replayed
//! session behaves identically to driving the controller live.

use crate::models::{InteractionEvent, Submission};
use crate::playback::FixedTrack;
use crate::services::TaskController;
use earmark_common::config::TaskConfig;
use earmark_common::events::{EventBus, FeedbackDirective};
use earmark_common::Result;
use serde::{Deserialize, Serialize};

/// A recorded interaction session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    /// Track duration the playback collaborator reported when recording
    pub track_duration: f64,
    /// Interaction events in arrival order
    pub events: Vec<InteractionEvent>,
}

/// Outcome of a replayed session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Non-trivial feedback directives in the order they were issued
    pub directives: Vec<FeedbackDirective>,
    /// Surfaced workflow errors; each one reverted the session to Idle
    pub errors: Vec<String>,
    /// Final submission projection
    pub submission: Submission,
}

/// Replay a script against a task configuration
///
/// Workflow errors are recoverable by design, so the replay records them
/// and continues, exactly like a live user who sees the error message and
/// keeps annotating. Only a config that fails load aborts the replay.
pub fn run(config: TaskConfig, script: &ReplayScript, event_bus: EventBus) -> Result<ReplayReport> {
    let playback = FixedTrack::new(script.track_duration);
    let mut controller = TaskController::load_task(config, &playback, event_bus)?;

    let mut directives = Vec::new();
    let mut errors = Vec::new();
    for event in &script.events {
        match controller.handle_event(event.clone()) {
            Ok(FeedbackDirective::None) => {}
            Ok(directive) => directives.push(directive),
            Err(e) => errors.push(e.to_string()),
        }
    }

    tracing::info!(
        events = script.events.len(),
        directives = directives.len(),
        errors = errors.len(),
        "replay finished"
    );
    Ok(ReplayReport {
        directives,
        errors,
        submission: controller.submission(),
    })
}
