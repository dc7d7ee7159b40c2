//! Task controller
//!
//! Top-level orchestrator for one task instance: validates the task
//! configuration, wires the workflow state machine to the store, scoring
//! engine, and feedback policy, and projects the committed state into the
//! submission payload. One controller per task; teardown is dropping it.

use crate::models::{InteractionEvent, ScoreRecord, Submission, SubmittedRegion};
use crate::playback::PlaybackSource;
use crate::services::{AnnotationWorkflow, FeedbackPolicy, RegionStore, ScoringEngine};
use earmark_common::config::{FeedbackMode, TaskConfig};
use earmark_common::events::{EarmarkEvent, EventBus, FeedbackDirective, WorkflowStage};
use earmark_common::{time, Result};

#[derive(Debug)]
pub struct TaskController {
    config: TaskConfig,
    track_duration: f64,
    workflow: AnnotationWorkflow,
    event_bus: EventBus,
}

impl TaskController {
    /// Validate the config and wire up the annotation pipeline
    ///
    /// The track duration is read once from the playback collaborator.
    /// Fails with `InvalidTaskConfig` or `NoSolutionSet` before any
    /// workflow activity; a controller that loads cannot hit a
    /// configuration error mid-session.
    pub fn load_task(
        config: TaskConfig,
        playback: &dyn PlaybackSource,
        event_bus: EventBus,
    ) -> Result<Self> {
        let track_duration = playback.track_duration();
        config.validate(track_duration)?;

        let store = RegionStore::new(
            track_duration,
            config.allow_overlap,
            config.vocabulary(),
            event_bus.clone(),
        );
        let scoring = match config.feedback {
            FeedbackMode::None => None,
            _ => {
                // validate() guarantees a non-empty solution set here
                let solution = config.solution.clone().unwrap_or_default();
                Some(ScoringEngine::new(solution, config.false_positive_penalty)?)
            }
        };
        let feedback = FeedbackPolicy::new(config.feedback, config.reveal_curve.clone());
        let workflow = AnnotationWorkflow::new(store, scoring, feedback, event_bus.clone());

        tracing::info!(
            audio_url = %config.audio_url,
            feedback = %config.feedback,
            track_duration,
            "task loaded"
        );
        event_bus.emit_lossy(EarmarkEvent::TaskLoaded {
            audio_url: config.audio_url.clone(),
            feedback: config.feedback.to_string(),
            track_duration,
            timestamp: time::now(),
        });

        Ok(Self {
            config,
            track_duration,
            workflow,
            event_bus,
        })
    }

    /// Forward one interaction event to the workflow
    pub fn handle_event(&mut self, event: InteractionEvent) -> Result<FeedbackDirective> {
        self.workflow.handle_event(event)
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn track_duration(&self) -> f64 {
        self.track_duration
    }

    pub fn stage(&self) -> WorkflowStage {
        self.workflow.stage()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn score_history(&self) -> &[ScoreRecord] {
        self.workflow.score_history()
    }

    /// Snapshot of the current regions in creation order
    ///
    /// The rendering collaborator reads this to draw regions and to learn
    /// the ids it echoes back in select/resize/delete events.
    pub fn regions(&self) -> crate::models::AnnotationSet {
        self.workflow.store().snapshot()
    }

    /// Read-only projection for the submission collaborator
    ///
    /// Callable at any workflow stage; reflects the latest committed state.
    /// Tag edits pending in the presentation layer are invisible here.
    pub fn submission(&self) -> Submission {
        let regions = self
            .workflow
            .store()
            .snapshot()
            .iter()
            .map(|region| SubmittedRegion {
                start_time: region.start_time,
                end_time: region.end_time,
                tags: region.tags.clone(),
            })
            .collect();
        Submission {
            regions,
            score_history: self.workflow.score_history().to_vec(),
        }
    }
}
