//! Annotation workflow state machine
//!
//! The controller at the center of the engine: tracks which interaction
//! stage the session is in, validates the staged protocol
//! (Idle → Drawing → Selected), and invokes the region store, scoring
//! engine, and feedback policy at the right points.
//!
//! # Stage progression
//! - `Idle --drawStart--> Drawing`
//! - `Drawing --drawComplete--> Selected` (region created, now tag-entry)
//! - `Drawing --drawCancel--> Idle`
//! - `Selected --tagsCommitted--> Idle` (scores + feedback when enabled)
//! - `Selected --regionSelect--> Selected` (switch, unsaved edits discarded)
//! - `Selected --regionDeselect--> Idle`
//! - `Selected --regionDeleteRequested--> Idle` (no scoring)
//!
//! Every store failure reverts to `Idle` and is emitted as a
//! `WorkflowError` event; no failure is silent. Gestures that do not apply
//! to the current stage are logged and ignored; they are protocol noise
//! from the renderer, not contract violations.

use crate::models::{InteractionEvent, ScoreRecord};
use crate::services::{FeedbackPolicy, RegionStore, ScoringEngine};
use earmark_common::events::{
    EarmarkEvent, EventBus, FeedbackDirective, WorkflowStage,
};
use earmark_common::{time, Error, Result};
use uuid::Uuid;

#[derive(Debug)]
pub struct AnnotationWorkflow {
    stage: WorkflowStage,
    /// Region under tag entry; Some exactly while stage is Selected
    selected: Option<Uuid>,
    /// Provisional bounds during a draw gesture
    draw_bounds: Option<(f64, f64)>,
    store: RegionStore,
    /// None when feedback mode is `none`: scoring is never invoked
    scoring: Option<ScoringEngine>,
    feedback: FeedbackPolicy,
    event_bus: EventBus,
}

impl AnnotationWorkflow {
    pub fn new(
        store: RegionStore,
        scoring: Option<ScoringEngine>,
        feedback: FeedbackPolicy,
        event_bus: EventBus,
    ) -> Self {
        Self {
            stage: WorkflowStage::Idle,
            selected: None,
            draw_bounds: None,
            store,
            scoring,
            feedback,
            event_bus,
        }
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn selected_region(&self) -> Option<Uuid> {
        self.selected
    }

    /// Provisional bounds of the in-flight draw gesture, if any
    pub fn draw_bounds(&self) -> Option<(f64, f64)> {
        self.draw_bounds
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    /// Score history so far (empty when feedback is `none`)
    pub fn score_history(&self) -> &[ScoreRecord] {
        self.scoring.as_ref().map(|s| s.history()).unwrap_or(&[])
    }

    /// Process one interaction event to completion
    ///
    /// Synchronous: scoring and feedback finish before this returns, so no
    /// two events ever interleave. Returns the feedback directive the
    /// presentation collaborator should render (`None` for most events).
    pub fn handle_event(&mut self, event: InteractionEvent) -> Result<FeedbackDirective> {
        match (self.stage, event) {
            (WorkflowStage::Idle, InteractionEvent::DrawStart) => {
                self.draw_bounds = None;
                self.set_stage(WorkflowStage::Drawing);
                Ok(FeedbackDirective::None)
            }

            (WorkflowStage::Drawing, InteractionEvent::DrawUpdate { start_time, end_time }) => {
                // Provisional only; nothing touches the store until the
                // gesture completes
                self.draw_bounds = Some((start_time, end_time));
                Ok(FeedbackDirective::None)
            }

            (WorkflowStage::Drawing, InteractionEvent::DrawComplete { start_time, end_time }) => {
                self.draw_bounds = None;
                match self.store.create_region(start_time, end_time) {
                    Ok(region) => {
                        self.selected = Some(region.id);
                        self.set_stage(WorkflowStage::Selected);
                        Ok(FeedbackDirective::None)
                    }
                    Err(e) => Err(self.fail(e)),
                }
            }

            (WorkflowStage::Drawing, InteractionEvent::DrawCancel) => {
                // No partial side effects: no region was created
                self.draw_bounds = None;
                self.set_stage(WorkflowStage::Idle);
                Ok(FeedbackDirective::None)
            }

            (
                WorkflowStage::Idle | WorkflowStage::Selected,
                InteractionEvent::RegionSelect { region_id },
            ) => {
                if self.store.contains(region_id) {
                    // Switching selection discards unsaved tag edits; they
                    // live in the presentation layer until commit
                    self.selected = Some(region_id);
                    self.set_stage(WorkflowStage::Selected);
                    Ok(FeedbackDirective::None)
                } else {
                    Err(self.fail(Error::UnknownRegion(region_id)))
                }
            }

            (WorkflowStage::Selected, InteractionEvent::RegionDeselect) => {
                self.selected = None;
                self.set_stage(WorkflowStage::Idle);
                Ok(FeedbackDirective::None)
            }

            (
                WorkflowStage::Selected,
                InteractionEvent::RegionResize {
                    region_id,
                    start_time,
                    end_time,
                },
            ) => match self.store.update_interval(region_id, start_time, end_time) {
                // Bounds changed but nothing was committed: no scoring
                Ok(()) => Ok(FeedbackDirective::None),
                Err(e) => Err(self.fail(e)),
            },

            (WorkflowStage::Selected, InteractionEvent::TagsCommitted { tags }) => {
                let region_id = match self.selected {
                    Some(id) => id,
                    None => {
                        tracing::warn!("Selected stage without a selected region");
                        return Ok(FeedbackDirective::None);
                    }
                };
                if let Err(e) = self.store.assign_tags(region_id, tags) {
                    return Err(self.fail(e));
                }
                self.selected = None;
                self.set_stage(WorkflowStage::Idle);
                Ok(self.score_and_feedback())
            }

            (
                WorkflowStage::Idle | WorkflowStage::Selected,
                InteractionEvent::RegionDeleteRequested { region_id },
            ) => {
                if let Err(e) = self.store.delete_region(region_id) {
                    return Err(self.fail(e));
                }
                if self.selected == Some(region_id) {
                    self.selected = None;
                }
                // Deletion alone does not re-score; scoring only follows a
                // committed tag assignment
                self.set_stage(WorkflowStage::Idle);
                Ok(FeedbackDirective::None)
            }

            (stage, event) => {
                tracing::warn!(%stage, ?event, "ignoring out-of-stage interaction event");
                Ok(FeedbackDirective::None)
            }
        }
    }

    /// Score the committed state and derive the feedback directive
    ///
    /// No-op returning `None` when feedback is `none` (no scoring engine
    /// exists). Under `silent` the record is still computed and retained.
    fn score_and_feedback(&mut self) -> FeedbackDirective {
        let engine = match self.scoring.as_mut() {
            Some(engine) => engine,
            None => return FeedbackDirective::None,
        };

        let record = engine.evaluate(&self.store.snapshot());
        self.event_bus.emit_lossy(EarmarkEvent::ScoreUpdated {
            score: record.score,
            trend: record.trend,
            timestamp: time::now(),
        });

        let directive = self.feedback.directive_for(&record);
        if directive != FeedbackDirective::None {
            self.event_bus.emit_lossy(EarmarkEvent::FeedbackIssued {
                directive: directive.clone(),
                timestamp: time::now(),
            });
        }
        directive
    }

    /// Revert to the safe stage and surface the failure
    fn fail(&mut self, error: Error) -> Error {
        tracing::warn!(kind = error.kind(), %error, "workflow action failed");
        self.selected = None;
        self.draw_bounds = None;
        self.set_stage(WorkflowStage::Idle);
        self.event_bus.emit_lossy(EarmarkEvent::WorkflowError {
            kind: error.kind().to_string(),
            message: error.to_string(),
            timestamp: time::now(),
        });
        error
    }

    fn set_stage(&mut self, new_stage: WorkflowStage) {
        if self.stage == new_stage {
            return;
        }
        let old_stage = self.stage;
        self.stage = new_stage;
        tracing::debug!(%old_stage, %new_stage, "workflow stage changed");
        self.event_bus.emit_lossy(EarmarkEvent::StageChanged {
            old_stage,
            new_stage,
            timestamp: time::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earmark_common::config::{FeedbackMode, RevealCurve, SolutionRegion, TagVocabulary};
    use earmark_common::events::ScoreTrend;
    use std::collections::BTreeSet;

    fn vocabulary() -> TagVocabulary {
        TagVocabulary::new(&["dog".to_string(), "cat".to_string()], &[])
    }

    fn solution_dog() -> Vec<SolutionRegion> {
        vec![SolutionRegion {
            start_time: 2.0,
            end_time: 4.0,
            tags: ["dog".to_string()].into_iter().collect(),
        }]
    }

    fn workflow(mode: FeedbackMode) -> AnnotationWorkflow {
        let bus = EventBus::new(128);
        let store = RegionStore::new(10.0, true, vocabulary(), bus.clone());
        let scoring = match mode {
            FeedbackMode::None => None,
            _ => Some(ScoringEngine::new(solution_dog(), 0.0).unwrap()),
        };
        let feedback = FeedbackPolicy::new(mode, RevealCurve::default());
        AnnotationWorkflow::new(store, scoring, feedback, bus)
    }

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn draw_region(wf: &mut AnnotationWorkflow, start: f64, end: f64) -> Uuid {
        wf.handle_event(InteractionEvent::DrawStart).unwrap();
        wf.handle_event(InteractionEvent::DrawComplete {
            start_time: start,
            end_time: end,
        })
        .unwrap();
        wf.selected_region().expect("draw should select the region")
    }

    #[test]
    fn test_draw_cycle_reaches_selected_then_idle() {
        let mut wf = workflow(FeedbackMode::None);
        assert_eq!(wf.stage(), WorkflowStage::Idle);

        wf.handle_event(InteractionEvent::DrawStart).unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Drawing);

        wf.handle_event(InteractionEvent::DrawUpdate {
            start_time: 2.0,
            end_time: 3.0,
        })
        .unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Drawing);
        assert_eq!(wf.draw_bounds(), Some((2.0, 3.0)));
        assert!(wf.store().is_empty(), "drawUpdate must not touch the store");

        wf.handle_event(InteractionEvent::DrawComplete {
            start_time: 2.0,
            end_time: 4.0,
        })
        .unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Selected);
        assert_eq!(wf.store().len(), 1);

        wf.handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert_eq!(wf.selected_region(), None);
    }

    #[test]
    fn test_cancel_draw_creates_nothing() {
        let mut wf = workflow(FeedbackMode::None);
        wf.handle_event(InteractionEvent::DrawStart).unwrap();
        wf.handle_event(InteractionEvent::DrawCancel).unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert!(wf.store().is_empty());
    }

    #[test]
    fn test_invalid_draw_reverts_to_idle_and_surfaces_error() {
        let mut wf = workflow(FeedbackMode::None);
        wf.handle_event(InteractionEvent::DrawStart).unwrap();

        let err = wf
            .handle_event(InteractionEvent::DrawComplete {
                start_time: 4.0,
                end_time: 2.0,
            })
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidInterval");
        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert_eq!(wf.selected_region(), None);
        assert!(wf.store().is_empty());
    }

    #[test]
    fn test_select_other_switches_selection() {
        let mut wf = workflow(FeedbackMode::None);
        let first = draw_region(&mut wf, 1.0, 2.0);
        wf.handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();
        let second = draw_region(&mut wf, 5.0, 6.0);
        assert_eq!(wf.selected_region(), Some(second));

        // Switch back to the first without committing the second's edits
        wf.handle_event(InteractionEvent::RegionSelect { region_id: first })
            .unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Selected);
        assert_eq!(wf.selected_region(), Some(first));
        // The second region's committed state is untouched
        assert!(wf.store().get(second).unwrap().tags.is_empty());
    }

    #[test]
    fn test_select_unknown_region_fails_to_idle() {
        let mut wf = workflow(FeedbackMode::None);
        let err = wf
            .handle_event(InteractionEvent::RegionSelect {
                region_id: Uuid::new_v4(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownRegion");
        assert_eq!(wf.stage(), WorkflowStage::Idle);
    }

    #[test]
    fn test_deselect_returns_to_idle() {
        let mut wf = workflow(FeedbackMode::None);
        draw_region(&mut wf, 1.0, 2.0);
        wf.handle_event(InteractionEvent::RegionDeselect).unwrap();
        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert_eq!(wf.selected_region(), None);
        // The region itself survives deselection
        assert_eq!(wf.store().len(), 1);
    }

    #[test]
    fn test_commit_triggers_scoring_and_directive() {
        let mut wf = workflow(FeedbackMode::Notify);
        draw_region(&mut wf, 2.0, 4.0);
        let directive = wf
            .handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();

        match directive {
            FeedbackDirective::ToastMessage { trend, .. } => {
                assert_eq!(trend, ScoreTrend::NotApplicable)
            }
            other => panic!("expected toast, got {:?}", other),
        }
        assert_eq!(wf.score_history().len(), 1);
        assert!((wf.score_history()[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_silent_mode_scores_without_directive() {
        let mut wf = workflow(FeedbackMode::Silent);
        draw_region(&mut wf, 2.0, 4.0);
        let directive = wf
            .handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();
        assert_eq!(directive, FeedbackDirective::None);
        assert_eq!(wf.score_history().len(), 1);
    }

    #[test]
    fn test_feedback_none_never_scores() {
        let mut wf = workflow(FeedbackMode::None);
        draw_region(&mut wf, 2.0, 4.0);
        let directive = wf
            .handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();
        assert_eq!(directive, FeedbackDirective::None);
        assert!(wf.score_history().is_empty());
    }

    #[test]
    fn test_invalid_tag_commit_reverts_to_idle() {
        let mut wf = workflow(FeedbackMode::Silent);
        let region_id = draw_region(&mut wf, 2.0, 4.0);

        let err = wf
            .handle_event(InteractionEvent::TagsCommitted { tags: tags(&["horn"]) })
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidTag");
        assert_eq!(wf.stage(), WorkflowStage::Idle);
        // Failed commit scored nothing and assigned nothing
        assert!(wf.score_history().is_empty());
        assert!(wf.store().get(region_id).unwrap().tags.is_empty());
    }

    #[test]
    fn test_delete_selected_does_not_score() {
        let mut wf = workflow(FeedbackMode::Silent);
        let region_id = draw_region(&mut wf, 2.0, 4.0);
        wf.handle_event(InteractionEvent::RegionDeleteRequested { region_id })
            .unwrap();

        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert!(wf.store().is_empty());
        assert!(wf.score_history().is_empty());
    }

    #[test]
    fn test_resize_updates_bounds_without_scoring() {
        let mut wf = workflow(FeedbackMode::Silent);
        let region_id = draw_region(&mut wf, 1.0, 3.0);
        wf.handle_event(InteractionEvent::RegionResize {
            region_id,
            start_time: 2.0,
            end_time: 4.0,
        })
        .unwrap();

        assert_eq!(wf.stage(), WorkflowStage::Selected);
        let region = wf.store().get(region_id).unwrap();
        assert_eq!(region.start_time, 2.0);
        assert_eq!(region.end_time, 4.0);
        assert!(wf.score_history().is_empty());
    }

    #[test]
    fn test_out_of_stage_gestures_are_ignored() {
        let mut wf = workflow(FeedbackMode::None);

        // None of these apply in Idle
        wf.handle_event(InteractionEvent::DrawUpdate {
            start_time: 1.0,
            end_time: 2.0,
        })
        .unwrap();
        wf.handle_event(InteractionEvent::DrawCancel).unwrap();
        wf.handle_event(InteractionEvent::TagsCommitted { tags: tags(&["dog"]) })
            .unwrap();
        wf.handle_event(InteractionEvent::RegionDeselect).unwrap();

        assert_eq!(wf.stage(), WorkflowStage::Idle);
        assert!(wf.store().is_empty());
    }

    #[test]
    fn test_failure_emits_workflow_error_event() {
        let bus = EventBus::new(128);
        let mut rx = bus.subscribe();
        let store = RegionStore::new(10.0, true, vocabulary(), bus.clone());
        let feedback = FeedbackPolicy::new(FeedbackMode::None, RevealCurve::default());
        let mut wf = AnnotationWorkflow::new(store, None, feedback, bus);

        wf.handle_event(InteractionEvent::DrawStart).unwrap();
        wf.handle_event(InteractionEvent::DrawComplete {
            start_time: 5.0,
            end_time: 5.0,
        })
        .unwrap_err();

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if let EarmarkEvent::WorkflowError { kind, .. } = event {
                assert_eq!(kind, "InvalidInterval");
                saw_error = true;
            }
        }
        assert!(saw_error, "failure must be observable on the bus");
    }
}
