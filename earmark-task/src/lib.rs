//! earmark-task - Annotation task engine
//!
//! Tracks user-drawn, tagged time regions over an audio track, enforces the
//! staged interaction protocol (Idle → Drawing → Selected), scores the
//! current annotation set against a reference solution, and derives feedback
//! directives for the presentation collaborator.
//!
//! Rendering, audio playback, and network submission are external
//! collaborators; this crate consumes their interaction events and exposes
//! the submission projection they read.

pub mod models;
pub mod playback;
pub mod replay;
pub mod services;

pub use models::{AnnotationSet, InteractionEvent, Region, ScoreRecord, Submission};
pub use playback::{FixedTrack, PlaybackSource};
pub use services::{
    AnnotationWorkflow, FeedbackPolicy, RegionStore, ScoringEngine, TaskController,
};
