//! Feedback policy
//!
//! Maps the task's feedback mode and a fresh score record to a presentation
//! directive. The policy owns the one piece of state feedback needs: the
//! best score ever achieved, which drives the image reveal so that a region
//! once uncovered is never hidden again.

use crate::models::ScoreRecord;
use earmark_common::config::{FeedbackMode, RevealCurve};
use earmark_common::events::{FeedbackDirective, ScoreTrend};

/// Deterministic toast text for a score trend
pub fn toast_message(trend: ScoreTrend) -> &'static str {
    match trend {
        ScoreTrend::Improving => "Nice! Your annotations are getting closer.",
        ScoreTrend::Worsening => "That change moved you further away.",
        ScoreTrend::Unchanged => "No change in your score.",
        ScoreTrend::NotApplicable => "Score recorded.",
    }
}

#[derive(Debug)]
pub struct FeedbackPolicy {
    mode: FeedbackMode,
    reveal_curve: RevealCurve,
    best_score: f64,
}

impl FeedbackPolicy {
    pub fn new(mode: FeedbackMode, reveal_curve: RevealCurve) -> Self {
        Self {
            mode,
            reveal_curve,
            best_score: 0.0,
        }
    }

    /// Directive for a fresh score record
    ///
    /// `none` and `silent` both present nothing; under `silent` the record
    /// still exists in the engine history for final submission. The reveal
    /// fraction depends only on the best score ever, not the latest one.
    pub fn directive_for(&mut self, record: &ScoreRecord) -> FeedbackDirective {
        match self.mode {
            FeedbackMode::None | FeedbackMode::Silent => FeedbackDirective::None,
            FeedbackMode::Notify => FeedbackDirective::ToastMessage {
                trend: record.trend,
                message: toast_message(record.trend).to_string(),
            },
            FeedbackMode::HiddenImage => {
                if record.score > self.best_score {
                    self.best_score = record.score;
                }
                FeedbackDirective::ImageReveal {
                    reveal_fraction: self.reveal_curve.fraction_for(self.best_score),
                }
            }
        }
    }

    /// Best score ever achieved in this task
    pub fn best_score(&self) -> f64 {
        self.best_score
    }
}
