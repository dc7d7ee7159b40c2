//! Scoring engine
//!
//! Compares the current annotation set against the task's solution set and
//! produces a scalar score plus a trend relative to the previous record.
//! Scoring itself is a pure function of the two sets; the engine adds only
//! the append-only history the trend is derived from.

use crate::models::{AnnotationSet, Region, ScoreRecord};
use earmark_common::config::SolutionRegion;
use earmark_common::events::ScoreTrend;
use earmark_common::{time, Error, Result};
use std::collections::BTreeSet;

/// Overlap fraction of two intervals: intersection length over union length
///
/// 0.0 when the intervals do not intersect; 1.0 only for identical bounds.
fn interval_jaccard(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    let intersection = (a_end.min(b_end) - a_start.max(b_start)).max(0.0);
    if intersection <= 0.0 {
        return 0.0;
    }
    let union = (a_end.max(b_end) - a_start.min(b_start)).max(intersection);
    intersection / union
}

/// Whether two tag sets share at least one tag
fn tags_match(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.iter().any(|tag| b.contains(tag))
}

/// Overlap fraction of a user region against one solution region, gated by
/// tag match
fn region_score(region: &Region, solution: &SolutionRegion) -> f64 {
    if !tags_match(&region.tags, &solution.tags) {
        return 0.0;
    }
    interval_jaccard(
        region.start_time,
        region.end_time,
        solution.start_time,
        solution.end_time,
    )
}

/// Pure aggregate score of `current` against `solution`
///
/// Per solution region: the maximum overlap fraction over all current
/// regions sharing at least one tag. Aggregate: the mean over solution
/// regions, minus `false_positive_penalty` per current region that matches
/// no solution region at all, floored at 0. Taking the maximum makes the
/// result independent of region iteration order.
pub fn score_annotation_set(
    current: &AnnotationSet,
    solution: &[SolutionRegion],
    false_positive_penalty: f64,
) -> f64 {
    if solution.is_empty() {
        return 0.0;
    }

    let total: f64 = solution
        .iter()
        .map(|sol| {
            current
                .iter()
                .map(|region| region_score(region, sol))
                .fold(0.0, f64::max)
        })
        .sum();
    let mean = total / solution.len() as f64;

    let false_positives = current
        .iter()
        .filter(|region| solution.iter().all(|sol| region_score(region, sol) == 0.0))
        .count();

    (mean - false_positive_penalty * false_positives as f64).max(0.0)
}

/// Scoring engine owning the solution set and the score history
#[derive(Debug)]
pub struct ScoringEngine {
    solution: Vec<SolutionRegion>,
    false_positive_penalty: f64,
    history: Vec<ScoreRecord>,
}

impl ScoringEngine {
    /// Create an engine over a non-empty solution set
    ///
    /// A missing or empty solution set is a configuration error; the task
    /// controller surfaces it at load time, long before the first
    /// evaluation.
    pub fn new(solution: Vec<SolutionRegion>, false_positive_penalty: f64) -> Result<Self> {
        if solution.is_empty() {
            return Err(Error::NoSolutionSet);
        }
        Ok(Self {
            solution,
            false_positive_penalty,
            history: Vec::new(),
        })
    }

    /// Evaluate a snapshot and append the resulting record to the history
    pub fn evaluate(&mut self, current: &AnnotationSet) -> ScoreRecord {
        let score = score_annotation_set(current, &self.solution, self.false_positive_penalty);
        let trend = match self.history.last() {
            None => ScoreTrend::NotApplicable,
            Some(prev) if score > prev.score => ScoreTrend::Improving,
            Some(prev) if score < prev.score => ScoreTrend::Worsening,
            Some(_) => ScoreTrend::Unchanged,
        };
        let record = ScoreRecord {
            score,
            timestamp: time::now(),
            trend,
        };
        tracing::debug!(score, %trend, "annotation set evaluated");
        self.history.push(record.clone());
        record
    }

    /// Append-only score history, oldest first
    pub fn history(&self) -> &[ScoreRecord] {
        &self.history
    }

    pub fn last(&self) -> Option<&ScoreRecord> {
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earmark_common::time;
    use uuid::Uuid;

    fn region(start: f64, end: f64, tags: &[&str]) -> Region {
        Region {
            id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: time::now(),
        }
    }

    fn solution(start: f64, end: f64, tags: &[&str]) -> SolutionRegion {
        SolutionRegion {
            start_time: start,
            end_time: end,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_interval_jaccard_cases() {
        // Identical intervals
        assert!((interval_jaccard(2.0, 4.0, 2.0, 4.0) - 1.0).abs() < 1e-12);
        // Disjoint
        assert_eq!(interval_jaccard(0.0, 1.0, 2.0, 3.0), 0.0);
        // Touching
        assert_eq!(interval_jaccard(0.0, 2.0, 2.0, 3.0), 0.0);
        // Partial: intersection 1, union 3
        assert!((interval_jaccard(1.0, 3.0, 2.0, 4.0) - 1.0 / 3.0).abs() < 1e-12);
        // Containment: intersection 1, union 2
        assert!((interval_jaccard(2.0, 3.0, 2.0, 4.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tag_gate_zeroes_overlap() {
        let set = AnnotationSet::new(vec![region(2.0, 4.0, &["cat"])]);
        let sol = [solution(2.0, 4.0, &["dog"])];
        assert_eq!(score_annotation_set(&set, &sol, 0.0), 0.0);
    }

    #[test]
    fn test_exact_match_scores_one() {
        let set = AnnotationSet::new(vec![region(2.0, 4.0, &["dog"])]);
        let sol = [solution(2.0, 4.0, &["dog"])];
        assert!((score_annotation_set(&set, &sol, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_best_overlap_wins_per_solution_region() {
        let set = AnnotationSet::new(vec![
            region(1.0, 3.0, &["dog"]),  // 1/3
            region(2.0, 4.0, &["dog"]),  // 1.0
        ]);
        let sol = [solution(2.0, 4.0, &["dog"])];
        assert!((score_annotation_set(&set, &sol, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_over_solution_regions() {
        let set = AnnotationSet::new(vec![region(2.0, 4.0, &["dog"])]);
        let sol = [
            solution(2.0, 4.0, &["dog"]),  // 1.0
            solution(6.0, 8.0, &["cat"]),  // unmatched: 0.0
        ];
        assert!((score_annotation_set(&set, &sol, 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_is_order_independent() {
        let a = region(1.0, 3.0, &["dog"]);
        let b = region(6.0, 7.0, &["cat"]);
        let c = region(2.0, 4.0, &["dog"]);
        let sol = [solution(2.0, 4.0, &["dog"]), solution(6.0, 7.0, &["cat"])];

        let forward = AnnotationSet::new(vec![a.clone(), b.clone(), c.clone()]);
        let reversed = AnnotationSet::new(vec![c, b, a]);
        assert_eq!(
            score_annotation_set(&forward, &sol, 0.25),
            score_annotation_set(&reversed, &sol, 0.25)
        );
    }

    #[test]
    fn test_scoring_is_pure() {
        let set = AnnotationSet::new(vec![region(1.0, 3.0, &["dog"])]);
        let sol = [solution(2.0, 4.0, &["dog"])];
        let first = score_annotation_set(&set, &sol, 0.0);
        let second = score_annotation_set(&set, &sol, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_false_positive_penalty_and_floor() {
        let set = AnnotationSet::new(vec![
            region(2.0, 4.0, &["dog"]),
            region(6.0, 7.0, &["cat"]),  // matches nothing
        ]);
        let sol = [solution(2.0, 4.0, &["dog"])];

        // Default penalty 0: the stray region costs nothing
        assert!((score_annotation_set(&set, &sol, 0.0) - 1.0).abs() < 1e-12);
        // Configured penalty is subtracted once per unmatched region
        assert!((score_annotation_set(&set, &sol, 0.25) - 0.75).abs() < 1e-12);
        // Aggregate is floored at zero
        assert_eq!(score_annotation_set(&set, &sol, 2.0), 0.0);
    }

    #[test]
    fn test_trend_sequence() {
        let sol = vec![solution(2.0, 4.0, &["dog"])];
        let mut engine = ScoringEngine::new(sol, 0.0).unwrap();

        let first = engine.evaluate(&AnnotationSet::new(vec![region(1.0, 3.0, &["dog"])]));
        assert_eq!(first.trend, ScoreTrend::NotApplicable);
        assert!((first.score - 1.0 / 3.0).abs() < 1e-12);

        let second = engine.evaluate(&AnnotationSet::new(vec![region(2.0, 4.0, &["dog"])]));
        assert_eq!(second.trend, ScoreTrend::Improving);
        assert!((second.score - 1.0).abs() < 1e-12);

        let third = engine.evaluate(&AnnotationSet::new(vec![region(2.0, 4.0, &["dog"])]));
        assert_eq!(third.trend, ScoreTrend::Unchanged);

        let fourth = engine.evaluate(&AnnotationSet::new(vec![region(1.0, 3.0, &["dog"])]));
        assert_eq!(fourth.trend, ScoreTrend::Worsening);

        assert_eq!(engine.history().len(), 4);
        assert_eq!(engine.last().unwrap().trend, ScoreTrend::Worsening);
    }

    #[test]
    fn test_engine_rejects_empty_solution() {
        let err = ScoringEngine::new(vec![], 0.0).unwrap_err();
        assert_eq!(err.kind(), "NoSolutionSet");
    }
}
