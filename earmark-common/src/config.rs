//! Task configuration loading and validation
//!
//! A task config is the immutable input bundle handed to the task controller
//! at load time: audio reference, visualization and feedback modes, tag
//! vocabulary, overlap/scoring policy, and (when feedback is enabled) the
//! solution set and reference image. Field names on the wire are camelCase,
//! matching the task payload served by the original annotation backend.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// What the user sees after each scored action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackMode {
    /// No scoring at all
    None,
    /// Score is computed and retained, nothing is shown
    Silent,
    /// Toast message derived from the score trend
    Notify,
    /// Progressive reveal of a hidden reference image
    HiddenImage,
}

impl Default for FeedbackMode {
    fn default() -> Self {
        FeedbackMode::None
    }
}

impl std::fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedbackMode::None => "none",
            FeedbackMode::Silent => "silent",
            FeedbackMode::Notify => "notify",
            FeedbackMode::HiddenImage => "hiddenImage",
        };
        write!(f, "{}", s)
    }
}

/// How the external renderer visualizes the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualizationMode {
    Waveform,
    Spectrogram,
}

impl Default for VisualizationMode {
    fn default() -> Self {
        VisualizationMode::Waveform
    }
}

/// Ground-truth reference region used for scoring
///
/// Immutable after load; owned by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRegion {
    /// Start in seconds
    pub start_time: f64,
    /// End in seconds
    pub end_time: f64,
    /// Tags a user region must share at least one of to match
    pub tags: BTreeSet<String>,
}

/// One step of the image reveal curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealStep {
    /// Best-score threshold at which this step activates
    pub min_score: f64,
    /// Image fraction revealed once the threshold is reached
    pub fraction: f64,
}

/// Non-decreasing step function from best score to reveal fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealCurve {
    pub steps: Vec<RevealStep>,
}

impl Default for RevealCurve {
    /// Quintile steps: each 0.2 of score reveals another 0.2 of the image
    fn default() -> Self {
        let steps = (1..=5)
            .map(|i| RevealStep {
                min_score: i as f64 * 0.2,
                fraction: i as f64 * 0.2,
            })
            .collect();
        Self { steps }
    }
}

impl RevealCurve {
    /// Reveal fraction for the given best-ever score
    ///
    /// Highest step whose threshold is reached wins; 0.0 below the first
    /// step. Assumes a validated curve (steps sorted by threshold).
    pub fn fraction_for(&self, best_score: f64) -> f64 {
        self.steps
            .iter()
            .filter(|step| best_score >= step.min_score)
            .map(|step| step.fraction)
            .last()
            .unwrap_or(0.0)
    }

    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::InvalidTaskConfig(
                "reveal curve must have at least one step".to_string(),
            ));
        }
        let mut prev: Option<&RevealStep> = None;
        for step in &self.steps {
            if !(0.0..=1.0).contains(&step.min_score) || !step.min_score.is_finite() {
                return Err(Error::InvalidTaskConfig(format!(
                    "reveal step threshold {} outside [0, 1]",
                    step.min_score
                )));
            }
            if !(0.0..=1.0).contains(&step.fraction) || !step.fraction.is_finite() {
                return Err(Error::InvalidTaskConfig(format!(
                    "reveal step fraction {} outside [0, 1]",
                    step.fraction
                )));
            }
            if let Some(p) = prev {
                if step.min_score <= p.min_score || step.fraction < p.fraction {
                    return Err(Error::InvalidTaskConfig(
                        "reveal curve steps must be increasing in threshold and non-decreasing in fraction"
                            .to_string(),
                    ));
                }
            }
            prev = Some(step);
        }
        Ok(())
    }
}

/// Tag vocabulary a task accepts
///
/// The original tool distinguishes annotation tags (what is heard) from
/// proximity tags (how near it sounds); a committed tag may come from
/// either set.
#[derive(Debug, Clone, Default)]
pub struct TagVocabulary {
    annotation: BTreeSet<String>,
    proximity: BTreeSet<String>,
}

impl TagVocabulary {
    pub fn new(annotation: &[String], proximity: &[String]) -> Self {
        Self {
            annotation: annotation.iter().cloned().collect(),
            proximity: proximity.iter().cloned().collect(),
        }
    }

    /// Whether the tag belongs to either vocabulary set
    pub fn contains(&self, tag: &str) -> bool {
        self.annotation.contains(tag) || self.proximity.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.annotation.is_empty() && self.proximity.is_empty()
    }
}

/// Immutable task configuration bundle
///
/// Validated once at load via [`TaskConfig::validate`]; never mutated during
/// a session, so configuration errors cannot occur mid-task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    /// Audio reference the task annotates (opaque to this core)
    pub audio_url: String,

    /// Visualization mode for the external renderer
    #[serde(default)]
    pub visualization: VisualizationMode,

    /// Feedback mode for the session
    #[serde(default)]
    pub feedback: FeedbackMode,

    /// Primary tag vocabulary (what is heard); must be non-empty
    pub annotation_tags: Vec<String>,

    /// Secondary tag vocabulary (how near it sounds); may be empty
    #[serde(default)]
    pub proximity_tags: Vec<String>,

    /// Whether the renderer shows tag controls before a region is selected
    #[serde(default = "default_true")]
    pub always_show_tags: bool,

    /// Optional tutorial video shown before the task
    #[serde(default)]
    pub tutorial_video_url: Option<String>,

    /// Total recordings in the batch this task belongs to
    #[serde(default)]
    pub num_recordings: Option<u32>,

    /// Index of this recording within the batch
    #[serde(default)]
    pub recording_index: Option<u32>,

    /// Whether user regions may overlap each other
    #[serde(default = "default_true")]
    pub allow_overlap: bool,

    /// Penalty subtracted per user region matching no solution region
    #[serde(default)]
    pub false_positive_penalty: f64,

    /// Step curve mapping best score to image reveal fraction
    #[serde(default)]
    pub reveal_curve: RevealCurve,

    /// Ground-truth regions; required unless feedback is `none`
    #[serde(default)]
    pub solution: Option<Vec<SolutionRegion>>,

    /// Hidden reference image; required for `hiddenImage` feedback
    #[serde(default)]
    pub reference_image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl TaskConfig {
    /// Load a task config from a TOML or JSON file, dispatching on extension
    pub fn load(path: &Path) -> Result<TaskConfig> {
        tracing::debug!(path = %path.display(), "loading task config");
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e))),
            _ => Err(Error::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Effective tag vocabulary (annotation ∪ proximity)
    pub fn vocabulary(&self) -> TagVocabulary {
        TagVocabulary::new(&self.annotation_tags, &self.proximity_tags)
    }

    /// Validate the config against the track duration
    ///
    /// The duration comes from the playback collaborator, not from the
    /// config itself. Errors here are fatal to starting the task.
    pub fn validate(&self, track_duration: f64) -> Result<()> {
        if !track_duration.is_finite() || track_duration <= 0.0 {
            return Err(Error::InvalidTaskConfig(format!(
                "track duration must be positive, got {}",
                track_duration
            )));
        }
        if self.audio_url.is_empty() {
            return Err(Error::InvalidTaskConfig("audio_url is empty".to_string()));
        }
        if self.annotation_tags.is_empty() {
            return Err(Error::InvalidTaskConfig(
                "annotation tag vocabulary is empty".to_string(),
            ));
        }
        if !self.false_positive_penalty.is_finite() || self.false_positive_penalty < 0.0 {
            return Err(Error::InvalidTaskConfig(format!(
                "false-positive penalty must be non-negative, got {}",
                self.false_positive_penalty
            )));
        }
        self.reveal_curve.validate()?;

        if self.feedback != FeedbackMode::None {
            let solution = match &self.solution {
                Some(s) if !s.is_empty() => s,
                _ => return Err(Error::NoSolutionSet),
            };
            let vocabulary = self.vocabulary();
            for region in solution {
                if !region.start_time.is_finite()
                    || !region.end_time.is_finite()
                    || region.start_time < 0.0
                    || region.start_time >= region.end_time
                    || region.end_time > track_duration
                {
                    return Err(Error::InvalidTaskConfig(format!(
                        "solution interval [{}, {}) outside track of {}s",
                        region.start_time, region.end_time, track_duration
                    )));
                }
                if region.tags.is_empty() {
                    return Err(Error::InvalidTaskConfig(
                        "solution region has no tags".to_string(),
                    ));
                }
                for tag in &region.tags {
                    if !vocabulary.contains(tag) {
                        return Err(Error::InvalidTaskConfig(format!(
                            "solution tag {:?} not in vocabulary",
                            tag
                        )));
                    }
                }
            }
        }

        if self.feedback == FeedbackMode::HiddenImage && self.reference_image_url.is_none() {
            return Err(Error::InvalidTaskConfig(
                "hiddenImage feedback requires a reference image".to_string(),
            ));
        }

        Ok(())
    }
}
