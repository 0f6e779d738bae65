//! Pipeline input, per-stage outputs and the aggregated result.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::language::{dedup_preserving_order, Language};
use crate::preferences::UserPreferences;

use super::error::{BranchError, PipelineError};

// ---------------------------------------------------------------------------
// ResponseMode
// ---------------------------------------------------------------------------

/// What the caller wants back for each target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Translated text only; the synthesis stage is skipped.
    Text,
    /// Synthesized speech.
    Audio,
    /// Translated text and synthesized speech.
    Both,
}

impl ResponseMode {
    pub fn wants_synthesis(&self) -> bool {
        matches!(self, ResponseMode::Audio | ResponseMode::Both)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResponseMode::Text => "text",
            ResponseMode::Audio => "audio",
            ResponseMode::Both => "both",
        }
    }
}

impl Default for ResponseMode {
    fn default() -> Self {
        ResponseMode::Text
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ResponseMode::Text),
            "audio" => Ok(ResponseMode::Audio),
            "both" => Ok(ResponseMode::Both),
            other => Err(format!(
                "unknown response mode {other:?} (expected text, audio or both)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioJob
// ---------------------------------------------------------------------------

/// Immutable pipeline input.
#[derive(Debug, Clone)]
pub struct AudioJob {
    audio: Arc<[u8]>,
    source_hint: Option<Language>,
    targets: Vec<Language>,
    mode: ResponseMode,
}

impl AudioJob {
    /// Build a job.  Duplicate targets are dropped (first occurrence wins);
    /// an empty target list is rejected.
    pub fn new(
        audio: impl Into<Arc<[u8]>>,
        targets: &[Language],
        mode: ResponseMode,
    ) -> Result<Self, PipelineError> {
        let targets = dedup_preserving_order(targets);
        if targets.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one target language is required".into(),
            ));
        }
        Ok(Self {
            audio: audio.into(),
            source_hint: None,
            targets,
            mode,
        })
    }

    /// Build a job from a user's stored preferences.
    pub fn from_preferences(
        audio: impl Into<Arc<[u8]>>,
        prefs: &UserPreferences,
    ) -> Result<Self, PipelineError> {
        Ok(Self::new(audio, &prefs.target_languages, prefs.response_mode)?
            .with_source_hint(prefs.source_language))
    }

    /// Fix the source language.  Detection then makes a single call in that
    /// language instead of trying the candidate list.
    pub fn with_source_hint(mut self, hint: Option<Language>) -> Self {
        self.source_hint = hint;
        self
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub(crate) fn shared_audio(&self) -> Arc<[u8]> {
        Arc::clone(&self.audio)
    }

    pub fn source_hint(&self) -> Option<Language> {
        self.source_hint
    }

    pub fn targets(&self) -> &[Language] {
        &self.targets
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }
}

// ---------------------------------------------------------------------------
// DetectionResult
// ---------------------------------------------------------------------------

/// Transcript and language chosen by the detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub text: String,
    pub language: Language,
    /// Always within `[0, 1]`.
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// TranslationBranch
// ---------------------------------------------------------------------------

/// Wall-clock time spent on one branch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BranchTimings {
    pub translation: Duration,
    /// `None` when synthesis was not attempted for this branch.
    pub synthesis: Option<Duration>,
}

/// Outcome for one target language.
///
/// `synthesis` is `None` unless synthesis was requested and the translation
/// succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationBranch {
    pub target: Language,
    pub translation: Result<String, BranchError>,
    pub synthesis: Option<Result<Vec<u8>, BranchError>>,
    pub timings: BranchTimings,
}

impl TranslationBranch {
    pub fn translated_text(&self) -> Option<&str> {
        self.translation.as_deref().ok()
    }

    pub fn translation_error(&self) -> Option<&BranchError> {
        self.translation.as_ref().err()
    }

    pub fn audio(&self) -> Option<&[u8]> {
        match &self.synthesis {
            Some(Ok(audio)) => Some(audio),
            _ => None,
        }
    }

    pub fn synthesis_error(&self) -> Option<&BranchError> {
        match &self.synthesis {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Translation failed, or synthesis was attempted and failed.
    pub fn is_failed(&self) -> bool {
        self.translation.is_err() || self.synthesis_error().is_some()
    }
}

// ---------------------------------------------------------------------------
// PipelineResult
// ---------------------------------------------------------------------------

/// Wall-clock time per pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineTimings {
    pub detection: Duration,
    pub translation: Duration,
    /// `None` when the response mode skipped synthesis.
    pub synthesis: Option<Duration>,
    pub aggregation: Duration,
    pub total: Duration,
}

/// Aggregated outcome of a pipeline run.
///
/// `branches` holds one entry per deduplicated target, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub detection: DetectionResult,
    pub branches: Vec<TranslationBranch>,
    pub timings: PipelineTimings,
}

impl PipelineResult {
    /// Target languages whose branch failed, in request order.
    pub fn failed_languages(&self) -> Vec<Language> {
        self.branches
            .iter()
            .filter(|b| b.is_failed())
            .map(|b| b.target)
            .collect()
    }

    /// At least one branch succeeded and at least one failed.
    pub fn is_partial_success(&self) -> bool {
        let failed = self.branches.iter().filter(|b| b.is_failed()).count();
        failed > 0 && failed < self.branches.len()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.timings.total.as_millis() as u64
    }

    pub fn branch(&self, target: Language) -> Option<&TranslationBranch> {
        self.branches.iter().find(|b| b.target == target)
    }
}
