//! Multi-candidate language detection with early exit.
//!
//! ```text
//! for candidate in priority order:
//!     transcribe(audio, hint = candidate)     ── one transcription job
//!     ├─ refused    → record, next candidate
//!     ├─ error      → record, next candidate
//!     └─ ok(conf)   → keep if better than best
//!                     conf ≥ threshold → stop
//! best seen, or NoViableLanguage if every candidate failed
//! ```
//!
//! Candidates are tried one after another.  A caller-supplied source hint
//! replaces the loop with a single attempt whose failure is fatal.

use std::sync::Arc;

use crate::language::Language;
use crate::queue::JobQueue;

use super::error::{BranchError, PipelineError};
use super::tasks::{TranscriptionRequest, TranscriptionTask};
use super::types::DetectionResult;

/// Default early-exit confidence.
pub const DEFAULT_EARLY_EXIT_THRESHOLD: f32 = 0.8;

/// Candidate order and early-exit rule.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    /// Languages to try, highest priority first.
    pub candidates: Vec<Language>,
    pub early_exit_threshold: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let candidates = ["en", "es", "fr", "de"]
            .into_iter()
            .filter_map(|code| Language::parse(code).ok())
            .collect();
        Self {
            candidates,
            early_exit_threshold: DEFAULT_EARLY_EXIT_THRESHOLD,
        }
    }
}

/// Missing confidence counts as 0; anything else is clamped into `[0, 1]`.
fn normalize_confidence(confidence: Option<f32>) -> f32 {
    match confidence {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

pub struct LanguageDetector {
    queue: Arc<JobQueue<TranscriptionTask>>,
    settings: DetectionSettings,
}

impl LanguageDetector {
    pub fn new(queue: Arc<JobQueue<TranscriptionTask>>, settings: DetectionSettings) -> Self {
        Self { queue, settings }
    }

    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Transcribe `audio` and decide its language.
    ///
    /// Fails with [`PipelineError::InvalidInput`] on empty audio (no engine
    /// call), [`PipelineError::HintedDetectionFailed`] when `hint` is set and
    /// that single attempt fails, and [`PipelineError::NoViableLanguage`]
    /// when every candidate fails.  A candidate the queue refuses counts as
    /// a failed candidate.
    pub async fn detect(
        &self,
        audio: Arc<[u8]>,
        hint: Option<Language>,
    ) -> Result<DetectionResult, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::InvalidInput("audio is empty".into()));
        }
        match hint {
            Some(language) => self.detect_hinted(audio, language).await,
            None => self.detect_candidates(audio).await,
        }
    }

    async fn detect_hinted(
        &self,
        audio: Arc<[u8]>,
        language: Language,
    ) -> Result<DetectionResult, PipelineError> {
        log::debug!("detector: source fixed to {language}, skipping candidates");
        let report = self
            .queue
            .enqueue(TranscriptionRequest {
                audio,
                hint: Some(language),
            })?
            .wait()
            .await;

        match report.outcome {
            Ok(t) => Ok(DetectionResult {
                text: t.text,
                language,
                confidence: normalize_confidence(t.confidence),
            }),
            Err(error) => Err(PipelineError::HintedDetectionFailed { language, error }),
        }
    }

    async fn detect_candidates(&self, audio: Arc<[u8]>) -> Result<DetectionResult, PipelineError> {
        let threshold = self.settings.early_exit_threshold;
        let mut best: Option<DetectionResult> = None;
        let mut failures: Vec<(Language, BranchError)> = Vec::new();

        for &candidate in &self.settings.candidates {
            let handle = match self.queue.enqueue(TranscriptionRequest {
                audio: Arc::clone(&audio),
                hint: Some(candidate),
            }) {
                Ok(handle) => handle,
                Err(e) => {
                    log::warn!("detector: candidate {candidate} not admitted: {e}");
                    failures.push((candidate, e.into()));
                    continue;
                }
            };

            let transcription = match handle.wait().await.outcome {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("detector: candidate {candidate} failed: {e}");
                    failures.push((candidate, e.into()));
                    continue;
                }
            };

            let confidence = normalize_confidence(transcription.confidence);
            log::debug!("detector: candidate {candidate} confidence {confidence:.2}");

            if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                best = Some(DetectionResult {
                    text: transcription.text,
                    language: candidate,
                    confidence,
                });
            }
            if confidence >= threshold {
                log::debug!("detector: early exit on {candidate} ({confidence:.2} >= {threshold})");
                break;
            }
        }

        match best {
            Some(result) => {
                log::info!(
                    "detector: {} (confidence {:.2})",
                    result.language,
                    result.confidence
                );
                Ok(result)
            }
            None => {
                log::error!(
                    "detector: all {} candidate(s) failed",
                    self.settings.candidates.len()
                );
                Err(PipelineError::NoViableLanguage { failures })
            }
        }
    }
}
