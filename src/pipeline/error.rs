//! Fatal pipeline errors and per-branch failures.

use thiserror::Error;

use crate::language::{Language, LanguageError};
use crate::queue::{JobError, QueueError};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that abort a whole pipeline run.
///
/// Per-language failures never end up here; they are captured in the
/// affected [`TranslationBranch`](super::TranslationBranch) as a
/// [`BranchError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The job was rejected before any engine was called.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Language(#[from] LanguageError),

    /// Every detection candidate failed, either in its job or at admission.
    #[error("no candidate language could be transcribed ({} attempt(s) failed)", failures.len())]
    NoViableLanguage {
        failures: Vec<(Language, BranchError)>,
    },

    /// The caller fixed the source language and transcription in it failed.
    #[error("transcription as {language} failed: {error}")]
    HintedDetectionFailed { language: Language, error: JobError },

    /// The transcription queue refused the single hinted detection job.
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("pipeline cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// BranchError
// ---------------------------------------------------------------------------

/// Why one unit of per-language work failed: a detection candidate, or the
/// translation or synthesis of one target language.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BranchError {
    /// The job ran and did not complete (dead-lettered, cancelled, or the
    /// queue shut down).
    #[error(transparent)]
    Job(#[from] JobError),

    /// The job was never admitted.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl BranchError {
    /// Attempts made before giving up, when the job ran at all.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            BranchError::Job(JobError::DeadLettered { attempts, .. }) => Some(*attempts),
            _ => None,
        }
    }
}
