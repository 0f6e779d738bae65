//! Speech-translation pipeline.
//!
//! # Architecture
//!
//! ```text
//! AudioJob
//!    │
//!    ▼
//! LanguageDetector ── transcription queue ── TranscriptionPort
//!    │  (text, source language, confidence)
//!    ▼
//! TranslationFanOut ── translation queue ─── TranslationPort   (one job per target)
//!    │  Vec<TranslationBranch>, request order
//!    ▼
//! SynthesisStage ───── synthesis queue ───── SynthesisPort     (skipped in text mode)
//!    │
//!    ▼
//! PipelineResult { detection, branches, timings }
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_translator::language::Language;
//! use voice_translator::pipeline::{AudioJob, EnginePorts, Pipeline, PipelineSettings, ResponseMode};
//!
//! # async fn example(ports: EnginePorts, audio: Vec<u8>) -> anyhow::Result<()> {
//! let pipeline = Arc::new(Pipeline::new(ports, PipelineSettings::default()));
//!
//! let targets = Language::parse_all(&["es", "fr"])?;
//! let job = AudioJob::new(audio, &targets, ResponseMode::Both)?;
//! let result = pipeline.run(&job).await?;
//!
//! for branch in &result.branches {
//!     println!("{}: {:?}", branch.target, branch.translated_text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod detector;
pub mod error;
pub mod fan_out;
pub mod orchestrator;
pub mod state;
pub mod synthesis;
pub mod tasks;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use detector::{DetectionSettings, LanguageDetector, DEFAULT_EARLY_EXIT_THRESHOLD};
pub use error::{BranchError, PipelineError};
pub use fan_out::TranslationFanOut;
pub use orchestrator::{EnginePorts, Pipeline, PipelineQueueStats, PipelineSettings};
pub use state::{PipelineStage, StageTracker};
pub use synthesis::SynthesisStage;
pub use types::{
    AudioJob, BranchTimings, DetectionResult, PipelineResult, PipelineTimings, ResponseMode,
    TranslationBranch,
};
