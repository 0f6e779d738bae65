//! Engine ports: the narrow interfaces to external ASR / MT / TTS services.
//!
//! The pipeline only ever talks to engines through these traits.  Concrete
//! implementations live in [`crate::engines`] (HTTP adapters) and, for tests,
//! in `ports::mock`.  Implementations are injected as `Arc<dyn …>` by the
//! process bootstrap; nothing in the pipeline looks them up globally.
//!
//! ```text
//! ┌───────────────────┐   ┌──────────────────┐   ┌────────────────┐
//! │ TranscriptionPort │   │ TranslationPort  │   │ SynthesisPort  │
//! │ audio → text+conf │   │ text → text      │   │ text → audio   │
//! └───────────────────┘   └──────────────────┘   └────────────────┘
//! ```

pub mod error;
#[cfg(test)]
pub mod mock;

pub use error::PortError;

use async_trait::async_trait;

use crate::language::Language;

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

/// Output of a single transcription call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// Recognised text, trimmed.
    pub text: String,
    /// Engine confidence in `[0, 1]`, when the engine reports one.
    pub confidence: Option<f32>,
}

impl Transcription {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Speech-recognition engine.
///
/// `hint` is the language the audio should be decoded as; `None` lets the
/// engine pick.
#[async_trait]
pub trait TranscriptionPort: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        hint: Option<Language>,
    ) -> Result<Transcription, PortError>;
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// Machine-translation engine.
///
/// `source` is `None` when the source language is unknown and the engine
/// should detect it.
#[async_trait]
pub trait TranslationPort: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Option<Language>,
    ) -> Result<String, PortError>;
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Text-to-speech engine returning encoded audio bytes.
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, PortError>;
}

// Compile-time assertion: all ports must be usable as trait objects.
const _: fn() = || {
    fn _assert_object_safe(
        _: Box<dyn TranscriptionPort>,
        _: Box<dyn TranslationPort>,
        _: Box<dyn SynthesisPort>,
    ) {
    }
};
