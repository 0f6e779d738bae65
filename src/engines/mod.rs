//! HTTP implementations of the engine ports.
//!
//! | Port                | Implementation              | Wire format                            |
//! |---------------------|-----------------------------|----------------------------------------|
//! | `TranscriptionPort` | [`OpenAiTranscriber`]       | `/v1/audio/transcriptions` (multipart) |
//! | `TranslationPort`   | [`LibreTranslateTranslator`]| `/translate` (JSON)                    |
//! | `SynthesisPort`     | [`OpenAiSynthesizer`]       | `/v1/audio/speech` (JSON → bytes)      |
//!
//! All connection details come from the matching config section; nothing is
//! hardcoded.  Error statuses are classified by
//! [`PortError::from_status`](crate::ports::PortError::from_status):
//! 408, 429 and 5xx are retried by the queue, other 4xx are not.

mod http;
pub mod libretranslate;
pub mod openai_stt;
pub mod openai_tts;

pub use libretranslate::LibreTranslateTranslator;
pub use openai_stt::OpenAiTranscriber;
pub use openai_tts::OpenAiSynthesizer;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::pipeline::EnginePorts;

/// Build the HTTP engines described by `config`.
pub fn from_config(config: &AppConfig) -> EnginePorts {
    EnginePorts {
        transcription: Arc::new(OpenAiTranscriber::from_config(&config.transcription)),
        translation: Arc::new(LibreTranslateTranslator::from_config(&config.translation)),
        synthesis: Arc::new(OpenAiSynthesizer::from_config(&config.synthesis)),
    }
}
