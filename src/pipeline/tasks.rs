//! Queue tasks wrapping the engine ports.
//!
//! Each engine gets its own [`JobQueue`](crate::queue::JobQueue) running one
//! of these tasks, so a queue's worker count is the concurrency limit for
//! calls to that engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::language::Language;
use crate::ports::{SynthesisPort, Transcription, TranscriptionPort, TranslationPort};
use crate::queue::{JobTask, TaskError};

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Arc<[u8]>,
    pub hint: Option<Language>,
}

pub struct TranscriptionTask {
    port: Arc<dyn TranscriptionPort>,
}

impl TranscriptionTask {
    pub fn new(port: Arc<dyn TranscriptionPort>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl JobTask for TranscriptionTask {
    type Payload = TranscriptionRequest;
    type Output = Transcription;

    async fn run(&self, req: &TranscriptionRequest) -> Result<Transcription, TaskError> {
        let mut out = self.port.transcribe(&req.audio, req.hint).await?;
        out.text = out.text.trim().to_string();
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Shared between all branches of one fan-out.
    pub text: Arc<str>,
    pub target: Language,
    pub source: Option<Language>,
}

pub struct TranslationTask {
    port: Arc<dyn TranslationPort>,
}

impl TranslationTask {
    pub fn new(port: Arc<dyn TranslationPort>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl JobTask for TranslationTask {
    type Payload = TranslationRequest;
    type Output = String;

    async fn run(&self, req: &TranslationRequest) -> Result<String, TaskError> {
        Ok(self.port.translate(&req.text, req.target, req.source).await?)
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub language: Language,
}

pub struct SynthesisTask {
    port: Arc<dyn SynthesisPort>,
}

impl SynthesisTask {
    pub fn new(port: Arc<dyn SynthesisPort>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl JobTask for SynthesisTask {
    type Payload = SynthesisRequest;
    type Output = Vec<u8>;

    async fn run(&self, req: &SynthesisRequest) -> Result<Vec<u8>, TaskError> {
        Ok(self.port.synthesize(&req.text, req.language).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{MockTranscriber, MockTranslator};
    use crate::ports::PortError;

    #[tokio::test]
    async fn transcription_task_trims_text() {
        let port = Arc::new(MockTranscriber::new().respond("en", "  hello there \n", Some(0.9)));
        let task = TranscriptionTask::new(port);
        let req = TranscriptionRequest {
            audio: Arc::from(vec![1u8, 2]),
            hint: Some(Language::parse("en").unwrap()),
        };
        let out = task.run(&req).await.unwrap();
        assert_eq!(out.text, "hello there");
        assert_eq!(out.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn port_errors_become_task_errors() {
        let port = Arc::new(MockTranslator::new().fail("fr", PortError::RateLimited));
        let task = TranslationTask::new(port);
        let req = TranslationRequest {
            text: Arc::from("hi"),
            target: Language::parse("fr").unwrap(),
            source: None,
        };
        let err = task.run(&req).await.unwrap_err();
        assert_eq!(err, TaskError::Port(PortError::RateLimited));
        assert!(err.is_retryable());
    }
}
