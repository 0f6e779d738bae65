//! `OpenAiTranscriber`: OpenAI-compatible `/v1/audio/transcriptions`.
//!
//! Works with OpenAI, Groq, and self-hosted whisper servers speaking the same
//! multipart wire format.  The request asks for `verbose_json` so the
//! per-segment `avg_logprob` can be turned into a confidence score.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::TranscriptionConfig;
use crate::language::Language;
use crate::ports::{PortError, Transcription, TranscriptionPort};

use super::http;

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    avg_logprob: f64,
}

/// `exp(mean avg_logprob)` over all segments, clamped into `[0, 1]`.
/// `None` when the engine returned no segments.
fn confidence_from_segments(segments: &[Segment]) -> Option<f32> {
    if segments.is_empty() {
        return None;
    }
    let mean = segments.iter().map(|s| s.avg_logprob).sum::<f64>() / segments.len() as f64;
    let p = mean.exp();
    if p.is_nan() {
        return None;
    }
    Some(p.clamp(0.0, 1.0) as f32)
}

fn parse_response(body: &str) -> Result<Transcription, PortError> {
    let parsed: VerboseTranscription =
        serde_json::from_str(body).map_err(|e| PortError::Parse(e.to_string()))?;
    Ok(Transcription::new(
        parsed.text.trim(),
        confidence_from_segments(&parsed.segments),
    ))
}

pub struct OpenAiTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl OpenAiTranscriber {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            client: http::client(config.timeout_secs),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl TranscriptionPort for OpenAiTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        hint: Option<Language>,
    ) -> Result<Transcription, PortError> {
        if audio.is_empty() {
            return Err(PortError::InvalidInput("audio is empty".into()));
        }

        let file = Part::bytes(audio.to_vec())
            .file_name("audio")
            .mime_str("application/octet-stream")
            .map_err(|e| PortError::InvalidInput(e.to_string()))?;
        let mut form = Form::new()
            .part("file", file)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = hint {
            form = form.text("language", lang.code());
        }

        let url = http::endpoint(&self.config.base_url, "/v1/audio/transcriptions");
        let req = http::with_auth(self.client.post(&url), self.config.api_key.as_deref());
        let response = http::check_status(req.multipart(form).send().await?).await?;
        let body = response.text().await?;

        let transcription = parse_response(&body)?;
        log::debug!(
            "openai-stt: {} chars, confidence {:?} (hint {:?})",
            transcription.text.len(),
            transcription.confidence,
            hint.map(|l| l.code())
        );
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbose_json_with_confidence() {
        let body = r#"{
            "task": "transcribe",
            "language": "english",
            "text": " Hello world. ",
            "segments": [
                {"id": 0, "avg_logprob": -0.1, "text": "Hello"},
                {"id": 1, "avg_logprob": -0.3, "text": "world."}
            ]
        }"#;
        let t = parse_response(body).unwrap();
        assert_eq!(t.text, "Hello world.");
        let expected = (-0.2f64).exp() as f32;
        assert!((t.confidence.unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn missing_segments_give_no_confidence() {
        let t = parse_response(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(t.confidence, None);
    }

    #[test]
    fn positive_logprob_is_clamped() {
        let segments = [Segment { avg_logprob: 0.5 }];
        assert_eq!(confidence_from_segments(&segments), Some(1.0));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_response("not json"),
            Err(PortError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn empty_audio_is_rejected_without_a_request() {
        let stt = OpenAiTranscriber::from_config(&TranscriptionConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..TranscriptionConfig::default()
        });
        assert!(matches!(
            stt.transcribe(&[], None).await,
            Err(PortError::InvalidInput(_))
        ));
    }
}
