//! `OpenAiSynthesizer`: OpenAI-compatible `/v1/audio/speech`.
//!
//! The configured voice is multilingual; the language only decides whether
//! the request is made at all (it must be in the language table, which every
//! [`Language`] already is) and is logged with the request.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SynthesisConfig;
use crate::language::Language;
use crate::ports::{PortError, SynthesisPort};

use super::http;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl OpenAiSynthesizer {
    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            client: http::client(config.timeout_secs),
            config: config.clone(),
        }
    }

    /// File extension matching the configured output format.
    pub fn extension(&self) -> &str {
        &self.config.format
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: &self.config.format,
        }
    }
}

#[async_trait]
impl SynthesisPort for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, PortError> {
        if text.trim().is_empty() {
            return Err(PortError::InvalidInput("nothing to synthesize".into()));
        }

        let url = http::endpoint(&self.config.base_url, "/v1/audio/speech");
        let req = http::with_auth(self.client.post(&url), self.config.api_key.as_deref());
        let response = http::check_status(req.json(&self.request_body(text)).send().await?).await?;
        let audio = response.bytes().await?;

        if audio.is_empty() {
            return Err(PortError::EmptyResponse);
        }
        log::debug!(
            "openai-tts: {} bytes of {} for {}",
            audio.len(),
            self.config.format,
            language.locale()
        );
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_configured_voice_and_format() {
        let tts = OpenAiSynthesizer::from_config(&SynthesisConfig {
            voice: "nova".into(),
            format: "opus".into(),
            ..SynthesisConfig::default()
        });
        let json = serde_json::to_value(tts.request_body("hola")).unwrap();
        assert_eq!(json["model"], "tts-1");
        assert_eq!(json["input"], "hola");
        assert_eq!(json["voice"], "nova");
        assert_eq!(json["response_format"], "opus");
        assert_eq!(tts.extension(), "opus");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_a_request() {
        let tts = OpenAiSynthesizer::from_config(&SynthesisConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..SynthesisConfig::default()
        });
        let err = tts
            .synthesize("   ", Language::parse("es").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
