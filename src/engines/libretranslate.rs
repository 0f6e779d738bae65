//! `LibreTranslateTranslator`: LibreTranslate `/translate` JSON API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TranslationConfig;
use crate::language::Language;
use crate::ports::{PortError, TranslationPort};

use super::http;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

fn parse_response(body: &str) -> Result<String, PortError> {
    let parsed: TranslateResponse =
        serde_json::from_str(body).map_err(|e| PortError::Parse(e.to_string()))?;
    if let Some(error) = parsed.error {
        return Err(PortError::InvalidInput(error));
    }
    let text = parsed.translated_text.ok_or(PortError::EmptyResponse)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PortError::EmptyResponse);
    }
    Ok(text.to_string())
}

pub struct LibreTranslateTranslator {
    client: reqwest::Client,
    config: TranslationConfig,
}

impl LibreTranslateTranslator {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            client: http::client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn request_body<'a>(
        &'a self,
        text: &'a str,
        target: Language,
        source: Option<Language>,
    ) -> TranslateRequest<'a> {
        TranslateRequest {
            q: text,
            source: source.map_or("auto", |l| l.code()),
            target: target.code(),
            format: "text",
            api_key: self.config.api_key.as_deref().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl TranslationPort for LibreTranslateTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Option<Language>,
    ) -> Result<String, PortError> {
        if text.trim().is_empty() {
            return Err(PortError::InvalidInput("nothing to translate".into()));
        }

        let url = http::endpoint(&self.config.base_url, "/translate");
        let body = self.request_body(text, target, source);
        let response = http::check_status(self.client.post(&url).json(&body).send().await?).await?;
        let translated = parse_response(&response.text().await?)?;

        log::debug!(
            "libretranslate: {} → {target}: {} chars",
            source.map_or("auto", |l| l.code()),
            translated.len()
        );
        Ok(translated)
    }
}
