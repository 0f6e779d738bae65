//! Scripted port implementations for unit tests.
//!
//! Each mock records every call it receives so tests can assert on call
//! counts and ordering, and can be scripted per language to succeed, fail,
//! fail a fixed number of times before succeeding, or answer slowly.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{PortError, SynthesisPort, Transcription, TranscriptionPort, TranslationPort};
use crate::language::Language;

/// Key used for calls made without a language hint / source.
pub const AUTO: &str = "auto";

fn key(lang: Option<Language>) -> String {
    lang.map(|l| l.code().to_string())
        .unwrap_or_else(|| AUTO.to_string())
}

// ---------------------------------------------------------------------------
// MockTranscriber
// ---------------------------------------------------------------------------

/// Transcriber scripted per language hint.  Unscripted hints answer with
/// [`PortError::UnsupportedLanguage`].
#[derive(Default)]
pub struct MockTranscriber {
    responses: HashMap<String, Result<Transcription, PortError>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `hint` with `text` at `confidence`.
    pub fn respond(mut self, hint: &str, text: &str, confidence: Option<f32>) -> Self {
        self.responses
            .insert(hint.to_string(), Ok(Transcription::new(text, confidence)));
        self
    }

    /// Answer `hint` with `error`.
    pub fn fail(mut self, hint: &str, error: PortError) -> Self {
        self.responses.insert(hint.to_string(), Err(error));
        self
    }

    /// Calls for `hint` take `delay` before answering.
    pub fn slow(mut self, hint: &str, delay: Duration) -> Self {
        self.delays.insert(hint.to_string(), delay);
        self
    }

    /// Hints received so far, in call order (`"auto"` for no hint).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptionPort for MockTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        hint: Option<Language>,
    ) -> Result<Transcription, PortError> {
        let k = key(hint);
        self.calls.lock().unwrap().push(k.clone());
        if let Some(delay) = self.delays.get(&k) {
            tokio::time::sleep(*delay).await;
        }
        self.responses
            .get(&k)
            .cloned()
            .unwrap_or(Err(PortError::UnsupportedLanguage(k)))
    }
}

// ---------------------------------------------------------------------------
// MockTranslator
// ---------------------------------------------------------------------------

/// Translator that answers `"<text> [<target>]"` unless scripted otherwise.
#[derive(Default)]
pub struct MockTranslator {
    failures: HashMap<String, PortError>,
    flaky: Mutex<HashMap<String, u32>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call for `target` fails with `error`.
    pub fn fail(mut self, target: &str, error: PortError) -> Self {
        self.failures.insert(target.to_string(), error);
        self
    }

    /// The first `times` calls for `target` fail with a transient error.
    pub fn flaky(self, target: &str, times: u32) -> Self {
        self.flaky.lock().unwrap().insert(target.to_string(), times);
        self
    }

    /// Calls for `target` take `delay` before answering.
    pub fn slow(mut self, target: &str, delay: Duration) -> Self {
        self.delays.insert(target.to_string(), delay);
        self
    }

    /// `(target, source)` pairs received so far (`"auto"` for no source).
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn expected(text: &str, target: &str) -> String {
        format!("{text} [{target}]")
    }
}

#[async_trait]
impl TranslationPort for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Option<Language>,
    ) -> Result<String, PortError> {
        let target_code = target.code().to_string();
        self.calls
            .lock()
            .unwrap()
            .push((target_code.clone(), key(source)));

        if let Some(delay) = self.delays.get(&target_code) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(err) = self.failures.get(&target_code) {
            return Err(err.clone());
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&target_code) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PortError::Request("connection reset".into()));
                }
            }
        }
        Ok(Self::expected(text, &target_code))
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer
// ---------------------------------------------------------------------------

/// Synthesizer that answers with the bytes of `"<locale>|<text>"`.
#[derive(Default)]
pub struct MockSynthesizer {
    failures: HashMap<String, PortError>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, language: &str, error: PortError) -> Self {
        self.failures.insert(language.to_string(), error);
        self
    }

    /// `(language, text)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn expected(text: &str, language: Language) -> Vec<u8> {
        format!("{}|{}", language.locale(), text).into_bytes()
    }
}

#[async_trait]
impl SynthesisPort for MockSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, PortError> {
        let code = language.code().to_string();
        self.calls
            .lock()
            .unwrap()
            .push((code.clone(), text.to_string()));
        if let Some(err) = self.failures.get(&code) {
            return Err(err.clone());
        }
        Ok(Self::expected(text, language))
    }
}
