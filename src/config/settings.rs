//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! optional in the file; missing keys take their default.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::language::{Language, LanguageError};
use crate::pipeline::{DetectionSettings, ResponseMode, DEFAULT_EARLY_EXIT_THRESHOLD};
use crate::queue::{QueueSettings, RetryPolicy};

use super::AppPaths;

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Candidate languages for detection and the early-exit rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Language codes tried in order when the source is not fixed.
    pub candidates: Vec<String>,
    /// A candidate at or above this confidence ends detection early.
    pub early_exit_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            candidates: vec!["en".into(), "es".into(), "fr".into(), "de".into()],
            early_exit_threshold: DEFAULT_EARLY_EXIT_THRESHOLD,
        }
    }
}

impl DetectionConfig {
    pub fn to_settings(&self) -> Result<DetectionSettings, LanguageError> {
        Ok(DetectionSettings {
            candidates: Language::parse_all(&self.candidates)?,
            early_exit_threshold: self.early_exit_threshold,
        })
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Worker pool, backlog and retry policy of one job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Concurrent engine calls.
    pub workers: usize,
    /// Waiting jobs allowed before new jobs are refused.
    pub max_backlog: usize,
    pub attempt_timeout_ms: u64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_backlog: 64,
            attempt_timeout_ms: 30_000,
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl QueueConfig {
    pub fn to_settings(&self) -> QueueSettings {
        QueueSettings {
            workers: self.workers,
            max_backlog: self.max_backlog,
            policy: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: Duration::from_millis(self.base_delay_ms),
                multiplier: self.multiplier,
                max_delay: Duration::from_millis(self.max_delay_ms),
                attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            },
        }
    }
}

/// One queue per engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub transcription: QueueConfig,
    pub translation: QueueConfig,
    pub synthesis: QueueConfig,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            // Detection runs candidates one at a time; two workers let two
            // pipelines detect concurrently.
            transcription: QueueConfig {
                workers: 2,
                max_backlog: 32,
                attempt_timeout_ms: 60_000,
                ..QueueConfig::default()
            },
            translation: QueueConfig {
                workers: 8,
                max_backlog: 128,
                attempt_timeout_ms: 15_000,
                ..QueueConfig::default()
            },
            synthesis: QueueConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine endpoints
// ---------------------------------------------------------------------------

/// OpenAI-compatible speech-to-text endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Base URL without a trailing `/v1`, e.g. `https://api.openai.com`.
    pub base_url: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: Option<String>,
    pub model: String,
    /// Upper bound for one HTTP request, independent of the queue timeout.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: 60,
        }
    }
}

/// LibreTranslate-compatible translation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

/// OpenAI-compatible text-to-speech endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    /// Audio container requested from the engine (`mp3`, `opus`, `wav` …).
    pub format: String,
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "tts-1".into(),
            voice: "alloy".into(),
            format: "mp3".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// PreferencesConfig
// ---------------------------------------------------------------------------

/// Preferences of one user as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferencesConfig {
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,
    pub response_mode: ResponseMode,
}

impl Default for UserPreferencesConfig {
    fn default() -> Self {
        Self {
            source_language: None,
            target_languages: vec!["en".into()],
            response_mode: ResponseMode::Text,
        }
    }
}

/// Default preferences plus per-user overrides, keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,
    pub response_mode: ResponseMode,
    pub users: BTreeMap<String, UserPreferencesConfig>,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        let user = UserPreferencesConfig::default();
        Self {
            source_language: user.source_language,
            target_languages: user.target_languages,
            response_mode: user.response_mode,
            users: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Top-level application configuration.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_translator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub queues: QueuesConfig,
    pub transcription: TranscriptionConfig,
    pub translation: TranslationConfig,
    pub synthesis: SynthesisConfig,
    pub preferences: PreferencesConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
