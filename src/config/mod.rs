//! Configuration module for the voice translator.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for detection, the
//! job queues, each engine endpoint and user preferences, `AppPaths` for
//! cross-platform directories, TOML persistence via `AppConfig::load` /
//! `AppConfig::save`, and startup checks via `AppConfig::validate`.

pub mod paths;
pub mod settings;
pub mod validate;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, DetectionConfig, PreferencesConfig, QueueConfig, QueuesConfig, SynthesisConfig,
    TranscriptionConfig, TranslationConfig, UserPreferencesConfig,
};
pub use validate::ConfigError;
