//! Startup validation of an [`AppConfig`].

use thiserror::Error;

use crate::language::{Language, LanguageError};
use crate::pipeline::PipelineSettings;

use super::settings::{AppConfig, QueueConfig};

/// A config value that cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{section}: {source}")]
    Language {
        section: String,
        #[source]
        source: LanguageError,
    },

    #[error("detection.candidates must list at least one language")]
    NoCandidates,

    #[error("detection.early_exit_threshold must be within [0, 1], got {0}")]
    Threshold(f32),

    #[error("queues.{queue}.{field} {reason}")]
    Queue {
        queue: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("{section}.base_url must start with http:// or https://, got {url:?}")]
    BaseUrl { section: &'static str, url: String },

    #[error("{section}.target_languages must list at least one language")]
    NoTargets { section: String },
}

fn languages(section: &str, codes: &[String]) -> Result<Vec<Language>, ConfigError> {
    Language::parse_all(codes).map_err(|source| ConfigError::Language {
        section: section.to_string(),
        source,
    })
}

fn check_queue(queue: &'static str, q: &QueueConfig) -> Result<(), ConfigError> {
    let fail = |field, reason| Err(ConfigError::Queue { queue, field, reason });
    if q.workers == 0 {
        return fail("workers", "must be at least 1");
    }
    if q.max_backlog == 0 {
        return fail("max_backlog", "must be at least 1");
    }
    if q.max_attempts == 0 {
        return fail("max_attempts", "must be at least 1");
    }
    if q.attempt_timeout_ms == 0 {
        return fail("attempt_timeout_ms", "must be positive");
    }
    if !q.multiplier.is_finite() || q.multiplier < 1.0 {
        return fail("multiplier", "must be a finite number ≥ 1");
    }
    if q.max_delay_ms < q.base_delay_ms {
        return fail("max_delay_ms", "must not be smaller than base_delay_ms");
    }
    Ok(())
}

fn check_url(section: &'static str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::BaseUrl {
            section,
            url: url.to_string(),
        })
    }
}

impl AppConfig {
    /// Check every language code against the static table and every numeric
    /// bound.  Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        languages("detection.candidates", &self.detection.candidates)?;
        let t = self.detection.early_exit_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::Threshold(t));
        }

        check_queue("transcription", &self.queues.transcription)?;
        check_queue("translation", &self.queues.translation)?;
        check_queue("synthesis", &self.queues.synthesis)?;

        check_url("transcription", &self.transcription.base_url)?;
        check_url("translation", &self.translation.base_url)?;
        check_url("synthesis", &self.synthesis.base_url)?;

        let prefs = &self.preferences;
        if prefs.target_languages.is_empty() {
            return Err(ConfigError::NoTargets {
                section: "preferences".into(),
            });
        }
        languages("preferences.target_languages", &prefs.target_languages)?;
        if let Some(code) = &prefs.source_language {
            languages("preferences.source_language", std::slice::from_ref(code))?;
        }
        for (user, entry) in &prefs.users {
            let section = format!("preferences.users.{user}");
            if entry.target_languages.is_empty() {
                return Err(ConfigError::NoTargets { section });
            }
            languages(&section, &entry.target_languages)?;
            if let Some(code) = &entry.source_language {
                languages(&section, std::slice::from_ref(code))?;
            }
        }
        Ok(())
    }

    /// Validate and convert into the pipeline's runtime settings.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        self.validate()?;
        let detection = self
            .detection
            .to_settings()
            .map_err(|source| ConfigError::Language {
                section: "detection.candidates".into(),
                source,
            })?;
        Ok(PipelineSettings {
            detection,
            transcription_queue: self.queues.transcription.to_settings(),
            translation_queue: self.queues.translation.to_settings(),
            synthesis_queue: self.queues.synthesis.to_settings(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserPreferencesConfig;

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detection.candidates.push("xx".into());
        assert_eq!(
            cfg.validate().unwrap_err(),
            ConfigError::Language {
                section: "detection.candidates".into(),
                source: LanguageError::Unsupported("xx".into()),
            }
        );
    }

    #[test]
    fn empty_candidates_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.detection.candidates.clear();
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::NoCandidates);
    }

    #[test]
    fn threshold_out_of_range() {
        let mut cfg = AppConfig::default();
        cfg.detection.early_exit_threshold = 1.5;
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::Threshold(1.5));
    }

    #[test]
    fn zero_workers_names_the_queue() {
        let mut cfg = AppConfig::default();
        cfg.queues.synthesis.workers = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "queues.synthesis.workers must be at least 1");
    }

    #[test]
    fn shrinking_multiplier_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.queues.translation.multiplier = 0.5;
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::Queue {
                queue: "translation",
                field: "multiplier",
                ..
            }
        ));
    }

    #[test]
    fn base_url_needs_a_scheme() {
        let mut cfg = AppConfig::default();
        cfg.translation.base_url = "localhost:5000".into();
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::BaseUrl {
                section: "translation",
                ..
            }
        ));
    }

    #[test]
    fn user_with_bad_source_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.preferences.users.insert(
            "bob".into(),
            UserPreferencesConfig {
                source_language: Some("zz".into()),
                ..UserPreferencesConfig::default()
            },
        );
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().starts_with("preferences.users.bob"));
    }

    #[test]
    fn pipeline_settings_carry_queue_policies() {
        let mut cfg = AppConfig::default();
        cfg.queues.translation.max_attempts = 5;
        let settings = cfg.pipeline_settings().unwrap();
        assert_eq!(settings.translation_queue.policy.max_attempts, 5);
        assert_eq!(settings.detection.candidates.len(), 4);
    }
}
