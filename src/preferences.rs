//! Read-only access to per-user language preferences.
//!
//! Storage is someone else's concern: the pipeline only needs
//! [`PreferenceProvider::preferences`].  [`StaticPreferences`] serves them
//! from the `[preferences]` section of the config file.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PreferencesConfig;
use crate::language::{Language, LanguageError};
use crate::pipeline::ResponseMode;

/// Resolved preferences of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Fixed source language, or `None` to detect it.
    pub source_language: Option<Language>,
    pub target_languages: Vec<Language>,
    pub response_mode: ResponseMode,
}

/// Lookup of user preferences.  Unknown users get the default preferences.
#[async_trait]
pub trait PreferenceProvider: Send + Sync {
    async fn preferences(&self, user_id: &str) -> UserPreferences;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn PreferenceProvider>) {}
};

// ---------------------------------------------------------------------------
// StaticPreferences
// ---------------------------------------------------------------------------

/// In-memory preferences with a default for unknown users.
#[derive(Debug, Clone)]
pub struct StaticPreferences {
    default: UserPreferences,
    users: HashMap<String, UserPreferences>,
}

impl StaticPreferences {
    pub fn new(default: UserPreferences) -> Self {
        Self {
            default,
            users: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, prefs: UserPreferences) -> Self {
        self.users.insert(user_id.into(), prefs);
        self
    }

    /// Build from the config section, validating every language code.
    pub fn from_config(config: &PreferencesConfig) -> Result<Self, LanguageError> {
        let default = UserPreferences {
            source_language: config.source_language.as_deref().map(Language::parse).transpose()?,
            target_languages: Language::parse_all(&config.target_languages)?,
            response_mode: config.response_mode,
        };

        let mut prefs = Self::new(default);
        for (user, entry) in &config.users {
            let resolved = UserPreferences {
                source_language: entry.source_language.as_deref().map(Language::parse).transpose()?,
                target_languages: Language::parse_all(&entry.target_languages)?,
                response_mode: entry.response_mode,
            };
            prefs.users.insert(user.clone(), resolved);
        }
        Ok(prefs)
    }

    pub fn default_preferences(&self) -> &UserPreferences {
        &self.default
    }
}

#[async_trait]
impl PreferenceProvider for StaticPreferences {
    async fn preferences(&self, user_id: &str) -> UserPreferences {
        match self.users.get(user_id) {
            Some(prefs) => prefs.clone(),
            None => {
                log::debug!("preferences: no entry for user {user_id:?}, using defaults");
                self.default.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserPreferencesConfig;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    #[tokio::test]
    async fn unknown_user_gets_defaults() {
        let default = UserPreferences {
            source_language: None,
            target_languages: vec![lang("en")],
            response_mode: ResponseMode::Text,
        };
        let provider = StaticPreferences::new(default.clone()).with_user(
            "alice",
            UserPreferences {
                source_language: Some(lang("fr")),
                target_languages: vec![lang("es")],
                response_mode: ResponseMode::Both,
            },
        );

        assert_eq!(provider.preferences("bob").await, default);
        assert_eq!(
            provider.preferences("alice").await.source_language,
            Some(lang("fr"))
        );
    }

    #[tokio::test]
    async fn from_config_resolves_users() {
        let mut config = PreferencesConfig::default();
        config.users.insert(
            "42".into(),
            UserPreferencesConfig {
                source_language: Some("ja".into()),
                target_languages: vec!["en".into(), "ko".into()],
                response_mode: ResponseMode::Audio,
            },
        );

        let provider = StaticPreferences::from_config(&config).unwrap();
        let prefs = provider.preferences("42").await;
        assert_eq!(prefs.source_language, Some(lang("ja")));
        assert_eq!(prefs.target_languages, vec![lang("en"), lang("ko")]);
        assert_eq!(prefs.response_mode, ResponseMode::Audio);
    }

    #[test]
    fn from_config_rejects_unknown_codes() {
        let config = PreferencesConfig {
            target_languages: vec!["xx".into()],
            ..PreferencesConfig::default()
        };
        assert_eq!(
            StaticPreferences::from_config(&config).unwrap_err(),
            LanguageError::Unsupported("xx".into())
        );
    }
}
