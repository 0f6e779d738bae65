//! Static language registry.
//!
//! Every language the pipeline can detect, translate into, or synthesize is
//! listed in [`LANGUAGES`], mapping a short ISO-639-1 code to the canonical
//! locale used by speech-synthesis voices.  The table is reviewed by hand and
//! checked once at startup with [`validate_table`]; lookups of codes that are
//! not in the table fail with [`LanguageError::Unsupported`] instead of
//! guessing a locale.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// LanguageError
// ---------------------------------------------------------------------------

/// Errors produced by language-code lookups and table validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// The code is not present in [`LANGUAGES`].
    #[error("unsupported language code: {0:?}")]
    Unsupported(String),

    /// The static table itself is inconsistent (duplicate or malformed entry).
    #[error("invalid language table entry {code:?}: {reason}")]
    InvalidTable { code: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// LanguageInfo
// ---------------------------------------------------------------------------

/// Static metadata for one supported language.
#[derive(Debug, PartialEq, Eq)]
pub struct LanguageInfo {
    /// Short ISO-639-1 code (e.g. `"en"`).
    pub code: &'static str,
    /// Canonical BCP-47 locale (e.g. `"en-US"`).
    pub locale: &'static str,
    /// English display name.
    pub name: &'static str,
}

/// All supported languages.
///
/// Order matters only for display (`voice-translator languages`).
pub const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo { code: "en", locale: "en-US", name: "English" },
    LanguageInfo { code: "es", locale: "es-ES", name: "Spanish" },
    LanguageInfo { code: "fr", locale: "fr-FR", name: "French" },
    LanguageInfo { code: "de", locale: "de-DE", name: "German" },
    LanguageInfo { code: "it", locale: "it-IT", name: "Italian" },
    LanguageInfo { code: "pt", locale: "pt-BR", name: "Portuguese" },
    LanguageInfo { code: "nl", locale: "nl-NL", name: "Dutch" },
    LanguageInfo { code: "ru", locale: "ru-RU", name: "Russian" },
    LanguageInfo { code: "uk", locale: "uk-UA", name: "Ukrainian" },
    LanguageInfo { code: "pl", locale: "pl-PL", name: "Polish" },
    LanguageInfo { code: "tr", locale: "tr-TR", name: "Turkish" },
    LanguageInfo { code: "ar", locale: "ar-SA", name: "Arabic" },
    LanguageInfo { code: "hi", locale: "hi-IN", name: "Hindi" },
    LanguageInfo { code: "zh", locale: "zh-CN", name: "Chinese (Mandarin)" },
    LanguageInfo { code: "ja", locale: "ja-JP", name: "Japanese" },
    LanguageInfo { code: "ko", locale: "ko-KR", name: "Korean" },
    LanguageInfo { code: "th", locale: "th-TH", name: "Thai" },
    LanguageInfo { code: "vi", locale: "vi-VN", name: "Vietnamese" },
    LanguageInfo { code: "id", locale: "id-ID", name: "Indonesian" },
];

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// A validated handle to an entry of [`LANGUAGES`].
///
/// Cheap to copy.  The only way to obtain one is [`Language::parse`] (or
/// deserialisation, which goes through it), so holding a `Language` proves
/// the code is supported.
#[derive(Clone, Copy)]
pub struct Language(&'static LanguageInfo);

impl Language {
    /// Look up `code` (case-insensitive, surrounding whitespace ignored).
    ///
    /// ```
    /// use voice_translator::language::Language;
    ///
    /// assert_eq!(Language::parse("EN").unwrap().locale(), "en-US");
    /// assert!(Language::parse("xx").is_err());
    /// ```
    pub fn parse(code: &str) -> Result<Self, LanguageError> {
        let wanted = code.trim();
        LANGUAGES
            .iter()
            .find(|info| info.code.eq_ignore_ascii_case(wanted))
            .map(Language)
            .ok_or_else(|| LanguageError::Unsupported(code.to_string()))
    }

    /// Parse a list of codes, failing on the first unsupported one.
    pub fn parse_all<S: AsRef<str>>(codes: &[S]) -> Result<Vec<Self>, LanguageError> {
        codes.iter().map(|c| Self::parse(c.as_ref())).collect()
    }

    pub fn code(&self) -> &'static str {
        self.0.code
    }

    pub fn locale(&self) -> &'static str {
        self.0.locale
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.0.code == other.0.code
    }
}

impl Eq for Language {}

impl std::hash::Hash for Language {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.code.hash(state);
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Language({})", self.0.code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.code)
    }
}

impl std::str::FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::parse(&code).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove duplicates from `languages`, keeping the first occurrence of each.
pub fn dedup_preserving_order(languages: &[Language]) -> Vec<Language> {
    let mut seen = std::collections::HashSet::with_capacity(languages.len());
    languages
        .iter()
        .copied()
        .filter(|lang| seen.insert(*lang))
        .collect()
}

/// Check the static table: codes are two lowercase ASCII letters, locales
/// start with their code followed by `-`, and no code appears twice.
///
/// Called once during startup so a bad edit to [`LANGUAGES`] is caught before
/// any request is served.
pub fn validate_table() -> Result<(), LanguageError> {
    let mut seen = std::collections::HashSet::new();
    for info in LANGUAGES {
        if info.code.len() != 2 || !info.code.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(LanguageError::InvalidTable {
                code: info.code,
                reason: "code must be two lowercase ASCII letters".into(),
            });
        }
        let prefix = format!("{}-", info.code);
        if !info.locale.starts_with(&prefix) || info.locale.len() <= prefix.len() {
            return Err(LanguageError::InvalidTable {
                code: info.code,
                reason: format!("locale {:?} does not extend the code", info.locale),
            });
        }
        if !seen.insert(info.code) {
            return Err(LanguageError::InvalidTable {
                code: info.code,
                reason: "duplicate code".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
