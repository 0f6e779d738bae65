//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-translator\
//!   macOS:   ~/Library/Application Support/voice-translator/
//!   Linux:   ~/.config/voice-translator/
//!
//! Data dir (synthesized audio when no `--out` is given):
//!   Windows: %LOCALAPPDATA%\voice-translator\
//!   macOS:   ~/Library/Application Support/voice-translator/
//!   Linux:   ~/.local/share/voice-translator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory for synthesized audio files.
    pub output_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-translator";

    /// Resolves all paths using the `dirs` crate, falling back to the
    /// current directory when the platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            output_dir: data_dir.join("output"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.output_dir.ends_with("output"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.settings_file.starts_with(&paths.config_dir));
    }
}
