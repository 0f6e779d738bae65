//! Command-line interface for voice-translator.
//!
//! Provides argument parsing using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use voice_translator::pipeline::ResponseMode;

/// Translate recorded speech into other languages
#[derive(Parser, Debug)]
#[command(name = "voice-translator", version, about = "Translate recorded speech into other languages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, translate and optionally synthesize one audio file
    Translate {
        /// Audio file to translate (any format the transcription engine accepts)
        audio: PathBuf,

        /// Target language codes, comma-separated (default: user preferences)
        #[arg(long, value_delimiter = ',', value_name = "LANGS")]
        to: Vec<String>,

        /// Source language code; skips detection candidates
        #[arg(long, value_name = "LANG")]
        from: Option<String>,

        /// Response mode: text, audio or both (default: user preferences)
        #[arg(long, value_name = "MODE")]
        mode: Option<ResponseMode>,

        /// User whose stored preferences fill in unspecified options
        #[arg(long, value_name = "ID")]
        user: Option<String>,

        /// Directory for synthesized audio (default: platform data dir)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List supported languages
    Languages,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}
