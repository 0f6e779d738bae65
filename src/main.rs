//! Application entry point for the voice-translator CLI.
//!
//! # Startup sequence
//!
//! 1. Parse arguments and initialise logging.
//! 2. Check the static language table.
//! 3. Load [`AppConfig`] (defaults when the file is missing) and validate it.
//! 4. Create the [`tokio`] runtime.
//! 5. Dispatch the subcommand; `translate` builds the HTTP engines and a
//!    [`Pipeline`], resolves user preferences, and runs one job with Ctrl+C
//!    wired to cancellation.

mod cli;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use cli::{Cli, Commands, ConfigAction};
use voice_translator::config::{AppConfig, AppPaths};
use voice_translator::engines;
use voice_translator::language::{self, Language, LANGUAGES};
use voice_translator::pipeline::{AudioJob, Pipeline, PipelineResult, ResponseMode};
use voice_translator::preferences::{PreferenceProvider, StaticPreferences, UserPreferences};
use voice_translator::queue::CancelToken;

// ---------------------------------------------------------------------------
// Translate
// ---------------------------------------------------------------------------

struct TranslateArgs {
    audio: PathBuf,
    to: Vec<String>,
    from: Option<String>,
    mode: Option<ResponseMode>,
    user: Option<String>,
    out: Option<PathBuf>,
    json: bool,
}

/// Stored preferences with command-line overrides applied.
async fn resolve_preferences(config: &AppConfig, args: &TranslateArgs) -> Result<UserPreferences> {
    let provider = StaticPreferences::from_config(&config.preferences)?;
    let mut prefs = match &args.user {
        Some(user) => provider.preferences(user).await,
        None => provider.default_preferences().clone(),
    };

    if !args.to.is_empty() {
        prefs.target_languages = Language::parse_all(&args.to)?;
    }
    if let Some(code) = &args.from {
        prefs.source_language = Some(Language::parse(code)?);
    }
    if let Some(mode) = args.mode {
        prefs.response_mode = mode;
    }
    Ok(prefs)
}

async fn translate(config: AppConfig, args: TranslateArgs) -> Result<()> {
    let settings = config.pipeline_settings()?;
    let prefs = resolve_preferences(&config, &args).await?;

    let audio = tokio::fs::read(&args.audio)
        .await
        .with_context(|| format!("reading {}", args.audio.display()))?;
    let job = AudioJob::from_preferences(audio, &prefs)?;

    let pipeline = Pipeline::new(engines::from_config(&config), settings);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl+C received, cancelling");
                cancel.cancel();
            }
        });
    }

    let result = pipeline.run_cancellable(&job, &cancel).await?;
    log::debug!("queue stats: {:?}", pipeline.queue_stats());

    let written = if job.mode().wants_synthesis() {
        let dir = args.out.clone().unwrap_or_else(|| AppPaths::new().output_dir);
        write_audio(&result, &dir, &config.synthesis.format)?
    } else {
        Vec::new()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result_json(&result, &written))?);
    } else {
        print_result(&result, &written);
    }

    if !result.branches.is_empty() && result.failed_languages().len() == result.branches.len() {
        bail!("every target language failed");
    }
    Ok(())
}

/// Write each branch's audio to `<dir>/<code>.<ext>`.
fn write_audio(result: &PipelineResult, dir: &Path, ext: &str) -> Result<Vec<(Language, PathBuf)>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::new();
    for branch in &result.branches {
        if let Some(audio) = branch.audio() {
            let path = dir.join(format!("{}.{ext}", branch.target.code()));
            std::fs::write(&path, audio).with_context(|| format!("writing {}", path.display()))?;
            written.push((branch.target, path));
        }
    }
    Ok(written)
}

fn print_result(result: &PipelineResult, written: &[(Language, PathBuf)]) {
    let d = &result.detection;
    println!(
        "[{} {:.2}] {}",
        d.language.code(),
        d.confidence,
        d.text
    );
    for branch in &result.branches {
        let code = branch.target.code();
        match &branch.translation {
            Ok(text) => println!("{code}: {text}"),
            Err(e) => println!("{code}: translation failed ({e})"),
        }
        if let Some(e) = branch.synthesis_error() {
            println!("{code}: synthesis failed ({e})");
        }
        if let Some((_, path)) = written.iter().find(|(l, _)| *l == branch.target) {
            println!("{code}: audio → {}", path.display());
        }
    }
    log::info!("finished in {} ms", result.total_duration_ms());
}

fn result_json(result: &PipelineResult, written: &[(Language, PathBuf)]) -> serde_json::Value {
    let branches: Vec<_> = result
        .branches
        .iter()
        .map(|b| {
            serde_json::json!({
                "target": b.target,
                "text": b.translated_text(),
                "error": b.translation_error().map(|e| e.to_string()),
                "audio_file": written
                    .iter()
                    .find(|(l, _)| *l == b.target)
                    .map(|(_, p)| p.display().to_string()),
                "synthesis_error": b.synthesis_error().map(|e| e.to_string()),
                "translation_ms": b.timings.translation.as_millis() as u64,
            })
        })
        .collect();

    serde_json::json!({
        "detection": result.detection,
        "branches": branches,
        "failed_languages": result.failed_languages(),
        "total_ms": result.total_duration_ms(),
    })
}

// ---------------------------------------------------------------------------
// Config / languages
// ---------------------------------------------------------------------------

fn config_command(action: ConfigAction, path: &Path, config: &AppConfig) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save_to(path)?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Show => print!("{}", toml::to_string_pretty(config)?),
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn list_languages() {
    for info in LANGUAGES {
        println!("{:<4}{:<8}{}", info.code, info.locale, info.name);
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // 2. Language table
    language::validate_table()?;

    // 3. Configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);

    match cli.command {
        Commands::Languages => {
            list_languages();
            Ok(())
        }
        Commands::Config { action } => {
            let config = AppConfig::load_from(&config_path)?;
            config_command(action, &config_path, &config)
        }
        Commands::Translate {
            audio,
            to,
            from,
            mode,
            user,
            out,
            json,
        } => {
            let config = AppConfig::load_from(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?;

            // 4. Tokio runtime
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            rt.block_on(translate(
                config,
                TranslateArgs {
                    audio,
                    to,
                    from,
                    mode,
                    user,
                    out,
                    json,
                },
            ))
        }
    }
}
