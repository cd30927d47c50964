//! Digital Defenders CLI - learner progress, settings and quiz streak.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use defenders_core::{
    AccessibilityPatch, FontSize, GamePatch, Language, Mission, SettingsPatch, Theme,
};
use defenders_progress::{
    export_file_name, BasicProgressTracker, DailyQuiz, Profile, ProgressTracker, SettingsStore,
    UserDataExport,
};
use defenders_storage::JsonFileStore;
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defenders")]
#[command(about = "Digital Defenders learner progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage directory
    #[arg(short, long, default_value = ".defenders")]
    storage: PathBuf,

    /// Storage quota in bytes
    #[arg(long)]
    quota: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored progress as JSON
    Show,
    /// Summarise mission progress, badges and certificate state
    Status,
    /// Submit a stage result
    Update {
        /// Mission (mindfog, phisher, aitruth)
        mission: String,
        /// Stage (intro, game1, game2, boss, debrief)
        stage: String,
        /// Completion flag
        #[arg(long)]
        completed: Option<bool>,
        /// Score
        #[arg(long)]
        score: Option<u32>,
    },
    /// Issue the certificate once all missions are completed
    Certificate {
        /// Certificate title
        #[arg(default_value = "Digital Defender")]
        title: String,
    },
    /// Daily quiz streak
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show or set the learner name
    Name {
        /// New name
        name: Option<String>,
    },
    /// Export all learner data to a JSON file
    Export {
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete all learner data
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum QuizAction {
    /// Show today's streak and completion
    Status,
    /// Record today's finished quiz
    Done {
        /// The session was not passed
        #[arg(long)]
        failed: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the settings as JSON
    Show,
    /// Change one or more settings
    Set {
        /// en, es, fr
        #[arg(long, value_parser = parse_wire::<Language>)]
        language: Option<Language>,
        /// light, dark, system
        #[arg(long, value_parser = parse_wire::<Theme>)]
        theme: Option<Theme>,
        /// small, medium, large, extra-large
        #[arg(long, value_parser = parse_wire::<FontSize>)]
        font_size: Option<FontSize>,
        #[arg(long)]
        high_contrast: Option<bool>,
        #[arg(long)]
        reduced_motion: Option<bool>,
        #[arg(long)]
        screen_reader_mode: Option<bool>,
        #[arg(long)]
        keyboard_navigation: Option<bool>,
        #[arg(long)]
        audio_enabled: Option<bool>,
        #[arg(long)]
        autoplay: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        data_collection: Option<bool>,
    },
}

fn init_logging() {
    // Logs go to stderr so JSON on stdout stays machine-readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a value using its stored (serde) spelling.
fn parse_wire<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|e| e.to_string())
}

/// Write an export document as pretty JSON.
async fn write_export(path: &Path, export: &UserDataExport) -> Result<()> {
    tokio::fs::write(path, serde_json::to_string_pretty(export)?).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut store = JsonFileStore::new(&cli.storage).await?;
    if let Some(bytes) = cli.quota {
        store = store.with_quota(bytes);
    }
    let store = Arc::new(store);
    let tracker = BasicProgressTracker::new(store.clone());

    match cli.command {
        Commands::Show => {
            let progress = tracker.read().await?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Commands::Status => {
            let progress = tracker.read().await?;
            println!("Digital Defender Training: {}%", progress.overall_progress_percent());
            for mission in Mission::ALL {
                let record = progress.mission(mission);
                println!(
                    "  {:<8} {:>3}%  {}",
                    mission.as_str(),
                    progress.mission_progress_percent(mission),
                    if record.completed { "COMPLETED" } else { "" },
                );
            }
            println!("Total score: {}", progress.total_score);
            if progress.badges.is_empty() {
                println!("Badges: none yet");
            } else {
                println!("Badges: {}", progress.badges.join(", "));
            }
            println!(
                "Certificate: {}",
                match (progress.certificate_unlocked, progress.certificate_generated) {
                    (false, _) => "locked",
                    (true, false) => "unlocked",
                    (true, true) => "issued",
                }
            );
        }
        Commands::Update { mission, stage, completed, score } => {
            if completed.is_none() && score.is_none() {
                bail!("nothing to update: pass --completed and/or --score");
            }
            let progress = tracker
                .update_game_progress_by_key(&mission, &stage, GamePatch { completed, score })
                .await?;
            let mission: Mission = mission.parse()?;
            println!(
                "{} {}% (total score {})",
                mission,
                progress.mission_progress_percent(mission),
                progress.total_score
            );
        }
        Commands::Certificate { title } => {
            let progress = tracker.issue_certificate(&title).await?;
            info!(certificates = progress.certificates.len(), "certificate recorded");
            println!("Certificate issued: {}", title.trim());
        }
        Commands::Quiz { action } => {
            let quiz = DailyQuiz::new(store.clone());
            let today = chrono::Local::now().date_naive();
            match action {
                QuizAction::Status => {
                    println!("Streak: {}", quiz.streak(today).await?);
                    println!(
                        "Today's quiz: {}",
                        if quiz.is_completed(today).await? { "done" } else { "pending" }
                    );
                }
                QuizAction::Done { failed } => {
                    if quiz.is_completed(today).await? {
                        bail!("today's quiz is already completed");
                    }
                    let streak = quiz.record_session(today, !failed).await?;
                    println!("Streak: {}", streak);
                }
            }
        }
        Commands::Settings { action } => {
            let settings = SettingsStore::new(store.clone());
            let current = match action {
                SettingsAction::Show => settings.read().await?,
                SettingsAction::Set {
                    language,
                    theme,
                    font_size,
                    high_contrast,
                    reduced_motion,
                    screen_reader_mode,
                    keyboard_navigation,
                    audio_enabled,
                    autoplay,
                    notifications,
                    data_collection,
                } => {
                    let accessibility = AccessibilityPatch {
                        font_size,
                        high_contrast,
                        reduced_motion,
                        screen_reader_mode,
                        keyboard_navigation,
                        audio_enabled,
                        autoplay,
                    };
                    settings
                        .save(SettingsPatch {
                            accessibility: Some(accessibility),
                            language,
                            theme,
                            notifications,
                            data_collection,
                        })
                        .await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        Commands::Name { name } => {
            let profile = Profile::new(store.clone());
            if let Some(name) = name {
                profile.set_name(&name).await?;
            }
            match profile.name().await? {
                Some(name) => println!("{}", name),
                None => println!("(no name set)"),
            }
        }
        Commands::Export { out } => {
            let export = Profile::new(store.clone()).export().await?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(export_file_name(export.export_date.date_naive()))
            });
            write_export(&path, &export).await?;
            println!("Exported to {}", path.display());
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("this deletes all progress and settings; re-run with --yes to confirm");
            }
            Profile::new(store.clone()).reset_all().await?;
            println!("All data reset");
        }
    }

    Ok(())
}
