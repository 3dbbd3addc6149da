use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use motionbase::{
    DEFAULT_SETTINGS_FILE, FfmpegLogLevel, MotionError, MotionSettings, ProgressCallback,
    ProgressInfo, RegenerateOptions, SettingsCheck, VideoSource, check_settings,
    generate_base_images, regenerate_all, save_settings_with_model,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  motionbase generate clips/hive_03.mp4 240 --static-out s.jpg --motion-out m.jpg\n  motionbase regenerate --root project --progress\n  motionbase check-settings --model-dirs models/motion_v2 --json\n  motionbase completions zsh > _motionbase";

/// Exit code of `check-settings` when nothing relevant changed.
const EXIT_UNCHANGED: i32 = 1;
/// Exit code for every failure.
const EXIT_FAILURE: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "motionbase",
    version,
    about = "Rebuild static and motion annotation images from video clips",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the images for one frame.
    #[command(
        about = "Rebuild the static and motion images for one frame",
        after_help = "Examples:\n  motionbase generate clips/hive_03.mp4 240 --static-out s.jpg --motion-out m.jpg"
    )]
    Generate {
        /// Input video path.
        video: PathBuf,
        /// Target frame (last frame of the window).
        frame: u64,
        /// Settings file.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,
        /// Where to write the static image.
        #[arg(long)]
        static_out: PathBuf,
        /// Where to write the motion image.
        #[arg(long)]
        motion_out: PathBuf,
    },

    /// Rebuild every labelled frame of a project.
    #[command(
        about = "Regenerate all labelled annotation images",
        after_help = "Examples:\n  motionbase regenerate\n  motionbase regenerate --root project --write-static --progress"
    )]
    Regenerate {
        /// Project root holding clips/, annot_motion/ and annot_static/.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Settings file, relative to the root unless absolute.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,
        /// Clip directory (defaults to <root>/clips).
        #[arg(long)]
        clips: Option<PathBuf>,
        /// Also rewrite the static images.
        #[arg(long)]
        write_static: bool,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Check whether the motion settings changed since the last snapshot.
    #[command(
        about = "Compare current motion settings with the saved snapshot",
        after_help = "Exit status: 0 if regeneration is due, 1 if not, 2 on error."
    )]
    CheckSettings {
        /// Current settings file.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,
        /// Explicit snapshot to compare against.
        #[arg(long)]
        saved: Option<PathBuf>,
        /// Model directories to look for snapshots and trained weights in.
        #[arg(long, num_args = 1..)]
        model_dirs: Vec<PathBuf>,
        /// Directory searched when no model directory has a snapshot.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Output the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Store the settings file next to a trained model.
    #[command(about = "Save a settings snapshot into a model directory")]
    SaveSettings {
        /// Model directory (created if missing).
        model_dir: PathBuf,
        /// Settings file to snapshot.
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata")]
    Probe {
        /// Input video path.
        video: PathBuf,
        /// Output metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed =
            FfmpegLogLevel::from_name(level).ok_or(format!("unsupported --log-level: {level}"))?;
        motionbase::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        match &info.current_item {
            Some(item) => self.bar.set_message(item.clone()),
            None => self.bar.finish_and_clear(),
        }
    }
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.as_ref().yellow());
}

/// JPEG paths go through the same quality-95 writer as `regenerate`; other
/// extensions pick their format from the extension.
fn save_image(image: &RgbImage, path: &Path) -> Result<(), MotionError> {
    let is_jpeg = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg")
        });
    if is_jpeg {
        motionbase::write_jpeg(image, path)
    } else {
        image.save(path).map_err(MotionError::from)
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;
    let verbose = cli.global.verbose;

    match cli.command {
        Commands::Generate {
            video,
            frame,
            config,
            static_out,
            motion_out,
        } => {
            let settings = MotionSettings::load(&config)?;
            let params = settings.window_parameters();
            params.validate()?;
            if verbose {
                eprintln!(
                    "{} {} frames, stride {}, strategy {}",
                    "window".cyan().bold(),
                    params.sample_count,
                    params.stride_step,
                    params.decay_strategy.name()
                );
            }

            let mut source = VideoSource::open(&video)?;
            let images = generate_base_images(&mut source, frame, &params)?;
            if images.is_degraded() {
                warn(format!(
                    "frame {frame}: built from {}/{} frames starting at {}",
                    images.frames_used, images.frames_requested, images.start_frame
                ));
            }
            save_image(&images.static_image, &static_out)?;
            save_image(&images.motion_image, &motion_out)?;
            println!(
                "{} {} and {}",
                "wrote".green().bold(),
                static_out.display(),
                motion_out.display()
            );
        }
        Commands::Regenerate {
            root,
            config,
            clips,
            write_static,
            progress,
        } => {
            let config = resolve_under(&root, &config);
            let settings = MotionSettings::load(&config)?;

            let mut options = RegenerateOptions::new(&root).with_write_static(write_static);
            if let Some(clips) = clips {
                options = options.with_clips_dir(clips);
            }
            if progress {
                options = options.with_progress(Arc::new(BarProgress::new()?));
            }

            let summary = regenerate_all(&settings, &options)?;
            for skipped in &summary.skipped {
                eprintln!(
                    "{} {} [{}]: {}",
                    "skipped".yellow().bold(),
                    skipped.item.base_name,
                    skipped.item.split,
                    skipped.reason
                );
            }
            if verbose && summary.degraded > 0 {
                warn(format!(
                    "{} images were built from a shortened window",
                    summary.degraded
                ));
            }
            println!(
                "{} {} regenerated, {} skipped",
                "done".green().bold(),
                summary.regenerated,
                summary.skipped.len()
            );
        }
        Commands::CheckSettings {
            config,
            saved,
            model_dirs,
            root,
            json,
        } => {
            let check = check_settings(&config, saved.as_deref(), &model_dirs, &root)?;
            if json {
                let payload = json!({
                    "changed": check.is_changed(),
                    "check": check,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                match &check {
                    SettingsCheck::Changed { snapshot, .. } => println!(
                        "{} motion settings differ from {}",
                        "changed".yellow().bold(),
                        snapshot.display()
                    ),
                    SettingsCheck::Unchanged { snapshot } => println!(
                        "{} motion settings match {}",
                        "unchanged".green().bold(),
                        snapshot.display()
                    ),
                    SettingsCheck::NoSnapshot { model_exists: true } => println!(
                        "{} a motion model exists but no settings snapshot was found",
                        "changed".yellow().bold()
                    ),
                    SettingsCheck::NoSnapshot { model_exists: false } => println!(
                        "{} no snapshot and no trained motion model yet",
                        "unchanged".green().bold()
                    ),
                }
            }
            if !check.is_changed() {
                return Ok(EXIT_UNCHANGED);
            }
        }
        Commands::SaveSettings { model_dir, config } => {
            let destination = save_settings_with_model(&model_dir, &config)?;
            println!("{} {}", "saved".green().bold(), destination.display());
        }
        Commands::Probe { video, json } => {
            let source = VideoSource::open(&video)?;
            let metadata = source.metadata();
            if json {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps, {} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec,
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "motionbase", &mut std::io::stdout());
        }
    }

    Ok(0)
}

fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(EXIT_FAILURE);
        }
    }
}
