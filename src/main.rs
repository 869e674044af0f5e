//! astc-converter - batch ASTC texture conversion

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use astc_converter::pipeline::{CancelToken, ConversionEvent, ConversionJob, Pipeline, RunSummary};
use astc_converter::scan::scan_images;
use astc_converter::selection::{ImageCandidate, SelectionSet, SelectionView};
use astc_converter::settings::Settings;
use astc_converter::textures::{choose_block, choose_block_min_padding};

#[derive(Parser)]
#[command(name = "astc-converter")]
#[command(version)]
#[command(about = "Batch-convert image folders to ASTC textures using astcenc")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List convertible images and their default selection
    Scan {
        /// Folder to scan (defaults to the saved input folder)
        folder: Option<PathBuf>,

        /// Only show images whose file name contains this text
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Which images to list: all, selected or excluded
        #[arg(long, default_value = "all")]
        view: String,
    },

    /// Convert the selected images to .astc (sources are deleted on success)
    Convert {
        /// Folder to convert (defaults to the saved input folder)
        folder: Option<PathBuf>,

        /// Path to the astcenc executable
        #[arg(short, long, env = "ASTCENC_PATH")]
        encoder: Option<PathBuf>,

        /// Block size: auto or one of 4x4 .. 12x12
        #[arg(short, long)]
        block: Option<String>,

        /// Encoder quality: -fast, -medium, -thorough or -exhaustive
        #[arg(short, long, allow_hyphen_values = true)]
        quality: Option<String>,

        /// Parallel encoder runs (defaults to CPU count, at most 4)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Seconds before a single encoder run is abandoned
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Select every image whose file name contains this text
        #[arg(long)]
        include: Vec<String>,

        /// Exclude every image whose file name contains this text
        #[arg(long)]
        exclude: Vec<String>,

        /// Start from everything selected instead of the size-based default
        #[arg(long)]
        all: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Remember folder, encoder, block size and quality
        #[arg(long)]
        save: bool,
    },

    /// Show which block size auto mode picks for one image
    Advise {
        /// Image file
        image: PathBuf,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the saved settings
    Show,

    /// Update saved settings
    Set {
        #[arg(long)]
        input_folder: Option<String>,

        #[arg(long)]
        encoder: Option<String>,

        #[arg(long)]
        block: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        quality: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(if cli.verbose {
                "astc_converter=debug".parse()?
            } else {
                "astc_converter=warn".parse()?
            }))
            .init();
    }

    match cli.command {
        Commands::Scan { folder, filter, view } => {
            let settings = Settings::load();
            let folder = folder.unwrap_or_else(|| PathBuf::from(&settings.input_folder));
            let view = SelectionView::from_str(&view)
                .ok_or_else(|| anyhow::anyhow!("Unknown view '{}' (all, selected, excluded)", view))?;

            ensure_folder_given(&folder)?;

            let config = settings.to_convert_config()?;
            let scanned = scan_images(&folder, &config.scan)?;
            if scanned.is_empty() {
                println!("No images found.");
                return Ok(());
            }

            let mut set = SelectionSet::classify(&scanned, &config.thresholds);
            set.set_filter(&filter);

            for index in set.view(view) {
                if let Some(candidate) = set.get(index) {
                    println!(
                        "[{}] {:>11}  {:<5}  {}",
                        if candidate.is_selected() { "x" } else { " " },
                        format!("{}x{}", candidate.width, candidate.height),
                        candidate.tier(&config.thresholds).name(),
                        candidate.path.display()
                    );
                }
            }

            let counts = set.counts();
            println!(
                "\nTotal: {} | Filtered: {} | Selected: {}",
                counts.total, counts.filtered, counts.selected
            );
        }

        Commands::Convert {
            folder,
            encoder,
            block,
            quality,
            workers,
            timeout,
            include,
            exclude,
            all,
            yes,
            save,
        } => {
            let mut settings = Settings::load();
            if let Some(folder) = folder {
                settings.input_folder = folder.to_string_lossy().to_string();
            }
            if let Some(encoder) = encoder {
                settings.encoder_path = encoder.to_string_lossy().to_string();
            }
            if let Some(block) = block {
                settings.block_size = block;
            }
            if let Some(quality) = quality {
                settings.quality = quality;
            }

            let mut config = settings.to_convert_config()?;
            if let Some(workers) = workers {
                config.workers = workers.max(1);
            }
            config.timeout = Duration::from_secs(timeout);
            ensure_folder_given(&config.input_folder)?;

            // Pre-flight before anything else touches the folder
            let pipeline = Pipeline::new(&config)?;

            if save {
                settings.save()?;
            }

            println!("astc-converter");
            println!("Folder:  {}", config.input_folder.display());
            println!("Encoder: {}", config.encoder_path.display());
            println!("Block:   {}", config.block);
            println!("Quality: {}", config.quality);
            println!("Workers: {}", pipeline.workers());
            println!();

            let scanned = scan_images(&config.input_folder, &config.scan)?;
            if scanned.is_empty() {
                println!("No images found.");
                return Ok(());
            }

            let mut set = SelectionSet::classify(&scanned, &config.thresholds);
            if all {
                let everything = set.filter("");
                set.select_all(&everything);
            }
            for term in &include {
                let view = set.filter(term);
                set.select_all(&view);
            }
            for term in &exclude {
                let view = set.filter(term);
                set.deselect_all(&view);
            }

            let counts = set.counts();
            println!("Total: {} | Selected: {}", counts.total, counts.selected);

            let selected = set.selected();
            if selected.is_empty() {
                println!("No images to convert.");
                return Ok(());
            }

            if !yes && !confirm(selected.len())? {
                println!("Aborted.");
                return Ok(());
            }

            let jobs = Pipeline::jobs_for(&selected, &config);
            let summary = run_with_progress(&pipeline, jobs).await;

            println!("\n{}", summary.summary_line());
            if summary.failed > 0 {
                println!("Some images failed. Fix the issues and run again; converted files are skipped.");
            }
        }

        Commands::Advise { image } => {
            let candidate = ImageCandidate::probe(&image)
                .with_context(|| format!("Could not read image header: {}", image.display()))?;
            advise(&candidate);
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let settings = Settings::load();
                println!("Settings file: {}", Settings::settings_path()?.display());
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigAction::Set {
                input_folder,
                encoder,
                block,
                quality,
            } => {
                let mut settings = Settings::load();
                if let Some(v) = input_folder {
                    settings.input_folder = v;
                }
                if let Some(v) = encoder {
                    settings.encoder_path = v;
                }
                if let Some(v) = block {
                    settings.block_size = v;
                }
                if let Some(v) = quality {
                    settings.quality = v;
                }

                // Reject values a later run could not parse
                settings.block_choice()?;
                settings.quality()?;

                settings.save()?;
                println!("Saved {}", Settings::settings_path()?.display());
            }
        },
    }

    Ok(())
}

fn confirm(count: usize) -> Result<bool> {
    print!("Convert {} images? Sources are deleted after conversion. [y/N] ", count);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Run the pipeline, printing one line per outcome above a progress bar.
/// Ctrl-C requests cancellation; running encoder calls are left to finish.
async fn run_with_progress(pipeline: &Pipeline, jobs: Vec<ConversionJob>) -> RunSummary {
    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Converting...");

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    let ctrl_c_pb = pb.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
            ctrl_c_pb.println("Cancelling... running encoder calls will finish first.");
            ctrl_c_pb.set_message("Cancelling...");
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let consumer = async {
        while let Some(event) = rx.recv().await {
            match event {
                ConversionEvent::Outcome { report, completed, .. } => {
                    pb.println(report.log_line());
                    for warning in &report.warnings {
                        pb.println(format!("  warning: {}", warning));
                    }
                    pb.set_position(completed as u64);
                }
                ConversionEvent::Finished(_) => {
                    pb.finish_and_clear();
                }
            }
        }
    };

    let (summary, ()) = tokio::join!(pipeline.run(jobs, cancel, tx), consumer);
    ctrl_c.abort();
    summary
}

fn advise(candidate: &ImageCandidate) {
    let (w, h) = (candidate.width, candidate.height);
    let auto = choose_block(w, h, candidate.file_size);
    let min_padding = choose_block_min_padding(w, h);

    println!("Image:      {}", candidate.path.display());
    println!("Dimensions: {}x{}", w, h);
    println!("File size:  {} bytes", candidate.file_size);
    println!();

    for (label, block) in [("Auto", auto), ("Min padding", min_padding)] {
        let (pw, ph) = block.aligned_dims(w, h);
        println!(
            "{:<12} {:>5}  -> {} bytes, padded to {}x{}",
            format!("{}:", label),
            block.to_string(),
            block.estimated_bytes(w, h),
            pw,
            ph
        );
    }

    if auto != min_padding {
        println!("\nConversion with --block auto uses {}.", auto);
    }
}

fn ensure_folder_given(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("No input folder given and none saved (use `config set --input-folder`)");
    }
    Ok(())
}
