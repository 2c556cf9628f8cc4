use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use frame_bridge::{
    batch::{BatchProcessor, BatchReport},
    bridge::BridgeEngine,
    config::{BatchMode, Config},
    error::BridgeError,
    video::{FfmpegBackend, ImageSequenceBackend, MediaBackend},
};

#[derive(Parser)]
#[command(
    name = "frame-bridge",
    version,
    about = "Splice videos at their visually smoothest point",
    long_about = "Frame Bridge compares the last frames of one video with the first frames of the next using structural similarity, and splices them where the transition is least visible."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of frames searched at each end of a video
    #[arg(short, long, global = true)]
    window_size: Option<usize>,

    /// Never cut at the very last frame of the first video or the very first frame of the second
    #[arg(long, global = true)]
    exclude_edge_frames: bool,

    /// Worker threads for frame scoring
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Treat inputs as directories of numbered images instead of video files
    #[arg(long, global = true)]
    image_sequence: bool,

    /// Frame rate of image sequences
    #[arg(long, global = true, default_value_t = 30.0)]
    fps: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Splice two videos at their best connection
    Merge {
        /// Video that plays first
        first: PathBuf,

        /// Video that plays second
        second: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Do not save the two connection frames next to the output
        #[arg(long)]
        no_frames: bool,
    },

    /// Merge every video in a directory
    Batch {
        /// Directory containing the videos
        input: PathBuf,

        /// Merge strategy
        #[arg(short, long, value_enum)]
        mode: Option<BatchMode>,

        /// Directory receiving merged videos and the report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Final output name (sequential mode)
        #[arg(short, long)]
        filename: Option<String>,

        /// Skip writing the report file
        #[arg(long)]
        no_report: bool,
    },

    /// Show resolution, frame rate, frame count and size of videos
    Inspect {
        videos: Vec<PathBuf>,
    },

    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Frame Bridge v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            match e.downcast_ref::<BridgeError>() {
                Some(bridge_error) => error!("{}", bridge_error.user_message()),
                None => error!("{:#}", e),
            }
            Err(e)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::InitConfig { path } = &cli.command {
        Config::default().save_to_file(path)?;
        info!("Default configuration written to {:?}", path);
        return Ok(());
    }

    let config = load_config(&cli)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.matcher.threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to configure thread pool: {}", e))?;

    if cli.image_sequence {
        execute(cli.command, config, ImageSequenceBackend::new(cli.fps)).await
    } else {
        let backend = FfmpegBackend::new(config.video.clone(), &config.batch)?;
        execute(cli.command, config, backend).await
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    // Command line flags override the file
    if let Some(window_size) = cli.window_size {
        config.matcher.window_size = window_size;
    }
    if cli.exclude_edge_frames {
        config.matcher.exclude_edge_frames = true;
    }
    if let Some(threads) = cli.threads {
        config.matcher.threads = threads;
    }
    if let Command::Batch { mode, output_dir, filename, .. } = &cli.command {
        if let Some(mode) = mode {
            config.batch.mode = *mode;
        }
        if let Some(output_dir) = output_dir {
            config.batch.output_dir = output_dir.clone();
        }
        if let Some(filename) = filename {
            config.batch.output_filename = filename.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

async fn execute<B: MediaBackend + 'static>(command: Command, config: Config, backend: B) -> Result<()> {
    info!("Window size: {} frames, edge frames {}",
          config.matcher.window_size,
          if config.matcher.exclude_edge_frames { "excluded" } else { "included" });

    match command {
        Command::Merge { first, second, output, no_frames } => {
            let engine = BridgeEngine::new(config, backend).with_frame_export(!no_frames);
            let outcome = engine.bridge(&first, &second, &output).await?;

            let summary = &outcome.match_summary;
            info!("Cut: frame {} of {:?} -> frame {} of {:?}",
                  summary.frame_index_a, first, summary.frame_index_b, second);
            info!("SSIM: {:.4} ({})", summary.score, summary.quality());
            if let Some((a, b)) = &outcome.frame_paths {
                info!("Connection frames: {:?}, {:?}", a, b);
            }
            info!("Output saved to: {:?} ({} frames)", outcome.output.output, outcome.output.total_frames());
        }

        Command::Batch { input, no_report, .. } => {
            let report_path = config.batch.output_dir.join(&config.batch.report_filename);
            let processor = BatchProcessor::new(config, backend);
            let summary = processor.process(&input).await?;

            let report = BatchReport::new(&summary);
            println!("{}", report.render());
            if !no_report {
                report.write_to(&report_path)?;
            }

            if !summary.succeeded() {
                anyhow::bail!("Batch produced no output");
            }
            for output in &summary.outputs {
                info!("Output: {:?}", output);
            }
        }

        Command::Inspect { videos } => {
            let engine = BridgeEngine::new(config, backend);
            let mut failed = 0;
            for video in &videos {
                if !inspect_one(&engine, video).await {
                    failed += 1;
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} videos could not be inspected", failed, videos.len());
            }
        }

        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// Print the details of one video, returning whether it could be read
async fn inspect_one<B: MediaBackend + 'static>(engine: &BridgeEngine<B>, video: &Path) -> bool {
    match engine.inspect(video).await {
        Ok(details) => {
            println!("{}", details);
            true
        }
        Err(e) => {
            warn!("Could not inspect {:?}: {}", video, e.user_message());
            false
        }
    }
}
