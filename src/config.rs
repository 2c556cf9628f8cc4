use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for Frame Bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Frame matching settings
    pub matcher: MatcherConfig,

    /// Video decoding and encoding settings
    pub video: VideoConfig,

    /// Batch processing settings
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        self.video.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

/// Size every frame is normalized to before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetSize {
    /// Per-axis minimum of the two videos' frame dimensions, scaled down to
    /// `matcher.max_dimension` when larger
    SmallestSource,

    /// A fixed canonical size
    Fixed { width: u32, height: u32 },
}

impl Default for TargetSize {
    fn default() -> Self {
        TargetSize::SmallestSource
    }
}

/// Frame matcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Number of frames sampled from the tail of the first video and the head of the second
    pub window_size: usize,

    /// Skip the very last frame of the first video and the very first frame of the second
    pub exclude_edge_frames: bool,

    /// Score the comparison grid on the rayon pool
    pub parallel: bool,

    /// Worker threads for parallel scoring
    pub threads: usize,

    /// Edge length of the local SSIM window (odd)
    pub ssim_window: usize,

    /// Normalization target
    pub target_size: TargetSize,

    /// Longest edge of a `smallest_source` target; 0 leaves it unbounded
    pub max_dimension: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            exclude_edge_frames: false,
            parallel: true,
            threads: num_cpus::get(),
            ssim_window: 7,
            target_size: TargetSize::default(),
            max_dimension: 640,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "matcher.window_size".to_string(),
                value: self.window_size.to_string()
            }.into());
        }

        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "matcher.threads".to_string(),
                value: self.threads.to_string()
            }.into());
        }

        if self.ssim_window < 3 || self.ssim_window % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                key: "matcher.ssim_window".to_string(),
                value: self.ssim_window.to_string()
            }.into());
        }

        if let TargetSize::Fixed { width, height } = self.target_size {
            if width == 0 || height == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "matcher.target_size".to_string(),
                    value: format!("{}x{}", width, height)
                }.into());
            }
        }

        Ok(())
    }
}

/// Video decoding and encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Encoder used for spliced output
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// ffmpeg executable
    pub ffmpeg_binary: String,

    /// ffprobe executable
    pub ffprobe_binary: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            quality: 85,
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "video.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.codec".to_string(),
                value: self.codec.clone()
            }.into());
        }

        Ok(())
    }
}

/// How a directory of videos is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// 1+2, then the result +3, and so on into a single output
    Sequential,

    /// (1,2), (3,4), ... into one output per pair
    Pairwise,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory receiving merged videos and the report
    pub output_dir: PathBuf,

    /// Merge strategy
    pub mode: BatchMode,

    /// Final output name in sequential mode
    pub output_filename: String,

    /// Report file name, written into the output directory
    pub report_filename: String,

    /// Accepted video extensions (lowercase, without the dot)
    pub supported_formats: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            mode: BatchMode::Sequential,
            output_filename: "merged_sequence.mp4".to_string(),
            report_filename: "batch_report.txt".to_string(),
            supported_formats: ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.output_filename.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "batch.output_filename".to_string(),
                value: self.output_filename.clone()
            }.into());
        }

        if self.supported_formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "batch.supported_formats".to_string(),
                value: "[]".to_string()
            }.into());
        }

        Ok(())
    }
}
