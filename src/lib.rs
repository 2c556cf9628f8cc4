//! # Frame Bridge
//!
//! Splice two video clips at their visually smoothest point.
//!
//! The matcher compares the last frames of the first video with the first
//! frames of the second using structural similarity (SSIM) and picks the most
//! similar pair. The spliced output keeps the first video up to and including
//! its chosen frame, then continues with the second video from its chosen frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frame_bridge::{BridgeEngine, Config, video::FfmpegBackend};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let backend = FfmpegBackend::new(config.video.clone(), &config.batch)?;
//!
//! let engine = BridgeEngine::new(config, backend);
//! let outcome = engine.bridge("intro.mp4", "main.mp4", "output/merged.mp4").await?;
//! println!("cut at {} -> {} (SSIM {:.3})",
//!          outcome.match_summary.frame_index_a,
//!          outcome.match_summary.frame_index_b,
//!          outcome.match_summary.score);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`matcher`] - Window extraction, normalization, SSIM and splice-point search
//! - [`video`] - Frame access ([`VideoSource`](video::VideoSource)) and on-disk backends
//! - [`bridge`] - Async engine tying the matcher to a backend
//! - [`batch`] - Directory-wide sequential and pairwise merging with reports
//! - [`config`] - Configuration management
//!
//! ## Custom Frame Sources
//!
//! The matcher works with anything that implements [`VideoSource`](video::VideoSource):
//!
//! ```rust
//! use frame_bridge::{config::TargetSize, matcher::find_best_connection, video::MemoryVideo};
//!
//! let first = MemoryVideo::solid_colors(32, 18, &[[0, 0, 0], [255, 0, 0]], 30.0);
//! let second = MemoryVideo::solid_colors(32, 18, &[[255, 0, 0], [0, 0, 0]], 30.0);
//!
//! let result = find_best_connection(&first, &second, 2, TargetSize::SmallestSource).unwrap();
//! assert_eq!((result.frame_index_a, result.frame_index_b), (1, 0));
//! ```

pub mod batch;
pub mod bridge;
pub mod config;
pub mod error;
pub mod matcher;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    batch::{BatchProcessor, BatchReport},
    bridge::{BridgeEngine, BridgeOutcome},
    config::Config,
    error::{BridgeError, Result},
    matcher::{FrameMatcher, MatchResult},
};
