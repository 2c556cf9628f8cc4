//! # Video Module
//!
//! Frame access and splicing. The matcher only depends on [`VideoSource`];
//! [`MediaBackend`] implementations decide how videos are stored on disk.

pub mod backend;
pub mod ffmpeg;
pub mod image_sequence;
pub mod source;
pub mod types;

pub use backend::{MediaBackend, SpliceRequest, SpliceSummary};
pub use ffmpeg::{FfmpegBackend, FfmpegVideo};
pub use image_sequence::{ImageSequenceBackend, ImageSequenceVideo};
pub use source::{MemoryVideo, VideoSource};
pub use types::{Frame, VideoDetails};
