use std::fmt;

use thiserror::Error;

/// Main error type for the Frame Bridge library
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Frame matching error: {0}")]
    Match(#[from] MatchError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Batch processing error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Which input of a pair an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    First,
    Second,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::First => write!(f, "first video"),
            Input::Second => write!(f, "second video"),
        }
    }
}

/// Failures of the frame matcher. All of them are fatal for the pair being matched.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("The {input} has no decodable frames")]
    EmptyVideo { input: Input },

    #[error("Frame cannot be normalized for comparison: {reason}")]
    InvalidFrame { reason: String },

    #[error("Failed to read frame {index}: {reason}")]
    FrameRead { index: usize, reason: String },

    #[error("Invalid matcher parameters: {details}")]
    InvalidParameters { details: String },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load video file: {path}")]
    LoadFailed { path: String },

    #[error("Output would overwrite input: {path}")]
    OutputIsInput { path: String },

    #[error("Video probing failed: {reason}")]
    ProbeFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("External tool not available: {tool}")]
    ToolMissing { tool: String },
}

/// Batch-specific errors
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input directory not found: {path}")]
    InputNotFound { path: String },

    #[error("At least two videos are required, found {found}")]
    NotEnoughInputs { found: usize },

    #[error("Report generation failed: {reason}")]
    ReportFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Match(MatchError::EmptyVideo { input }) => {
                format!("The {} contains no frames. Please check the file is a valid video.", input)
            }
            Self::Match(MatchError::FrameRead { index, .. }) => {
                format!("Frame {} could not be decoded. Try a smaller window size.", index)
            }
            Self::Video(VideoError::LoadFailed { path }) => {
                format!("Could not load video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::ToolMissing { tool }) => {
                format!("'{}' was not found. Please install FFmpeg and make sure it is on PATH.", tool)
            }
            Self::Video(VideoError::OutputIsInput { path }) => {
                format!("The output '{}' is one of the inputs. Choose a different output path.", path)
            }
            Self::Batch(BatchError::NotEnoughInputs { found }) => {
                format!("Merging needs at least two videos, but only {} were found.", found)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
