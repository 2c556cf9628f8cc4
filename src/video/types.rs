use std::fmt;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, Rgb, RgbImage};

/// Represents a single decoded video frame
///
/// A thin wrapper around an RGB image buffer. Frames handed out by a
/// [`VideoSource`](crate::video::VideoSource) are never modified by the matcher.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Create a frame by evaluating `f` at every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| Rgb(f(x, y)));
        Self { buffer }
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Width and height as a tuple
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Single-channel luma copy of this frame
    pub fn to_luma(&self) -> GrayImage {
        image::DynamicImage::ImageRgb8(self.buffer.clone()).into_luma8()
    }

    /// Save the frame as an image file; the format follows the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// Properties of an opened video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: usize,
    pub file_size: u64,
}

impl VideoDetails {
    /// Playback duration in seconds
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

impl fmt::Display for VideoDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Video: {}", self.path.display())?;
        writeln!(f, "  Resolution: {} x {}", self.width, self.height)?;
        writeln!(f, "  Frame rate: {:.2} fps", self.fps)?;
        writeln!(f, "  Frames:     {}", self.frame_count)?;
        writeln!(f, "  Duration:   {:.2} s", self.duration())?;
        write!(f, "  File size:  {:.1} MB", self.file_size as f64 / (1024.0 * 1024.0))
    }
}
