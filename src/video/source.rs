use std::ops::Range;

use crate::error::{MatchError, Result};
use crate::video::types::Frame;

/// Minimal capability interface over a decoded, frame-indexed video
///
/// Implementations are borrowed, never consumed, by the matcher. Reading a
/// frame must not change what later reads return.
pub trait VideoSource: Send + Sync {
    /// Total number of decodable frames
    fn frame_count(&self) -> usize;

    /// Frames per second
    fn fps(&self) -> f64;

    /// Frame width and height
    fn dimensions(&self) -> (u32, u32);

    /// Decode the frame at `index`
    ///
    /// Failures are reported as [`MatchError::FrameRead`] carrying the index.
    fn frame(&self, index: usize) -> Result<Frame>;

    /// Decode a contiguous range of frames in order
    ///
    /// Sources that can decode a run of frames cheaper than seeking to each one
    /// should override this.
    fn frames(&self, range: Range<usize>) -> Result<Vec<Frame>> {
        range.map(|index| self.frame(index)).collect()
    }
}

impl<T: VideoSource + ?Sized> VideoSource for Box<T> {
    fn frame_count(&self) -> usize {
        (**self).frame_count()
    }

    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn frame(&self, index: usize) -> Result<Frame> {
        (**self).frame(index)
    }

    fn frames(&self, range: Range<usize>) -> Result<Vec<Frame>> {
        (**self).frames(range)
    }
}

/// A video held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryVideo {
    frames: Vec<Frame>,
    fps: f64,
}

impl MemoryVideo {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self { frames, fps }
    }

    /// One solid-color frame per entry of `colors`
    pub fn solid_colors(width: u32, height: u32, colors: &[[u8; 3]], fps: f64) -> Self {
        let frames = colors
            .iter()
            .map(|&color| Frame::new_filled(width, height, color))
            .collect();
        Self::new(frames, fps)
    }
}

impl VideoSource for MemoryVideo {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frames.first().map(Frame::dimensions).unwrap_or((0, 0))
    }

    fn frame(&self, index: usize) -> Result<Frame> {
        self.frames.get(index).cloned().ok_or_else(|| {
            MatchError::FrameRead {
                index,
                reason: format!("index out of range (video has {} frames)", self.frames.len()),
            }
            .into()
        })
    }

    fn frames(&self, range: Range<usize>) -> Result<Vec<Frame>> {
        if range.end > self.frames.len() {
            return Err(MatchError::FrameRead {
                index: range.start.max(self.frames.len()),
                reason: format!("index out of range (video has {} frames)", self.frames.len()),
            }
            .into());
        }
        Ok(self.frames[range].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[test]
    fn test_memory_video_basics() {
        let video = MemoryVideo::solid_colors(8, 6, &[[0, 0, 0], [255, 255, 255]], 24.0);
        assert_eq!(video.frame_count(), 2);
        assert_eq!(video.dimensions(), (8, 6));
        assert_eq!(video.frame(1).unwrap().get_pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn test_out_of_range_reports_index() {
        let video = MemoryVideo::solid_colors(2, 2, &[[1, 2, 3]], 30.0);
        match video.frame(5) {
            Err(BridgeError::Match(MatchError::FrameRead { index, .. })) => assert_eq!(index, 5),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_boxed_source_delegates() {
        let boxed: Box<dyn VideoSource> =
            Box::new(MemoryVideo::solid_colors(3, 3, &[[9, 9, 9]; 4], 10.0));
        assert_eq!(boxed.frame_count(), 4);
        assert_eq!(boxed.frames(1..3).unwrap().len(), 2);
    }
}
