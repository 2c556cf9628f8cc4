use std::ops::Range;

use tracing::debug;

use crate::error::{MatchError, Result};
use crate::video::{Frame, VideoSource};

/// Which end of a video a window is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The first frames of the video
    Head,
    /// The last frames of the video
    Tail,
}

/// Candidate splice frames with their original indices, in time order
#[derive(Debug, Clone)]
pub struct CandidateWindow {
    side: Side,
    entries: Vec<(usize, Frame)>,
}

impl CandidateWindow {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frame(&self, position: usize) -> Option<&Frame> {
        self.entries.get(position).map(|(_, frame)| frame)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|(index, _)| *index).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, Frame)> {
        self.entries.iter()
    }

    /// Take the frame at `position` out of the window
    pub(crate) fn into_frame(mut self, position: usize) -> Option<(usize, Frame)> {
        (position < self.entries.len()).then(|| self.entries.swap_remove(position))
    }
}

/// Read up to `count` frames from one end of `video`
///
/// Short videos are not an error: the window shrinks to the frames available.
pub fn extract_window<V: VideoSource + ?Sized>(
    video: &V,
    side: Side,
    count: usize,
) -> Result<CandidateWindow> {
    extract_window_with_margin(video, side, count, 0)
}

/// Like [`extract_window`], but first skips `margin` frames at the outer edge
/// (the last frames for [`Side::Tail`], the first ones for [`Side::Head`]).
///
/// The margin never removes the only remaining frame.
pub fn extract_window_with_margin<V: VideoSource + ?Sized>(
    video: &V,
    side: Side,
    count: usize,
    margin: usize,
) -> Result<CandidateWindow> {
    if count == 0 {
        return Err(MatchError::InvalidParameters {
            details: "window size must be positive".to_string(),
        }.into());
    }

    let range = window_range(video.frame_count(), side, count, margin);
    debug!("Extracting {:?} window {:?} of {} frames", side, range, video.frame_count());

    let start = range.start;
    let frames = video.frames(range.clone())?;
    if frames.len() != range.len() {
        return Err(MatchError::FrameRead {
            index: start + frames.len().min(range.len()),
            reason: format!("expected {} frames, source returned {}", range.len(), frames.len()),
        }.into());
    }

    Ok(CandidateWindow {
        side,
        entries: range.zip(frames).collect(),
    })
}

fn window_range(total: usize, side: Side, count: usize, margin: usize) -> Range<usize> {
    if total == 0 {
        return 0..0;
    }

    let margin = margin.min(total - 1);
    match side {
        Side::Tail => {
            let end = total - margin;
            end.saturating_sub(count)..end
        }
        Side::Head => {
            let start = margin;
            start..(start + count).min(total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::MemoryVideo;

    fn numbered(count: usize) -> MemoryVideo {
        let colors: Vec<[u8; 3]> = (0..count).map(|i| [i as u8, 0, 0]).collect();
        MemoryVideo::solid_colors(2, 2, &colors, 30.0)
    }

    #[test]
    fn test_tail_window_is_in_time_order() {
        let window = extract_window(&numbered(10), Side::Tail, 3).unwrap();
        assert_eq!(window.indices(), vec![7, 8, 9]);
        assert_eq!(window.frame(0).unwrap().get_pixel(0, 0), [7, 0, 0]);
    }

    #[test]
    fn test_head_window() {
        let window = extract_window(&numbered(10), Side::Head, 4).unwrap();
        assert_eq!(window.indices(), vec![0, 1, 2, 3]);
        assert_eq!(window.side(), Side::Head);
    }

    #[test]
    fn test_short_video_is_clamped() {
        let video = numbered(2);
        assert_eq!(extract_window(&video, Side::Tail, 30).unwrap().indices(), vec![0, 1]);
        assert_eq!(extract_window(&video, Side::Head, 30).unwrap().indices(), vec![0, 1]);
    }

    #[test]
    fn test_margin_skips_edge_frames() {
        let video = numbered(10);
        let tail = extract_window_with_margin(&video, Side::Tail, 3, 1).unwrap();
        let head = extract_window_with_margin(&video, Side::Head, 3, 1).unwrap();
        assert_eq!(tail.indices(), vec![6, 7, 8]);
        assert_eq!(head.indices(), vec![1, 2, 3]);
    }

    #[test]
    fn test_margin_keeps_single_frame() {
        let video = numbered(1);
        let tail = extract_window_with_margin(&video, Side::Tail, 5, 1).unwrap();
        assert_eq!(tail.indices(), vec![0]);
    }

    #[test]
    fn test_empty_video_gives_empty_window() {
        let window = extract_window(&MemoryVideo::default(), Side::Head, 3).unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_count_is_rejected() {
        assert!(extract_window(&numbered(3), Side::Head, 0).is_err());
    }

    #[test]
    fn test_into_frame() {
        let window = extract_window(&numbered(5), Side::Tail, 2).unwrap();
        let (index, frame) = window.into_frame(1).unwrap();
        assert_eq!(index, 4);
        assert_eq!(frame.get_pixel(1, 1), [4, 0, 0]);
    }
}
