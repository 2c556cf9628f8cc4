//! # Frame Matcher
//!
//! Finds the splice point between two videos: the pair of frames, one from the
//! tail of the first video and one from the head of the second, with the
//! highest structural similarity.
//!
//! ```rust,no_run
//! use frame_bridge::config::TargetSize;
//! use frame_bridge::matcher::find_best_connection;
//! use frame_bridge::video::MemoryVideo;
//!
//! # fn main() -> frame_bridge::Result<()> {
//! let first = MemoryVideo::solid_colors(64, 36, &[[0, 0, 255], [255, 0, 0]], 30.0);
//! let second = MemoryVideo::solid_colors(64, 36, &[[255, 0, 0], [0, 255, 0]], 30.0);
//!
//! let result = find_best_connection(&first, &second, 2, TargetSize::SmallestSource)?;
//! assert_eq!((result.frame_index_a, result.frame_index_b), (1, 0));
//! # Ok(())
//! # }
//! ```

pub mod normalize;
pub mod ssim;
pub mod window;

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{MatcherConfig, TargetSize};
use crate::error::{Input, MatchError, Result};
use crate::video::{Frame, VideoSource};

pub use normalize::{cap_dimensions, normalize, resolve_target};
pub use ssim::{score, Ssim, SsimPlane};
pub use window::{extract_window, extract_window_with_margin, CandidateWindow, Side};

/// The chosen splice point
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Index into the first video (last frame kept from it)
    pub frame_index_a: usize,

    /// Index into the second video (first frame kept from it)
    pub frame_index_b: usize,

    /// SSIM of the two frames after normalization
    pub score: f64,

    /// Raw frame at `frame_index_a`
    pub frame_a: Frame,

    /// Raw frame at `frame_index_b`
    pub frame_b: Frame,

    /// Number of frame pairs scored
    pub comparisons: usize,

    /// Size every frame was normalized to
    pub normalized_size: (u32, u32),
}

impl MatchResult {
    pub fn quality(&self) -> MatchQuality {
        MatchQuality::from_score(self.score)
    }
}

/// Coarse rating of how seamless a splice will look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    NeedsReview,
}

impl MatchQuality {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            MatchQuality::Excellent
        } else if score > 0.6 {
            MatchQuality::Good
        } else if score > 0.4 {
            MatchQuality::Fair
        } else {
            MatchQuality::NeedsReview
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchQuality::Excellent => "excellent",
            MatchQuality::Good => "good",
            MatchQuality::Fair => "fair",
            MatchQuality::NeedsReview => "needs review",
        };
        f.write_str(label)
    }
}

/// Stateless splice-point finder configured from [`MatcherConfig`]
#[derive(Debug, Clone)]
pub struct FrameMatcher {
    window_size: usize,
    target_size: TargetSize,
    max_dimension: u32,
    exclude_edge_frames: bool,
    parallel: bool,
    ssim: Ssim,
}

impl Default for FrameMatcher {
    fn default() -> Self {
        Self::from_config(&MatcherConfig::default())
    }
}

impl FrameMatcher {
    pub fn new(window_size: usize, target_size: TargetSize) -> Self {
        Self {
            window_size,
            target_size,
            max_dimension: 0,
            exclude_edge_frames: false,
            parallel: false,
            ssim: Ssim::default(),
        }
    }

    pub fn from_config(config: &MatcherConfig) -> Self {
        Self {
            window_size: config.window_size,
            target_size: config.target_size,
            max_dimension: config.max_dimension,
            exclude_edge_frames: config.exclude_edge_frames,
            parallel: config.parallel,
            ssim: Ssim::new(config.ssim_window),
        }
    }

    /// Bound the longest edge of a [`TargetSize::SmallestSource`] target; 0 disables
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_edge_exclusion(mut self, exclude: bool) -> Self {
        self.exclude_edge_frames = exclude;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Find the best splice point between the tail of `first` and the head of `second`
    ///
    /// Ties go to the smallest index into the first video, then the smallest
    /// index into the second, so the result is reproducible whether or not the
    /// grid was scored in parallel.
    pub fn find_best_connection<A, B>(&self, first: &A, second: &B) -> Result<MatchResult>
    where
        A: VideoSource + ?Sized,
        B: VideoSource + ?Sized,
    {
        if self.window_size == 0 {
            return Err(MatchError::InvalidParameters {
                details: "window size must be positive".to_string(),
            }.into());
        }
        if first.frame_count() == 0 {
            return Err(MatchError::EmptyVideo { input: Input::First }.into());
        }
        if second.frame_count() == 0 {
            return Err(MatchError::EmptyVideo { input: Input::Second }.into());
        }

        let margin = usize::from(self.exclude_edge_frames);
        let tail = extract_window_with_margin(first, Side::Tail, self.window_size, margin)?;
        let head = extract_window_with_margin(second, Side::Head, self.window_size, margin)?;

        let (Some(sample_a), Some(sample_b)) = (tail.frame(0), head.frame(0)) else {
            return Err(MatchError::InvalidFrame {
                reason: "candidate window is empty".to_string(),
            }.into());
        };
        let mut target = resolve_target(self.target_size, sample_a.dimensions(), sample_b.dimensions())?;
        if self.target_size == TargetSize::SmallestSource {
            target = cap_dimensions(target, self.max_dimension);
        }

        debug!("Scoring {} x {} candidates at {}x{} (frames {:?} -> {:?})",
               tail.len(), head.len(), target.0, target.1, tail.indices(), head.indices());

        let planes_a = self.prepare(&tail, target)?;
        let planes_b = self.prepare(&head, target)?;
        let grid = self.score_grid(&planes_a, &planes_b)?;

        let (best, score) = select_best(&grid).ok_or_else(|| MatchError::InvalidFrame {
            reason: "no candidate pairs were scored".to_string(),
        })?;
        let (i, j) = (best / head.len(), best % head.len());

        let comparisons = grid.len();
        let (frame_index_a, frame_a) = tail.into_frame(i).ok_or_else(|| MatchError::InvalidFrame {
            reason: format!("window position {} out of range", i),
        })?;
        let (frame_index_b, frame_b) = head.into_frame(j).ok_or_else(|| MatchError::InvalidFrame {
            reason: format!("window position {} out of range", j),
        })?;

        info!("Best connection: first[{}] -> second[{}] (SSIM {:.4}, {} comparisons)",
              frame_index_a, frame_index_b, score, comparisons);

        Ok(MatchResult {
            frame_index_a,
            frame_index_b,
            score,
            frame_a,
            frame_b,
            comparisons,
            normalized_size: target,
        })
    }

    fn prepare(&self, window: &CandidateWindow, target: (u32, u32)) -> Result<Vec<SsimPlane>> {
        let build = |(_, frame): &(usize, Frame)| -> Result<SsimPlane> {
            SsimPlane::new(&normalize(frame, target)?)
        };
        let entries: Vec<&(usize, Frame)> = window.iter().collect();

        if self.parallel {
            entries.into_par_iter().map(build).collect()
        } else {
            entries.into_iter().map(build).collect()
        }
    }

    /// Row-major grid of scores: entry `i * b.len() + j` compares `a[i]` with `b[j]`
    fn score_grid(&self, a: &[SsimPlane], b: &[SsimPlane]) -> Result<Vec<f64>> {
        let cells = a.len() * b.len();
        let cell = |k: usize| self.ssim.compare(&a[k / b.len()], &b[k % b.len()]);

        if self.parallel {
            (0..cells).into_par_iter().map(cell).collect()
        } else {
            (0..cells).map(cell).collect()
        }
    }
}

/// First position holding the maximum score, with that score
fn select_best(grid: &[f64]) -> Option<(usize, f64)> {
    grid.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (k, score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((k, score)),
        })
}

/// Find the best splice point with an explicit window size and normalization target
pub fn find_best_connection<A, B>(
    first: &A,
    second: &B,
    window_size: usize,
    target_size: TargetSize,
) -> Result<MatchResult>
where
    A: VideoSource + ?Sized,
    B: VideoSource + ?Sized,
{
    FrameMatcher::new(window_size, target_size).find_best_connection(first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::video::MemoryVideo;

    const RED: [u8; 3] = [255, 0, 0];
    const GREEN: [u8; 3] = [0, 255, 0];
    const BLUE: [u8; 3] = [0, 0, 255];
    const WHITE: [u8; 3] = [255, 255, 255];
    const BLACK: [u8; 3] = [0, 0, 0];

    fn gradient(width: u32, height: u32, phase: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            let v = ((x * 9 + y * 5 + phase * 23) % 256) as u8;
            [v, v / 2, 255 - v]
        })
    }

    #[test]
    fn test_red_to_red_end_to_end() {
        let first = MemoryVideo::solid_colors(32, 24, &[GREEN, BLUE, WHITE, BLACK, RED], 30.0);
        let second = MemoryVideo::solid_colors(32, 24, &[RED, BLUE, GREEN, WHITE, BLACK], 30.0);

        let result = find_best_connection(&first, &second, 3, TargetSize::SmallestSource).unwrap();
        assert_eq!((result.frame_index_a, result.frame_index_b), (4, 0));
        assert_eq!(result.frame_a.get_pixel(0, 0), RED);
        assert_eq!(result.frame_b.get_pixel(0, 0), RED);
        assert_eq!(result.comparisons, 9);

        let red = normalize(&Frame::new_filled(32, 24, RED), (32, 24)).unwrap();
        for other in [GREEN, BLUE, WHITE, BLACK] {
            let other = normalize(&Frame::new_filled(32, 24, other), (32, 24)).unwrap();
            assert!(result.score > score(&red, &other).unwrap());
        }
    }

    #[test]
    fn test_default_config_finds_red_to_red() {
        let first = MemoryVideo::solid_colors(32, 24, &[GREEN, BLUE, WHITE, BLACK, RED], 30.0);
        let second = MemoryVideo::solid_colors(32, 24, &[RED, BLUE, GREEN, WHITE, BLACK], 30.0);

        let matcher = FrameMatcher::from_config(&MatcherConfig { window_size: 3, ..Default::default() });
        let result = matcher.find_best_connection(&first, &second).unwrap();
        assert_eq!((result.frame_index_a, result.frame_index_b), (4, 0));
        assert_eq!(result.comparisons, 9);
    }

    #[test]
    fn test_default_config_bounds_large_sources() {
        let first = MemoryVideo::solid_colors(1920, 1080, &[GREEN, RED], 30.0);
        let second = MemoryVideo::solid_colors(1280, 720, &[RED, BLUE], 30.0);

        let result = FrameMatcher::from_config(&MatcherConfig { window_size: 2, ..Default::default() })
            .find_best_connection(&first, &second)
            .unwrap();
        assert_eq!(result.normalized_size, (640, 360));
        assert_eq!((result.frame_index_a, result.frame_index_b), (1, 0));
        assert_eq!(result.frame_a.dimensions(), (1920, 1080));

        // An explicit fixed size is used as given
        let fixed = MatcherConfig {
            window_size: 1,
            target_size: TargetSize::Fixed { width: 800, height: 600 },
            ..Default::default()
        };
        let result = FrameMatcher::from_config(&fixed).find_best_connection(&first, &second).unwrap();
        assert_eq!(result.normalized_size, (800, 600));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let first = MemoryVideo::new((0..8).map(|p| gradient(40, 30, p)).collect(), 24.0);
        let second = MemoryVideo::new((5..13).map(|p| gradient(40, 30, p)).collect(), 24.0);
        let matcher = FrameMatcher::new(4, TargetSize::SmallestSource);

        let a = matcher.find_best_connection(&first, &second).unwrap();
        let b = matcher.find_best_connection(&first, &second).unwrap();
        assert_eq!((a.frame_index_a, a.frame_index_b, a.score), (b.frame_index_a, b.frame_index_b, b.score));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let first = MemoryVideo::new((0..10).map(|p| gradient(48, 32, p * 3)).collect(), 24.0);
        let second = MemoryVideo::new((0..10).map(|p| gradient(48, 32, p * 5)).collect(), 24.0);

        let sequential = FrameMatcher::new(6, TargetSize::SmallestSource)
            .find_best_connection(&first, &second)
            .unwrap();
        let parallel = FrameMatcher::new(6, TargetSize::SmallestSource)
            .with_parallel(true)
            .find_best_connection(&first, &second)
            .unwrap();

        assert_eq!(sequential.frame_index_a, parallel.frame_index_a);
        assert_eq!(sequential.frame_index_b, parallel.frame_index_b);
        assert_eq!(sequential.score, parallel.score);
    }

    #[test]
    fn test_ties_prefer_smallest_indices() {
        // Every frame is identical, so every pair scores 1.0
        let first = MemoryVideo::solid_colors(16, 16, &[BLUE; 6], 30.0);
        let second = MemoryVideo::solid_colors(16, 16, &[BLUE; 6], 30.0);

        let result = find_best_connection(&first, &second, 3, TargetSize::SmallestSource).unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!((result.frame_index_a, result.frame_index_b), (3, 0));
    }

    #[test]
    fn test_ties_break_on_second_index() {
        let first = MemoryVideo::solid_colors(16, 16, &[BLACK, RED, WHITE], 30.0);
        let second = MemoryVideo::solid_colors(16, 16, &[GREEN, RED, BLUE, RED], 30.0);

        let result = find_best_connection(&first, &second, 4, TargetSize::SmallestSource).unwrap();
        assert_eq!((result.frame_index_a, result.frame_index_b), (1, 1));
    }

    #[test]
    fn test_short_videos_are_clamped() {
        let first = MemoryVideo::solid_colors(16, 16, &[GREEN, RED], 30.0);
        let second = MemoryVideo::solid_colors(16, 16, &[RED], 30.0);

        let result = find_best_connection(&first, &second, 30, TargetSize::SmallestSource).unwrap();
        assert_eq!((result.frame_index_a, result.frame_index_b), (1, 0));
        assert_eq!(result.comparisons, 2);
        assert!(result.frame_index_a < first.frame_count());
        assert!(result.frame_index_b < second.frame_count());
    }

    #[test]
    fn test_empty_video_fails() {
        let empty = MemoryVideo::default();
        let video = MemoryVideo::solid_colors(8, 8, &[RED], 30.0);

        match find_best_connection(&empty, &video, 3, TargetSize::SmallestSource) {
            Err(BridgeError::Match(MatchError::EmptyVideo { input })) => assert_eq!(input, Input::First),
            other => panic!("unexpected result: {:?}", other.map(|r| r.score)),
        }
        match find_best_connection(&video, &empty, 3, TargetSize::SmallestSource) {
            Err(BridgeError::Match(MatchError::EmptyVideo { input })) => assert_eq!(input, Input::Second),
            other => panic!("unexpected result: {:?}", other.map(|r| r.score)),
        }
    }

    #[test]
    fn test_zero_area_frames_are_invalid() {
        let first = MemoryVideo::new(vec![Frame::new_filled(0, 0, RED)], 30.0);
        let second = MemoryVideo::solid_colors(8, 8, &[RED], 30.0);

        let result = find_best_connection(&first, &second, 2, TargetSize::SmallestSource);
        assert!(matches!(result, Err(BridgeError::Match(MatchError::InvalidFrame { .. }))));
    }

    #[test]
    fn test_different_resolutions_are_normalized() {
        let first = MemoryVideo::solid_colors(64, 48, &[GREEN, RED], 30.0);
        let second = MemoryVideo::solid_colors(32, 40, &[RED, BLUE], 30.0);

        let result = find_best_connection(&first, &second, 2, TargetSize::SmallestSource).unwrap();
        assert_eq!(result.normalized_size, (32, 40));
        assert_eq!((result.frame_index_a, result.frame_index_b), (1, 0));
        // Raw frames keep their source resolution
        assert_eq!(result.frame_a.dimensions(), (64, 48));
        assert_eq!(result.frame_b.dimensions(), (32, 40));
    }

    #[test]
    fn test_edge_exclusion_skips_outer_frames() {
        let first = MemoryVideo::solid_colors(16, 16, &[GREEN, BLUE, WHITE, RED], 30.0);
        let second = MemoryVideo::solid_colors(16, 16, &[RED, BLACK, WHITE, GREEN], 30.0);

        let result = FrameMatcher::new(2, TargetSize::SmallestSource)
            .with_edge_exclusion(true)
            .find_best_connection(&first, &second)
            .unwrap();
        // Candidates are first[1..3] and second[1..3]; white matches white
        assert_eq!((result.frame_index_a, result.frame_index_b), (2, 2));
    }

    #[test]
    fn test_frame_read_failure_propagates_index() {
        struct Broken;

        impl VideoSource for Broken {
            fn frame_count(&self) -> usize {
                10
            }
            fn fps(&self) -> f64 {
                30.0
            }
            fn dimensions(&self) -> (u32, u32) {
                (8, 8)
            }
            fn frame(&self, index: usize) -> Result<Frame> {
                if index == 8 {
                    Err(MatchError::FrameRead { index, reason: "corrupt packet".to_string() }.into())
                } else {
                    Ok(Frame::new_filled(8, 8, RED))
                }
            }
        }

        let second = MemoryVideo::solid_colors(8, 8, &[RED], 30.0);
        match find_best_connection(&Broken, &second, 3, TargetSize::SmallestSource) {
            Err(BridgeError::Match(MatchError::FrameRead { index, .. })) => assert_eq!(index, 8),
            other => panic!("unexpected result: {:?}", other.map(|r| r.score)),
        }
    }

    #[test]
    fn test_fixed_target_size() {
        let first = MemoryVideo::new(vec![gradient(120, 80, 0)], 30.0);
        let second = MemoryVideo::new(vec![gradient(60, 40, 0)], 30.0);

        let result = find_best_connection(&first, &second, 1, TargetSize::Fixed { width: 30, height: 20 }).unwrap();
        assert_eq!(result.normalized_size, (30, 20));
        assert!((-1.0..=1.0).contains(&result.score));
    }

    #[test]
    fn test_select_best_keeps_first_maximum() {
        assert_eq!(select_best(&[0.2, 0.9, 0.9, 0.1]), Some((1, 0.9)));
        assert_eq!(select_best(&[-0.5]), Some((0, -0.5)));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(MatchQuality::from_score(0.95), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_score(0.7), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(0.5), MatchQuality::Fair);
        assert_eq!(MatchQuality::from_score(0.4), MatchQuality::NeedsReview);
        assert_eq!(MatchQuality::NeedsReview.to_string(), "needs review");
    }
}
