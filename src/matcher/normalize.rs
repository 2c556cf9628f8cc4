use image::imageops::FilterType;
use image::GrayImage;

use crate::config::TargetSize;
use crate::error::{MatchError, Result};
use crate::video::Frame;

/// Convert `frame` to luma and resize it to `target` (width, height)
///
/// Bilinear resampling keeps the output a pure function of the input pixels.
pub fn normalize(frame: &Frame, target: (u32, u32)) -> Result<GrayImage> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(MatchError::InvalidFrame {
            reason: format!("frame has zero area ({}x{})", width, height),
        }.into());
    }
    if target.0 == 0 || target.1 == 0 {
        return Err(MatchError::InvalidFrame {
            reason: format!("target size has zero area ({}x{})", target.0, target.1),
        }.into());
    }

    let luma = frame.to_luma();
    if luma.dimensions() == target {
        return Ok(luma);
    }

    Ok(image::imageops::resize(&luma, target.0, target.1, FilterType::Triangle))
}

/// The size both windows are normalized to
pub fn resolve_target(target: TargetSize, first: (u32, u32), second: (u32, u32)) -> Result<(u32, u32)> {
    let size = match target {
        TargetSize::SmallestSource => (first.0.min(second.0), first.1.min(second.1)),
        TargetSize::Fixed { width, height } => (width, height),
    };

    if size.0 == 0 || size.1 == 0 {
        return Err(MatchError::InvalidFrame {
            reason: format!(
                "no common comparable size for {}x{} and {}x{}",
                first.0, first.1, second.0, second.1
            ),
        }.into());
    }

    Ok(size)
}

/// Scale `size` down, keeping its aspect ratio, so neither edge exceeds `max_dimension`
pub fn cap_dimensions(size: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let longest = size.0.max(size.1);
    if max_dimension == 0 || longest <= max_dimension {
        return size;
    }

    let scale = |edge: u32| {
        let scaled = (edge as u64 * max_dimension as u64 + longest as u64 / 2) / longest as u64;
        (scaled as u32).max(1)
    };
    (scale(size.0), scale(size.1))
}
