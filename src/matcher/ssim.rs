//! Structural similarity (SSIM) between two equally sized luma images.
//!
//! Local statistics are taken over every `window x window` square that fits
//! inside the image (uniform weights, sample covariance), using the usual
//! stabilizers `C1 = (0.01 * 255)^2` and `C2 = (0.03 * 255)^2`. The score is
//! the mean of the local SSIM map, in `[-1, 1]`.
//!
//! Window sums come from integer summed-area tables, so they are exact and the
//! score depends only on pixel data. The cross term is accumulated per
//! comparison with a running column sum, which needs one row of scratch space
//! rather than a full-image buffer.

use image::GrayImage;

use crate::error::{MatchError, Result};

const DATA_RANGE: f64 = 255.0;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Default local window edge
pub const DEFAULT_WINDOW: usize = 7;

/// A luma image with its summed-area tables, reusable across many comparisons
///
/// Costs 17 bytes per pixel: the pixels plus two `u64` tables.
#[derive(Debug, Clone)]
pub struct SsimPlane {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl SsimPlane {
    pub fn new(image: &GrayImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width == 0 || height == 0 {
            return Err(MatchError::InvalidFrame {
                reason: format!("cannot score a {}x{} image", width, height),
            }.into());
        }

        let pixels = image.as_raw().clone();
        let sum = integral(&pixels, width, height, |p| p);
        let sum_sq = integral(&pixels, width, height, |p| p * p);

        Ok(Self { width, height, pixels, sum, sum_sq })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Approximate heap footprint in bytes
    pub fn heap_size(&self) -> usize {
        self.pixels.len() + (self.sum.len() + self.sum_sq.len()) * std::mem::size_of::<u64>()
    }

    fn pixel(&self, x: usize, y: usize) -> u64 {
        self.pixels[y * self.width + x] as u64
    }
}

/// SSIM comparator with a fixed local window size
#[derive(Debug, Clone, Copy)]
pub struct Ssim {
    window: usize,
}

impl Default for Ssim {
    fn default() -> Self {
        Self { window: DEFAULT_WINDOW }
    }
}

impl Ssim {
    /// `window` should be odd; even values are rounded down
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }

    /// Score two luma images
    pub fn score(&self, a: &GrayImage, b: &GrayImage) -> Result<f64> {
        self.compare(&SsimPlane::new(a)?, &SsimPlane::new(b)?)
    }

    /// Score two prepared planes. Symmetric in its arguments.
    pub fn compare(&self, a: &SsimPlane, b: &SsimPlane) -> Result<f64> {
        if a.dimensions() != b.dimensions() {
            return Err(MatchError::InvalidFrame {
                reason: format!(
                    "dimension mismatch: {}x{} vs {}x{}",
                    a.width, a.height, b.width, b.height
                ),
            }.into());
        }

        let (width, height) = a.dimensions();
        let window = self.effective_window(width, height);

        let np = (window * window) as f64;
        let cov_norm = if np > 1.0 { np / (np - 1.0) } else { 1.0 };
        let c1 = (K1 * DATA_RANGE).powi(2);
        let c2 = (K2 * DATA_RANGE).powi(2);

        // columns[x] = sum of a*b over rows y..y+window at column x
        let mut columns: Vec<u64> = (0..width)
            .map(|x| (0..window).map(|y| a.pixel(x, y) * b.pixel(x, y)).sum())
            .collect();

        let mut total = 0.0;
        let mut count = 0usize;

        for y in 0..=(height - window) {
            if y > 0 {
                for (x, column) in columns.iter_mut().enumerate() {
                    *column -= a.pixel(x, y - 1) * b.pixel(x, y - 1);
                    *column += a.pixel(x, y + window - 1) * b.pixel(x, y + window - 1);
                }
            }

            let mut run: u64 = columns[..window].iter().sum();
            for x in 0..=(width - window) {
                if x > 0 {
                    run = run - columns[x - 1] + columns[x + window - 1];
                }

                let ux = window_sum(&a.sum, width, x, y, window) as f64 / np;
                let uy = window_sum(&b.sum, width, x, y, window) as f64 / np;
                let uxx = window_sum(&a.sum_sq, width, x, y, window) as f64 / np;
                let uyy = window_sum(&b.sum_sq, width, x, y, window) as f64 / np;
                let uxy = run as f64 / np;

                let vx = cov_norm * (uxx - ux * ux);
                let vy = cov_norm * (uyy - uy * uy);
                let vxy = cov_norm * (uxy - ux * uy);

                let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
                let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);

                total += numerator / denominator;
                count += 1;
            }
        }

        Ok(total / count as f64)
    }

    /// Largest odd window not exceeding the configured one or the image
    fn effective_window(&self, width: usize, height: usize) -> usize {
        let window = self.window.min(width).min(height);
        if window % 2 == 0 {
            window - 1
        } else {
            window
        }
    }
}

/// SSIM of two luma images with the default window
pub fn score(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    Ssim::default().score(a, b)
}

/// Summed-area table with a zero first row and column, `(width + 1) * (height + 1)` entries
fn integral<F: Fn(u64) -> u64>(pixels: &[u8], width: usize, height: usize, f: F) -> Vec<u64> {
    let stride = width + 1;
    let mut table = vec![0u64; stride * (height + 1)];

    for y in 0..height {
        let mut row = 0u64;
        for x in 0..width {
            row += f(pixels[y * width + x] as u64);
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
        }
    }

    table
}

fn window_sum(table: &[u64], width: usize, x: usize, y: usize, window: usize) -> u64 {
    let stride = width + 1;
    let (x1, y1) = (x + window, y + window);
    table[y1 * stride + x1] + table[y * stride + x] - table[y * stride + x1] - table[y1 * stride + x]
}
