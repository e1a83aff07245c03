//! 2-D spectral frames and the 1-D signal pre-processing that feeds the
//! dispersion search.
//!
//! The frame is stored row-major with the spectral (dispersion) axis along
//! `x` and the slit along `y`.

use crate::error::{CalibrationError, Result};

/// A 2-D long-slit spectral frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralImage {
    width: usize,
    height: usize,
    pixels: Vec<f64>,
}

impl SpectralImage {
    /// Wrap row-major pixel data. `pixels.len()` must equal `width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<f64>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(CalibrationError::LengthMismatch {
                expected: width * height,
                found: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; width * height],
        }
    }

    /// Build a frame by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.pixels[self.index(x, y)])
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut f64> {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            Some(&mut self.pixels[idx])
        } else {
            None
        }
    }

    /// Pixels of row `y`, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&[f64]> {
        (y < self.height).then(|| {
            let start = self.index(0, y);
            &self.pixels[start..start + self.width]
        })
    }

    /// Set every negative pixel to zero.
    pub fn threshold_negative(&mut self) {
        clamp_negative(&mut self.pixels);
    }

    /// Median of each column over rows `[discard_lo, height - discard_hi)`.
    ///
    /// Fails with [`CalibrationError::InvalidParameter`] when the discarded rows
    /// leave nothing to collapse.
    pub fn collapse_median(&self, discard_lo: usize, discard_hi: usize) -> Result<Vec<f64>> {
        if discard_lo + discard_hi >= self.height {
            return Err(CalibrationError::invalid(format!(
                "discarding {discard_lo} + {discard_hi} rows leaves none of {}",
                self.height
            )));
        }
        let rows = discard_lo..self.height - discard_hi;
        let mut column = Vec::with_capacity(rows.len());
        Ok((0..self.width)
            .map(|x| {
                column.clear();
                column.extend(rows.clone().map(|y| self.pixels[self.index(x, y)]));
                median(&mut column)
            })
            .collect())
    }
}

/// Median of `values`, reordering them. The mean of the two central values for
/// an even count, 0 for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    if n % 2 == 0 {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    } else {
        values[n / 2]
    }
}

/// Running median with an odd `width`, window truncated at the signal edges.
pub fn running_median(signal: &[f64], width: usize) -> Vec<f64> {
    let half = width / 2;
    let mut window = Vec::with_capacity(2 * half + 1);
    (0..signal.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(signal.len());
            window.clear();
            window.extend_from_slice(&signal[lo..hi]);
            median(&mut window)
        })
        .collect()
}

/// Window width used for thermal-background removal: `8 * slit`, odd, at least 3.
pub fn thermal_window(slit_width_px: f64) -> usize {
    let w = ((8.0 * slit_width_px).round() as usize).max(3);
    w | 1
}

/// Subtract a running-median low-pass component from `signal`.
pub fn subtract_thermal(signal: &mut [f64], width: usize) {
    let background = running_median(signal, width);
    for (s, b) in signal.iter_mut().zip(&background) {
        *s -= b;
    }
}

pub fn clamp_negative(signal: &mut [f64]) {
    for v in signal.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Zero the first `left` and the last `right` samples.
pub fn zero_discard_zones(signal: &mut [f64], left: usize, right: usize) {
    let n = signal.len();
    signal[..left.min(n)].fill(0.0);
    signal[n.saturating_sub(right)..].fill(0.0);
}

/// `s -> ln(1 + s)` for positive samples.
pub fn log_compress(signal: &mut [f64]) {
    for v in signal.iter_mut() {
        if *v > 0.0 {
            *v = v.ln_1p();
        }
    }
}
