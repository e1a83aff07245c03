//! Model spectrum synthesis from an emission-line catalog.
//!
//! Given a trial dispersion relation, every catalog line that lands on (or
//! within a few line widths of) the detector is rendered as a Gaussian whose
//! area equals the line intensity. The summed signal is log-compressed,
//! `s -> ln(1 + s)`, so that the faint lines still weigh in the
//! cross-correlation against a few very bright ones.

use std::f64::consts::PI;

use crate::error::{CalibrationError, Result};
use crate::linecatalog::LineCatalog;
use crate::polynomial::{sample_to_pixel, DispersionPolynomial};

/// Ratio between the Gaussian sigma of a rendered line and the slit width.
pub const SLIT_TO_SIGMA: f64 = 0.25;

/// Line profiles are truncated at this many sigmas.
pub const CUTOFF_SIGMAS: f64 = 6.0;

/// A synthesized model signal.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSignal {
    /// Log-compressed samples.
    pub samples: Vec<f64>,
    /// Number of catalog lines that contributed to at least one sample.
    pub lines_used: usize,
}

/// Renders catalog lines into 1-D model signals for trial dispersion relations.
#[derive(Debug, Clone)]
pub struct SignalSynthesizer<'a> {
    catalog: &'a LineCatalog,
    order: f64,
    sigma: f64,
    cutoff: isize,
    amplitude_norm: f64,
}

impl<'a> SignalSynthesizer<'a> {
    /// `catalog` must be sorted by wavelength.
    pub fn new(catalog: &'a LineCatalog, order: u32, slit_width_px: f64) -> Result<Self> {
        if !(slit_width_px > 0.0) || !slit_width_px.is_finite() {
            return Err(CalibrationError::invalid(format!(
                "slit width must be positive, got {slit_width_px}"
            )));
        }
        if order < 1 {
            return Err(CalibrationError::invalid(format!(
                "spectral order must be >= 1, got {order}"
            )));
        }
        let sigma = slit_width_px * SLIT_TO_SIGMA;
        Ok(Self {
            catalog,
            order: order as f64,
            sigma,
            cutoff: ((CUTOFF_SIGMAS * sigma).ceil() as isize).max(1),
            amplitude_norm: 1.0 / (sigma * (2.0 * PI).sqrt()),
        })
    }

    /// Gaussian sigma of a rendered line, in pixels.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Truncation radius of a rendered line, in samples.
    pub fn cutoff(&self) -> usize {
        self.cutoff as usize
    }

    /// Render the catalog through `poly` into `out`, overwriting it.
    ///
    /// Returns the number of lines that contributed. Zero means the buffer holds
    /// no usable signal.
    pub fn render_into(&self, poly: &DispersionPolynomial, out: &mut [f64]) -> usize {
        out.fill(0.0);
        let size = out.len() as isize;
        let lines = self.catalog.lines();
        let two_sigma_sq = 2.0 * self.sigma * self.sigma;

        let mut cursor = 0;
        let mut used = 0;
        for i in -self.cutoff..size + self.cutoff {
            let p = sample_to_pixel(i);
            let lo = poly.wavelength(p - 0.5);
            let hi = poly.wavelength(p + 0.5);
            if hi <= lo {
                continue;
            }
            while cursor < lines.len() && lines[cursor].wavelength * self.order < lo {
                cursor += 1;
            }
            while cursor < lines.len() && lines[cursor].wavelength * self.order < hi {
                let line = lines[cursor];
                cursor += 1;
                if line.intensity <= 0.0 {
                    continue;
                }
                let first = (i - self.cutoff).max(0);
                let last = (i + self.cutoff).min(size - 1);
                if first > last {
                    continue;
                }
                // Sub-sample position from linear interpolation inside the sample.
                let center = i as f64 - 0.5 + (line.wavelength * self.order - lo) / (hi - lo);
                let amplitude = line.intensity * self.amplitude_norm;
                for j in first..=last {
                    let d = j as f64 - center;
                    out[j as usize] += amplitude * (-d * d / two_sigma_sq).exp();
                }
                used += 1;
            }
            if cursor == lines.len() {
                break;
            }
        }

        for v in out.iter_mut() {
            if *v > 0.0 {
                *v = v.ln_1p();
            }
        }
        used
    }

    /// Render into a fresh buffer of `size` samples.
    pub fn render(&self, poly: &DispersionPolynomial, size: usize) -> Result<ModelSignal> {
        let mut samples = vec![0.0; size];
        let lines_used = self.render_into(poly, &mut samples);
        if lines_used == 0 {
            return Err(CalibrationError::NoSignal);
        }
        Ok(ModelSignal {
            samples,
            lines_used,
        })
    }
}

/// Synthesize a `size`-sample model signal of `catalog` seen through `poly`.
///
/// Fails with [`CalibrationError::InvalidParameter`] for a non-positive slit width
/// and with [`CalibrationError::NoSignal`] when no line lands on the detector.
pub fn build_signal(
    catalog: &LineCatalog,
    poly: &DispersionPolynomial,
    order: u32,
    slit_width_px: f64,
    size: usize,
) -> Result<ModelSignal> {
    SignalSynthesizer::new(catalog, order, slit_width_px)?.render(poly, size)
}
