//! Line-by-line validation of a dispersion relation.
//!
//! Every catalog line expected in the non-discarded range is predicted on the
//! detector, located as the local maximum of its window and centroided. The
//! offsets between measured and predicted positions give the residual figures
//! reported with a calibration.

use tracing::{debug, trace};

use crate::error::{CalibrationError, Result};
use crate::linecatalog::LineCatalog;
use crate::polynomial::DispersionPolynomial;

/// Maximum number of times a contaminated window is re-split.
pub const MAX_SPLIT_DEPTH: usize = 8;
/// Smallest window, in samples, in which a line is searched for.
pub const MIN_WINDOW: usize = 3;
/// Pixels per line, on top of the slit width, below which a spectrum counts as
/// crowded.
pub const CROWDING_PAD_PX: f64 = 11.0;
/// In crowded spectra, lines fainter than this fraction of the brightest line
/// in range are skipped.
pub const FAINT_LINE_FRACTION: f64 = 0.01;
/// A centroid window keeps growing while the next sample is at most this
/// factor above the current one.
pub const CENTROID_RISE_TOLERANCE: f64 = 1.25;

/// A catalog line located in the signal. Pixel coordinates are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMatch {
    /// Catalog wavelength times the spectral order, in Angstrom.
    pub wavelength: f64,
    pub predicted_pixel: f64,
    pub measured_pixel: f64,
}

impl LineMatch {
    /// Signed offset `measured - predicted`, in pixels.
    pub fn offset(&self) -> f64 {
        self.measured_pixel - self.predicted_pixel
    }
}

/// Residual statistics of a dispersion relation.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatchStats {
    /// Mean absolute offset, in pixels.
    pub mean_residual: f64,
    /// Sample (n - 1) standard deviation of the signed offsets; 0 below 2 lines.
    pub rms_residual: f64,
    /// Positive-intensity catalog lines in the non-discarded range.
    pub catalog_lines: usize,
    /// Lines successfully located.
    pub detected_lines: usize,
    pub matches: Vec<LineMatch>,
}

/// A line selected for location.
#[derive(Debug, Clone, Copy)]
struct Target {
    wavelength: f64,
    intensity: f64,
    /// Predicted position as a fractional sample index.
    sample: f64,
}

/// Locates catalog lines in a pre-processed signal.
#[derive(Debug, Clone)]
pub struct SolutionRefiner<'a> {
    signal: &'a [f64],
    catalog: &'a LineCatalog,
    order: u32,
    slit_width_px: f64,
    discard_left: usize,
    discard_right: usize,
}

impl<'a> SolutionRefiner<'a> {
    pub fn new(
        signal: &'a [f64],
        catalog: &'a LineCatalog,
        order: u32,
        slit_width_px: f64,
        discard_left: usize,
        discard_right: usize,
    ) -> Result<Self> {
        if order < 1 {
            return Err(CalibrationError::invalid(format!(
                "spectral order must be >= 1, got {order}"
            )));
        }
        if !(slit_width_px > 0.0) || !slit_width_px.is_finite() {
            return Err(CalibrationError::invalid(format!(
                "slit width must be positive, got {slit_width_px}"
            )));
        }
        if discard_left + discard_right >= signal.len() {
            return Err(CalibrationError::invalid(format!(
                "discard zones {discard_left} + {discard_right} cover the whole {}-pixel signal",
                signal.len()
            )));
        }
        Ok(Self {
            signal,
            catalog,
            order,
            slit_width_px,
            discard_left,
            discard_right,
        })
    }

    /// Locate every usable catalog line predicted by `poly` and summarise the
    /// offsets.
    pub fn refine(&self, poly: &DispersionPolynomial) -> Result<LineMatchStats> {
        let npix = self.signal.len();
        let wave_min = poly.wavelength(self.discard_left as f64);
        let wave_max = poly.wavelength((npix - self.discard_right) as f64);
        let in_range = self.catalog.lines_in_range(wave_min, wave_max, self.order);
        let catalog_lines = in_range.iter().filter(|l| l.intensity > 0.0).count();
        if catalog_lines == 0 {
            return Err(CalibrationError::NoLinesInRange { wave_min, wave_max });
        }

        let targets = self.select_targets(poly, wave_min, wave_max, catalog_lines);
        let first = self.discard_left;
        let last = npix - self.discard_right - 1;

        let mut matches = Vec::with_capacity(targets.len());
        for (k, target) in targets.iter().enumerate() {
            let lo = match k {
                0 => first,
                _ => (0.5 * (targets[k - 1].sample + target.sample)).ceil() as usize,
            };
            let hi = match targets.get(k + 1) {
                Some(next) => (0.5 * (target.sample + next.sample)).floor() as usize,
                None => last,
            };
            let (lo, hi) = (lo.max(first), hi.min(last));

            let Some(peak) = self.locate(lo, hi, target.sample, 0) else {
                trace!("Line {:.3}: not found near pixel {:.2}", target.wavelength, target.sample + 1.0);
                continue;
            };
            let Some(centroid) = self.centroid(lo, hi, peak) else {
                continue;
            };
            matches.push(LineMatch {
                wavelength: target.wavelength,
                predicted_pixel: target.sample + 1.0,
                measured_pixel: centroid + 1.0,
            });
        }

        let (mean_residual, rms_residual) = residual_stats(&matches);
        debug!(
            "Refined {} of {} catalog lines ({} selected): mean {:.3} px, rms {:.3} px",
            matches.len(),
            catalog_lines,
            targets.len(),
            mean_residual,
            rms_residual
        );
        Ok(LineMatchStats {
            mean_residual,
            rms_residual,
            catalog_lines,
            detected_lines: matches.len(),
            matches,
        })
    }

    /// Lines to locate: positive intensity, above the faint-line threshold in
    /// crowded spectra, predicted inside the non-discarded samples, and at
    /// least half a resolution element from their kept neighbour.
    fn select_targets(
        &self,
        poly: &DispersionPolynomial,
        wave_min: f64,
        wave_max: f64,
        catalog_lines: usize,
    ) -> Vec<Target> {
        let npix = self.signal.len();
        let order = self.order as f64;
        let crowded = catalog_lines as f64 * (CROWDING_PAD_PX + self.slit_width_px) > npix as f64;
        let threshold = if crowded {
            FAINT_LINE_FRACTION
                * self
                    .catalog
                    .max_intensity_in_range(wave_min, wave_max, self.order)
                    .unwrap_or(0.0)
        } else {
            0.0
        };
        let first = self.discard_left as f64;
        let last = (npix - self.discard_right - 1) as f64;

        let mut targets: Vec<Target> = Vec::new();
        for line in self.catalog.lines_in_range(wave_min, wave_max, self.order) {
            if line.intensity <= 0.0 || line.intensity < threshold {
                continue;
            }
            let wavelength = line.wavelength * order;
            let Some(pixel) = poly.pixel_at(wavelength, npix) else {
                continue;
            };
            let sample = pixel - 1.0;
            if sample < first || sample > last {
                continue;
            }
            let target = Target {
                wavelength,
                intensity: line.intensity,
                sample,
            };
            if let Some(prev) = targets.last_mut() {
                let resolution = 0.5 * self.slit_width_px * poly.dispersion(pixel);
                if wavelength - prev.wavelength < resolution {
                    if target.intensity > prev.intensity {
                        *prev = target;
                    }
                    continue;
                }
            }
            targets.push(target);
        }
        targets
    }

    /// Sample index of the line expected at `predicted` within `[lo, hi]`.
    ///
    /// When the window maximum is more than a slit width from the prediction,
    /// the window is split halfway between the two and the half holding the
    /// prediction is searched again. Each split strictly shrinks the window;
    /// depth and minimum width bound the recursion.
    fn locate(&self, lo: usize, hi: usize, predicted: f64, depth: usize) -> Option<usize> {
        if hi < lo || hi - lo + 1 < MIN_WINDOW {
            return None;
        }
        let window = &self.signal[lo..=hi];
        let (offset, &peak_value) = window
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f64)>, (i, v)| match best {
                Some((_, b)) if *v <= *b => best,
                _ => Some((i, v)),
            })?;
        let floor = window.iter().copied().fold(f64::INFINITY, f64::min);
        if peak_value <= floor {
            return None;
        }
        let peak = lo + offset;
        if (peak as f64 - predicted).abs() <= self.slit_width_px {
            return Some(peak);
        }
        if depth >= MAX_SPLIT_DEPTH {
            return None;
        }
        let split = 0.5 * (peak as f64 + predicted);
        let (new_lo, new_hi) = if predicted < peak as f64 {
            (lo, (split.floor() as usize).min(peak - 1))
        } else {
            ((split.ceil() as usize).max(peak + 1), hi)
        };
        if new_hi < new_lo || new_hi - new_lo >= hi - lo {
            return None;
        }
        trace!(
            "Window [{}, {}] peaks at {}, {:.2} from prediction: re-splitting to [{}, {}]",
            lo,
            hi,
            peak,
            (peak as f64 - predicted).abs(),
            new_lo,
            new_hi
        );
        self.locate(new_lo, new_hi, predicted, depth + 1)
    }

    /// Background-subtracted, intensity-weighted centroid around `peak`, as a
    /// fractional sample index.
    fn centroid(&self, lo: usize, hi: usize, peak: usize) -> Option<f64> {
        let s = self.signal;
        let reach = (self.slit_width_px.round() as usize).max(1);
        let background = s[lo..=hi].iter().copied().fold(f64::INFINITY, f64::min);

        let mut left = peak;
        while left > lo && peak - left < reach && s[left - 1] <= CENTROID_RISE_TOLERANCE * s[left] {
            left -= 1;
        }
        let mut right = peak;
        while right < hi && right - peak < reach && s[right + 1] <= CENTROID_RISE_TOLERANCE * s[right]
        {
            right += 1;
        }

        let (sum_w, sum_wx) = (left..=right).fold((0.0, 0.0), |(sw, swx), i| {
            let w = s[i] - background;
            (sw + w, swx + w * i as f64)
        });
        (sum_w > 0.0).then(|| sum_wx / sum_w)
    }
}

/// Mean absolute offset and sample standard deviation of the signed offsets.
fn residual_stats(matches: &[LineMatch]) -> (f64, f64) {
    let n = matches.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let nf = n as f64;
    let mean_abs = matches.iter().map(|m| m.offset().abs()).sum::<f64>() / nf;
    if n < 2 {
        return (mean_abs, 0.0);
    }
    let mean = matches.iter().map(|m| m.offset()).sum::<f64>() / nf;
    let var = matches
        .iter()
        .map(|m| (m.offset() - mean).powi(2))
        .sum::<f64>()
        / (nf - 1.0);
    (mean_abs, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linecatalog::{EmissionLine, LineSource};
    use crate::synth::build_signal;

    fn catalog(lines: &[(f64, f64)]) -> LineCatalog {
        LineCatalog::from_lines(
            lines
                .iter()
                .map(|&(wavelength, intensity)| EmissionLine {
                    wavelength,
                    intensity,
                    source: LineSource::External,
                })
                .collect(),
        )
    }

    /// Lines every 25 pixels under `W = 12000 + 4 p`.
    fn comb() -> LineCatalog {
        catalog(&[
            (12100.0, 10.0),
            (12200.0, 20.0),
            (12300.0, 15.0),
            (12400.0, 30.0),
            (12500.0, 12.0),
            (12600.0, 18.0),
            (12700.0, 25.0),
        ])
    }

    fn truth() -> DispersionPolynomial {
        DispersionPolynomial::new(12000.0, 4.0, 0.0, 0.0)
    }

    #[test]
    fn test_true_relation_has_small_residuals() {
        let cat = comb();
        let signal = build_signal(&cat, &truth(), 1, 2.0, 200).unwrap().samples;
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        let stats = refiner.refine(&truth()).unwrap();
        assert_eq!(stats.catalog_lines, 7);
        assert_eq!(stats.detected_lines, 7);
        assert!(stats.mean_residual < 0.05, "mean {}", stats.mean_residual);
        assert!(stats.rms_residual < 0.05, "rms {}", stats.rms_residual);
        for m in &stats.matches {
            assert!((m.predicted_pixel - (m.wavelength - 12000.0) / 4.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_constant_shift_shows_in_mean_not_rms() {
        let cat = comb();
        let signal = build_signal(&cat, &truth(), 1, 2.0, 200).unwrap().samples;
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        // Predictions 0.75 px to the right of the true positions.
        let shifted = truth().shifted_pixels(0.75, 100.5);
        let stats = refiner.refine(&shifted).unwrap();
        assert_eq!(stats.detected_lines, 7);
        assert!((stats.mean_residual - 0.75).abs() < 0.05, "mean {}", stats.mean_residual);
        assert!(stats.rms_residual < 0.05);
    }

    #[test]
    fn test_bright_contaminant_is_split_away() {
        let cat = comb();
        let mut signal = build_signal(&cat, &truth(), 1, 2.0, 200).unwrap().samples;
        // Unidentified feature 8 samples right of the 12400 line (sample 99).
        signal[107] = 20.0;
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        let stats = refiner.refine(&truth()).unwrap();
        let m = stats
            .matches
            .iter()
            .find(|m| m.wavelength == 12400.0)
            .unwrap();
        assert!(m.offset().abs() < 0.1, "offset {}", m.offset());
    }

    #[test]
    fn test_close_lines_are_merged_keeping_brighter() {
        let cat = catalog(&[(12400.0, 10.0), (12400.3, 20.0), (12600.0, 5.0)]);
        let signal = build_signal(&cat, &truth(), 1, 2.0, 200).unwrap().samples;
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        let stats = refiner.refine(&truth()).unwrap();
        assert_eq!(stats.catalog_lines, 3);
        assert_eq!(stats.detected_lines, 2);
        assert_eq!(stats.matches[0].wavelength, 12400.3);
    }

    #[test]
    fn test_crowded_spectrum_skips_faint_lines() {
        // 20 lines over 200 pixels: 20 * (11 + 2) > 200.
        let mut lines: Vec<(f64, f64)> = (0..20)
            .map(|k| (12040.0 + 36.0 * k as f64, 100.0))
            .collect();
        lines[10].1 = 0.5;
        let cat = catalog(&lines);
        let signal = build_signal(&cat, &truth(), 1, 2.0, 200).unwrap().samples;
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        let stats = refiner.refine(&truth()).unwrap();
        assert_eq!(stats.catalog_lines, 20);
        assert!(stats.matches.iter().all(|m| m.wavelength != lines[10].0));
        assert_eq!(stats.detected_lines, 19);
    }

    #[test]
    fn test_no_catalog_lines_in_range() {
        let cat = catalog(&[(20000.0, 10.0)]);
        let signal = vec![0.0; 200];
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        assert!(matches!(
            refiner.refine(&truth()),
            Err(CalibrationError::NoLinesInRange { .. })
        ));
    }

    #[test]
    fn test_flat_signal_detects_nothing() {
        let cat = comb();
        let signal = vec![0.0; 200];
        let refiner = SolutionRefiner::new(&signal, &cat, 1, 2.0, 5, 5).unwrap();
        let stats = refiner.refine(&truth()).unwrap();
        assert_eq!(stats.detected_lines, 0);
        assert_eq!((stats.mean_residual, stats.rms_residual), (0.0, 0.0));
    }

    #[test]
    fn test_residual_stats() {
        let m = |offset: f64| LineMatch {
            wavelength: 0.0,
            predicted_pixel: 10.0,
            measured_pixel: 10.0 + offset,
        };
        let (mean, rms) = residual_stats(&[m(0.3)]);
        assert!((mean - 0.3).abs() < 1e-12);
        assert_eq!(rms, 0.0);
        let (mean, rms) = residual_stats(&[m(0.5), m(-0.5)]);
        assert!((mean - 0.5).abs() < 1e-12);
        assert!((rms - 0.5f64.sqrt()).abs() < 1e-12);
    }
}
