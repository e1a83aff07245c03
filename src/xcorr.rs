//! Normalised cross-correlation of two equal-length 1-D signals.
//!
//! Both signals are centred on their global mean and scaled by their global
//! variance. For each integer delay the products are summed over the overlap
//! region and divided by the full length, which is the zero-padded estimator:
//! identical signals score exactly 1 at delay 0 and no score leaves `[-1, 1]`.
//!
//! Sign convention: a positive delay `d` means the features of `b` sit `d`
//! samples to the right of those of `a`, i.e. `b[i] ≈ a[i - d]`.

use crate::error::{CalibrationError, Result};

/// Variance below which a signal is treated as constant.
pub const MIN_VARIANCE: f64 = 1e-20;

/// Best score found over the delay window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// Normalised correlation in `[-1, 1]`.
    pub score: f64,
    /// Delay (in samples) at which `score` was reached.
    pub delay: isize,
}

impl Correlation {
    /// Result for a degenerate (constant) input.
    pub const NONE: Correlation = Correlation {
        score: 0.0,
        delay: 0,
    };
}

fn mean_variance(x: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var)
}

/// Cross-correlate `a` against `b` for every delay in `[-max_delay, max_delay]`.
///
/// Returns the highest score and its delay. On ties the most negative delay
/// wins. A constant input yields [`Correlation::NONE`]. `max_delay` is clamped
/// to `len - 1`.
pub fn cross_correlate(a: &[f64], b: &[f64], max_delay: usize) -> Result<Correlation> {
    if a.len() != b.len() {
        return Err(CalibrationError::LengthMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    let n = a.len();
    if n == 0 {
        return Ok(Correlation::NONE);
    }
    let (ma, va) = mean_variance(a);
    let (mb, vb) = mean_variance(b);
    if va <= MIN_VARIANCE || vb <= MIN_VARIANCE {
        return Ok(Correlation::NONE);
    }
    let norm = (va * vb).sqrt();

    let max_delay = max_delay.min(n - 1) as isize;
    let mut best = Correlation {
        score: f64::NEG_INFINITY,
        delay: 0,
    };
    for d in -max_delay..=max_delay {
        // Overlap: i in [start, end) of `a`, i + d in `b`.
        let (start, end) = if d >= 0 {
            (0, n - d as usize)
        } else {
            (d.unsigned_abs(), n)
        };
        let b_start = (start as isize + d) as usize;
        let sum: f64 = a[start..end]
            .iter()
            .zip(&b[b_start..])
            .map(|(x, y)| (x - ma) * (y - mb))
            .sum();
        let score = sum / (n as f64 * norm);
        if score > best.score {
            best = Correlation { score, delay: d };
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A few Gaussian bumps on a zero background, clear of both edges.
    fn bumps(n: usize) -> Vec<f64> {
        let centers = [40.0, 57.5, 90.0, 131.0, 160.0];
        let heights = [1.0, 0.4, 2.0, 0.7, 1.3];
        (0..n)
            .map(|i| {
                centers
                    .iter()
                    .zip(&heights)
                    .map(|(c, h)| {
                        let d = i as f64 - c;
                        h * (-d * d / 4.0).exp()
                    })
                    .sum()
            })
            .collect()
    }

    fn shift(s: &[f64], k: isize) -> Vec<f64> {
        (0..s.len() as isize)
            .map(|i| {
                let j = i - k;
                if j >= 0 && (j as usize) < s.len() {
                    s[j as usize]
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn test_self_correlation_is_one_at_zero_delay() {
        let s = bumps(200);
        for max_delay in [0, 3, 50, 500] {
            let c = cross_correlate(&s, &s, max_delay).unwrap();
            assert_eq!(c.delay, 0);
            assert!((c.score - 1.0).abs() < 1e-12, "score {}", c.score);
        }
    }

    #[test]
    fn test_shifted_copy_reports_delay() {
        let s = bumps(200);
        for k in [-7, -1, 1, 4, 12] {
            let shifted = shift(&s, k);
            let c = cross_correlate(&s, &shifted, 20).unwrap();
            assert_eq!(c.delay, k, "k = {k}");
            assert!((c.score - 1.0).abs() < 0.05, "k = {k}, score {}", c.score);
        }
    }

    #[test]
    fn test_delay_outside_window_is_not_found() {
        let s = bumps(200);
        let shifted = shift(&s, 10);
        let c = cross_correlate(&s, &shifted, 3).unwrap();
        assert!(c.delay.abs() <= 3);
        assert!(c.score < 0.9);
    }

    #[test]
    fn test_constant_signal_scores_zero() {
        let s = bumps(64);
        let flat = vec![2.5; 64];
        assert_eq!(cross_correlate(&s, &flat, 5).unwrap(), Correlation::NONE);
        assert_eq!(cross_correlate(&flat, &s, 5).unwrap(), Correlation::NONE);
        assert_eq!(cross_correlate(&[], &[], 5).unwrap(), Correlation::NONE);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        match cross_correlate(&[1.0, 2.0, 3.0], &[1.0, 2.0], 1) {
            Err(CalibrationError::LengthMismatch { expected, found }) => {
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("expected length mismatch, got {other:?}"),
        }
    }
}
