//! Cubic dispersion relation mapping detector pixel to wavelength.
//!
//! `wavelength(p) = c0 + c1·p + c2·p² + c3·p³`, evaluated with Horner's scheme.
//!
//! Pixel coordinates are 1-based: sample `i` of a signal covers the pixel
//! interval `[i + 0.5, i + 1.5]` and its centre is pixel `i + 1`. The domain of
//! an `npix`-sample signal is therefore `[0.5, npix + 0.5]`.

use std::fmt;
use std::ops::Sub;

use nalgebra::Vector4;

/// Pixel coordinate of the centre of sample `i`.
#[inline]
pub fn sample_to_pixel(i: isize) -> f64 {
    i as f64 + 1.0
}

/// Sample index whose centre is closest to pixel `p`.
#[inline]
pub fn pixel_to_sample(p: f64) -> isize {
    (p - 1.0).round() as isize
}

/// Central pixel of an `npix`-sample detector, `0.5 * (1 + npix)`.
#[inline]
pub fn central_pixel(npix: usize) -> f64 {
    0.5 * (1.0 + npix as f64)
}

/// Wavelength (Angstrom) as a cubic polynomial of pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionPolynomial {
    coeffs: Vector4<f64>,
}

impl DispersionPolynomial {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self {
            coeffs: Vector4::new(c0, c1, c2, c3),
        }
    }

    pub fn from_coeffs(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Coefficients `[c0, c1, c2, c3]`.
    pub fn coeffs(&self) -> [f64; 4] {
        [self.coeffs[0], self.coeffs[1], self.coeffs[2], self.coeffs[3]]
    }

    /// Coefficient of `p^k`, `k` in `0..4`.
    pub fn coeff(&self, k: usize) -> f64 {
        self.coeffs[k]
    }

    /// Highest power with a non-zero coefficient.
    pub fn degree(&self) -> usize {
        (1..4).rev().find(|&k| self.coeffs[k] != 0.0).unwrap_or(0)
    }

    /// Wavelength at pixel `p`.
    #[inline]
    pub fn wavelength(&self, p: f64) -> f64 {
        let c = &self.coeffs;
        ((c[3] * p + c[2]) * p + c[1]) * p + c[0]
    }

    /// Local dispersion `dλ/dp` at pixel `p` (Angstrom per pixel).
    #[inline]
    pub fn dispersion(&self, p: f64) -> f64 {
        let c = &self.coeffs;
        (3.0 * c[3] * p + 2.0 * c[2]) * p + c[1]
    }

    /// `true` when the relation is strictly increasing over `[0.5, npix + 0.5]`.
    ///
    /// The derivative is a quadratic, so its minimum over the domain is at one
    /// of the two ends or at its vertex.
    pub fn is_monotonic(&self, npix: usize) -> bool {
        let lo = 0.5;
        let hi = npix as f64 + 0.5;
        if self.dispersion(lo) <= 0.0 || self.dispersion(hi) <= 0.0 {
            return false;
        }
        let c3 = self.coeffs[3];
        if c3 != 0.0 {
            let vertex = -self.coeffs[2] / (3.0 * c3);
            if vertex > lo && vertex < hi && self.dispersion(vertex) <= 0.0 {
                return false;
            }
        }
        true
    }

    /// Pixel at which the relation reaches `wavelength`, by bisection on the
    /// domain `[0.5, npix + 0.5]`.
    ///
    /// Assumes the relation is increasing; returns `None` outside the domain.
    pub fn pixel_at(&self, wavelength: f64, npix: usize) -> Option<f64> {
        let mut lo = 0.5;
        let mut hi = npix as f64 + 0.5;
        if wavelength < self.wavelength(lo) || wavelength > self.wavelength(hi) {
            return None;
        }
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            if self.wavelength(mid) < wavelength {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-9 {
                break;
            }
        }
        Some(0.5 * (lo + hi))
    }

    /// Scale coefficients 1..3 of `self` and re-derive `c0` so that the
    /// wavelength at pixel `center` is unchanged.
    pub fn rescaled_about(&self, scales: [f64; 3], center: f64) -> Self {
        let powers = Vector4::new(1.0, center, center * center, center * center * center);
        let mut coeffs = self
            .coeffs
            .component_mul(&Vector4::new(0.0, scales[0], scales[1], scales[2]));
        coeffs[0] = self.coeffs.dot(&powers) - coeffs.dot(&powers);
        Self { coeffs }
    }

    /// Add a constant wavelength offset (Angstrom).
    pub fn translated(&self, delta_wavelength: f64) -> Self {
        let mut coeffs = self.coeffs;
        coeffs[0] += delta_wavelength;
        Self { coeffs }
    }

    /// Move every feature `delta_px` pixels to the right, linearised at pixel
    /// `center`: only `c0` changes.
    pub fn shifted_pixels(&self, delta_px: f64, center: f64) -> Self {
        self.translated(-delta_px * self.dispersion(center))
    }

    /// Largest wavelength difference between `self` and `other` over pixels
    /// `1..=npix`, in units of the local dispersion of `self`.
    ///
    /// The dispersion is floored at `min_dispersion` so a vanishing local scale
    /// cannot blow the ratio up.
    pub fn max_pixel_drift(&self, other: &Self, npix: usize, min_dispersion: f64) -> f64 {
        let delta = *self - *other;
        (1..=npix)
            .map(|i| {
                let p = i as f64;
                let scale = self.dispersion(p).abs().max(min_dispersion);
                delta.wavelength(p).abs() / scale
            })
            .fold(0.0, f64::max)
    }
}

impl Sub for DispersionPolynomial {
    type Output = DispersionPolynomial;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            coeffs: self.coeffs - rhs.coeffs,
        }
    }
}

impl From<[f64; 4]> for DispersionPolynomial {
    fn from(c: [f64; 4]) -> Self {
        Self::from_coeffs(c)
    }
}

impl fmt::Display for DispersionPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.coeffs;
        write!(
            f,
            "{:.4} + {:.6e}*p + {:.6e}*p^2 + {:.6e}*p^3",
            c[0], c[1], c[2], c[3]
        )
    }
}
