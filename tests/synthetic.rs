//! Shared synthetic-spectrum helpers for the integration tests.
//!
//! Observed signals are rendered from a known dispersion relation with the
//! crate's own synthesizer, so a perfect calibration reproduces them exactly.

#![allow(dead_code)]

use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use wavecal::{build_signal, DispersionPolynomial, EmissionLine, LineCatalog, LineSource};

pub const NPIX: usize = 600;
pub const SLIT: f64 = 2.0;

/// Irregularly spaced H-band lines, 28-110 Angstrom apart.
pub const LINES: &[(f64, f64)] = &[
    (14524.55, 12.0),
    (14584.93, 5.0),
    (14618.87, 120.0),
    (14654.59, 200.0),
    (14687.34, 120.0),
    (14732.95, 8.0),
    (14796.51, 8.0),
    (14844.24, 120.0),
    (14907.05, 200.0),
    (14945.21, 20.0),
    (15024.92, 200.0),
    (15130.63, 200.0),
    (15206.64, 5.0),
    (15314.70, 5.0),
    (15388.34, 12.0),
    (15440.09, 12.0),
    (15512.43, 200.0),
    (15565.72, 12.0),
    (15602.17, 200.0),
    (15682.56, 45.0),
    (15718.55, 8.0),
    (15792.83, 200.0),
    (15837.72, 120.0),
    (15900.78, 45.0),
    (15966.96, 90.0),
    (16024.61, 20.0),
    (16117.75, 20.0),
    (16152.46, 30.0),
    (16223.53, 45.0),
    (16311.34, 30.0),
    (16389.28, 8.0),
    (16426.96, 60.0),
    (16468.49, 45.0),
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

pub fn catalog_from(lines: &[(f64, f64)]) -> LineCatalog {
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

pub fn lamp_catalog() -> LineCatalog {
    catalog_from(LINES)
}

/// Write `lines` as a two-column catalog file.
pub fn catalog_file(lines: &[(f64, f64)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# wavelength  intensity").unwrap();
    for (w, i) in lines {
        writeln!(file, "{w:.3}  {i:.1}").unwrap();
    }
    file
}

/// Dispersion relation the synthetic detector actually has.
pub fn true_polynomial() -> DispersionPolynomial {
    DispersionPolynomial::new(14500.0, 3.2, 1.5e-4, -4e-8)
}

/// Physical-model guess: a few percent off in every term and ~8 pixels off at
/// the detector centre.
pub fn perturbed_guess() -> DispersionPolynomial {
    let c = true_polynomial().coeffs();
    DispersionPolynomial::new(c[0] + 12.0, c[1] * 1.015, c[2] * 0.95, c[3] * 1.10)
}

/// Log-compressed observed signal, as the search engine sees it.
pub fn observed_signal(catalog: &LineCatalog, poly: &DispersionPolynomial, npix: usize) -> Vec<f64> {
    build_signal(catalog, poly, 1, SLIT, npix).unwrap().samples
}

/// Linear raw line: the synthetic spectrum undone from its log compression,
/// on top of `continuum(pixel_index)` with Gaussian read noise.
pub fn raw_line(
    catalog: &LineCatalog,
    poly: &DispersionPolynomial,
    npix: usize,
    continuum: impl Fn(usize) -> f64,
    noise_sigma: f64,
    seed: u64,
) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_sigma).unwrap();
    observed_signal(catalog, poly, npix)
        .iter()
        .enumerate()
        .map(|(i, s)| s.exp_m1() + continuum(i) + noise.sample(&mut rng))
        .collect()
}

/// Largest distance between two relations over `pixels`, in pixels of `reference`.
pub fn max_pixel_error(
    reference: &DispersionPolynomial,
    other: &DispersionPolynomial,
    pixels: std::ops::RangeInclusive<usize>,
) -> f64 {
    pixels
        .map(|p| {
            let p = p as f64;
            (reference.wavelength(p) - other.wavelength(p)).abs() / reference.dispersion(p)
        })
        .fold(0.0, f64::max)
}
