//! Xenon arc-lamp lines, 0.8 - 4.0 micron.
//!
//! Air wavelengths in Angstrom with relative intensities.

/// `(wavelength, intensity)` pairs, ascending in wavelength.
pub(crate) const LINES: &[(f64, f64)] = &[
    (8061.340, 30.0),
    (8206.340, 700.0),
    (8231.634, 10000.0),
    (8266.520, 500.0),
    (8280.117, 7000.0),
    (8346.822, 2000.0),
    (8409.190, 2000.0),
    (8576.010, 40.0),
    (8648.540, 40.0),
    (8739.370, 300.0),
    (8819.410, 5000.0),
    (8862.320, 300.0),
    (8908.730, 200.0),
    (8930.830, 200.0),
    (8952.250, 1000.0),
    (9045.450, 400.0),
    (9162.652, 500.0),
    (9513.379, 300.0),
    (9799.696, 2000.0),
    (9923.190, 3000.0),
    (10527.130, 60.0),
    (10838.340, 100.0),
    (10895.380, 40.0),
    (11085.250, 40.0),
    (11742.000, 30.0),
    (12623.391, 500.0),
    (13657.055, 600.0),
    (14142.420, 100.0),
    (14732.806, 250.0),
    (15418.394, 120.0),
    (16053.280, 80.0),
    (16728.150, 60.0),
    (17325.770, 80.0),
    (18788.130, 20.0),
    (19762.620, 10.0),
    (20262.240, 60.0),
    (23193.330, 80.0),
    (24824.710, 50.0),
    (26269.080, 40.0),
    (26510.860, 30.0),
    (26827.620, 20.0),
    (31069.230, 50.0),
    (32739.260, 60.0),
    (34015.620, 30.0),
    (35070.250, 40.0),
    (36219.450, 20.0),
    (36508.200, 30.0),
    (39955.030, 20.0),
];
