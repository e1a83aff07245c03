//! Argon arc-lamp lines, 0.8 - 2.4 micron.
//!
//! Air wavelengths in Angstrom with relative intensities as seen through a
//! near-infrared long-slit spectrograph.

/// `(wavelength, intensity)` pairs, ascending in wavelength.
pub(crate) const LINES: &[(f64, f64)] = &[
    (8006.157, 2000.0),
    (8014.786, 2500.0),
    (8103.693, 2000.0),
    (8115.311, 5000.0),
    (8264.522, 1500.0),
    (8408.210, 2000.0),
    (8424.648, 2000.0),
    (8521.442, 1500.0),
    (8667.944, 450.0),
    (9122.967, 3500.0),
    (9224.499, 1500.0),
    (9354.220, 160.0),
    (9657.786, 2500.0),
    (9784.503, 1600.0),
    (10470.054, 1600.0),
    (10673.565, 200.0),
    (11488.109, 100.0),
    (11668.710, 200.0),
    (12112.326, 200.0),
    (12139.738, 130.0),
    (12343.393, 70.0),
    (12402.827, 200.0),
    (12439.321, 200.0),
    (12456.120, 150.0),
    (12487.663, 150.0),
    (12702.281, 150.0),
    (12733.418, 30.0),
    (12802.739, 80.0),
    (12956.659, 200.0),
    (13008.264, 200.0),
    (13214.741, 500.0),
    (13228.107, 300.0),
    (13272.640, 500.0),
    (13313.210, 1000.0),
    (13367.111, 500.0),
    (13499.410, 40.0),
    (13504.191, 1000.0),
    (13599.333, 60.0),
    (13622.659, 200.0),
    (13678.550, 200.0),
    (13718.577, 1000.0),
    (14093.640, 500.0),
    (15046.500, 30.0),
    (15172.690, 40.0),
    (15989.490, 30.0),
    (16519.860, 20.0),
    (16940.580, 200.0),
    (17449.590, 5.0),
    (18427.760, 10.0),
    (19822.910, 5.0),
    (20616.230, 40.0),
    (20986.110, 20.0),
    (21332.880, 30.0),
    (21534.200, 30.0),
    (22039.840, 2.0),
    (22077.060, 10.0),
    (23133.200, 20.0),
    (23966.520, 20.0),
];
