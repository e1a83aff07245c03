//! Atmospheric OH airglow lines, 1.0 - 2.4 micron.
//!
//! Vacuum wavelengths in Angstrom with relative intensities, after the
//! Rousselot et al. (2000, A&A 354, 1134) night-sky atlas. Close doublets that
//! a medium-resolution spectrograph cannot separate are listed as a single
//! blended entry.

/// `(wavelength, intensity)` pairs, ascending in wavelength.
pub(crate) const LINES: &[(f64, f64)] = &[
    // (5-2) and (6-3) bands, Y/J
    (10083.2, 340.0),
    (10124.0, 190.0),
    (10207.6, 90.0),
    (10289.3, 350.0),
    (10347.2, 120.0),
    (10372.4, 280.0),
    (10460.7, 180.0),
    (10501.5, 290.0),
    (10550.5, 120.0),
    (10689.4, 110.0),
    (10834.6, 250.0),
    (10918.6, 310.0),
    (11072.5, 80.0),
    (11159.4, 130.0),
    (11325.0, 60.0),
    (11538.7, 80.0),
    (11561.5, 80.0),
    (11646.2, 110.0),
    // (7-4) band, J
    (11716.5, 230.0),
    (11764.6, 200.0),
    (11911.7, 140.0),
    (11969.0, 250.0),
    (12035.3, 190.0),
    (12126.4, 160.0),
    (12231.1, 140.0),
    (12292.9, 130.0),
    (12395.6, 150.0),
    (12437.7, 110.0),
    (12560.6, 80.0),
    (12626.9, 180.0),
    (12694.0, 90.0),
    (12819.7, 80.0),
    (12881.7, 80.0),
    (12946.4, 60.0),
    // (8-5) band, J
    (13049.4, 50.0),
    (13145.5, 40.0),
    (13225.9, 30.0),
    // (3-1) band, H
    (14564.1, 300.0),
    (14718.2, 260.0),
    (14868.3, 250.0),
    (15055.3, 330.0),
    (15187.1, 520.0),
    (15240.9, 370.0),
    (15332.4, 590.0),
    (15395.3, 410.0),
    (15432.2, 430.0),
    (15505.7, 350.0),
    (15570.2, 490.0),
    (15597.6, 300.0),
    (15656.2, 360.0),
    (15701.0, 330.0),
    (15750.8, 320.0),
    (15833.5, 120.0),
    (15888.4, 230.0),
    (15968.2, 120.0),
    (16030.8, 180.0),
    (16079.8, 380.0),
    // (4-2) band, H
    (16128.6, 510.0),
    (16194.6, 420.0),
    (16235.4, 360.0),
    (16317.2, 250.0),
    (16350.7, 400.0),
    (16388.5, 350.0),
    (16414.7, 300.0),
    (16475.7, 290.0),
    (16502.4, 380.0),
    (16553.8, 240.0),
    (16612.2, 200.0),
    (16692.4, 270.0),
    (16759.0, 130.0),
    (16840.5, 230.0),
    (16903.7, 280.0),
    (16955.1, 240.0),
    (17008.7, 200.0),
    (17123.5, 150.0),
    (17210.2, 90.0),
    (17288.3, 160.0),
    (17356.9, 90.0),
    (17449.5, 140.0),
    (17653.2, 70.0),
    (17767.9, 60.0),
    (17880.3, 50.0),
    // (1-0) and (8-6) bands, K
    (19518.0, 40.0),
    (19593.0, 50.0),
    (19701.0, 60.0),
    (19771.9, 40.0),
    (19845.1, 70.0),
    (20008.2, 90.0),
    (20193.2, 80.0),
    (20275.9, 100.0),
    (20339.6, 140.0),
    (20412.7, 90.0),
    (20563.6, 200.0),
    (20729.0, 240.0),
    (20860.3, 210.0),
    (21007.3, 120.0),
    // (9-7) and (2-0) bands, K
    (21176.5, 90.0),
    (21249.5, 70.0),
    (21279.1, 110.0),
    (21505.5, 90.0),
    (21580.6, 100.0),
    (21711.1, 110.0),
    (21802.2, 260.0),
    (21873.5, 200.0),
    (21955.6, 360.0),
    (22052.1, 260.0),
    (22125.5, 370.0),
    (22247.9, 180.0),
    (22312.7, 280.0),
    (22460.3, 130.0),
    (22517.9, 270.0),
    (22624.0, 120.0),
    (22741.9, 200.0),
    (22984.8, 110.0),
    (23046.8, 60.0),
    (23153.1, 40.0),
    (23264.8, 50.0),
    (23373.2, 40.0),
];
