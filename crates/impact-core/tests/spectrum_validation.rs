use impact_core::{FrequencyGrid, ImpactError, NoiseSpectrum, Observation};
use num_complex::Complex64;

#[test]
fn non_positive_psd_is_an_invalid_noise_model() {
    let err = NoiseSpectrum::from_psd(vec![vec![1.0, 0.0, 2.0]]).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidNoiseModel(_)));
    assert_eq!(err.info().context.get("bin").map(String::as_str), Some("1"));

    let err = NoiseSpectrum::from_psd(vec![vec![1.0, f64::NAN]]).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidNoiseModel(_)));
}

#[test]
fn inverse_tracks_psd() {
    let spectrum = NoiseSpectrum::from_psd(vec![vec![2.0, 4.0], vec![0.5, 1.0]]).unwrap();
    assert_eq!(spectrum.inverse()[0], vec![0.5, 0.25]);
    assert_eq!(spectrum.inverse()[1], vec![2.0, 1.0]);
    assert!(!spectrum.is_external());
}

#[test]
fn external_spectrum_must_match_shape() {
    let mut spectrum = NoiseSpectrum::unit(3, 8);
    let untouched = spectrum.clone();

    let err = spectrum.install_external(&[vec![2.0; 8]]).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidNoiseModel(_)));
    assert_eq!(err.info().code, "psd-shape");
    assert_eq!(spectrum, untouched);

    let short = vec![vec![2.0; 8], vec![2.0; 4], vec![2.0; 8]];
    let err = spectrum.install_external(&short).unwrap_err();
    assert_eq!(err.info().code, "psd-shape");
    assert_eq!(err.info().context.get("channel").map(String::as_str), Some("1"));
    assert_eq!(spectrum, untouched);
    assert!(!spectrum.is_external());

    spectrum.install_external(&vec![vec![2.0; 8]; 3]).unwrap();
    assert!(spectrum.is_external());
    assert!(spectrum.inverse().iter().all(|row| row == &vec![0.5; 8]));
}

#[test]
fn grid_band_follows_frequency_limits() {
    let grid = FrequencyGrid::new(256.0, 1.0, 1.0 / 256.0, 0.5).unwrap();
    assert_eq!(grid.bins, 128);
    assert_eq!(grid.band(), 1..128);
    assert!((grid.frequency(128) - 0.5).abs() < 1e-12);

    let err = FrequencyGrid::new(256.0, 1.0, 0.4, 0.1).unwrap_err();
    assert!(matches!(err, ImpactError::Configuration(_)));
}

#[test]
fn observation_rejects_short_channels() {
    let grid = FrequencyGrid::new(16.0, 1.0, 0.0625, 0.5).unwrap();
    let err = Observation::new(grid, vec![vec![Complex64::new(0.0, 0.0); 3]]).unwrap_err();
    assert_eq!(err.info().code, "observation-length");
}
