use std::f64::consts::PI;

use ndarray::Array1;
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::Serialize;

use crate::signal::filter::FilterConfig;
use crate::signal::SignalError;

/// Named EEG frequency bands. Delta is not tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Band {
    Theta,
    Alpha,
    Beta,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Theta, Band::Alpha, Band::Beta];

    pub fn name(self) -> &'static str {
        match self {
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
        }
    }
}

/// Integrated spectral power per band, always non-negative.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct BandPowers {
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl BandPowers {
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
        }
    }
}

/// Welch-style band power estimator: Hann-windowed averaged periodogram over
/// 2-second segments with 50% overlap, then trapezoidal integration of the
/// PSD over each band's frequency range.
pub struct BandPowerEstimator {
    bands: [(Band, f64, f64); 3],
}

impl BandPowerEstimator {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            bands: [
                (Band::Theta, config.theta_band.0, config.theta_band.1),
                (Band::Alpha, config.alpha_band.0, config.alpha_band.1),
                (Band::Beta, config.beta_band.0, config.beta_band.1),
            ],
        }
    }

    /// Minimum window length: one full 2-second segment.
    pub fn min_window(sample_rate: f64) -> usize {
        (2.0 * sample_rate) as usize
    }

    /// Estimate band powers from one channel's buffered window. Windows
    /// shorter than two seconds are a caller-visible precondition failure.
    pub fn estimate(&self, window: &[f64], sample_rate: f64) -> Result<BandPowers, SignalError> {
        if sample_rate <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        let nperseg = Self::min_window(sample_rate);
        if window.len() < nperseg {
            return Err(SignalError::InsufficientData {
                needed: nperseg,
                got: window.len(),
            });
        }
        let (freqs, psd) = welch_psd(window, sample_rate, nperseg);
        let mut powers = BandPowers::default();
        for (band, low, high) in self.bands {
            let power = integrate_band(&freqs, &psd, low, high);
            match band {
                Band::Theta => powers.theta = power,
                Band::Alpha => powers.alpha = power,
                Band::Beta => powers.beta = power,
            }
        }
        Ok(powers)
    }
}

/// One-sided PSD via Welch's method (mean-detrended, Hann window, density
/// scaling). Returns (frequencies, psd) of length `nperseg / 2 + 1`.
fn welch_psd(window: &[f64], sample_rate: f64, nperseg: usize) -> (Array1<f64>, Array1<f64>) {
    let hann: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / nperseg as f64).cos()))
        .collect();
    let window_power: f64 = hann.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate * window_power);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);

    let nbins = nperseg / 2 + 1;
    let mut psd = Array1::<f64>::zeros(nbins);
    let step = nperseg / 2;
    let mut segments = 0usize;
    let mut start = 0usize;
    while start + nperseg <= window.len() {
        let segment = &window[start..start + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;
        let mut buffer: Vec<Complex64> = segment
            .iter()
            .zip(&hann)
            .map(|(&x, &w)| Complex64::new((x - mean) * w, 0.0))
            .collect();
        fft.process(&mut buffer);
        for (k, bin) in buffer.iter().take(nbins).enumerate() {
            let mut p = bin.norm_sqr() * scale;
            // One-sided spectrum: fold negative frequencies in, except at DC
            // and (for even lengths) the Nyquist bin.
            if k != 0 && !(nperseg % 2 == 0 && k == nbins - 1) {
                p *= 2.0;
            }
            psd[k] += p;
        }
        segments += 1;
        start += step;
    }
    psd /= segments as f64;

    let freqs = Array1::from_iter((0..nbins).map(|k| k as f64 * sample_rate / nperseg as f64));
    (freqs, psd)
}

/// Trapezoidal integration of the PSD over `low..=high` Hz.
fn integrate_band(freqs: &Array1<f64>, psd: &Array1<f64>, low: f64, high: f64) -> f64 {
    let selected: Vec<(f64, f64)> = freqs
        .iter()
        .zip(psd.iter())
        .filter(|(&f, _)| f >= low && f <= high)
        .map(|(&f, &p)| (f, p))
        .collect();
    selected
        .windows(2)
        .map(|pair| (pair[1].0 - pair[0].0) * (pair[0].1 + pair[1].1) / 2.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 256.0;

    fn sine(freq: f64, amplitude: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / FS).sin())
            .collect()
    }

    #[test]
    fn short_window_is_a_precondition_failure() {
        let estimator = BandPowerEstimator::new(&FilterConfig::default());
        let window = sine(10.0, 1.0, 511);
        assert!(matches!(
            estimator.estimate(&window, FS),
            Err(SignalError::InsufficientData {
                needed: 512,
                got: 511
            })
        ));
    }

    #[test]
    fn powers_are_never_negative() {
        let estimator = BandPowerEstimator::new(&FilterConfig::default());
        let window = sine(17.0, 3.0, 1280);
        let powers = estimator.estimate(&window, FS).unwrap();
        for band in Band::ALL {
            assert!(powers.get(band) >= 0.0);
        }
    }

    #[test]
    fn alpha_tone_lands_in_the_alpha_band() {
        let estimator = BandPowerEstimator::new(&FilterConfig::default());
        let window = sine(10.0, 2.0, 1280);
        let powers = estimator.estimate(&window, FS).unwrap();
        assert!(powers.alpha > 10.0 * powers.theta);
        assert!(powers.alpha > 10.0 * powers.beta);
        // Amplitude-2 sine carries total power 2.0; most of it must be
        // recovered in-band.
        assert!(powers.alpha > 1.5 && powers.alpha < 2.2);
    }

    #[test]
    fn band_sum_does_not_exceed_total_signal_power() {
        let estimator = BandPowerEstimator::new(&FilterConfig::default());
        // Mixed theta + beta content.
        let window: Vec<f64> = sine(6.0, 1.0, 1280)
            .iter()
            .zip(sine(20.0, 1.0, 1280))
            .map(|(a, b)| a + b)
            .collect();
        let powers = estimator.estimate(&window, FS).unwrap();
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let variance =
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / window.len() as f64;
        let band_sum = powers.theta + powers.alpha + powers.beta;
        assert!(band_sum <= variance * 1.05, "{band_sum} vs {variance}");
        assert!(powers.theta > 0.3 && powers.beta > 0.3);
    }
}
