use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::signal::SignalError;

/// Windows shorter than this pass through unfiltered.
pub const MIN_FILTER_SAMPLES: usize = 10;

/// Q values for a 4th-order Butterworth response split into two biquads.
const BUTTERWORTH_Q4: [f64; 2] = [0.5411961001461969, 1.3065629648763764];

/// Frequency bounds for every stage, fixed at startup.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub notch_hz: f64,
    pub notch_q: f64,
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
    pub theta_band: (f64, f64),
    pub alpha_band: (f64, f64),
    pub beta_band: (f64, f64),
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            notch_hz: 60.0,
            notch_q: 30.0,
            highpass_hz: 1.0,
            lowpass_hz: 30.0,
            theta_band: (4.0, 8.0),
            alpha_band: (8.0, 13.0),
            beta_band: (13.0, 30.0),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        for (band, (low, high)) in [
            ("theta", self.theta_band),
            ("alpha", self.alpha_band),
            ("beta", self.beta_band),
        ] {
            if low <= 0.0 || high <= low {
                return Err(SignalError::InvalidBand { band, low, high });
            }
        }
        if self.notch_hz <= 0.0 || self.notch_q <= 0.0 {
            return Err(SignalError::InvalidBand {
                band: "notch",
                low: self.notch_hz,
                high: self.notch_q,
            });
        }
        if self.highpass_hz <= 0.0 || self.lowpass_hz <= self.highpass_hz {
            return Err(SignalError::InvalidBand {
                band: "pass",
                low: self.highpass_hz,
                high: self.lowpass_hz,
            });
        }
        Ok(())
    }
}

/// Which stages to run. Application order is fixed: notch, high-pass,
/// low-pass, then any selected band-passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub notch: bool,
    pub highpass: bool,
    pub lowpass: bool,
    pub theta: bool,
    pub alpha: bool,
    pub beta: bool,
}

impl FilterSpec {
    /// Notch + high-pass + low-pass, the usual display chain.
    pub fn standard() -> Self {
        Self {
            notch: true,
            highpass: true,
            lowpass: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug)]
struct Coeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

/// Direct Form II Transposed second-order section.
struct Biquad {
    coeffs: Coeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new(coeffs: Coeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.coeffs.b0 * x + self.z1;
        self.z1 = self.coeffs.b1 * x - self.coeffs.a1 * y + self.z2;
        self.z2 = self.coeffs.b2 * x - self.coeffs.a2 * y;
        y
    }
}

fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Coeffs {
    Coeffs {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}

fn notch_coeffs(sample_rate: f64, freq: f64, q: f64) -> Coeffs {
    let omega = 2.0 * PI * freq / sample_rate;
    let alpha = omega.sin() / (2.0 * q);
    let cos_omega = omega.cos();
    normalize(
        1.0,
        -2.0 * cos_omega,
        1.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

fn highpass_coeffs(sample_rate: f64, freq: f64, q: f64) -> Coeffs {
    let omega = 2.0 * PI * freq / sample_rate;
    let alpha = omega.sin() / (2.0 * q);
    let cos_omega = omega.cos();
    normalize(
        (1.0 + cos_omega) / 2.0,
        -(1.0 + cos_omega),
        (1.0 + cos_omega) / 2.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

fn lowpass_coeffs(sample_rate: f64, freq: f64, q: f64) -> Coeffs {
    let omega = 2.0 * PI * freq / sample_rate;
    let alpha = omega.sin() / (2.0 * q);
    let cos_omega = omega.cos();
    normalize(
        (1.0 - cos_omega) / 2.0,
        1.0 - cos_omega,
        (1.0 - cos_omega) / 2.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

fn highpass_cascade(sample_rate: f64, freq: f64) -> Vec<Coeffs> {
    BUTTERWORTH_Q4
        .iter()
        .map(|&q| highpass_coeffs(sample_rate, freq, q))
        .collect()
}

fn lowpass_cascade(sample_rate: f64, freq: f64) -> Vec<Coeffs> {
    BUTTERWORTH_Q4
        .iter()
        .map(|&q| lowpass_coeffs(sample_rate, freq, q))
        .collect()
}

/// Band-pass as a high-pass at the lower edge cascaded with a low-pass at the
/// upper edge, both 4th-order Butterworth.
fn bandpass_cascade(sample_rate: f64, low: f64, high: f64) -> Vec<Coeffs> {
    let mut sections = highpass_cascade(sample_rate, low);
    sections.extend(lowpass_cascade(sample_rate, high));
    sections
}

fn run_cascade(sections: &[Coeffs], data: &[f64]) -> Vec<f64> {
    let mut biquads: Vec<Biquad> = sections.iter().map(|&c| Biquad::new(c)).collect();
    data.iter()
        .map(|&x| biquads.iter_mut().fold(x, |acc, bq| bq.process(acc)))
        .collect()
}

/// Zero-phase (forward-backward) run over the whole window. Non-causal: it
/// needs the complete window in memory and distorts the window edges, which
/// is accepted for display-oriented reprocessing of a buffered snapshot.
fn filtfilt(sections: &[Coeffs], data: &[f64]) -> Vec<f64> {
    let mut forward = run_cascade(sections, data);
    forward.reverse();
    let mut backward = run_cascade(sections, &forward);
    backward.reverse();
    backward
}

/// Apply the selected stages to a buffered window. Output length always
/// equals input length; windows under `MIN_FILTER_SAMPLES` are returned
/// unmodified rather than failing.
pub fn apply_filters(
    data: &[f64],
    sample_rate: f64,
    spec: &FilterSpec,
    config: &FilterConfig,
) -> Vec<f64> {
    if data.len() < MIN_FILTER_SAMPLES || spec.is_empty() {
        return data.to_vec();
    }
    let mut out = data.to_vec();
    if spec.notch {
        let section = notch_coeffs(sample_rate, config.notch_hz, config.notch_q);
        out = filtfilt(&[section], &out);
    }
    if spec.highpass {
        out = filtfilt(&highpass_cascade(sample_rate, config.highpass_hz), &out);
    }
    if spec.lowpass {
        out = filtfilt(&lowpass_cascade(sample_rate, config.lowpass_hz), &out);
    }
    for (selected, (low, high)) in [
        (spec.theta, config.theta_band),
        (spec.alpha, config.alpha_band),
        (spec.beta, config.beta_band),
    ] {
        if selected {
            out = filtfilt(&bandpass_cascade(sample_rate, low, high), &out);
        }
    }
    out
}
