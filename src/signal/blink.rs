use serde::Deserialize;

/// Frontal channels carry the strongest blink artifacts; the same pair
/// doubles as the focus-metric channel set.
pub const FRONTAL_CHANNELS: [&str; 2] = ["AF7", "AF8"];

/// Channels must have buffered at least this many samples before they are
/// considered for blink checks; shorter channels are skipped.
pub const MIN_BLINK_SAMPLES: usize = 50;

/// Fraction of a second of recent data inspected for the spike.
const RECENT_WINDOW_S: f64 = 0.2;

/// Tuning:
/// - If blinks aren't registering, lower the threshold.
/// - If blinks register without blinking, raise the threshold or cooldown.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub threshold: f64,
    pub cooldown_s: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            threshold: 65.0,
            cooldown_s: 0.75,
        }
    }
}

/// Amplitude-spike blink detector over the frontal channels with a
/// refractory cooldown.
#[derive(Clone, Copy, Debug)]
pub struct BlinkDetector {
    config: BlinkConfig,
}

impl BlinkDetector {
    pub fn new(config: BlinkConfig) -> Self {
        Self { config }
    }

    /// Scan the frontal channels for a blink artifact.
    ///
    /// Within the cooldown of `last_blink_time` nothing is inspected and the
    /// previous acceptance time is returned unchanged. Otherwise each channel
    /// contributes only its most recent 200 ms; if peak-to-peak amplitude
    /// exceeds the threshold on any channel, the blink is accepted at `now`.
    /// The first qualifying channel short-circuits the scan.
    pub fn detect(
        &self,
        frontal_channels: &[&[f64]],
        sample_rate: f64,
        last_blink_time: f64,
        now: f64,
    ) -> (bool, f64) {
        if now - last_blink_time < self.config.cooldown_s {
            return (false, last_blink_time);
        }
        let recent = (RECENT_WINDOW_S * sample_rate) as usize;
        for channel in frontal_channels {
            if channel.len() < MIN_BLINK_SAMPLES {
                continue;
            }
            let window = &channel[channel.len().saturating_sub(recent)..];
            if window.is_empty() {
                continue;
            }
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in window {
                min = min.min(v);
                max = max.max(v);
            }
            if max - min > self.config.threshold {
                return (true, now);
            }
        }
        (false, last_blink_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 256.0;

    /// Flat channel with a spike of the given amplitude in the last 200 ms.
    fn spiked_channel(amplitude: f64) -> Vec<f64> {
        let mut data = vec![0.0; 256];
        let last = data.len() - 1;
        data[last - 10] = amplitude;
        data
    }

    #[test]
    fn spike_fires_and_cooldown_suppresses_the_second_call() {
        let detector = BlinkDetector::new(BlinkConfig::default());
        let af7 = spiked_channel(200.0);
        let af8 = vec![0.0; 256];
        let channels: Vec<&[f64]> = vec![&af7, &af8];

        let t0 = 10.0;
        let (fired, last) = detector.detect(&channels, FS, 0.0, t0);
        assert!(fired);
        assert_eq!(last, t0);

        // Same spike still buffered 0.5 s later: inside the cooldown.
        let (fired, last) = detector.detect(&channels, FS, last, t0 + 0.5);
        assert!(!fired);
        assert_eq!(last, t0);

        // 0.8 s after acceptance the detector re-arms.
        let (fired, last) = detector.detect(&channels, FS, last, t0 + 0.8);
        assert!(fired);
        assert_eq!(last, t0 + 0.8);
    }

    #[test]
    fn sub_threshold_activity_does_not_fire() {
        let detector = BlinkDetector::new(BlinkConfig::default());
        let af7 = spiked_channel(60.0);
        let channels: Vec<&[f64]> = vec![&af7];
        let (fired, last) = detector.detect(&channels, FS, 0.0, 10.0);
        assert!(!fired);
        assert_eq!(last, 0.0);
    }

    #[test]
    fn underfilled_channels_are_skipped_not_errors() {
        let detector = BlinkDetector::new(BlinkConfig::default());
        let short = vec![500.0; 20];
        let channels: Vec<&[f64]> = vec![&short];
        let (fired, _) = detector.detect(&channels, FS, 0.0, 10.0);
        assert!(!fired);
    }

    #[test]
    fn spike_outside_recent_window_is_ignored() {
        let detector = BlinkDetector::new(BlinkConfig::default());
        let mut data = vec![0.0; 512];
        // Large transient more than 200 ms in the past.
        data[100] = 300.0;
        let channels: Vec<&[f64]> = vec![&data];
        let (fired, _) = detector.detect(&channels, FS, 0.0, 10.0);
        assert!(!fired);
    }

    #[test]
    fn second_frontal_channel_can_trip_the_detector() {
        let detector = BlinkDetector::new(BlinkConfig::default());
        let quiet = vec![0.0; 256];
        let af8 = spiked_channel(120.0);
        let channels: Vec<&[f64]> = vec![&quiet, &af8];
        let (fired, last) = detector.detect(&channels, FS, 0.0, 5.0);
        assert!(fired);
        assert_eq!(last, 5.0);
    }
}
