use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::time::Instant;

use crate::signal::SignalError;

/// One multi-channel reading in the stream's channel order.
#[derive(Clone, Debug)]
pub struct Frame {
    pub values: Vec<f64>,
    pub timestamp: f64,
}

/// Non-blocking producer of timestamped sample frames. `Ok(None)` means no
/// sample is available right now; the poll loop simply moves on.
pub trait SampleSource {
    fn pull(&mut self) -> Result<Option<Frame>, SignalError>;
}

/// In-memory source for deterministic tests and playback.
pub struct ManualSource {
    queue: VecDeque<Frame>,
}

impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
        }
    }
}

impl SampleSource for ManualSource {
    fn pull(&mut self) -> Result<Option<Frame>, SignalError> {
        Ok(self.queue.pop_front())
    }
}

/// Wall-clock paced sine generator standing in for real hardware. Each pull
/// yields at most one frame; frames become due at the configured sample rate,
/// so a drain loop catches up after a stall. Optionally injects a large
/// transient on selected channels at a fixed period to exercise the blink
/// path.
pub struct SineSource {
    sample_rate: f64,
    channel_freqs: Vec<f64>,
    amplitude: f64,
    spike: Option<SpikeProfile>,
    emitted: u64,
    started: Instant,
}

#[derive(Clone, Debug)]
pub struct SpikeProfile {
    pub period_s: f64,
    pub width_s: f64,
    pub amplitude: f64,
    pub channels: Vec<usize>,
}

impl SineSource {
    pub fn new(sample_rate: f64, channel_freqs: Vec<f64>, amplitude: f64) -> Self {
        Self {
            sample_rate,
            channel_freqs,
            amplitude,
            spike: None,
            emitted: 0,
            started: Instant::now(),
        }
    }

    pub fn with_spikes(mut self, spike: SpikeProfile) -> Self {
        self.spike = Some(spike);
        self
    }
}

impl SampleSource for SineSource {
    fn pull(&mut self) -> Result<Option<Frame>, SignalError> {
        let due = (self.started.elapsed().as_secs_f64() * self.sample_rate) as u64;
        if self.emitted >= due {
            return Ok(None);
        }
        let t = self.emitted as f64 / self.sample_rate;
        let mut values: Vec<f64> = self
            .channel_freqs
            .iter()
            .map(|&f| self.amplitude * (TAU * f * t).sin())
            .collect();
        if let Some(spike) = &self.spike {
            if t % spike.period_s < spike.width_s {
                for &idx in &spike.channels {
                    if let Some(v) = values.get_mut(idx) {
                        *v += spike.amplitude;
                    }
                }
            }
        }
        self.emitted += 1;
        Ok(Some(Frame {
            values,
            timestamp: t,
        }))
    }
}
