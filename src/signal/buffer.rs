use std::collections::{HashMap, VecDeque};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::signal::SignalError;

/// One timestamped scalar reading from a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

/// The three stream types exposed by the headband.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StreamKind {
    Eeg,
    Accelerometer,
    Gyroscope,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [
        StreamKind::Eeg,
        StreamKind::Accelerometer,
        StreamKind::Gyroscope,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Eeg => "EEG",
            StreamKind::Accelerometer => "Accelerometer",
            StreamKind::Gyroscope => "Gyroscope",
        }
    }
}

/// Fixed channel order per stream. Incoming frames must match this layout,
/// and readers address channels by these labels.
pub static CHANNEL_LAYOUT: Lazy<HashMap<StreamKind, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (StreamKind::Eeg, vec!["TP9", "AF7", "AF8", "TP10"]),
        (StreamKind::Accelerometer, vec!["X", "Y", "Z"]),
        (StreamKind::Gyroscope, vec!["X", "Y", "Z"]),
    ])
});

/// Fixed-capacity FIFO of the most recent samples on one channel.
///
/// Pushing at capacity evicts the oldest sample. Timestamps are stored in
/// arrival order; the buffer never re-sorts.
pub struct RingBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self, SignalError> {
        if capacity == 0 {
            return Err(SignalError::InvalidCapacity);
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Ordered copy of the current contents, oldest first. An under-filled
    /// buffer simply yields fewer than `capacity` samples.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Values only, in the same order as `snapshot`.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn last(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

struct StreamBuffers {
    labels: Vec<&'static str>,
    sample_rate: f64,
    rings: Vec<RingBuffer>,
}

/// Owner of all sample history: one ring per channel, grouped by stream.
///
/// Single writer (the acquisition poll loop) pushes frames; readers take
/// independent snapshots, so no observer can see a torn write as long as
/// access goes through one lock.
pub struct StreamStore {
    streams: HashMap<StreamKind, StreamBuffers>,
}

impl StreamStore {
    pub fn new(
        buffer_seconds: f64,
        eeg_sample_rate: f64,
        motion_sample_rate: f64,
    ) -> Result<Self, SignalError> {
        if buffer_seconds <= 0.0 {
            return Err(SignalError::InvalidCapacity);
        }
        if eeg_sample_rate <= 0.0 || motion_sample_rate <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        let mut streams = HashMap::new();
        for kind in StreamKind::ALL {
            let sample_rate = match kind {
                StreamKind::Eeg => eeg_sample_rate,
                _ => motion_sample_rate,
            };
            let labels = CHANNEL_LAYOUT[&kind].clone();
            let capacity = (buffer_seconds * sample_rate).ceil() as usize;
            let rings = labels
                .iter()
                .map(|_| RingBuffer::new(capacity))
                .collect::<Result<Vec<_>, _>>()?;
            streams.insert(
                kind,
                StreamBuffers {
                    labels,
                    sample_rate,
                    rings,
                },
            );
        }
        Ok(Self { streams })
    }

    /// Fan one multi-channel frame out to the per-channel rings. The value
    /// order must match `CHANNEL_LAYOUT` for the stream.
    pub fn push_frame(
        &mut self,
        kind: StreamKind,
        values: &[f64],
        timestamp: f64,
    ) -> Result<(), SignalError> {
        let stream = self
            .streams
            .get_mut(&kind)
            .ok_or(SignalError::ChannelMismatch {
                expected: 0,
                actual: values.len(),
            })?;
        if values.len() != stream.rings.len() {
            return Err(SignalError::ChannelMismatch {
                expected: stream.rings.len(),
                actual: values.len(),
            });
        }
        for (ring, &value) in stream.rings.iter_mut().zip(values) {
            ring.push(Sample { timestamp, value });
        }
        Ok(())
    }

    /// Read-only copy of one channel's history. Unknown channels and channels
    /// that have not received data yet both yield an empty sequence.
    pub fn snapshot(&self, kind: StreamKind, channel: &str) -> Vec<Sample> {
        self.ring(kind, channel)
            .map(|r| r.snapshot())
            .unwrap_or_default()
    }

    /// Values only, for the filtering and spectral paths.
    pub fn values(&self, kind: StreamKind, channel: &str) -> Vec<f64> {
        self.ring(kind, channel)
            .map(|r| r.values())
            .unwrap_or_default()
    }

    /// Most recent sample on a channel. `None` means "waiting for data".
    pub fn last(&self, kind: StreamKind, channel: &str) -> Option<Sample> {
        self.ring(kind, channel).and_then(|r| r.last())
    }

    pub fn sample_rate(&self, kind: StreamKind) -> f64 {
        self.streams.get(&kind).map(|s| s.sample_rate).unwrap_or(0.0)
    }

    pub fn channels(&self, kind: StreamKind) -> &[&'static str] {
        self.streams
            .get(&kind)
            .map(|s| s.labels.as_slice())
            .unwrap_or(&[])
    }

    fn ring(&self, kind: StreamKind, channel: &str) -> Option<&RingBuffer> {
        let stream = self.streams.get(&kind)?;
        let idx = stream.labels.iter().position(|l| *l == channel)?;
        stream.rings.get(idx)
    }
}
