// src/signal/mod.rs
pub mod bandpower;
pub mod blink;
pub mod buffer;
pub mod error;
pub mod filter;
pub mod source;

pub use bandpower::{Band, BandPowerEstimator, BandPowers};
pub use blink::{BlinkConfig, BlinkDetector, FRONTAL_CHANNELS};
pub use buffer::{RingBuffer, Sample, StreamKind, StreamStore, CHANNEL_LAYOUT};
pub use error::SignalError;
pub use filter::{apply_filters, FilterConfig, FilterSpec};
pub use source::{Frame, ManualSource, SampleSource, SineSource, SpikeProfile};
