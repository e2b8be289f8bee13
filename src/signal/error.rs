use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,
    #[error("tick interval must be greater than zero")]
    InvalidInterval,
    #[error("band {band} has inverted bounds {low}..{high} Hz")]
    InvalidBand {
        band: &'static str,
        low: f64,
        high: f64,
    },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("stream source failed: {0}")]
    Source(String),
}
