// src/types.rs

use serde::Serialize;

use crate::game::GameSnapshot;
use crate::motion::ControlOutput;
use crate::signal::{BandPowers, FilterSpec, Sample, StreamKind};

/// Commands from the embedding layer into the engine.
#[derive(Clone, Debug)]
pub enum ControlCommand {
    /// Start or restart a zen-archer round.
    StartGame,
    /// Swap the display filter chain.
    SetFilterSpec(FilterSpec),
    Shutdown,
}

/// One channel's filtered waveform for plotting.
#[derive(Clone, Debug, Serialize)]
pub struct ChannelWaveform {
    pub stream: StreamKind,
    pub channel: &'static str,
    pub samples: Vec<Sample>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct ChannelBandPowers {
    pub channel: &'static str,
    pub powers: BandPowers,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct BlinkStatus {
    pub fired: bool,
    pub last_blink_time: f64,
}

/// Immutable per-tick artifacts pushed to the presentation/actuation side.
/// Consumers must never feed these back into the core.
#[derive(Clone, Debug)]
pub enum CoreMessage {
    Log(String),
    Waveforms(Vec<ChannelWaveform>),
    BandPower(Vec<ChannelBandPowers>),
    Blink(BlinkStatus),
    Game(GameSnapshot),
    Vehicle(ControlOutput),
    /// Named stream has produced no usable data yet.
    Waiting(&'static str),
}
