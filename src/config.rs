// src/config.rs
//
// Startup configuration. Everything here is fixed before the loops start;
// a bad value aborts the process rather than limping into the hot path.

use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::game::GameConfig;
use crate::motion::VehicleConfig;
use crate::signal::{BlinkConfig, FilterConfig, SignalError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// 250 ms dashboard tick driving the archery game.
    ZenArcher,
    /// 60 Hz loop emitting steer/gas/brake actions.
    Vehicle,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: EngineMode,
    pub buffer_seconds: f64,
    pub eeg_sample_rate: f64,
    pub motion_sample_rate: f64,
    pub tick_interval_ms: u64,
    pub vehicle_rate_hz: f64,
    pub blink: BlinkConfig,
    pub filters: FilterConfig,
    pub game: GameConfig,
    pub vehicle: VehicleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: EngineMode::ZenArcher,
            buffer_seconds: 5.0,
            eeg_sample_rate: 256.0,
            motion_sample_rate: 52.0,
            tick_interval_ms: 250,
            vehicle_rate_hz: 60.0,
            blink: BlinkConfig::default(),
            filters: FilterConfig::default(),
            game: GameConfig::default(),
            vehicle: VehicleConfig::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file, or fall back to defaults. Either way the
    /// result is validated before anything else runs.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config: Config = match path {
            Some(p) => {
                let raw =
                    fs::read_to_string(p).with_context(|| format!("reading config file {p}"))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing config file {p}"))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        if self.eeg_sample_rate <= 0.0 || self.motion_sample_rate <= 0.0 {
            return Err(SignalError::InvalidSampleRate);
        }
        if self.buffer_seconds <= 0.0 {
            return Err(SignalError::InvalidCapacity);
        }
        if self.tick_interval_ms == 0 || self.vehicle_rate_hz <= 0.0 {
            return Err(SignalError::InvalidInterval);
        }
        if self.blink.threshold <= 0.0 || self.blink.cooldown_s < 0.0 {
            return Err(SignalError::InvalidConfig(
                "blink threshold must be positive and cooldown non-negative",
            ));
        }
        if self.game.shot_duration_s <= 0.0 || self.game.max_shots == 0 {
            return Err(SignalError::InvalidConfig(
                "game needs a positive shot timer and at least one shot",
            ));
        }
        if !(0.0..=1.0).contains(&self.game.aim.smoothing) || self.game.aim.arena_max <= 0.0 {
            return Err(SignalError::InvalidConfig(
                "aim smoothing must be in 0..=1 over a positive arena",
            ));
        }
        if self.game.aim.sensitivity <= 0.0
            || self.game.aim.jitter_gain <= 0.0
            || self.game.aim.jitter_min < 0.0
            || self.game.aim.jitter_max < self.game.aim.jitter_min
        {
            return Err(SignalError::InvalidConfig(
                "aim jitter needs positive gain and 0 <= jitter_min <= jitter_max",
            ));
        }
        if self.vehicle.steer_threshold <= 0.0
            || self.vehicle.accel_threshold <= 0.0
            || self.vehicle.brake_threshold <= 0.0
        {
            return Err(SignalError::InvalidConfig(
                "vehicle thresholds must be positive",
            ));
        }
        // Gains scale an already-clamped [0, 1] output, so anything above
        // 1.0 would break the gas/brake bounds.
        if self.vehicle.accel_gain <= 0.0
            || self.vehicle.accel_gain > 1.0
            || self.vehicle.brake_gain <= 0.0
            || self.vehicle.brake_gain > 1.0
        {
            return Err(SignalError::InvalidConfig(
                "vehicle gains must be in (0, 1]",
            ));
        }
        self.filters.validate()
    }
}
