// src/motion.rs
//
// Maps raw gyroscope readings into bounded control outputs: a steering /
// throttle / brake triple for the vehicle loop, and a smoothed 2D aim
// position for the archery game.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exponential decay applied to steering when the head is level. Never
/// hard-zeroed so noisy near-center readings stay smooth.
const STEER_DECAY: f64 = 0.999;
const GAS_DECAY: f64 = 0.99;
const GAS_DIVISOR: f64 = 10.0;
const BRAKE_DIVISOR: f64 = 90.0;

const FOCUS_EPSILON: f64 = 1e-10;

/// Vehicle action for one tick. Replaced wholesale every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ControlOutput {
    /// -1.0 (full left) to +1.0 (full right).
    pub steer: f64,
    /// 0.0 to 1.0.
    pub gas: f64,
    /// 0.0 to 1.0.
    pub brake: f64,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Degrees/sec of head tilt before steering engages.
    pub steer_threshold: f64,
    /// Forward nod rate that engages the throttle.
    pub accel_threshold: f64,
    /// Backward nod rate that engages the brake.
    pub brake_threshold: f64,
    pub accel_gain: f64,
    pub brake_gain: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            steer_threshold: 30.0,
            accel_threshold: 10.0,
            brake_threshold: 70.0,
            accel_gain: 1.0,
            brake_gain: 0.8,
        }
    }
}

/// Head-tilt steering with first-order decay toward center.
///
/// Gas and brake are mutually exclusive by construction: the threshold bands
/// (+accel_threshold forward, -brake_threshold backward) cannot both be
/// satisfied by one reading.
pub struct VehicleMapper {
    config: VehicleConfig,
    prev: ControlOutput,
}

impl VehicleMapper {
    pub fn new(config: VehicleConfig) -> Self {
        Self {
            config,
            prev: ControlOutput::default(),
        }
    }

    pub fn map(&mut self, gyro_x: f64, gyro_y: f64) -> ControlOutput {
        let steer = if gyro_x < -self.config.steer_threshold {
            1.0
        } else if gyro_x > self.config.steer_threshold {
            -1.0
        } else {
            self.prev.steer * STEER_DECAY
        };

        let (gas, brake) = if gyro_y > self.config.accel_threshold {
            (
                (gyro_y / GAS_DIVISOR).clamp(0.0, 1.0) * self.config.accel_gain,
                0.0,
            )
        } else if gyro_y < -self.config.brake_threshold {
            (
                0.0,
                (-gyro_y / BRAKE_DIVISOR).clamp(0.0, 1.0) * self.config.brake_gain,
            )
        } else {
            (self.prev.gas * GAS_DECAY, 0.0)
        };

        self.prev = ControlOutput { steer, gas, brake };
        self.prev
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    /// Gyro degrees/sec to arena pixels.
    pub sensitivity: f64,
    /// EMA coefficient for crosshair smoothing.
    pub smoothing: f64,
    /// Tremor model: jitter magnitude is `jitter_gain / focus`, clamped.
    pub jitter_gain: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    /// Square arena, positions clipped to `[0, arena_max]`.
    pub arena_max: f64,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            sensitivity: 5.0,
            smoothing: 0.4,
            jitter_gain: 5.0,
            jitter_min: 1.0,
            jitter_max: 20.0,
            arena_max: 470.0,
        }
    }
}

/// Gyro-to-crosshair mapper. Raw position is arena center plus the (y, z)
/// gyro reading times sensitivity, plus uniform jitter scaled inversely to
/// the focus metric; the result is EMA-smoothed across ticks and clipped to
/// the arena.
pub struct AimMapper {
    config: AimConfig,
    smoothed: (f64, f64),
}

impl AimMapper {
    pub fn new(config: AimConfig) -> Self {
        let center = config.arena_max / 2.0;
        Self {
            config,
            smoothed: (center, center),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        let c = self.config.arena_max / 2.0;
        (c, c)
    }

    pub fn reset(&mut self) {
        self.smoothed = self.center();
    }

    pub fn position(&self) -> (f64, f64) {
        self.smoothed
    }

    pub fn update(
        &mut self,
        gyro_y: f64,
        gyro_z: f64,
        focus: f64,
        rng: &mut impl Rng,
    ) -> (f64, f64) {
        let jitter = (self.config.jitter_gain / (focus + FOCUS_EPSILON))
            .clamp(self.config.jitter_min, self.config.jitter_max);
        let (cx, cy) = self.center();
        let raw_x = cx + gyro_z * self.config.sensitivity + rng.gen_range(-jitter..=jitter);
        let raw_y = cy + gyro_y * self.config.sensitivity + rng.gen_range(-jitter..=jitter);

        let alpha = self.config.smoothing;
        let x = (alpha * raw_x + (1.0 - alpha) * self.smoothed.0).clamp(0.0, self.config.arena_max);
        let y = (alpha * raw_y + (1.0 - alpha) * self.smoothed.1).clamp(0.0, self.config.arena_max);
        self.smoothed = (x, y);
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn left_tilt_holds_full_steer_then_decays() {
        let mut mapper = VehicleMapper::new(VehicleConfig::default());
        for _ in 0..5 {
            let out = mapper.map(-40.0, 0.0);
            assert_eq!(out.steer, 1.0);
        }
        let out = mapper.map(0.0, 0.0);
        assert!((out.steer - 0.999).abs() < 1e-12);
    }

    #[test]
    fn forward_nod_maps_to_clamped_gas() {
        let mut mapper = VehicleMapper::new(VehicleConfig::default());
        // Any nod past the +10 threshold saturates: 25/10 clamps to 1.0.
        let out = mapper.map(0.0, 25.0);
        assert_eq!(out.gas, 1.0);
        assert_eq!(out.brake, 0.0);
    }

    #[test]
    fn backward_nod_brakes_and_cuts_gas() {
        let mut mapper = VehicleMapper::new(VehicleConfig::default());
        mapper.map(0.0, 15.0); // gas on
        let out = mapper.map(0.0, -90.0);
        assert_eq!(out.gas, 0.0);
        assert!((out.brake - 0.8).abs() < 1e-12);
    }

    #[test]
    fn level_head_decays_gas_and_releases_brake() {
        let mut mapper = VehicleMapper::new(VehicleConfig::default());
        mapper.map(0.0, 20.0);
        let out = mapper.map(0.0, 0.0);
        assert!((out.gas - 0.99).abs() < 1e-12);
        assert_eq!(out.brake, 0.0);
    }

    #[test]
    fn gas_and_brake_are_mutually_exclusive() {
        let mut mapper = VehicleMapper::new(VehicleConfig::default());
        for gy in [-120.0, -80.0, -30.0, 0.0, 15.0, 60.0] {
            let out = mapper.map(0.0, gy);
            assert!(out.gas == 0.0 || out.brake == 0.0, "gy={gy}");
        }
    }

    #[test]
    fn aim_stays_inside_the_arena() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mapper = AimMapper::new(AimConfig::default());
        for _ in 0..200 {
            let (x, y) = mapper.update(400.0, -400.0, 0.01, &mut rng);
            assert!((0.0..=470.0).contains(&x));
            assert!((0.0..=470.0).contains(&y));
        }
    }

    #[test]
    fn high_focus_keeps_the_crosshair_near_the_raw_position() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut mapper = AimMapper::new(AimConfig::default());
        // focus 1000 clamps jitter to the 1-unit floor; with zero gyro the
        // raw position is the center, so one EMA step moves at most
        // alpha * jitter from center.
        let (x, y) = mapper.update(0.0, 0.0, 1000.0, &mut rng);
        assert!((x - 235.0).abs() <= 0.4 + 1e-9);
        assert!((y - 235.0).abs() <= 0.4 + 1e-9);
    }

    #[test]
    fn smoothing_state_persists_across_ticks() {
        let config = AimConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut mapper = AimMapper::new(config);
        // Constant gyro offset: the EMA converges toward raw over ticks
        // instead of jumping there.
        let first = mapper.update(20.0, 0.0, 1000.0, &mut rng).1;
        let raw_y = 235.0 + 20.0 * config.sensitivity;
        assert!(first < raw_y - 20.0, "EMA jumped straight to raw");
        let mut last = first;
        for _ in 0..30 {
            last = mapper.update(20.0, 0.0, 1000.0, &mut rng).1;
        }
        assert!((last - raw_y).abs() < 5.0, "EMA failed to converge: {last}");
    }
}
