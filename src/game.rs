// src/game.rs
//
// "Zen archer": blink-triggered target shooting driven by head motion and
// the focus metric. The state machine owns all game state and replaces it
// wholesale each tick; consumers only ever see immutable snapshots.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::motion::{AimConfig, AimMapper};
use crate::signal::{BandPowers, BlinkConfig, BlinkDetector};

/// Target sprite is 150 px square; its center sits at position + 75 and the
/// outermost scoring ring has the same radius.
const TARGET_CENTER_OFFSET: f64 = 75.0;
const TARGET_POS_MIN: f64 = 25.0;
const TARGET_POS_MAX: f64 = 325.0;
const INITIAL_TARGET_POS: (f64, f64) = (175.0, 175.0);

const FOCUS_EPSILON: f64 = 1e-10;

const WAITING_FOR_EEG: &str = "Waiting for EEG data...";
const WAITING_FOR_GYRO: &str = "Waiting for Gyro data...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    WaitingForData,
    Aiming,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShotOutcome {
    None,
    Hit(u32),
    Miss,
    /// Shot timer ran out; the shot fires but scores nothing.
    TimedOut,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Timer for each shot, seconds.
    pub shot_duration_s: f64,
    /// Shots before game over.
    pub max_shots: u32,
    pub aim: AimConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            shot_duration_s: 10.0,
            max_shots: 10,
            aim: AimConfig::default(),
        }
    }
}

/// Immutable per-tick view handed to the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub score: u64,
    pub shot_number: u32,
    pub shot_timer: f64,
    pub crosshair: (f64, f64),
    pub target_pos: (f64, f64),
    pub focus: Option<f64>,
    pub blink_fired: bool,
    pub last_blink_time: f64,
    pub last_shot: ShotOutcome,
    pub status: Option<&'static str>,
}

/// Everything the machine consumes on one tick. Slices borrow from the
/// caller's snapshots; the machine never holds onto them.
pub struct TickInput<'a> {
    /// Monotonic seconds, same clock as `last_blink_time`.
    pub now: f64,
    /// Tick interval, seconds.
    pub dt: f64,
    pub sample_rate: f64,
    /// Recent values of the frontal channels, for blink detection.
    pub frontal: &'a [&'a [f64]],
    /// Band powers of the focus channels that had enough buffered data.
    pub focus_powers: &'a [BandPowers],
    /// Latest gyroscope (y, z) reading.
    pub gyro_yz: Option<(f64, f64)>,
}

/// Concentric-ring score for a shot landing `distance` away from the target
/// center.
pub fn ring_points(distance: f64) -> u32 {
    if distance <= 25.0 {
        100
    } else if distance <= 50.0 {
        50
    } else if distance <= 75.0 {
        20
    } else {
        0
    }
}

pub struct ZenArcher<R: Rng> {
    config: GameConfig,
    detector: BlinkDetector,
    aim: AimMapper,
    rng: R,
    phase: GamePhase,
    score: u64,
    shot_number: u32,
    shot_timer: f64,
    target_pos: (f64, f64),
    last_blink_time: f64,
    focus: Option<f64>,
    blink_fired: bool,
    last_shot: ShotOutcome,
}

impl<R: Rng> ZenArcher<R> {
    pub fn new(config: GameConfig, blink: BlinkConfig, rng: R) -> Self {
        let aim = AimMapper::new(config.aim);
        let shot_timer = config.shot_duration_s;
        Self {
            config,
            detector: BlinkDetector::new(blink),
            aim,
            rng,
            phase: GamePhase::WaitingForData,
            score: 0,
            shot_number: 0,
            shot_timer,
            target_pos: INITIAL_TARGET_POS,
            last_blink_time: 0.0,
            focus: None,
            blink_fired: false,
            last_shot: ShotOutcome::None,
        }
    }

    /// Start or restart a round.
    pub fn reset(&mut self, now: f64) {
        self.phase = GamePhase::Aiming;
        self.score = 0;
        self.shot_number = 0;
        self.shot_timer = self.config.shot_duration_s;
        self.target_pos = INITIAL_TARGET_POS;
        self.last_blink_time = now;
        self.focus = None;
        self.blink_fired = false;
        self.last_shot = ShotOutcome::None;
        self.aim.reset();
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_with(None)
    }

    fn snapshot_with(&self, status: Option<&'static str>) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            score: self.score,
            shot_number: self.shot_number,
            shot_timer: self.shot_timer,
            crosshair: self.aim.position(),
            target_pos: self.target_pos,
            focus: self.focus,
            // A waiting tick runs no detection, so it must not re-report a
            // blink from an earlier tick.
            blink_fired: self.blink_fired && status.is_none(),
            last_blink_time: self.last_blink_time,
            last_shot: self.last_shot,
            status,
        }
    }

    /// Advance one tick. Missing input data degrades to a waiting status
    /// without mutating any state; once the round is over, ticks only report
    /// the final score.
    pub fn tick(&mut self, input: &TickInput<'_>) -> GameSnapshot {
        match self.phase {
            GamePhase::WaitingForData => return self.snapshot_with(Some(WAITING_FOR_EEG)),
            GamePhase::GameOver => return self.snapshot(),
            GamePhase::Aiming => {}
        }
        if input.focus_powers.is_empty() {
            return self.snapshot_with(Some(WAITING_FOR_EEG));
        }
        let Some((gyro_y, gyro_z)) = input.gyro_yz else {
            return self.snapshot_with(Some(WAITING_FOR_GYRO));
        };

        self.shot_timer -= input.dt;

        let (blinked, last_blink) = self.detector.detect(
            input.frontal,
            input.sample_rate,
            self.last_blink_time,
            input.now,
        );
        self.blink_fired = blinked;
        self.last_blink_time = last_blink;

        let n = input.focus_powers.len() as f64;
        let alpha: f64 = input.focus_powers.iter().map(|p| p.alpha).sum::<f64>() / n;
        let beta: f64 = input.focus_powers.iter().map(|p| p.beta).sum::<f64>() / n;
        let focus = beta / (alpha + FOCUS_EPSILON);
        self.focus = Some(focus);

        let crosshair = self.aim.update(gyro_y, gyro_z, focus, &mut self.rng);

        self.last_shot = ShotOutcome::None;
        if blinked || self.shot_timer <= 0.0 {
            self.fire(blinked, crosshair);
        }
        self.snapshot()
    }

    fn fire(&mut self, blinked: bool, crosshair: (f64, f64)) {
        if blinked {
            let center = (
                self.target_pos.0 + TARGET_CENTER_OFFSET,
                self.target_pos.1 + TARGET_CENTER_OFFSET,
            );
            let distance = ((crosshair.0 - center.0).powi(2) + (crosshair.1 - center.1).powi(2)).sqrt();
            let points = ring_points(distance);
            if points > 0 {
                self.score += u64::from(points);
                self.last_shot = ShotOutcome::Hit(points);
            } else {
                self.last_shot = ShotOutcome::Miss;
            }
        } else {
            // Timer-expiry shots never score.
            self.last_shot = ShotOutcome::TimedOut;
        }

        self.shot_number += 1;
        if self.shot_number >= self.config.max_shots {
            self.phase = GamePhase::GameOver;
        } else {
            self.target_pos = (
                self.rng.gen_range(TARGET_POS_MIN..TARGET_POS_MAX),
                self.rng.gen_range(TARGET_POS_MIN..TARGET_POS_MAX),
            );
        }
        self.shot_timer = self.config.shot_duration_s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FS: f64 = 256.0;

    fn archer(config: GameConfig) -> ZenArcher<StdRng> {
        ZenArcher::new(config, BlinkConfig::default(), StdRng::seed_from_u64(42))
    }

    fn spiked_channel() -> Vec<f64> {
        let mut data = vec![0.0; 256];
        data[250] = 200.0;
        data
    }

    fn focused_powers() -> Vec<BandPowers> {
        vec![BandPowers {
            theta: 0.1,
            alpha: 0.001,
            beta: 100.0,
        }]
    }

    #[test]
    fn scoring_is_monotone_in_proximity() {
        assert_eq!(ring_points(20.0), 100);
        assert_eq!(ring_points(40.0), 50);
        assert_eq!(ring_points(60.0), 20);
        assert_eq!(ring_points(90.0), 0);
    }

    #[test]
    fn reset_reinitializes_the_round() {
        let mut game = archer(GameConfig::default());
        game.reset(3.0);
        let snap = game.snapshot();
        assert_eq!(snap.phase, GamePhase::Aiming);
        assert_eq!(snap.score, 0);
        assert_eq!(snap.shot_number, 0);
        assert_eq!(snap.shot_timer, 10.0);
        assert_eq!(snap.crosshair, (235.0, 235.0));
        assert_eq!(snap.last_blink_time, 3.0);
    }

    #[test]
    fn missing_eeg_reports_waiting_without_mutation() {
        let mut game = archer(GameConfig::default());
        game.reset(0.0);
        let snap = game.tick(&TickInput {
            now: 1.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &[],
            focus_powers: &[],
            gyro_yz: Some((0.0, 0.0)),
        });
        assert_eq!(snap.status, Some("Waiting for EEG data..."));
        assert_eq!(snap.shot_timer, 10.0);
        assert_eq!(snap.phase, GamePhase::Aiming);
    }

    #[test]
    fn missing_gyro_reports_waiting_without_mutation() {
        let mut game = archer(GameConfig::default());
        game.reset(0.0);
        let powers = focused_powers();
        let snap = game.tick(&TickInput {
            now: 1.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &[],
            focus_powers: &powers,
            gyro_yz: None,
        });
        assert_eq!(snap.status, Some("Waiting for Gyro data..."));
        assert_eq!(snap.shot_timer, 10.0);
    }

    #[test]
    fn blink_on_center_target_scores_the_bullseye() {
        let mut game = archer(GameConfig::default());
        game.reset(0.0);
        let af7 = spiked_channel();
        let frontal: Vec<&[f64]> = vec![&af7];
        let powers = focused_powers();
        // Initial target (175, 175) centers at (250, 250); the crosshair
        // starts at (235, 235), 21.2 px out, inside the 25 px ring. High
        // focus pins the jitter to its floor so one EMA step cannot leave
        // the ring.
        let snap = game.tick(&TickInput {
            now: 5.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &frontal,
            focus_powers: &powers,
            gyro_yz: Some((0.0, 0.0)),
        });
        assert!(snap.blink_fired);
        assert_eq!(snap.last_shot, ShotOutcome::Hit(100));
        assert_eq!(snap.score, 100);
        assert_eq!(snap.shot_number, 1);
        assert_eq!(snap.shot_timer, 10.0);
        assert_eq!(snap.last_blink_time, 5.0);
    }

    #[test]
    fn waiting_tick_does_not_carry_a_previous_blink() {
        let mut game = archer(GameConfig::default());
        game.reset(0.0);
        let af7 = spiked_channel();
        let frontal: Vec<&[f64]> = vec![&af7];
        let powers = focused_powers();
        let snap = game.tick(&TickInput {
            now: 5.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &frontal,
            focus_powers: &powers,
            gyro_yz: Some((0.0, 0.0)),
        });
        assert!(snap.blink_fired);
        assert_eq!(snap.shot_number, 1);

        // Gyro drops out on the next tick: waiting, and no stale blink.
        let snap = game.tick(&TickInput {
            now: 5.25,
            dt: 0.25,
            sample_rate: FS,
            frontal: &frontal,
            focus_powers: &powers,
            gyro_yz: None,
        });
        assert_eq!(snap.status, Some("Waiting for Gyro data..."));
        assert!(!snap.blink_fired);
        assert_eq!(snap.shot_number, 1);
        assert_eq!(snap.last_blink_time, 5.0);
    }

    #[test]
    fn timer_expiry_fires_a_scoreless_shot() {
        let mut game = archer(GameConfig {
            shot_duration_s: 0.2,
            ..GameConfig::default()
        });
        game.reset(0.0);
        let quiet = vec![0.0; 256];
        let frontal: Vec<&[f64]> = vec![&quiet];
        let powers = focused_powers();
        let snap = game.tick(&TickInput {
            now: 1.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &frontal,
            focus_powers: &powers,
            gyro_yz: Some((0.0, 0.0)),
        });
        assert_eq!(snap.last_shot, ShotOutcome::TimedOut);
        assert_eq!(snap.score, 0);
        assert_eq!(snap.shot_number, 1);
        assert!((snap.shot_timer - 0.2).abs() < 1e-12);
    }

    #[test]
    fn shot_number_never_exceeds_max_and_state_freezes() {
        let mut game = archer(GameConfig {
            max_shots: 3,
            ..GameConfig::default()
        });
        game.reset(0.0);
        let af7 = spiked_channel();
        let frontal: Vec<&[f64]> = vec![&af7];
        let powers = focused_powers();
        let mut now = 5.0;
        let mut previous_shots = 0;
        for _ in 0..6 {
            let snap = game.tick(&TickInput {
                now,
                dt: 0.25,
                sample_rate: FS,
                frontal: &frontal,
                focus_powers: &powers,
                gyro_yz: Some((0.0, 0.0)),
            });
            assert!(snap.shot_number >= previous_shots, "shot_number regressed");
            assert!(snap.shot_number <= 3);
            previous_shots = snap.shot_number;
            now += 1.0; // past the cooldown every tick
        }
        let final_snap = game.snapshot();
        assert_eq!(final_snap.phase, GamePhase::GameOver);
        assert_eq!(final_snap.shot_number, 3);

        // Frozen: further ticks with live blinks change nothing.
        let score = final_snap.score;
        let snap = game.tick(&TickInput {
            now: now + 10.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &frontal,
            focus_powers: &powers,
            gyro_yz: Some((0.0, 0.0)),
        });
        assert_eq!(snap.score, score);
        assert_eq!(snap.shot_number, 3);
        assert_eq!(snap.phase, GamePhase::GameOver);
    }

    #[test]
    fn ticks_before_reset_report_waiting() {
        let mut game = archer(GameConfig::default());
        let powers = focused_powers();
        let snap = game.tick(&TickInput {
            now: 1.0,
            dt: 0.25,
            sample_rate: FS,
            frontal: &[],
            focus_powers: &powers,
            gyro_yz: Some((0.0, 0.0)),
        });
        assert_eq!(snap.phase, GamePhase::WaitingForData);
        assert_eq!(snap.shot_number, 0);
    }
}
