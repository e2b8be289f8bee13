// src/engine.rs
//
// Runtime wiring: one producer thread drains the stream sources into the
// shared store; one consumer thread ticks on a fixed period, derives the
// per-tick artifacts, and hands immutable snapshots to the embedding layer
// over an mpsc channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Config, EngineMode};
use crate::game::{TickInput, ZenArcher};
use crate::motion::VehicleMapper;
use crate::signal::{
    apply_filters, BandPowerEstimator, BandPowers, BlinkDetector, FilterSpec, Sample,
    SampleSource, StreamKind, StreamStore, FRONTAL_CHANNELS,
};
use crate::types::{BlinkStatus, ChannelBandPowers, ChannelWaveform, ControlCommand, CoreMessage};

/// Sweep interval of the acquisition poll loop.
const POLL_SLEEP: Duration = Duration::from_millis(1);

pub type BoxedSource = Box<dyn SampleSource + Send>;

fn lock_store(store: &Mutex<StreamStore>) -> MutexGuard<'_, StreamStore> {
    // A poisoned lock only means a peer thread panicked mid-tick; the ring
    // buffers themselves never hold partial frames across a push.
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drain every pending frame from every source into the store. Returns the
/// number of frames written; source errors are logged and absorbed.
fn drain_sources(sources: &mut [(StreamKind, BoxedSource)], store: &Mutex<StreamStore>) -> usize {
    let mut written = 0;
    for (kind, source) in sources.iter_mut() {
        loop {
            match source.pull() {
                Ok(Some(frame)) => {
                    let pushed =
                        lock_store(store).push_frame(*kind, &frame.values, frame.timestamp);
                    match pushed {
                        Ok(()) => written += 1,
                        Err(e) => {
                            warn!("{} frame dropped: {e}", kind.name());
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("{} source error: {e}", kind.name());
                    break;
                }
            }
        }
    }
    written
}

/// Spawn the acquisition poll loop: non-blocking pulls, near-zero pacing
/// sleep, runs until the shutdown flag flips.
pub fn spawn_producer(
    store: Arc<Mutex<StreamStore>>,
    mut sources: Vec<(StreamKind, BoxedSource)>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            drain_sources(&mut sources, &store);
            thread::sleep(POLL_SLEEP);
        }
    })
}

/// Everything one consumer tick derives from the store.
struct TickArtifacts {
    waveforms: Vec<ChannelWaveform>,
    band_powers: Vec<ChannelBandPowers>,
    focus_powers: Vec<BandPowers>,
    frontal: Vec<Vec<f64>>,
    gyro_yz: Option<(f64, f64)>,
    eeg_rate: f64,
}

/// Snapshot the store once, then run the filter and band power paths on the
/// copies. Channels without enough data for band power are skipped, never
/// errors.
fn collect_tick(
    store: &Mutex<StreamStore>,
    config: &Config,
    spec: &FilterSpec,
    estimator: &BandPowerEstimator,
) -> TickArtifacts {
    let eeg_rate;
    let mut eeg_snaps: Vec<(&'static str, Vec<Sample>, Vec<f64>)> = Vec::new();
    let mut motion_snaps: Vec<(StreamKind, &'static str, Vec<Sample>)> = Vec::new();
    let gyro_yz;
    {
        let guard = lock_store(store);
        eeg_rate = guard.sample_rate(StreamKind::Eeg);
        for &ch in guard.channels(StreamKind::Eeg) {
            let samples = guard.snapshot(StreamKind::Eeg, ch);
            let values = samples.iter().map(|s| s.value).collect();
            eeg_snaps.push((ch, samples, values));
        }
        for kind in [StreamKind::Accelerometer, StreamKind::Gyroscope] {
            for &ch in guard.channels(kind) {
                motion_snaps.push((kind, ch, guard.snapshot(kind, ch)));
            }
        }
        gyro_yz = guard
            .last(StreamKind::Gyroscope, "Y")
            .zip(guard.last(StreamKind::Gyroscope, "Z"))
            .map(|(y, z)| (y.value, z.value));
    }

    let mut waveforms = Vec::with_capacity(eeg_snaps.len() + motion_snaps.len());
    let mut band_powers = Vec::new();
    for &(ch, ref samples, ref values) in &eeg_snaps {
        let filtered = apply_filters(values, eeg_rate, spec, &config.filters);
        let resampled = samples
            .iter()
            .zip(filtered)
            .map(|(s, value)| Sample {
                timestamp: s.timestamp,
                value,
            })
            .collect();
        waveforms.push(ChannelWaveform {
            stream: StreamKind::Eeg,
            channel: ch,
            samples: resampled,
        });

        match estimator.estimate(values, eeg_rate) {
            Ok(powers) => band_powers.push(ChannelBandPowers { channel: ch, powers }),
            Err(e) => debug!("band power skipped on {ch}: {e}"),
        }
    }
    for (kind, ch, samples) in motion_snaps {
        waveforms.push(ChannelWaveform {
            stream: kind,
            channel: ch,
            samples,
        });
    }

    let focus_powers = band_powers
        .iter()
        .filter(|c| FRONTAL_CHANNELS.contains(&c.channel))
        .map(|c| c.powers)
        .collect();
    let frontal = FRONTAL_CHANNELS
        .iter()
        .filter_map(|name| {
            eeg_snaps
                .iter()
                .find(|(ch, ..)| ch == name)
                .map(|(_, _, values)| values.clone())
        })
        .collect();

    TickArtifacts {
        waveforms,
        band_powers,
        focus_powers,
        frontal,
        gyro_yz,
        eeg_rate,
    }
}

/// Spawn the consumer loop for the configured mode.
pub fn spawn(
    config: Config,
    store: Arc<Mutex<StreamStore>>,
    tx: Sender<CoreMessage>,
    rx_cmd: Receiver<ControlCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || match config.mode {
        EngineMode::ZenArcher => run_dashboard(config, store, tx, rx_cmd),
        EngineMode::Vehicle => run_vehicle(config, store, tx, rx_cmd),
    })
}

fn run_dashboard(
    config: Config,
    store: Arc<Mutex<StreamStore>>,
    tx: Sender<CoreMessage>,
    rx_cmd: Receiver<ControlCommand>,
) {
    let clock = Instant::now();
    let tick = Duration::from_millis(config.tick_interval_ms);
    let dt = tick.as_secs_f64();
    let estimator = BandPowerEstimator::new(&config.filters);
    let mut game = ZenArcher::new(config.game.clone(), config.blink, StdRng::from_entropy());
    let mut game_started = false;
    let idle_detector = BlinkDetector::new(config.blink);
    let mut idle_last_blink = 0.0_f64;
    let mut filter_spec = FilterSpec::standard();
    let mut next_tick = Instant::now() + tick;

    let _ = tx.send(CoreMessage::Log("core engine ready".to_owned()));

    loop {
        loop {
            match rx_cmd.try_recv() {
                Ok(ControlCommand::StartGame) => {
                    game.reset(clock.elapsed().as_secs_f64());
                    game_started = true;
                    let _ = tx.send(CoreMessage::Log("zen archer round started".to_owned()));
                }
                Ok(ControlCommand::SetFilterSpec(spec)) => filter_spec = spec,
                Ok(ControlCommand::Shutdown) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }

        // Fixed-period pacing on the monotonic clock; a late tick is simply
        // absorbed by the next one.
        let before = Instant::now();
        if before < next_tick {
            thread::sleep(next_tick - before);
        }
        next_tick += tick;
        let now = clock.elapsed().as_secs_f64();

        let artifacts = collect_tick(&store, &config, &filter_spec, &estimator);

        if game_started {
            let frontal: Vec<&[f64]> = artifacts.frontal.iter().map(Vec::as_slice).collect();
            let snap = game.tick(&TickInput {
                now,
                dt,
                sample_rate: artifacts.eeg_rate,
                frontal: &frontal,
                focus_powers: &artifacts.focus_powers,
                gyro_yz: artifacts.gyro_yz,
            });
            let _ = tx.send(CoreMessage::Blink(BlinkStatus {
                fired: snap.blink_fired,
                last_blink_time: snap.last_blink_time,
            }));
            let _ = tx.send(CoreMessage::Game(snap));
        } else {
            let frontal: Vec<&[f64]> = artifacts.frontal.iter().map(Vec::as_slice).collect();
            let (fired, last) =
                idle_detector.detect(&frontal, artifacts.eeg_rate, idle_last_blink, now);
            idle_last_blink = last;
            let _ = tx.send(CoreMessage::Blink(BlinkStatus {
                fired,
                last_blink_time: last,
            }));
        }

        if tx.send(CoreMessage::Waveforms(artifacts.waveforms)).is_err() {
            return; // embedding layer went away
        }
        let _ = tx.send(CoreMessage::BandPower(artifacts.band_powers));
    }
}

fn run_vehicle(
    config: Config,
    store: Arc<Mutex<StreamStore>>,
    tx: Sender<CoreMessage>,
    rx_cmd: Receiver<ControlCommand>,
) {
    let tick = Duration::from_secs_f64(1.0 / config.vehicle_rate_hz);
    let mut mapper = VehicleMapper::new(config.vehicle);
    let mut next_tick = Instant::now() + tick;
    let mut was_waiting = false;

    loop {
        match rx_cmd.try_recv() {
            Ok(ControlCommand::Shutdown) | Err(TryRecvError::Disconnected) => return,
            Ok(_) | Err(TryRecvError::Empty) => {}
        }

        let before = Instant::now();
        if before < next_tick {
            thread::sleep(next_tick - before);
        }
        next_tick += tick;

        let reading = {
            let guard = lock_store(&store);
            guard
                .last(StreamKind::Gyroscope, "X")
                .zip(guard.last(StreamKind::Gyroscope, "Y"))
        };
        match reading {
            Some((x, y)) => {
                was_waiting = false;
                let action = mapper.map(x.value, y.value);
                if tx.send(CoreMessage::Vehicle(action)).is_err() {
                    return;
                }
            }
            None => {
                // Report the gap once instead of flooding the channel.
                if !was_waiting {
                    was_waiting = true;
                    let _ = tx.send(CoreMessage::Waiting("Gyroscope"));
                }
            }
        }
    }
}
