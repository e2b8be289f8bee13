// src/main.rs
mod config;
mod engine;
mod game;
mod motion;
mod signal;
mod types;

use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc, Mutex};

use anyhow::Result;
use log::{debug, info};

use crate::config::Config;
use crate::engine::BoxedSource;
use crate::signal::{Band, SineSource, SpikeProfile, StreamKind, StreamStore};
use crate::types::{ControlCommand, CoreMessage};

/// Simulated stand-ins for the LSL inlets: an alpha-dominant EEG carrier
/// with periodic frontal spikes (so the blink path fires), plus gentle
/// motion oscillations. A real deployment swaps these for hardware-backed
/// `SampleSource` impls.
fn simulated_sources(config: &Config) -> Vec<(StreamKind, BoxedSource)> {
    let eeg = SineSource::new(
        config.eeg_sample_rate,
        vec![10.0, 10.0, 11.0, 9.0],
        20.0,
    )
    .with_spikes(SpikeProfile {
        period_s: 4.0,
        width_s: 0.05,
        amplitude: 200.0,
        channels: vec![1, 2], // AF7, AF8
    });
    let accel = SineSource::new(config.motion_sample_rate, vec![0.4, 0.5, 0.6], 1.0);
    let gyro = SineSource::new(config.motion_sample_rate, vec![0.2, 0.3, 0.25], 15.0);
    vec![
        (StreamKind::Eeg, Box::new(eeg) as BoxedSource),
        (StreamKind::Accelerometer, Box::new(accel) as BoxedSource),
        (StreamKind::Gyroscope, Box::new(gyro) as BoxedSource),
    ]
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load(std::env::args().nth(1).as_deref())?;
    info!("mindlink core starting in {:?} mode", config.mode);

    let store = Arc::new(Mutex::new(StreamStore::new(
        config.buffer_seconds,
        config.eeg_sample_rate,
        config.motion_sample_rate,
    )?));
    let shutdown = Arc::new(AtomicBool::new(false));
    let _producer = engine::spawn_producer(store.clone(), simulated_sources(&config), shutdown);

    let (tx, rx) = mpsc::channel();
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let max_shots = config.game.max_shots;
    let _engine = engine::spawn(config, store, tx, rx_cmd);

    tx_cmd.send(ControlCommand::StartGame).ok();

    // Headless presentation: log the per-tick snapshots. A dashboard or
    // actuator would consume the same channel.
    for message in rx {
        match message {
            CoreMessage::Log(line) => info!("{line}"),
            CoreMessage::Game(snap) => {
                if let Some(status) = snap.status {
                    info!("{status}");
                } else {
                    info!(
                        "score {} | shot {}/{} | timer {:.1}s | focus {:.2} | {:?}",
                        snap.score,
                        snap.shot_number,
                        max_shots,
                        snap.shot_timer,
                        snap.focus.unwrap_or(0.0),
                        snap.last_shot,
                    );
                }
            }
            CoreMessage::Vehicle(action) => info!(
                "steer {:+.2} gas {:.2} brake {:.2}",
                action.steer, action.gas, action.brake
            ),
            CoreMessage::Blink(status) if status.fired => {
                info!("blink at {:.2}s", status.last_blink_time)
            }
            CoreMessage::Waiting(stream) => info!("waiting for {stream} data"),
            CoreMessage::BandPower(channels) => {
                for entry in &channels {
                    let line = Band::ALL
                        .iter()
                        .map(|&band| format!("{} {:.1}", band.name(), entry.powers.get(band)))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    debug!("band power {}: {line}", entry.channel);
                }
            }
            _ => {}
        }
    }
    Ok(())
}
