#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic enemy wave injection system.
//!
//! The system listens for [`Event::WaveStarted`], resolves the composition
//! configured for that wave and scatters its units over the lanes using an RNG
//! seeded from the schedule seed and the wave number. Every unit becomes a
//! [`Command::QueueEnemyUnit`] for the world to execute.

use lane_defence_core::{Command, Event, LaneId, UnitKind, WaveEntry, WaveSchedule};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Pure system that turns wave starts into enemy queue commands.
#[derive(Debug)]
pub struct WaveSpawner {
    schedule: WaveSchedule,
    lanes: u32,
    last_wave: u32,
}

impl WaveSpawner {
    /// Creates a spawner for the schedule spreading units over `lanes` lanes.
    #[must_use]
    pub fn new(schedule: WaveSchedule, lanes: u32) -> Self {
        Self {
            schedule,
            lanes: lanes.max(1),
            last_wave: 0,
        }
    }

    /// Consumes world events and emits the commands queueing each wave.
    ///
    /// A wave is injected at most once; a restart makes every wave eligible again.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::GameRestarted => self.last_wave = 0,
                Event::WaveStarted { wave } if *wave > self.last_wave => {
                    self.last_wave = *wave;
                    self.inject(*wave, out);
                }
                _ => {}
            }
        }
    }

    /// Unit batches of the wave after growth is applied.
    #[must_use]
    pub fn composition(&self, wave: u32) -> Vec<WaveEntry> {
        let compositions = &self.schedule.compositions;
        let Some(last) = compositions.len().checked_sub(1) else {
            return Vec::new();
        };
        let index = usize::try_from(wave.saturating_sub(1))
            .unwrap_or(usize::MAX)
            .min(last);
        let table_len = u32::try_from(compositions.len()).unwrap_or(u32::MAX);
        let extra = self
            .schedule
            .growth
            .saturating_mul(wave.saturating_sub(table_len));

        compositions[index]
            .entries
            .iter()
            .map(|entry| WaveEntry {
                kind: entry.kind,
                count: entry.count.saturating_add(extra),
            })
            .collect()
    }

    fn inject(&self, wave: u32, out: &mut Vec<Command>) {
        let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(self.schedule.seed, wave));
        let mut queued = 0u32;
        for entry in self.composition(wave) {
            for _ in 0..entry.count {
                out.push(queue(&mut rng, self.lanes, entry.kind));
                queued = queued.saturating_add(1);
            }
        }
        tracing::info!(wave, units = queued, "wave injected");
    }
}

fn queue(rng: &mut ChaCha8Rng, lanes: u32, kind: UnitKind) -> Command {
    Command::QueueEnemyUnit {
        lane: LaneId::new(rng.gen_range(0..lanes)),
        kind,
    }
}

fn derive_wave_seed(seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
