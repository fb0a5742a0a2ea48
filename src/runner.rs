use anyhow::{anyhow, Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::arena::{Arena, ArenaEvent};
use crate::autopilot::Autopilot;
use crate::client::GameEvents;
use crate::config::{BotConfig, GameConstants};
use crate::supervisor::{display_name, Reconnector, RetryPolicy};
use crate::tuner::{Coefficients, LifeSummary};
use crate::util::derive_seed;
use crate::world::AgentId;

pub const LOCAL_ENDPOINT: &str = "local://arena";

#[derive(Clone, Debug)]
pub struct SeatConfig {
    pub bot: BotConfig,
    pub dual_agent: bool,
}

#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub constants: GameConstants,
    pub seats: Vec<SeatConfig>,
    pub max_frames: u64,
    pub frames_per_cell: u64,
    pub seed: u64,
    pub retry: RetryPolicy,
}

impl MatchConfig {
    /// `bot` plus `sparring` territorial opponents, moving one cell per
    /// acting tick.
    pub fn versus(bot: BotConfig, sparring: usize, constants: GameConstants, seed: u64, max_frames: u64) -> Self {
        let mut seats = vec![SeatConfig {
            bot,
            dual_agent: false,
        }];
        seats.extend((0..sparring).map(|_| SeatConfig {
            bot: BotConfig::default(),
            dual_agent: false,
        }));
        Self {
            constants,
            seats,
            max_frames,
            frames_per_cell: constants.tick_divisor,
            seed,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SeatReport {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub names: Vec<String>,
    pub lives: Vec<LifeSummary>,
    pub failed_joins: u32,
    pub final_coefficients: Coefficients,
    pub aggression: f64,
}

impl SeatReport {
    pub fn best_fitness(&self) -> f64 {
        self.lives
            .iter()
            .map(LifeSummary::fitness)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn total_kills(&self) -> u32 {
        self.lives.iter().map(|l| l.kills).sum()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchReport {
    pub seed: u64,
    pub frames: u64,
    pub seats: Vec<SeatReport>,
}

struct Seat {
    pilot: Autopilot,
    reconnector: Reconnector,
    agent: Option<AgentId>,
    names: Vec<String>,
    lives: Vec<LifeSummary>,
}

pub fn run_match(config: &MatchConfig) -> Result<MatchReport> {
    if config.max_frames == 0 {
        return Err(anyhow!("max_frames must be > 0"));
    }
    if config.seats.is_empty() {
        return Err(anyhow!("match requires at least one seat"));
    }
    config
        .constants
        .validate()
        .context("invalid game constants")?;

    let constants = config.constants;
    let mut arena = Arena::new(constants.grid_count, config.frames_per_cell, config.seed);
    let mut name_rng = ChaCha8Rng::seed_from_u64(derive_seed(config.seed, u64::MAX));
    let mut seats: Vec<Seat> = config
        .seats
        .iter()
        .enumerate()
        .map(|(idx, seat)| Seat {
            pilot: Autopilot::new(seat.bot.clone(), constants, derive_seed(config.seed, idx as u64)),
            reconnector: Reconnector::new(config.retry, seat.dual_agent, constants.fps),
            agent: None,
            names: Vec::new(),
            lives: Vec::new(),
        })
        .collect();

    for frame in 0..config.max_frames {
        for idx in 0..seats.len() {
            let seat = &mut seats[idx];
            if seat.agent.is_some() || !seat.reconnector.is_due(frame) {
                continue;
            }
            let bot = seat.pilot.config();
            let name = display_name(&bot.names, bot.display_name.as_deref(), &mut name_rng);
            if let Some(id) = seat
                .reconnector
                .attempt(&mut arena, LOCAL_ENDPOINT, &name, frame)
            {
                seat.agent = Some(id);
                seat.names.push(name);
                seat.pilot.on_set_self(id);
            }
            dispatch(&mut seats, arena.take_events(), frame);
        }

        for seat in seats.iter_mut() {
            if let Some(id) = seat.agent {
                let mut client = arena.client(id);
                seat.pilot.on_tick(frame, &mut client);
            }
        }

        arena.step();
        dispatch(&mut seats, arena.take_events(), frame);
    }

    for seat in seats.iter_mut() {
        if let Some(id) = seat.agent.take() {
            let life = seat.pilot.on_disconnect(arena.kills_of(id));
            seat.lives.push(life);
        }
    }

    Ok(MatchReport {
        seed: config.seed,
        frames: config.max_frames,
        seats: seats
            .into_iter()
            .map(|seat| SeatReport {
                bot_id: seat.pilot.config().id.clone(),
                bot_fingerprint: seat.pilot.config().fingerprint(),
                names: seat.names,
                lives: seat.lives,
                failed_joins: seat.reconnector.failures,
                final_coefficients: seat.pilot.session().coefficients,
                aggression: seat.pilot.session().aggression,
            })
            .collect(),
    })
}

fn dispatch(seats: &mut [Seat], events: Vec<ArenaEvent>, frame: u64) {
    for event in events {
        match event {
            ArenaEvent::Added { id } => {
                for seat in seats.iter_mut() {
                    seat.pilot.on_agent_added(id);
                }
            }
            ArenaEvent::Removed { id } => {
                for seat in seats.iter_mut() {
                    seat.pilot.on_agent_removed(id);
                }
            }
            ArenaEvent::Ownership {
                cell,
                before,
                after,
            } => {
                for seat in seats.iter_mut() {
                    seat.pilot.on_ownership_changed(cell, before, after);
                }
            }
            ArenaEvent::Died { id, kills, .. } => {
                if let Some(seat) = seats.iter_mut().find(|s| s.agent == Some(id)) {
                    seat.agent = None;
                    let life = seat.pilot.on_disconnect(kills);
                    seat.lives.push(life);
                    seat.reconnector.schedule_after_death(frame);
                }
            }
        }
    }
}
