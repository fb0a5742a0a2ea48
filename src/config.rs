use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::supervisor::NamePool;
use crate::territory::ModeWeights;
use crate::tuner::Coefficients;

pub const DEFAULT_GRID_COUNT: i32 = 100;
pub const DEFAULT_TICK_DIVISOR: u64 = 6;
pub const DEFAULT_SEARCH_RADIUS: i32 = 10;
pub const DEFAULT_DECAY_THRESHOLD: f64 = 10.0;
pub const DEFAULT_RAY_STEPS: i32 = 20;
pub const DEFAULT_FPS: u64 = 30;

pub const PRESET_IDS: [&str; 3] = ["territorial", "feature", "hunter"];

/// Read-only game geometry and cadence shared by every component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConstants {
    pub grid_count: i32,
    /// The engine acts on every `tick_divisor`-th frame.
    pub tick_divisor: u64,
    pub search_radius: i32,
    pub decay_threshold: f64,
    pub ray_steps: i32,
    pub fps: u64,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            grid_count: DEFAULT_GRID_COUNT,
            tick_divisor: DEFAULT_TICK_DIVISOR,
            search_radius: DEFAULT_SEARCH_RADIUS,
            decay_threshold: DEFAULT_DECAY_THRESHOLD,
            ray_steps: DEFAULT_RAY_STEPS,
            fps: DEFAULT_FPS,
        }
    }
}

impl GameConstants {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let constants = Self {
            grid_count: read_env_i32("AUTOPILOT_GRID_COUNT", defaults.grid_count),
            tick_divisor: read_env_u64("AUTOPILOT_TICK_DIVISOR", defaults.tick_divisor),
            search_radius: read_env_i32("AUTOPILOT_SEARCH_RADIUS", defaults.search_radius),
            decay_threshold: defaults.decay_threshold,
            ray_steps: read_env_i32("AUTOPILOT_RAY_STEPS", defaults.ray_steps),
            fps: read_env_u64("AUTOPILOT_FPS", defaults.fps),
        };
        if let Err(err) = constants.validate() {
            tracing::warn!("{err}. Falling back to default game constants.");
            return defaults;
        }
        constants
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        // The arena needs room for a 3x3 spawn block away from the border.
        if self.grid_count < 5 {
            return Err(EngineError::InvalidConstant {
                field: "grid_count",
                value: self.grid_count as i64,
            });
        }
        if self.tick_divisor == 0 {
            return Err(EngineError::InvalidConstant {
                field: "tick_divisor",
                value: 0,
            });
        }
        if self.search_radius < 0 {
            return Err(EngineError::InvalidConstant {
                field: "search_radius",
                value: self.search_radius as i64,
            });
        }
        if self.ray_steps < 2 {
            return Err(EngineError::InvalidConstant {
                field: "ray_steps",
                value: self.ray_steps as i64,
            });
        }
        if self.fps == 0 {
            return Err(EngineError::InvalidConstant {
                field: "fps",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn area(&self) -> f64 {
        (self.grid_count as f64) * (self.grid_count as f64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Three-mode state machine with claim loops.
    Territorial,
    /// Feature-weighted neighbourhood scoring on every acting tick.
    FeatureWeighted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    pub id: String,
    pub description: String,
    pub policy: Policy,
    pub coefficients: Coefficients,
    /// Fixed aggression in `[0, 1]`; drawn at random once per session when absent.
    #[serde(default)]
    pub aggression: Option<f64>,
    pub claim_threshold_base: f64,
    pub claim_threshold_spread: f64,
    /// Scale applied to the weighting-engine scores inside the ray-march modes.
    pub feature_blend: f64,
    pub cooperative_marker: String,
    pub cooperative_discount: f64,
    pub in_territory: ModeWeights,
    pub caution: ModeWeights,
    #[serde(default)]
    pub names: NamePool,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            id: "territorial".to_string(),
            description: "Claim loops while small, ray-marched homing and hunting once grown."
                .to_string(),
            policy: Policy::Territorial,
            coefficients: Coefficients::default(),
            aggression: None,
            claim_threshold_base: 0.05,
            claim_threshold_spread: 0.1,
            feature_blend: 0.05,
            cooperative_marker: "PAPER".to_string(),
            cooperative_discount: 0.1,
            in_territory: ModeWeights::in_territory(),
            caution: ModeWeights::caution(),
            names: NamePool::default(),
            display_name: None,
        }
    }
}

impl BotConfig {
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "territorial" => Some(Self::default()),
            "feature" => Some(Self {
                id: "feature".to_string(),
                description: "Pure neighbourhood feature scoring with self-tuned coefficients."
                    .to_string(),
                policy: Policy::FeatureWeighted,
                ..Self::default()
            }),
            "hunter" => Some(Self {
                id: "hunter".to_string(),
                description: "Territorial bot that commits hard to opponent tails.".to_string(),
                aggression: Some(0.9),
                claim_threshold_base: 0.03,
                claim_threshold_spread: 0.05,
                feature_blend: 0.15,
                in_territory: ModeWeights {
                    strong_opponent_factor: 45.0,
                    ..ModeWeights::in_territory()
                },
                caution: ModeWeights {
                    strong_opponent_factor: 45.0,
                    ..ModeWeights::caution()
                },
                ..Self::default()
            }),
            _ => None,
        }
    }

    pub fn resolve(name: &str) -> Result<Self, EngineError> {
        Self::preset(name).ok_or_else(|| EngineError::UnknownPreset {
            name: name.to_string(),
        })
    }

    /// Stable identity of the full configuration, used to tell tuned variants apart.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(encoded) => format!("crc32:{:08x}:len:{}", crc32(&encoded), encoded.len()),
            Err(_) => "unknown".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("failed reading config {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("failed parsing config {}", path.display()))
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

pub(crate) fn read_env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
