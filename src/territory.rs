use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::claim::{generate_legs, ClaimPlan};
use crate::config::GameConstants;
use crate::tuner::Coefficients;
use crate::weighting::CooperationRule;
use crate::world::{Heading, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    InTerritory,
    Claiming,
    OutsideCaution,
}

/// Fraction of the grid area below which the bot keeps drawing claim loops.
/// Redrawn every tick: `(base + spread * r) * area`.
pub fn claim_threshold<R: Rng + ?Sized>(base: f64, spread: f64, area: f64, rng: &mut R) -> f64 {
    (base + spread * rng.gen::<f64>()) * area
}

pub fn select_mode(on_own_land: bool, portion: i64, threshold: f64) -> Mode {
    if on_own_land {
        Mode::InTerritory
    } else if (portion as f64) < threshold {
        Mode::Claiming
    } else {
        Mode::OutsideCaution
    }
}

/// Per-mode knobs for the ray-march.
///
/// Every ray starts at `baseline` (`forward` for the current heading) and
/// walks `1..ray_steps` cells outward. Terms with a zero factor are inert.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeWeights {
    pub baseline: f64,
    pub forward: f64,
    /// Subtracted for every ray cell not owned by the bot.
    pub outside_penalty: f64,
    /// Subtracted for every ray step past the border after the first.
    pub out_of_bounds_penalty: f64,
    /// Own tail at step `s > 1` costs `own_tail_reach - s`; at step 1 it vetoes.
    /// Zero disables the term.
    pub own_tail_reach: f64,
    pub home_bonus_base: f64,
    pub home_bonus_slope: f64,
    /// Opponent tail at step `s` earns `factor * (opponent_reach - s)`, scaled
    /// down for cooperating opponents.
    pub opponent_reach: f64,
    pub strong_opponent_factor: f64,
}

impl ModeWeights {
    pub fn in_territory() -> Self {
        Self {
            baseline: 25.0,
            forward: 100.0,
            outside_penalty: 1.0,
            out_of_bounds_penalty: 1.0,
            own_tail_reach: 0.0,
            home_bonus_base: 0.0,
            home_bonus_slope: 0.0,
            opponent_reach: 30.0,
            strong_opponent_factor: 30.0,
        }
    }

    pub fn caution() -> Self {
        Self {
            baseline: 5.0,
            forward: 50.0,
            outside_penalty: 0.0,
            out_of_bounds_penalty: 1.0,
            own_tail_reach: 50.0,
            home_bonus_base: 10.0,
            home_bonus_slope: 1.0,
            opponent_reach: 30.0,
            strong_opponent_factor: 30.0,
        }
    }

    fn start(&self, heading: Heading, current: Heading) -> f64 {
        if heading == current {
            self.forward
        } else {
            self.baseline
        }
    }
}

/// Scores each heading by walking a straight ray out from the bot.
///
/// The reverse heading, a first step off the grid and a first step onto the
/// bot's own tail are hard vetoes (`-inf`).
pub fn ray_march(
    snapshot: &Snapshot<'_>,
    weights: &ModeWeights,
    constants: &GameConstants,
    coop: &CooperationRule<'_>,
) -> [f64; 4] {
    let origin = snapshot.me.cell;
    let current = snapshot.me.heading;
    let mut scores = [f64::NEG_INFINITY; 4];

    for heading in Heading::ALL {
        if heading == current.reverse() {
            continue;
        }
        let mut score = weights.start(heading, current);
        for step in 1..constants.ray_steps {
            let cell = origin.step(heading, step);
            if !cell.in_bounds(constants.grid_count) {
                if step == 1 {
                    score = f64::NEG_INFINITY;
                    break;
                }
                score -= weights.out_of_bounds_penalty;
                continue;
            }

            let s = step as f64;
            let home = snapshot.owns(cell);
            if !home {
                score -= weights.outside_penalty;
            }
            if weights.own_tail_reach > 0.0 && snapshot.me.tail.hits(cell) {
                if step == 1 {
                    score = f64::NEG_INFINITY;
                    break;
                }
                score -= weights.own_tail_reach - s;
            }
            if home {
                score += weights.home_bonus_base + weights.home_bonus_slope * s;
            }
            let tail = coop.tail_strength(snapshot, cell);
            if tail > 0.0 {
                score += tail * weights.strong_opponent_factor * (weights.opponent_reach - s);
            }
        }
        scores[heading.index()] = score;
    }
    scores
}

/// `ray + blend * features`, element-wise.
pub fn blend_scores(ray: &[f64; 4], features: &[f64; 4], blend: f64) -> [f64; 4] {
    let mut out = *ray;
    if blend == 0.0 {
        return out;
    }
    for (slot, feature) in out.iter_mut().zip(features) {
        *slot += blend * feature;
    }
    out
}

/// Pops the next claim step, drawing a fresh four-leg loop when the plan is dry.
pub fn next_claim_step<R: Rng + ?Sized>(
    plan: &mut ClaimPlan,
    heading: Heading,
    coefficients: &Coefficients,
    max_leg: u32,
    rng: &mut R,
) -> Heading {
    if plan.is_empty() {
        let legs = generate_legs(heading, coefficients, max_leg, rng);
        plan.refill(&legs);
        tracing::debug!(steps = plan.len(), ?legs, "claim plan drawn");
    }
    plan.pop().unwrap_or(heading)
}
