use rand::Rng;
use serde::{Deserialize, Serialize};

pub const COEFFICIENT_COUNT: usize = 7;
pub const MAX_MUTATION_STRENGTH: f64 = 10.0;
pub const KILL_FITNESS: f64 = 50.0;
pub const SURVIVAL_FRAMES_PER_POINT: f64 = 100.0;

/// `[land, own_tail, opponent_tail, opponent, edge, claim_breadth, claim_spread]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients(pub [f64; COEFFICIENT_COUNT]);

impl Default for Coefficients {
    fn default() -> Self {
        Self([0.6164, -2.5194, 0.9199, -1.2159, -3.0729, 5.0, 4.0])
    }
}

impl Coefficients {
    pub fn land(&self) -> f64 {
        self.0[0]
    }

    pub fn own_tail(&self) -> f64 {
        self.0[1]
    }

    pub fn opponent_tail(&self) -> f64 {
        self.0[2]
    }

    pub fn opponent(&self) -> f64 {
        self.0[3]
    }

    pub fn edge(&self) -> f64 {
        self.0[4]
    }

    pub fn claim_breadth(&self) -> f64 {
        self.0[5]
    }

    pub fn claim_spread(&self) -> f64 {
        self.0[6]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeSummary {
    /// Cells owned when the life ended.
    pub portion: i64,
    pub kills: u32,
    pub survival_frames: u64,
}

impl LifeSummary {
    pub fn fitness(&self) -> f64 {
        self.portion as f64
            + self.kills as f64 * KILL_FITNESS
            + self.survival_frames as f64 / SURVIVAL_FRAMES_PER_POINT
    }
}

pub fn mutation_strength(fitness: f64) -> f64 {
    if fitness.is_nan() {
        return MAX_MUTATION_STRENGTH;
    }
    2f64.powf(fitness).min(MAX_MUTATION_STRENGTH)
}

#[derive(Clone, Debug, Serialize)]
pub struct MutationReport {
    pub fitness: f64,
    pub strength: f64,
    pub deltas: [f64; COEFFICIENT_COUNT],
}

/// Perturbs every coefficient by `uniform(-1, 1) * strength`.
pub fn mutate<R: Rng + ?Sized>(
    coefficients: &mut Coefficients,
    life: &LifeSummary,
    rng: &mut R,
) -> MutationReport {
    let fitness = life.fitness();
    let strength = mutation_strength(fitness);
    let mut deltas = [0.0; COEFFICIENT_COUNT];
    for (coefficient, delta) in coefficients.0.iter_mut().zip(deltas.iter_mut()) {
        *delta = rng.gen_range(-1.0..1.0) * strength;
        *coefficient += *delta;
    }
    MutationReport {
        fitness,
        strength,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fitness_blends_land_kills_and_survival() {
        let life = LifeSummary {
            portion: 120,
            kills: 2,
            survival_frames: 4_500,
        };
        assert_eq!(life.fitness(), 120.0 + 100.0 + 45.0);
    }

    #[test]
    fn empty_life_mutates_by_at_most_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let before = Coefficients::default();
        let mut after = before;
        let report = mutate(&mut after, &LifeSummary::default(), &mut rng);

        assert_eq!(report.fitness, 0.0);
        assert_eq!(report.strength, 1.0);
        for (old, new) in before.0.iter().zip(after.0.iter()) {
            assert!((new - old).abs() <= 1.0, "old={old} new={new}");
        }
    }

    #[test]
    fn strength_saturates_at_ten() {
        assert_eq!(mutation_strength(3.0), 8.0);
        assert_eq!(mutation_strength(4.0), MAX_MUTATION_STRENGTH);
        assert_eq!(mutation_strength(1e9), MAX_MUTATION_STRENGTH);
        assert!(mutation_strength(-3.0) < 1.0);

        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let champion = LifeSummary {
            portion: 9_000,
            kills: 40,
            survival_frames: 1_000_000,
        };
        for _ in 0..200 {
            let mut coefficients = Coefficients::default();
            let report = mutate(&mut coefficients, &champion, &mut rng);
            assert!(report.deltas.iter().all(|d| d.abs() <= MAX_MUTATION_STRENGTH));
        }
    }
}
