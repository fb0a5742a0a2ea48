use crate::config::GameConstants;
use crate::tuner::Coefficients;
use crate::world::{Cell, Snapshot};

/// Marks opponents whose tails we go easy on.
#[derive(Clone, Copy, Debug)]
pub struct CooperationRule<'a> {
    pub marker: &'a str,
    pub discount: f64,
}

impl<'a> CooperationRule<'a> {
    pub fn is_cooperating(&self, name: &str) -> bool {
        !self.marker.is_empty() && name.contains(self.marker)
    }

    /// `1.0` when any non-cooperating opponent's tail covers `cell`, the
    /// discount when only cooperating ones do, `0.0` otherwise.
    pub fn tail_strength(&self, snapshot: &Snapshot<'_>, cell: Cell) -> f64 {
        let mut strength: f64 = 0.0;
        for other in snapshot.opponents_on_tail(cell) {
            if self.is_cooperating(&other.name) {
                strength = strength.max(self.discount);
            } else {
                return 1.0;
            }
        }
        strength
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    Land,
    OwnTail,
    OpponentTail,
    Opponent,
    Edge,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Land,
        Feature::OwnTail,
        Feature::OpponentTail,
        Feature::Opponent,
        Feature::Edge,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// How strongly `cell` exhibits this feature, in `[0, 1]`.
    pub fn strength(self, snapshot: &Snapshot<'_>, cell: Cell, coop: &CooperationRule<'_>) -> f64 {
        let hit = match self {
            Feature::Land => snapshot.owns(cell),
            Feature::OwnTail => snapshot.me.tail.hits(cell),
            Feature::OpponentTail => return coop.tail_strength(snapshot, cell),
            Feature::Opponent => snapshot.opponent_at(cell),
            Feature::Edge => {
                let last = snapshot.grid.size() - 2;
                cell.row <= 1 || cell.col <= 1 || cell.row >= last || cell.col >= last
            }
        };
        if hit {
            1.0
        } else {
            0.0
        }
    }

    pub fn coefficient(self, coefficients: &Coefficients, aggression: f64) -> f64 {
        match self {
            Feature::Land => coefficients.land(),
            Feature::OwnTail => coefficients.own_tail(),
            Feature::OpponentTail => aggression * coefficients.opponent_tail(),
            Feature::Opponent => (1.0 - aggression) * coefficients.opponent(),
            Feature::Edge => coefficients.edge(),
        }
    }
}

/// Per-feature accumulated distance weight.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureTally(pub [f64; 5]);

impl FeatureTally {
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn score(&self, coefficients: &Coefficients, aggression: f64) -> f64 {
        Feature::ALL
            .iter()
            .map(|f| self.get(*f) * f.coefficient(coefficients, aggression))
            .sum()
    }
}

pub fn distance_weight(distance: i32, threshold: f64) -> f64 {
    (threshold - distance as f64) / (distance as f64 + 1.0)
}

pub fn tally_neighbourhood(
    snapshot: &Snapshot<'_>,
    constants: &GameConstants,
    coop: &CooperationRule<'_>,
) -> FeatureTally {
    let origin = snapshot.me.cell;
    let radius = constants.search_radius;
    let mut tally = FeatureTally::default();
    for d_row in -radius..=radius {
        for d_col in -radius..=radius {
            let cell = Cell::new(origin.row + d_row, origin.col + d_col);
            if !cell.in_bounds(constants.grid_count) {
                continue;
            }
            let weight = distance_weight(origin.chebyshev(cell), constants.decay_threshold);
            for feature in Feature::ALL {
                let strength = feature.strength(snapshot, cell, coop);
                if strength > 0.0 {
                    tally.0[feature.index()] += weight * strength;
                }
            }
        }
    }
    tally
}

/// One score per heading index. The reverse heading is not searched; it gets
/// the lowest of the three computed scores.
pub fn direction_scores(
    snapshot: &Snapshot<'_>,
    constants: &GameConstants,
    coefficients: &Coefficients,
    aggression: f64,
    coop: &CooperationRule<'_>,
) -> [f64; 4] {
    // The scan is centred on the bot for every candidate, so one tally serves all three.
    let tally = tally_neighbourhood(snapshot, constants, coop);
    let current = snapshot.me.heading;
    let mut scores = [0.0; 4];
    let mut low = f64::INFINITY;
    for heading in current.candidates() {
        let score = tally.score(coefficients, aggression);
        scores[heading.index()] = score;
        low = low.min(score);
    }
    scores[current.reverse().index()] = low;
    scores
}
