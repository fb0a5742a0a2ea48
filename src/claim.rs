use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;

use crate::tuner::Coefficients;
use crate::world::Heading;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimLeg {
    pub heading: Heading,
    pub steps: u32,
}

/// Four legs turning the same way each time: `dir, dir+t, dir+2t, dir+3t`.
///
/// The first and third legs share the breadth (the third runs one or two
/// cells longer to start closing the loop); the second and fourth share the
/// spread. Every leg is clamped to `1..=max_leg`.
pub fn generate_legs<R: Rng + ?Sized>(
    heading: Heading,
    coefficients: &Coefficients,
    max_leg: u32,
    rng: &mut R,
) -> [ClaimLeg; 4] {
    let max_leg = max_leg.max(1);
    let breadth = random_extent(coefficients.claim_breadth(), rng);
    let spread = random_extent(coefficients.claim_spread(), rng);
    let extra = rng.gen_range(1..=2);
    let turn = if rng.gen::<bool>() { 1 } else { -1 };

    let lengths = [breadth, spread, breadth.saturating_add(extra), spread];
    let mut legs = [ClaimLeg { heading, steps: 1 }; 4];
    for (i, leg) in legs.iter_mut().enumerate() {
        leg.heading = heading.turned(turn * i as i32);
        leg.steps = lengths[i].clamp(1, max_leg as i64) as u32;
    }
    legs
}

/// `floor(r * scale) + 1`. Mutation may drive `scale` negative or non-finite.
fn random_extent<R: Rng + ?Sized>(scale: f64, rng: &mut R) -> i64 {
    let draw = (rng.gen::<f64>() * scale).floor();
    if draw.is_finite() {
        (draw as i64).saturating_add(1)
    } else {
        1
    }
}

/// Consumable queue of single-step headings.
#[derive(Clone, Debug, Default)]
pub struct ClaimPlan {
    queue: VecDeque<Heading>,
}

impl ClaimPlan {
    pub fn refill(&mut self, legs: &[ClaimLeg]) {
        self.queue.clear();
        for leg in legs {
            self.queue
                .extend(std::iter::repeat(leg.heading).take(leg.steps as usize));
        }
    }

    pub fn pop(&mut self) -> Option<Heading> {
        self.queue.pop_front()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn plan_length_matches_leg_sum() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xDEAD_BEEF);
        for _ in 0..500 {
            let legs = generate_legs(Heading::Right, &Coefficients::default(), 100, &mut rng);
            let mut plan = ClaimPlan::default();
            plan.refill(&legs);
            let expected: u32 = legs.iter().map(|leg| leg.steps).sum();
            assert!(legs.iter().all(|leg| leg.steps >= 1));
            assert_eq!(plan.len(), expected as usize);
        }
    }

    #[test]
    fn legs_cycle_through_all_four_headings() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            let legs = generate_legs(Heading::Right, &Coefficients::default(), 100, &mut rng);
            assert_eq!(legs[0].heading, Heading::Right);
            let mut seen: Vec<Heading> = legs.iter().map(|leg| leg.heading).collect();
            seen.sort_by_key(|h| h.index());
            seen.dedup();
            assert_eq!(seen.len(), 4);
            let turn = if legs[1].heading == Heading::Down { 1 } else { -1 };
            for (i, leg) in legs.iter().enumerate() {
                assert_eq!(leg.heading, Heading::Right.turned(turn * i as i32));
            }
        }
    }

    #[test]
    fn third_leg_outruns_first_and_even_legs_pair() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..200 {
            let legs = generate_legs(Heading::Up, &Coefficients::default(), 100, &mut rng);
            assert!(legs[2].steps > legs[0].steps);
            assert!(legs[2].steps <= legs[0].steps + 2);
            assert_eq!(legs[1].steps, legs[3].steps);
        }
    }

    #[test]
    fn degenerate_coefficients_still_yield_steps() {
        let mut broken = Coefficients::default();
        broken.0[5] = -40.0;
        broken.0[6] = f64::NAN;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let legs = generate_legs(Heading::Left, &broken, 100, &mut rng);
        assert!(legs.iter().all(|leg| leg.steps >= 1));

        broken.0[5] = 1e12;
        for _ in 0..50 {
            let legs = generate_legs(Heading::Left, &broken, 50, &mut rng);
            assert!(legs.iter().all(|leg| (1..=50).contains(&leg.steps)));
        }
    }

    #[test]
    fn huge_breadth_saturates_at_the_longest_leg() {
        let mut huge = Coefficients::default();
        huge.0[5] = 1e30;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let legs = generate_legs(Heading::Up, &huge, 100, &mut rng);
            assert!(legs.iter().all(|leg| (1..=100).contains(&leg.steps)));
            assert_eq!(legs[0].steps, 100);
            assert_eq!(legs[2].steps, 100);
        }

        huge.0[5] = f64::MAX;
        huge.0[6] = -f64::MAX;
        let legs = generate_legs(Heading::Up, &huge, 100, &mut rng);
        assert_eq!(legs[1].steps, 1);
        assert_eq!(legs[2].steps, 100);
    }

    #[test]
    fn zero_draws_give_minimal_counter_clockwise_hook() {
        // A zero draw floors both extents to one, adds one extra step and turns -1.
        let mut rng = StepRng::new(0, 0);
        let legs = generate_legs(Heading::Up, &Coefficients::default(), 100, &mut rng);
        let steps: Vec<u32> = legs.iter().map(|leg| leg.steps).collect();
        assert_eq!(steps, vec![1, 1, 2, 1]);
        assert_eq!(legs[1].heading, Heading::Left);
    }

    #[test]
    fn plan_drains_in_leg_order() {
        let mut plan = ClaimPlan::default();
        plan.refill(&[
            ClaimLeg {
                heading: Heading::Up,
                steps: 2,
            },
            ClaimLeg {
                heading: Heading::Left,
                steps: 1,
            },
        ]);
        assert_eq!(plan.pop(), Some(Heading::Up));
        assert_eq!(plan.pop(), Some(Heading::Up));
        assert_eq!(plan.pop(), Some(Heading::Left));
        assert_eq!(plan.pop(), None);
        assert!(plan.is_empty());
    }
}
