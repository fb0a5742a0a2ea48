use rand::Rng;

use crate::world::Heading;

/// Picks a heading with probability proportional to its floor-shifted score.
///
/// The floor is `low * (1 + r)` where `low = min(0, finite scores)` and `r` is
/// drawn once per call. The reverse of `current` and any non-finite (vetoed)
/// score get zero weight. When nothing carries weight the choice falls back to
/// a uniform pick among `current` and its two laterals.
pub fn sample_heading<R: Rng + ?Sized>(scores: &[f64; 4], current: Heading, rng: &mut R) -> Heading {
    let weights = shifted_weights(scores, current, rng.gen::<f64>());
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let fallback = current.candidates();
        return fallback[rng.gen_range(0..fallback.len())];
    }

    let mut remainder = rng.gen::<f64>() * total;
    let mut last_viable = current;
    for heading in Heading::ALL {
        let weight = weights[heading.index()];
        if weight <= 0.0 {
            continue;
        }
        if remainder < weight {
            return heading;
        }
        remainder -= weight;
        last_viable = heading;
    }
    // Rounding can leave a sliver past the last bucket.
    last_viable
}

pub fn shifted_weights(scores: &[f64; 4], current: Heading, floor_jitter: f64) -> [f64; 4] {
    let reverse = current.reverse();
    let low = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(0.0, f64::min);
    let floor = low * (1.0 + floor_jitter);

    let mut weights = [0.0; 4];
    for heading in Heading::ALL {
        let score = scores[heading.index()];
        if heading == reverse || !score.is_finite() {
            continue;
        }
        weights[heading.index()] = (score - floor).max(0.0);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn reverse_is_never_sampled() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xC0FF_EE11);
        let cases = [
            [5.0, -3.0, -3.0, 1.0],
            [-10.0, -20.0, -30.0, -40.0],
            [100.0, 25.0, f64::NEG_INFINITY, 25.0],
            [0.0, 0.0, 0.0, 0.0],
        ];
        for scores in cases {
            for current in Heading::ALL {
                for _ in 0..200 {
                    let picked = sample_heading(&scores, current, &mut rng);
                    assert_ne!(picked, current.reverse(), "scores={scores:?}");
                }
            }
        }
    }

    #[test]
    fn weights_are_non_negative_and_shifted_by_floor() {
        let weights = shifted_weights(&[-4.0, 2.0, 6.0, -1.0], Heading::Up, 0.5);
        // floor = -4 * 1.5 = -6; Down is the reverse of Up.
        assert_eq!(weights, [2.0, 8.0, 0.0, 5.0]);

        let positive = shifted_weights(&[3.0, 1.0, 9.0, 2.0], Heading::Right, 0.9);
        assert_eq!(positive, [3.0, 1.0, 9.0, 0.0]);
    }

    #[test]
    fn vetoed_headings_carry_no_weight() {
        let weights = shifted_weights(
            &[f64::NEG_INFINITY, 10.0, -9_999.0, f64::NAN],
            Heading::Up,
            0.0,
        );
        assert_eq!(weights[Heading::Up.index()], 0.0);
        assert_eq!(weights[Heading::Left.index()], 0.0);
        assert!(weights[Heading::Right.index()] > 0.0);
    }

    #[test]
    fn all_zero_scores_fall_back_to_forward_or_laterals() {
        // StepRng(0, 0) always yields zero: r = 0 and the fallback index is 0.
        let mut rng = StepRng::new(0, 0);
        let picked = sample_heading(&[0.0; 4], Heading::Up, &mut rng);
        assert_eq!(picked, Heading::Left);

        let mut seeded = ChaCha8Rng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..300 {
            seen[sample_heading(&[0.0; 4], Heading::Up, &mut seeded).index()] = true;
        }
        assert_eq!(seen, [true, true, false, true]);
    }

    #[test]
    fn zero_draw_picks_first_weighted_heading() {
        let mut rng = StepRng::new(0, 0);
        let picked = sample_heading(&[0.0, 0.0, 7.0, 3.0], Heading::Down, &mut rng);
        assert_eq!(picked, Heading::Down);
    }

    #[test]
    fn sampling_tracks_relative_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = [0u32; 4];
        for _ in 0..20_000 {
            counts[sample_heading(&[90.0, 10.0, 0.0, 0.0], Heading::Up, &mut rng).index()] += 1;
        }
        let up_share = counts[0] as f64 / 20_000.0;
        assert!((up_share - 0.9).abs() < 0.02, "up_share={up_share}");
        assert_eq!(counts[Heading::Down.index()], 0);
        assert_eq!(counts[Heading::Left.index()], 0);
    }
}
