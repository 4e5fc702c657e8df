//! Probability weighted reward selection.
//!
//! The draw is a pure function of the catalog and one uniform sample. It keeps no
//! state between calls, so any number of callers may draw at the same time.

use rand::Rng;
use thiserror::Error;

use crate::reward::Reward;

/// Largest `f64` strictly below 1.0.
const LARGEST_UNIT: f64 = 1.0 - f64::EPSILON / 2.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Outcome of a draw: the reward and its position in the input order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawn<'a> {
    pub reward: &'a Reward,
    pub index: usize,
}

fn weight(reward: &Reward) -> f64 {
    if reward.probability.is_finite() && reward.probability > 0.0 {
        reward.probability
    } else {
        0.0
    }
}

/// Draws one reward using a uniform sample from `rng`.
pub fn draw<'a, R: Rng + ?Sized>(rewards: &'a [Reward], rng: &mut R) -> Result<Drawn<'a>, DrawError> {
    draw_at(rewards, rng.gen::<f64>())
}

/// Draws one reward for a given uniform sample `unit` in `[0, 1)`.
///
/// The sample is scaled by the total weight and the rewards are walked in order; the
/// first reward whose cumulative weight reaches the scaled sample wins. Rewards with a
/// zero weight are never selected. If rounding lets the walk run off the end, the last
/// reachable reward is returned.
pub fn draw_at(rewards: &[Reward], unit: f64) -> Result<Drawn<'_>, DrawError> {
    if rewards.is_empty() {
        return Err(DrawError::InvalidInput("reward catalog is empty"));
    }

    let total: f64 = rewards.iter().map(weight).sum();
    if !total.is_finite() {
        return Err(DrawError::InvalidInput("reward weights add up to a non-finite total"));
    }
    if total <= 0.0 {
        return Err(DrawError::InvalidInput("reward catalog has no positive weight"));
    }

    let unit = if unit.is_nan() { 0.0 } else { unit.clamp(0.0, LARGEST_UNIT) };
    let target = unit * total;

    let mut acc = 0.0;
    let mut last_reachable = rewards.len() - 1;
    for (index, reward) in rewards.iter().enumerate() {
        let p = weight(reward);
        if p == 0.0 {
            continue;
        }
        if acc + p >= target {
            log::trace!("drew reward {} at index {}", reward.id, index);
            return Ok(Drawn { reward, index });
        }
        acc += p;
        last_reachable = index;
    }

    log::debug!("draw walked past the catalog (target {}, total {}), using last reward", target, total);
    Ok(Drawn {
        reward: &rewards[last_reachable],
        index: last_reachable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::Rarity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reward(id: &str, probability: f64) -> Reward {
        Reward {
            id: id.to_string(),
            name: id.to_uppercase(),
            coin_amount: 1,
            rarity: Rarity::Common,
            probability,
            color: "#000000".to_string(),
            sort_order: 0,
        }
    }

    fn catalog(weights: &[f64]) -> Vec<Reward> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &p)| reward(&format!("r{}", i), p))
            .collect()
    }

    #[test]
    fn test_empty_catalog_is_invalid_input() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(draw(&[], &mut rng), Err(DrawError::InvalidInput("reward catalog is empty")));
        }
        assert!(matches!(draw_at(&[], 0.5), Err(DrawError::InvalidInput(_))));
    }

    #[test]
    fn test_all_zero_weights_is_invalid_input() {
        let rewards = catalog(&[0.0, 0.0]);
        assert!(matches!(draw_at(&rewards, 0.3), Err(DrawError::InvalidInput(_))));
    }

    #[test]
    fn test_single_reward_always_wins() {
        let rewards = catalog(&[1.0]);
        for unit in [0.0, 0.25, 0.5, 0.999999, LARGEST_UNIT] {
            let drawn = draw_at(&rewards, unit).unwrap();
            assert_eq!(drawn.index, 0);
            assert_eq!(drawn.reward, &rewards[0]);
        }
    }

    #[test]
    fn test_fixed_samples_are_deterministic() {
        let rewards = catalog(&[1.0, 1.0, 2.0]);
        let expected = [(0.0, 0), (0.5, 1), (0.999999, 2)];
        for _ in 0..3 {
            for &(unit, index) in &expected {
                let drawn = draw_at(&rewards, unit).unwrap();
                assert_eq!(drawn.index, index, "unit {}", unit);
                assert_eq!(drawn.reward.id, rewards[index].id);
            }
        }
    }

    #[test]
    fn test_upper_edge_picks_last_not_first() {
        let rewards = catalog(&[0.1, 0.2, 0.3]);
        assert_eq!(draw_at(&rewards, LARGEST_UNIT).unwrap().index, 2);
        // Out of range samples are clamped into [0, 1).
        assert_eq!(draw_at(&rewards, 1.0).unwrap().index, 2);
        assert_eq!(draw_at(&rewards, 7.5).unwrap().index, 2);
        assert_eq!(draw_at(&rewards, -3.0).unwrap().index, 0);
        assert_eq!(draw_at(&rewards, f64::NAN).unwrap().index, 0);
    }

    #[test]
    fn test_zero_weight_rewards_are_unreachable() {
        let rewards = catalog(&[0.0, 1.0, 0.0, 1.0, 0.0]);
        for step in 0..1000 {
            let unit = f64::from(step) / 1000.0;
            let index = draw_at(&rewards, unit).unwrap().index;
            assert!(index == 1 || index == 3, "unit {} drew {}", unit, index);
        }
        assert_eq!(draw_at(&rewards, LARGEST_UNIT).unwrap().index, 3);
    }

    #[test]
    fn test_result_is_always_in_catalog() {
        let rewards = catalog(&[3.0, 0.5, 9.0, 0.01, 2.0]);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10_000 {
            let drawn = draw(&rewards, &mut rng).unwrap();
            assert!(drawn.index < rewards.len());
            assert!(std::ptr::eq(drawn.reward, &rewards[drawn.index]));
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let rewards = catalog(&[50.0, 25.0, 15.0, 10.0]);
        let total: f64 = rewards.iter().map(|r| r.probability).sum();
        let mut counts = [0usize; 4];
        let mut rng = StdRng::seed_from_u64(2024);
        let draws = 100_000;
        for _ in 0..draws {
            counts[draw(&rewards, &mut rng).unwrap().index] += 1;
        }
        for (i, count) in counts.iter().enumerate() {
            let observed = *count as f64 / draws as f64;
            let expected = rewards[i].probability / total;
            assert!((observed - expected).abs() < 0.01, "reward {}: {} vs {}", i, observed, expected);
        }
    }

    #[test]
    fn test_equal_weights_are_uniform() {
        let rewards = catalog(&[2.0; 8]);
        let mut counts = [0usize; 8];
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 80_000;
        for _ in 0..draws {
            counts[draw(&rewards, &mut rng).unwrap().index] += 1;
        }
        for count in counts {
            let observed = count as f64 / draws as f64;
            assert!((observed - 0.125).abs() < 0.01);
        }
    }

    #[test]
    fn test_tiny_weight_next_to_huge_weight_is_still_drawn() {
        let rewards = catalog(&[1_000_000.0, 10_000.0]);
        let mut rng = StdRng::seed_from_u64(3);
        let draws = 200_000;
        let hits = (0..draws)
            .filter(|_| draw(&rewards, &mut rng).unwrap().index == 1)
            .count();
        let observed = hits as f64 / draws as f64;
        let expected = 10_000.0 / 1_010_000.0;
        assert!(hits > 0);
        assert!((observed - expected).abs() < 0.002, "{} vs {}", observed, expected);
    }

    #[test]
    fn test_concurrent_draws_stay_in_catalog() {
        let rewards = catalog(&[5.0, 1.0, 1.0, 3.0]);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u64)
                .map(|seed| {
                    let rewards = &rewards;
                    scope.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        for _ in 0..5_000 {
                            let drawn = draw(rewards, &mut rng).expect("draw failed");
                            assert_eq!(rewards[drawn.index].id, drawn.reward.id);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().expect("drawing thread panicked");
            }
        });
    }
}
