//! Rejection sampling of points that have not been evaluated yet.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

use so_types::{runtime_error, SearchPoint, SpaceOptResult, Value};

use crate::space::Space;

/// Draw up to `sample_size` distinct points that are absent from `evaluated`.
///
/// Each attempt draws a full batch of `sample_size` random points and keeps
/// the new ones. Sampling stops once enough candidates are collected or after
/// `max_num_retries` attempts. The result is truncated to the number of
/// points still unevaluated and returned in random order.
pub(crate) fn sample_unevaluated_unique<R: Rng + ?Sized>(
    space: &Space,
    evaluated: &[SearchPoint],
    rng: &mut R,
    sample_size: usize,
    max_num_retries: usize,
) -> SpaceOptResult<Vec<SearchPoint>> {
    let evaluated_keys: HashSet<Vec<Value>> =
        evaluated.iter().filter_map(|p| space.project(p)).collect();
    let num_unevaluated = space.size().saturating_sub(evaluated_keys.len() as u128);
    let max_sample_size = usize::try_from(num_unevaluated)
        .map_or(sample_size, |remaining| remaining.min(sample_size));

    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let mut candidates: Vec<SearchPoint> = Vec::new();

    if max_sample_size > 0 {
        for attempt in 0..max_num_retries {
            for _ in 0..sample_size {
                let point = space.sample(rng);
                let Some(key) = space.project(&point) else {
                    continue;
                };
                if evaluated_keys.contains(&key) || !seen.insert(key) {
                    continue;
                }
                candidates.push(point);
            }
            debug!(
                attempt,
                candidates = candidates.len(),
                target = max_sample_size,
                "sampled unevaluated spoints"
            );
            if candidates.len() >= max_sample_size {
                break;
            }
        }
    }

    if candidates.is_empty() {
        warn!(
            space_size = %space.size(),
            evaluated = evaluated.len(),
            "no unevaluated spoints left to sample"
        );
        return Err(runtime_error!(
            "could not sample any new spoints - search space is fully explored or \
             random sampling was unfortunate.\nsearch space size = {}\n\
             num evaluated spoints = {}\nnum unevaluated spoints = {}",
            space.size(),
            evaluated.len(),
            num_unevaluated
        ));
    }

    if candidates.len() < max_sample_size {
        warn!(
            sampled = candidates.len(),
            requested = max_sample_size,
            max_num_retries,
            "sampled fewer unevaluated spoints than requested"
        );
    }

    candidates.truncate(max_sample_size);
    candidates.shuffle(rng);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_space() -> Space {
        Space::new(vec![
            ("w", vec![Value::from("W1"), Value::from("W2")]),
            ("b", vec![Value::Int(5)]),
        ])
        .unwrap()
    }

    #[test]
    fn returns_distinct_unevaluated_points() {
        let space = Space::new(vec![
            ("a", (0..10).map(Value::Int).collect()),
            ("b", (0..10).map(Value::Int).collect()),
        ])
        .unwrap();
        let evaluated: Vec<SearchPoint> = (0..10)
            .map(|i| SearchPoint::new().with("a", i).with("b", i).with("y", 0.0))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let sample = sample_unevaluated_unique(&space, &evaluated, &mut rng, 50, 100).unwrap();
        assert_eq!(sample.len(), 50);

        let keys: HashSet<Vec<Value>> = sample.iter().map(|p| space.project(p).unwrap()).collect();
        assert_eq!(keys.len(), 50);
        for point in &sample {
            assert_ne!(point.get("a"), point.get("b"));
        }
    }

    #[test]
    fn truncates_to_remaining_points() {
        let space = small_space();
        let evaluated = vec![SearchPoint::new().with("w", "W1").with("b", 5).with("y", 1.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let sample = sample_unevaluated_unique(&space, &evaluated, &mut rng, 10_000, 100).unwrap();
        assert_eq!(
            sample,
            vec![SearchPoint::new().with("w", "W2").with("b", 5)]
        );
    }

    #[test]
    fn exhausted_space_reports_counts() {
        let space = small_space();
        let evaluated = vec![
            SearchPoint::new().with("w", "W1").with("b", 5).with("y", 1.0),
            SearchPoint::new().with("w", "W2").with("b", 5).with("y", 2.0),
            SearchPoint::new().with("w", "W2").with("b", 5).with("y", 2.5),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let err = sample_unevaluated_unique(&space, &evaluated, &mut rng, 100, 100).unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(
            err.message(),
            "could not sample any new spoints - search space is fully explored or \
             random sampling was unfortunate.\nsearch space size = 2\n\
             num evaluated spoints = 3\nnum unevaluated spoints = 0"
        );
    }

    #[test]
    fn zero_retries_finds_nothing() {
        let space = small_space();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = sample_unevaluated_unique(&space, &[], &mut rng, 10, 0).unwrap_err();
        assert!(err.is_runtime());
    }
}
