//! Seeded train/test partition

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub train_targets: Vec<u8>,
    pub test: Vec<T>,
    pub test_targets: Vec<u8>,
}

/// Held-out row count: `ceil(n * ratio)`, always leaving one training row.
pub fn test_size(n: usize, ratio: f64) -> usize {
    if n <= 1 || ratio <= 0.0 {
        return 0;
    }
    let wanted = (n as f64 * ratio).ceil() as usize;
    wanted.min(n - 1)
}

/// Shuffle with `rng` and cut off the first `test_size` rows as the test set.
pub fn train_test_split<T>(
    samples: Vec<T>,
    targets: Vec<u8>,
    test_ratio: f64,
    rng: &mut StdRng,
) -> Partition<T> {
    let n = samples.len().min(targets.len());
    let n_test = test_size(n, test_ratio);

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut slots: Vec<Option<T>> = samples.into_iter().map(Some).collect();
    let mut partition = Partition {
        train: Vec::with_capacity(n - n_test),
        train_targets: Vec::with_capacity(n - n_test),
        test: Vec::with_capacity(n_test),
        test_targets: Vec::with_capacity(n_test),
    };

    for (position, idx) in order.into_iter().enumerate() {
        let Some(sample) = slots[idx].take() else {
            continue;
        };
        if position < n_test {
            partition.test.push(sample);
            partition.test_targets.push(targets[idx]);
        } else {
            partition.train.push(sample);
            partition.train_targets.push(targets[idx]);
        }
    }

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_test_size_rounds_up() {
        assert_eq!(test_size(100, 0.2), 20);
        assert_eq!(test_size(11, 0.2), 3);
        assert_eq!(test_size(2, 0.2), 1);
        assert_eq!(test_size(1, 0.2), 0);
        assert_eq!(test_size(10, 0.0), 0);
    }

    #[test]
    fn test_split_keeps_pairs_together() {
        let mut rng = StdRng::seed_from_u64(100);
        let samples: Vec<u32> = (0..50).collect();
        let targets: Vec<u8> = samples.iter().map(|s| (s % 2) as u8).collect();

        let p = train_test_split(samples, targets, 0.2, &mut rng);

        assert_eq!(p.test.len(), 10);
        assert_eq!(p.train.len(), 40);
        for (s, t) in p.train.iter().zip(&p.train_targets) {
            assert_eq!((s % 2) as u8, *t);
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(100);
            train_test_split((0..30).collect::<Vec<u32>>(), vec![0; 30], 0.2, &mut rng).test
        };
        assert_eq!(run(), run());
    }
}
