//! Class balance check and minority resampling

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// A class with fewer rows than this triggers resampling.
pub const MIN_CLASS_ROWS: usize = 2;

/// Samples after the balance check
#[derive(Debug, Clone)]
pub struct Balanced<T> {
    pub samples: Vec<T>,
    pub targets: Vec<u8>,
    /// True when rows were resampled
    pub resampled: bool,
}

/// Row count per class code.
pub fn class_counts(targets: &[u8]) -> [usize; 2] {
    let mut counts = [0; 2];
    for &t in targets {
        if let Some(slot) = counts.get_mut(t as usize) {
            *slot += 1;
        }
    }
    counts
}

/// True when some class is below [`MIN_CLASS_ROWS`].
pub fn needs_resampling(counts: &[usize; 2]) -> bool {
    counts.iter().any(|&c| c < MIN_CLASS_ROWS)
}

/// Leave the data alone unless a class is too small; in that case every
/// class is drawn with replacement up to the majority count.
pub fn balance<T: Clone>(samples: Vec<T>, targets: Vec<u8>, rng: &mut StdRng) -> Balanced<T> {
    let counts = class_counts(&targets);
    if !needs_resampling(&counts) {
        return Balanced {
            samples,
            targets,
            resampled: false,
        };
    }

    let majority = counts.iter().copied().max().unwrap_or(0);
    let mut out_samples = Vec::with_capacity(majority * counts.len());
    let mut out_targets = Vec::with_capacity(majority * counts.len());

    for class in 0..counts.len() as u8 {
        let members: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == class)
            .map(|(idx, _)| idx)
            .collect();

        for _ in 0..majority {
            if let Some(&idx) = members.choose(rng) {
                out_samples.push(samples[idx].clone());
                out_targets.push(class);
            }
        }
    }

    Balanced {
        samples: out_samples,
        targets: out_targets,
        resampled: true,
    }
}
