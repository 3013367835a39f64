//! Seeded reordering of images and labels.

use ndarray::{Array1, Array3, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Source of randomness for a single call.
///
/// There is no process-wide generator: each call builds its own `StdRng`
/// from the seed, or clones the instance it was handed.
#[derive(Debug, Clone)]
pub enum RandomState {
    Seed(u64),
    Generator(StdRng),
}

impl Default for RandomState {
    fn default() -> Self {
        Self::Seed(0)
    }
}

impl From<u64> for RandomState {
    fn from(seed: u64) -> Self {
        Self::Seed(seed)
    }
}

impl From<StdRng> for RandomState {
    fn from(rng: StdRng) -> Self {
        Self::Generator(rng)
    }
}

impl RandomState {
    /// Generator for one invocation.
    pub fn rng(&self) -> StdRng {
        match self {
            Self::Seed(seed) => StdRng::seed_from_u64(*seed),
            Self::Generator(rng) => rng.clone(),
        }
    }
}

/// Images and labels after reordering, with the permutation used.
#[derive(Debug, Clone, PartialEq)]
pub struct Shuffled {
    pub images: Array3<f32>,
    pub labels: Array1<usize>,
    /// `images[i]` is the original sample `order[i]`.
    pub order: Vec<usize>,
}

/// A uniformly random permutation of `0..n`.
pub fn permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

/// Reindex the first axis of `images` and `labels` by the same `order`.
pub fn apply_permutation(
    images: &Array3<f32>,
    labels: &Array1<usize>,
    order: &[usize],
) -> (Array3<f32>, Array1<usize>) {
    (images.select(Axis(0), order), labels.select(Axis(0), order))
}

/// Draw one permutation from `rng` and apply it to both arrays.
pub fn shuffle_with<R: Rng + ?Sized>(
    images: &Array3<f32>,
    labels: &Array1<usize>,
    rng: &mut R,
) -> Shuffled {
    let order = permutation(images.shape()[0], rng);
    let (images, labels) = apply_permutation(images, labels, &order);
    Shuffled {
        images,
        labels,
        order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::normalize::class_labels;
    use ndarray::s;
    use proptest::prelude::*;

    fn tagged_images(n: usize) -> Array3<f32> {
        // every pixel of image i holds i
        Array3::from_shape_fn((n, 2, 2), |(i, _, _)| i as f32)
    }

    #[test]
    fn test_same_seed_same_permutation() {
        let a = permutation(400, &mut RandomState::Seed(0).rng());
        let b = permutation(400, &mut RandomState::Seed(0).rng());
        assert_eq!(a, b);
        let c = permutation(400, &mut RandomState::Seed(1).rng());
        assert_ne!(a, c);
    }

    #[test]
    fn test_generator_state_is_cloned_not_consumed() {
        let state = RandomState::from(StdRng::seed_from_u64(7));
        let first = permutation(50, &mut state.rng());
        let second = permutation(50, &mut state.rng());
        assert_eq!(first, second);
    }

    #[test]
    fn test_permutation_covers_every_index() {
        let mut order = permutation(400, &mut RandomState::Seed(3).rng());
        order.sort_unstable();
        assert_eq!(order, (0..400).collect::<Vec<_>>());
    }

    #[test]
    fn test_images_follow_their_labels() {
        let images = tagged_images(40);
        let labels = class_labels(40, 10);
        let shuffled = shuffle_with(&images, &labels, &mut RandomState::Seed(0).rng());

        for (i, &original) in shuffled.order.iter().enumerate() {
            assert_eq!(shuffled.labels[i], labels[original]);
            assert_eq!(shuffled.images[[i, 0, 0]], original as f32);
            assert_eq!(
                shuffled.images.slice(s![i, .., ..]),
                images.slice(s![original, .., ..])
            );
        }
    }

    proptest! {
        #[test]
        fn prop_shuffle_correspondence(seed in any::<u64>(), n in 1usize..64) {
            let images = tagged_images(n);
            let labels = class_labels(n, 4);
            let shuffled = shuffle_with(&images, &labels, &mut RandomState::Seed(seed).rng());
            for i in 0..n {
                let original = shuffled.order[i];
                prop_assert_eq!(shuffled.labels[i], original / 4);
                prop_assert_eq!(shuffled.images[[i, 1, 1]], original as f32);
            }
        }
    }
}
