//! In-memory shaping of the face collection.
//!
//! - [`normalize`]: min-max scaling, image reshape and class labels
//! - [`shuffle`]: seeded permutation applied to images and labels together
//! - [`bundle`]: the immutable result handed to callers

pub mod bundle;
pub mod normalize;
pub mod shuffle;

pub use bundle::{FacesBundle, DESCRIPTION};
pub use normalize::{normalize, DegeneratePolicy, Normalized};
pub use shuffle::{RandomState, Shuffled};

/// Subjects in the collection.
pub const N_CLASSES: usize = 40;
/// Images per subject.
pub const SAMPLES_PER_CLASS: usize = 10;
/// Total images.
pub const N_SAMPLES: usize = 400;
/// Width and height of every image.
pub const IMAGE_SIDE: usize = 64;
/// Pixels per image.
pub const N_FEATURES: usize = IMAGE_SIDE * IMAGE_SIDE;

const _: () = assert!(N_SAMPLES == N_CLASSES * SAMPLES_PER_CLASS);
