//! Intensity scaling and reshaping of the raw matrix.
//!
//! The steps run in a fixed order: cast to `f32`, subtract the global
//! minimum, divide by the maximum of the shifted values, reshape each row
//! into a square image, swap each image's rows and columns. Labels are
//! derived from the class-contiguous order before any shuffle.

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{FetchError, FetchResult};
use crate::format::RawMatrix;

/// What to do when every raw value is identical and `max - min == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Divide anyway; every value becomes NaN.
    #[default]
    Propagate,
    /// Leave the shifted values at 0.0.
    Zeros,
    /// Fail with [`FetchError::DegenerateInput`].
    Reject,
}

/// Normalized images with their pre-shuffle labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// `[samples, side, side]`, values in `[0, 1]`.
    pub images: Array3<f32>,
    /// `labels[i] == i / samples_per_class`.
    pub labels: Array1<usize>,
}

/// Run the full normalization for square images of `side` pixels.
pub fn normalize(
    raw: &RawMatrix,
    side: usize,
    samples_per_class: usize,
    policy: DegeneratePolicy,
) -> FetchResult<Normalized> {
    let mut values = to_f32(raw.values());
    let min = shift_by_global_min(&mut values);

    let shifted_max = global_max(&values);
    if shifted_max == 0.0 && !values.is_empty() {
        match policy {
            DegeneratePolicy::Propagate => {
                warn!(
                    "All {} raw values equal {}; scaling yields NaN",
                    values.len(),
                    min
                );
                scale_by_shifted_max(&mut values);
            }
            DegeneratePolicy::Zeros => {
                warn!(
                    "All {} raw values equal {}; leaving collection at 0.0",
                    values.len(),
                    min
                );
            }
            DegeneratePolicy::Reject => {
                return Err(FetchError::DegenerateInput {
                    count: values.len(),
                    value: f64::from(min),
                });
            }
        }
    } else {
        scale_by_shifted_max(&mut values);
    }

    let images = transpose_image_axes(reshape_to_images(values, side)?);
    let labels = class_labels(images.shape()[0], samples_per_class);
    debug!(
        "Normalized {} images of {}x{} (raw min {}, range {})",
        images.shape()[0],
        side,
        side,
        min,
        shifted_max
    );
    Ok(Normalized { images, labels })
}

/// Cast raw values to `f32`.
pub fn to_f32(raw: &Array2<f64>) -> Array2<f32> {
    raw.mapv(|v| v as f32)
}

/// Subtract the single global minimum from every value; returns that minimum.
pub fn shift_by_global_min(values: &mut Array2<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let min = values.fold(f32::INFINITY, |acc, &v| acc.min(v));
    values.mapv_inplace(|v| v - min);
    min
}

/// Divide every value by the maximum of the already shifted collection;
/// returns the divisor.
pub fn scale_by_shifted_max(values: &mut Array2<f32>) -> f32 {
    let max = global_max(values);
    values.mapv_inplace(|v| v / max);
    max
}

fn global_max(values: &Array2<f32>) -> f32 {
    values.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v))
}

/// Reshape each length `side * side` row into a `side × side` block.
pub fn reshape_to_images(flat: Array2<f32>, side: usize) -> FetchResult<Array3<f32>> {
    let (samples, features) = flat.dim();
    if features != side * side {
        return Err(FetchError::format(format!(
            "rows of {features} values cannot form {side}x{side} images"
        )));
    }
    flat.as_standard_layout()
        .into_owned()
        .into_shape_with_order((samples, side, side))
        .map_err(|e| FetchError::format(format!("cannot reshape to images: {e}")))
}

/// Swap rows and columns of every image, keeping the sample axis first.
pub fn transpose_image_axes(images: Array3<f32>) -> Array3<f32> {
    images
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .into_owned()
}

/// `labels[i] = i / samples_per_class` for `i` in `0..n_samples`.
pub fn class_labels(n_samples: usize, samples_per_class: usize) -> Array1<usize> {
    Array1::from_iter((0..n_samples).map(|i| i / samples_per_class))
}
