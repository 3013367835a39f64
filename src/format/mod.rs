//! Raw archive decoding.
//!
//! The remote archive is a MATLAB v5 file holding a single `faces` matrix
//! stored feature-major (4096 pixels × 400 samples). [`mat`] reads the
//! container, [`convert`] turns the matrix into a samples×features
//! [`RawMatrix`].

pub mod convert;
pub mod mat;

use ndarray::Array2;

pub use convert::{archive_to_raw, transpose_feature_major};
pub use mat::{MatArray, MatFile};

/// Samples×features matrix as decoded from the archive or the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatrix(Array2<f64>);

impl RawMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.0
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }

    pub fn n_samples(&self) -> usize {
        self.0.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.0.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.0.dim()
    }
}
