//! Archive bytes → samples×features raw matrix.

use ndarray::{Array2, ShapeBuilder};
use tracing::debug;

use super::mat::MatFile;
use super::RawMatrix;
use crate::dataset::{N_FEATURES, N_SAMPLES};
use crate::errors::{FetchError, FetchResult};

/// Name of the variable holding the face matrix inside the archive.
pub const FACES_VARIABLE: &str = "faces";

/// Parse the downloaded archive into a `[400, 4096]` raw matrix.
///
/// # Errors
/// [`FetchError::Format`] if the bytes are not a MAT v5 file, the `faces`
/// variable is absent or complex, or its shape is not `[4096, 400]`.
pub fn archive_to_raw(bytes: &[u8]) -> FetchResult<RawMatrix> {
    archive_to_raw_with(bytes, FACES_VARIABLE, N_FEATURES, N_SAMPLES)
}

/// Like [`archive_to_raw`] for an arbitrary variable and expected
/// features×samples shape.
pub fn archive_to_raw_with(
    bytes: &[u8],
    variable: &str,
    n_features: usize,
    n_samples: usize,
) -> FetchResult<RawMatrix> {
    let array = MatFile::parse(bytes)?
        .into_array(variable)
        .ok_or_else(|| FetchError::format(format!("archive has no numeric variable '{variable}'")))?;

    if array.complex {
        return Err(FetchError::format(format!(
            "variable '{variable}' is complex, expected real intensities"
        )));
    }
    if array.dims.len() != 2 {
        return Err(FetchError::format(format!(
            "variable '{variable}' has {} dimensions, expected 2",
            array.dims.len()
        )));
    }
    if array.dims != [n_features, n_samples] {
        return Err(FetchError::format(format!(
            "variable '{variable}' has shape {:?}, expected [{n_features}, {n_samples}]",
            array.dims
        )));
    }

    // MAT data is column-major: each column is one sample's pixels.
    let feature_major = Array2::from_shape_vec((n_features, n_samples).f(), array.data)
        .map_err(|e| FetchError::format(format!("cannot shape '{variable}': {e}")))?;

    let raw = transpose_feature_major(feature_major);
    debug!("Converted archive variable '{}' to {:?}", variable, raw.shape());
    Ok(raw)
}

/// Swap the container's features×samples orientation to samples×features.
pub fn transpose_feature_major(feature_major: Array2<f64>) -> RawMatrix {
    RawMatrix::new(
        feature_major
            .reversed_axes()
            .as_standard_layout()
            .into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::mat::MatBuilder;
    use ndarray::array;

    #[test]
    fn test_transpose_feature_major() {
        // 3 features × 2 samples
        let fm = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let raw = transpose_feature_major(fm);
        assert_eq!(raw.values(), &array![[1.0, 2.0, 3.0], [10.0, 20.0, 30.0]]);
        assert!(raw.values().is_standard_layout());
    }

    #[test]
    fn test_columns_become_samples() {
        // column-major 3×2: sample 0 = [1,2,3], sample 1 = [4,5,6]
        let bytes = MatBuilder::new()
            .add_u8("faces", &[3, 2], &[1, 2, 3, 4, 5, 6])
            .build()
            .unwrap();
        let raw = archive_to_raw_with(&bytes, "faces", 3, 2).unwrap();
        assert_eq!(raw.shape(), (2, 3));
        assert_eq!(raw.values(), &array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_missing_variable() {
        let bytes = MatBuilder::new()
            .add_u8("other", &[3, 2], &[0; 6])
            .build()
            .unwrap();
        let err = archive_to_raw_with(&bytes, "faces", 3, 2).unwrap_err();
        assert!(err.to_string().contains("no numeric variable 'faces'"));
    }

    #[test]
    fn test_wrong_dimensionality() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[3, 2, 1], &[0; 6])
            .build()
            .unwrap();
        let err = archive_to_raw_with(&bytes, "faces", 3, 2).unwrap_err();
        assert!(err.to_string().contains("3 dimensions"));
    }

    #[test]
    fn test_samples_major_archive_is_rejected() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[2, 3], &[0; 6])
            .build()
            .unwrap();
        let err = archive_to_raw_with(&bytes, "faces", 3, 2).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }

    #[test]
    fn test_garbage_bytes() {
        let err = archive_to_raw(b"<html>404</html>").unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }
}
