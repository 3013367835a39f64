//! The result handed back to callers.

use ndarray::{Array1, Array2, Array3};

use crate::errors::{FetchError, FetchResult};

/// Description attached to every bundle.
pub const DESCRIPTION: &str = "\
Modified Olivetti faces dataset.

The original database was available from

    http://www.cl.cam.ac.uk/research/dtg/attarchive/facedatabase.html

The version retrieved here comes in MATLAB format from the personal
web page of Sam Roweis:

    http://www.cs.nyu.edu/~roweis/

There are ten different images of each of 40 distinct subjects. For some
subjects, the images were taken at different times, varying the lighting,
facial expressions (open / closed eyes, smiling / not smiling) and facial
details (glasses / no glasses). All the images were taken against a dark
homogeneous background with the subjects in an upright, frontal position (with
tolerance for some side movement).

The original dataset consisted of 92 x 112, while the Roweis version
consists of 64x64 images.
";

/// Images, their flattened rows, labels and a description.
///
/// Every call to the loader builds a new bundle; the arrays are owned and
/// never shared with other bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct FacesBundle {
    data: Array2<f32>,
    images: Array3<f32>,
    labels: Array1<usize>,
    description: &'static str,
}

impl FacesBundle {
    /// Build a bundle; `data` is an owned `[samples, h * w]` copy of `images`.
    pub fn assemble(images: Array3<f32>, labels: Array1<usize>) -> FetchResult<Self> {
        let (samples, height, width) = images.dim();
        if labels.len() != samples {
            return Err(FetchError::format(format!(
                "{} labels for {samples} images",
                labels.len()
            )));
        }
        let data = images
            .to_shape((samples, height * width))
            .map_err(|e| FetchError::format(format!("cannot flatten images: {e}")))?
            .into_owned();

        Ok(Self {
            data,
            images,
            labels,
            description: DESCRIPTION,
        })
    }

    /// `[samples, h * w]`
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// `[samples, h, w]`
    pub fn images(&self) -> &Array3<f32> {
        &self.images
    }

    /// Class of each sample.
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    /// Take ownership of `(data, images, labels)`.
    pub fn into_parts(self) -> (Array2<f32>, Array3<f32>, Array1<usize>) {
        (self.data, self.images, self.labels)
    }
}
