//! # olivetti-fetch
//!
//! Downloads the Olivetti faces collection (400 grayscale 64×64 images of
//! 40 subjects, ten each) once, caches a compressed copy of the raw matrix
//! and returns a freshly built [`FacesBundle`] on every call.
//!
//! ```no_run
//! use olivetti_fetch::{fetch_olivetti_faces, FetchOptions};
//!
//! let faces = fetch_olivetti_faces(
//!     &FetchOptions::new()
//!         .data_home("/var/cache/olivetti")
//!         .shuffle(true)
//!         .seed(0),
//! )?;
//! assert_eq!(faces.data().shape(), &[400, 4096]);
//! assert_eq!(faces.labels().len(), 400);
//! # Ok::<(), olivetti_fetch::errors::FetchError>(())
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod fetch;
pub mod format;
pub mod sources;

pub use dataset::{DegeneratePolicy, FacesBundle, RandomState, DESCRIPTION};
pub use errors::{FetchError, FetchResult};
pub use fetch::{fetch_olivetti_faces, fetch_olivetti_faces_async, FacesFetcher, FetchOptions};
pub use sources::{ArchiveFetcher, HttpArchiveFetcher};
