//! Local persistence of the converted raw matrix.
//!
//! - [`locator`]: where the artifact lives and creating its directory
//! - [`store`]: compressed save/load of the matrix

pub mod locator;
pub mod store;

pub use locator::{CacheLocator, ARTIFACT_FILENAME};
