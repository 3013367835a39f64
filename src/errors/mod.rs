//! Centralized error handling for the face collection loader
//!
//! # Error Categories
//!
//! - **Filesystem**: cache directory or artifact cannot be created or read
//! - **Fetch**: the remote archive could not be downloaded
//! - **MissingData**: no cache and downloading disabled
//! - **Format**: archive bytes are not the expected MAT container
//! - **CorruptCache**: cached artifact cannot be decoded
//!
//! # Usage
//!
//! ```rust
//! use olivetti_fetch::errors::{FetchError, FetchResult};
//!
//! fn example_function() -> FetchResult<usize> {
//!     Err(FetchError::format("missing variable 'faces'"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using FetchError
pub type FetchResult<T> = Result<T, FetchError>;
