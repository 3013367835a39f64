//! Remote archive retrieval abstraction
//!
//! The pipeline only ever asks for the whole archive as bytes. Keeping this
//! behind a trait lets callers plug in a mirror, a local fixture or a test
//! double that records how often it was called.

use crate::errors::FetchResult;

/// Retrieves the raw archive in one blocking call.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher: Send + Sync {
    /// Download the complete archive.
    ///
    /// # Errors
    /// [`FetchError::Fetch`](crate::errors::FetchError::Fetch) on any
    /// transport or HTTP status failure. Implementations must not retry.
    fn fetch_archive(&self) -> FetchResult<Vec<u8>>;

    /// Where the archive is fetched from, as shown in log lines.
    fn locator(&self) -> &str;
}

impl<T: ArchiveFetcher + ?Sized> ArchiveFetcher for std::sync::Arc<T> {
    fn fetch_archive(&self) -> FetchResult<Vec<u8>> {
        (**self).fetch_archive()
    }

    fn locator(&self) -> &str {
        (**self).locator()
    }
}
