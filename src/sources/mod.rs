//! Where the raw archive comes from.

pub mod http;
pub mod traits;

pub use http::HttpArchiveFetcher;
pub use traits::ArchiveFetcher;
