//! Dataset management for the bitemporal record visualizer
//!
//! [`DataManager`] owns the current snapshot of every named dataset
//! and the subscriber groups that react to dataset replaces, hover
//! broadcasts and point queries. Records come from a pluggable
//! [`RecordFetcher`] collaborator.

pub mod fetch;
pub mod manager;

use bv_core::record::DatasetKey;
use thiserror::Error;

pub use fetch::{FetchError, FetchParams, RecordFetcher};
pub use manager::{DataManager, LoadOutcome};

/// Errors surfaced by dataset operations.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("fetch for dataset '{key}' failed: {source}")]
    Fetch {
        key: DatasetKey,
        #[source]
        source: FetchError,
    },
}
