//! The external record source seam.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use bv_core::record::{BitemporalRecord, DatePair};

/// Errors a fetch collaborator can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Parameters forwarded to the collaborator with a load request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchParams {
    /// Point-in-bitemporal-time filter for effective-record queries.
    pub as_of: Option<DatePair>,
    /// Free-form key/value filters, entity ids and the like.
    pub filters: Vec<(String, String)>,
}

impl FetchParams {
    /// Parameters for a point query at `pair`.
    pub fn as_of(pair: DatePair) -> Self {
        Self {
            as_of: Some(pair),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }
}

/// An external source of bitemporal records: an HTTP API, a database
/// gateway, a fixture.
///
/// A fetch returns the full record set for a dataset key, in the
/// order the source emits it; partial results are never surfaced.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(
        &self,
        key: &str,
        params: &FetchParams,
    ) -> Result<Vec<BitemporalRecord>, FetchError>;

    /// Collaborator name, for logs.
    fn source_name(&self) -> &str {
        "fetcher"
    }
}
