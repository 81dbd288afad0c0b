//! Traits describing the per-address fetcher and its failure modes.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{AddressQuery, OutagePayload};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while looking up one address.
pub enum FetchError {
    /// Transport failed: connection refused, timeout, TLS or DNS.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Response body is not JSON or has the wrong shape.
    #[error("Malformed response: {0}")]
    Malformed(#[from] JsonError),
    /// Internal fetcher error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outcome of one lookup.
pub type FetchResult = Result<OutagePayload, FetchError>;

#[async_trait]
/// Trait for backends that look up outages for one address.
pub trait OutagePort: Send + Sync {
    /// Address handled by this port.
    fn query(&self) -> &AddressQuery;

    /// Short description of the outbound request, used as log context.
    fn describe(&self) -> String;

    /// Perform one lookup round trip.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the transport fails or the body cannot be decoded.
    async fn fetch(&self) -> FetchResult;
}
