#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Traffic incident source trait and the LTA `DataMall` client.
//!
//! Each provider implements the [`IncidentSource`] trait and returns a
//! complete snapshot of the incidents it currently knows about. The
//! ingestion pipeline only depends on the trait, so tests and alternate
//! feeds can be swapped in without touching the driver.

pub mod lta;
pub mod mock;

use async_trait::async_trait;
use sentinel_ops_incident_models::Incident;

pub use lta::LtaClient;

/// Errors that can occur while fetching incidents from a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream API answered with a non-200 status.
    #[error("Upstream API returned status {status}")]
    Status {
        /// HTTP status code returned by the API.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Trait that all incident sources must implement.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetches the current snapshot of incidents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails, the upstream answers
    /// with a non-200 status, or the body cannot be decoded.
    async fn fetch(&self) -> Result<Vec<Incident>, SourceError>;
}
