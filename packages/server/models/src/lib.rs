#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the SentinelOps read API.
//!
//! Field names match the `traffic_incidents` columns read by the web map,
//! so the API and the table can be consumed interchangeably. They are kept
//! separate from [`IncidentRow`] so the API contract can evolve on its own.

use chrono::{DateTime, Utc};
use sentinel_ops_incident_models::{IncidentCategory, IncidentRow};
use serde::{Deserialize, Serialize};

/// Default page size for `GET /api/incidents`.
pub const DEFAULT_INCIDENT_LIMIT: u32 = 50;

/// Largest page size accepted by `GET /api/incidents`.
pub const MAX_INCIDENT_LIMIT: u32 = 500;

/// A traffic incident as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIncident {
    /// Store-assigned incident ID.
    pub id: i64,
    /// Raw category label from the feed.
    #[serde(rename = "type")]
    pub kind: String,
    /// Parsed category.
    pub category: IncidentCategory,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Free-text description.
    pub message: String,
    /// Impact score from the analysis service, once available.
    pub impact_score: Option<i64>,
    /// Analysis summary, once available.
    pub ai_analysis: Option<String>,
    /// When the incident was first stored (ISO 8601).
    pub created_at: Option<DateTime<Utc>>,
}

impl From<IncidentRow> for ApiIncident {
    fn from(row: IncidentRow) -> Self {
        Self {
            id: row.id,
            category: row.category(),
            kind: row.kind,
            latitude: row.latitude,
            longitude: row.longitude,
            message: row.message,
            impact_score: row.impact_score,
            ai_analysis: row.ai_analysis,
            created_at: row.created_at,
        }
    }
}

/// Query parameters for `GET /api/incidents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentListParams {
    /// Maximum number of incidents to return.
    pub limit: Option<u32>,
}

impl IncidentListParams {
    /// Returns the requested limit clamped to `1..=MAX_INCIDENT_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_INCIDENT_LIMIT)
            .clamp(1, MAX_INCIDENT_LIMIT)
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the store answered.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Number of stored incidents, when the store answered.
    pub incident_count: Option<u64>,
}
