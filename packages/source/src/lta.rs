//! LTA `DataMall` `TrafficIncidents` client.
//!
//! The endpoint returns the full set of currently active incidents on every
//! call, so there is no paging or incremental state. Requests are
//! authenticated with the `AccountKey` header.
//!
//! When no account key is configured (or the key is the literal `"mock"`)
//! the client runs in mock mode and serves [`crate::mock::mock_incidents`]
//! without touching the network.
//!
//! See <https://datamall.lta.gov.sg/content/datamall/en/dynamic-data.html>

use async_trait::async_trait;
use sentinel_ops_incident_models::Incident;
use serde::Deserialize;

use crate::{IncidentSource, SourceError};

/// Production `DataMall` base URL.
pub const DEFAULT_BASE_URL: &str = "http://datamall2.mytransport.sg/ltaodataservice";

/// Account key value that forces mock mode.
pub const MOCK_ACCOUNT_KEY: &str = "mock";

/// Path of the traffic incidents dataset, relative to the base URL.
const TRAFFIC_INCIDENTS_PATH: &str = "/TrafficIncidents";

/// `DataMall` response envelope.
#[derive(Deserialize)]
struct IncidentResponse {
    value: Vec<Incident>,
}

#[derive(Debug, Clone)]
enum Mode {
    Mock,
    Live { account_key: String },
}

/// Client for the LTA `DataMall` traffic incidents feed.
#[derive(Debug, Clone)]
pub struct LtaClient {
    client: reqwest::Client,
    base_url: String,
    mode: Mode,
}

impl LtaClient {
    /// Creates a client for the given account key.
    ///
    /// `None`, an empty string, or [`MOCK_ACCOUNT_KEY`] select mock mode.
    #[must_use]
    pub fn new(account_key: Option<&str>) -> Self {
        let mode = match account_key.map(str::trim) {
            None | Some("" | MOCK_ACCOUNT_KEY) => Mode::Mock,
            Some(key) => Mode::Live {
                account_key: key.to_string(),
            },
        };

        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            mode,
        }
    }

    /// Overrides the `DataMall` base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns `true` if this client serves mock data.
    #[must_use]
    pub const fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock)
    }

    /// Fetches the current traffic incidents.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] on transport failure,
    /// [`SourceError::Status`] for any status other than `200 OK`, and
    /// [`SourceError::Decode`] if the body is not a `DataMall` envelope.
    pub async fn fetch_traffic_incidents(&self) -> Result<Vec<Incident>, SourceError> {
        let account_key = match &self.mode {
            Mode::Mock => return Ok(crate::mock::mock_incidents()),
            Mode::Live { account_key } => account_key,
        };

        let url = format!("{}{TRAFFIC_INCIDENTS_PATH}", self.base_url);
        log::debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .header("AccountKey", account_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(SourceError::Status {
                status: resp.status().as_u16(),
            });
        }

        let text = resp.text().await?;
        parse_response(&text)
    }
}

#[async_trait]
impl IncidentSource for LtaClient {
    fn name(&self) -> &str {
        if self.is_mock() {
            "LTA DataMall (mock)"
        } else {
            "LTA DataMall"
        }
    }

    async fn fetch(&self) -> Result<Vec<Incident>, SourceError> {
        self.fetch_traffic_incidents().await
    }
}

fn parse_response(text: &str) -> Result<Vec<Incident>, SourceError> {
    let envelope: IncidentResponse = serde_json::from_str(text)?;
    Ok(envelope.value)
}
