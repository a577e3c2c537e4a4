//! Fire-and-forget notifications to the analysis service.
//!
//! Each newly stored incident triggers one `POST <base>/analyze/<id>`.
//! Delivery is best effort: the outcome is logged by the spawned task and
//! never fed back into the store or the driver.

use tokio::task::JoinHandle;

/// Analysis service base URL used when none is configured.
pub const DEFAULT_ANALYST_URL: &str = "http://localhost:8001";

/// Errors that can occur while notifying the analysis service.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The request could not be delivered.
    #[error("Analyst request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client for the analysis service's `/analyze/{id}` trigger.
#[derive(Debug, Clone)]
pub struct AnalystNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl AnalystNotifier {
    /// Creates a notifier for `base_url`, falling back to
    /// [`DEFAULT_ANALYST_URL`] when it is `None` or blank.
    #[must_use]
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_ANALYST_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Returns the trigger URL for incident `id`.
    #[must_use]
    pub fn analyze_url(&self, id: i64) -> String {
        format!("{}/analyze/{id}", self.base_url)
    }

    /// Sends the trigger for incident `id` and returns the response status.
    ///
    /// Any status counts as delivered; the body is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the request could not be sent.
    pub async fn notify(&self, id: i64) -> Result<reqwest::StatusCode, NotifyError> {
        let resp = self
            .client
            .post(self.analyze_url(id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(Vec::new())
            .send()
            .await?;

        Ok(resp.status())
    }

    /// Spawns [`Self::notify`] for incident `id` without waiting for it.
    ///
    /// The outcome is only logged. Dropping the returned handle detaches
    /// the task; no ordering holds between dispatched notifications.
    #[must_use = "drop the handle explicitly to detach the notification"]
    pub fn dispatch(&self, id: i64) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.notify(id).await {
                Ok(status) if status.is_success() => {
                    log::info!("Triggered analysis for incident #{id}");
                }
                Ok(status) => {
                    log::warn!("Analyst answered {status} for incident #{id}");
                }
                Err(e) => {
                    log::error!("Failed to notify analyst service for incident #{id}: {e}");
                }
            }
        })
    }
}
