#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident ingestion pipeline: fetch → deduplicate-and-persist →
//! fan-out-notify.
//!
//! [`run_cycle`] performs one pass. [`scheduler::run`] repeats it on a
//! fixed period. Everything a cycle needs lives in [`IngestContext`], which
//! `main` builds once and clones into every spawned task.

pub mod notify;
pub mod scheduler;

use std::collections::BTreeMap;
use std::sync::Arc;

use sentinel_ops_database::{ConnectionPool, DbError, queries};
use sentinel_ops_incident_models::IncidentCategory;
use sentinel_ops_source::{IncidentSource, SourceError};
use tokio::task::JoinHandle;

use crate::notify::AnalystNotifier;

/// Process-wide handles shared by the scheduler and every cycle.
#[derive(Clone)]
pub struct IngestContext {
    /// Where incidents come from.
    pub source: Arc<dyn IncidentSource>,
    /// Incident store connections.
    pub pool: Arc<ConnectionPool>,
    /// Analysis service trigger.
    pub notifier: AnalystNotifier,
}

/// Errors that abort a single ingestion cycle.
///
/// None of them are fatal to the process; the next tick simply tries again.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// The source could not be fetched or decoded.
    #[error("Fetch error: {0}")]
    Fetch(#[from] SourceError),

    /// The store rejected an insert. Rows saved earlier in the batch remain.
    #[error("Save error: {0}")]
    Store(#[from] DbError),
}

/// Outcome of a successful cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Number of incidents returned by the source.
    pub fetched: usize,
    /// Ids of the rows inserted by this cycle, in fetch order.
    pub new_ids: Vec<i64>,
    /// Handles of the dispatched analyst notifications.
    pub notifications: Vec<JoinHandle<()>>,
}

impl CycleReport {
    /// Waits for every dispatched notification to finish.
    pub async fn wait_for_notifications(self) {
        for handle in self.notifications {
            if let Err(e) = handle.await {
                log::error!("Notification task panicked: {e}");
            }
        }
    }
}

/// Runs one fetch → save → notify pass.
///
/// Fetch and save are awaited. One notification is then dispatched per new
/// row without waiting for it; the handles are returned in the report and
/// detach when dropped.
///
/// # Errors
///
/// Returns [`CycleError::Fetch`] if the source fails and
/// [`CycleError::Store`] if an insert fails. No notifications are sent in
/// either case.
pub async fn run_cycle(ctx: &IngestContext) -> Result<CycleReport, CycleError> {
    log::info!(
        "Fetching and storing latest incidents from {}...",
        ctx.source.name()
    );

    let incidents = ctx.source.fetch().await?;

    if log::log_enabled!(log::Level::Debug) {
        let mut by_category: BTreeMap<IncidentCategory, usize> = BTreeMap::new();
        for incident in &incidents {
            *by_category.entry(incident.category()).or_default() += 1;
        }
        log::debug!("Fetched incidents by category: {by_category:?}");
    }

    let new_ids = queries::save_new_incidents(&ctx.pool, &incidents).await?;

    log::info!(
        "Processed {} incidents. New: {}",
        incidents.len(),
        new_ids.len()
    );

    let notifications = new_ids
        .iter()
        .map(|&id| ctx.notifier.dispatch(id))
        .collect();

    Ok(CycleReport {
        fetched: incidents.len(),
        new_ids,
        notifications,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use sentinel_ops_database::ConnectionPool;
    use sentinel_ops_incident_models::Incident;
    use sentinel_ops_source::{IncidentSource, SourceError};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers with an empty body and
    /// `status_line`, and yields the raw request text.
    pub async fn serve_once(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response =
                format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{addr}"), handle)
    }

    /// Returns a base URL nothing is listening on.
    pub async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    /// Opens a fresh `SQLite` store under the temp directory.
    pub async fn test_pool(name: &str) -> Arc<ConnectionPool> {
        let path = std::env::temp_dir().join(format!(
            "sentinel_ops_ingest_{name}_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let pool = sentinel_ops_database::db::open_sqlite(&path, 1).unwrap();
        sentinel_ops_database::ensure_schema(&pool).await.unwrap();
        Arc::new(pool)
    }

    /// Source that always returns the same incidents.
    pub struct StaticSource(pub Vec<Incident>);

    #[async_trait]
    impl IncidentSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self) -> Result<Vec<Incident>, SourceError> {
            Ok(self.0.clone())
        }
    }

    /// Source that always fails with the given status.
    pub struct FailingSource(pub u16);

    #[async_trait]
    impl IncidentSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self) -> Result<Vec<Incident>, SourceError> {
            Err(SourceError::Status { status: self.0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use sentinel_ops_incident_models::Incident;

    use super::*;
    use crate::test_support::{
        FailingSource, StaticSource, closed_port_url, serve_once, test_pool,
    };

    fn sample_incidents() -> Vec<Incident> {
        sentinel_ops_source::mock::mock_incidents()
    }

    #[tokio::test]
    async fn cycle_persists_new_incidents_once() {
        let ctx = IngestContext {
            source: Arc::new(StaticSource(sample_incidents())),
            pool: test_pool("cycle_once").await,
            notifier: AnalystNotifier::new(Some(closed_port_url().await.as_str())),
        };

        let first = run_cycle(&ctx).await.unwrap();
        assert_eq!(first.fetched, 3);
        assert_eq!(first.new_ids.len(), 3);
        assert_eq!(first.notifications.len(), 3);
        first.wait_for_notifications().await;

        let second = run_cycle(&ctx).await.unwrap();
        assert_eq!(second.fetched, 3);
        assert!(second.new_ids.is_empty());
        assert!(second.notifications.is_empty());

        assert_eq!(queries::count_incidents(&ctx.pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn notify_failure_leaves_rows_in_place() {
        let ctx = IngestContext {
            source: Arc::new(StaticSource(vec![Incident::new(
                "Fire",
                1.35,
                103.94,
                "(2/3) 14:05 Vehicle fire on TPE",
            )])),
            pool: test_pool("notify_failure").await,
            notifier: AnalystNotifier::new(Some(closed_port_url().await.as_str())),
        };

        let report = run_cycle(&ctx).await.unwrap();
        let id = report.new_ids[0];
        report.wait_for_notifications().await;

        let row = queries::get_incident(&ctx.pool, id).await.unwrap().unwrap();
        assert_eq!(row.kind, "Fire");
        assert_eq!(row.message, "(2/3) 14:05 Vehicle fire on TPE");
    }

    #[tokio::test]
    async fn new_rows_trigger_analysis_by_id() {
        let (base, server) = serve_once("200 OK").await;
        let ctx = IngestContext {
            source: Arc::new(StaticSource(vec![Incident::new(
                "Obstacle",
                1.30,
                103.80,
                "(5/6) 09:00 Obstacle on AYE",
            )])),
            pool: test_pool("notify_success").await,
            notifier: AnalystNotifier::new(Some(base.as_str())),
        };

        let report = run_cycle(&ctx).await.unwrap();
        let id = report.new_ids[0];
        report.wait_for_notifications().await;

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(
            request.starts_with(&format!("post /analyze/{id} ")),
            "{request}"
        );
    }

    #[tokio::test]
    async fn fetch_failure_aborts_cycle_without_writes() {
        let ctx = IngestContext {
            source: Arc::new(FailingSource(503)),
            pool: test_pool("fetch_failure").await,
            notifier: AnalystNotifier::new(None),
        };

        let err = run_cycle(&ctx).await.unwrap_err();
        assert!(
            matches!(err, CycleError::Fetch(SourceError::Status { status: 503 })),
            "{err:?}"
        );
        assert_eq!(queries::count_incidents(&ctx.pool).await.unwrap(), 0);
    }
}
