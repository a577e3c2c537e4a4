//! Incident store queries.
//!
//! Writes go through [`save_new_incidents`], which inserts each incident on
//! its own pool checkout and relies on the `unique_incident` constraint to
//! skip incidents that are already known. Reads back the rows for the
//! read API.

use chrono::{DateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use sentinel_ops_incident_models::{Incident, IncidentRow};
use switchy_database::DatabaseValue;

use crate::{ConnectionPool, DbError, SqlDialect};

/// Default number of rows returned by [`latest_incidents`] callers.
pub const DEFAULT_LATEST_LIMIT: u32 = 50;

const INSERT_POSTGRES: &str = "INSERT INTO traffic_incidents (type, latitude, longitude, message)
     VALUES ($1, $2, $3, $4)
     ON CONFLICT ON CONSTRAINT unique_incident DO NOTHING
     RETURNING id";

const INSERT_SQLITE: &str = "INSERT INTO traffic_incidents (type, latitude, longitude, message)
     VALUES (?, ?, ?, ?)
     ON CONFLICT (type, latitude, longitude, message) DO NOTHING
     RETURNING id";

const SELECT_COLUMNS_POSTGRES: &str = r#"SELECT id, type, latitude, longitude, message,
            impact_score, ai_analysis,
            to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
     FROM traffic_incidents"#;

const SELECT_COLUMNS_SQLITE: &str = "SELECT id, type, latitude, longitude, message,
            impact_score, ai_analysis,
            strftime('%Y-%m-%dT%H:%M:%SZ', created_at) AS created_at
     FROM traffic_incidents";

impl SqlDialect {
    const fn insert_incident_sql(self) -> &'static str {
        match self {
            Self::Postgres => INSERT_POSTGRES,
            Self::Sqlite => INSERT_SQLITE,
        }
    }

    const fn select_columns_sql(self) -> &'static str {
        match self {
            Self::Postgres => SELECT_COLUMNS_POSTGRES,
            Self::Sqlite => SELECT_COLUMNS_SQLITE,
        }
    }

    /// Returns the placeholder for the `n`th (1-based) bound parameter.
    fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            Self::Sqlite => "?".to_string(),
        }
    }
}

/// Inserts every incident whose natural key is not yet stored and returns
/// the ids assigned to the new rows, in input order.
///
/// Incidents that conflict with an existing row are skipped silently; that
/// is the normal case on every poll after the first. Each insert runs on
/// its own connection checkout and outside any shared transaction, so on
/// error the rows inserted before the failing one stay persisted while the
/// call itself reports only the error.
///
/// # Errors
///
/// Returns [`DbError`] on the first insert that fails for any reason other
/// than a natural-key conflict. The remaining incidents are not attempted.
pub async fn save_new_incidents(
    pool: &ConnectionPool,
    incidents: &[Incident],
) -> Result<Vec<i64>, DbError> {
    let sql = pool.dialect().insert_incident_sql();
    let mut new_ids = Vec::new();

    for (index, incident) in incidents.iter().enumerate() {
        let rows = {
            let conn = pool.acquire().await;
            conn.query_raw_params(
                sql,
                &[
                    DatabaseValue::String(incident.kind.clone()),
                    DatabaseValue::Real64(incident.latitude),
                    DatabaseValue::Real64(incident.longitude),
                    DatabaseValue::String(incident.message.clone()),
                ],
            )
            .await
        };

        let rows = rows.map_err(|e| {
            log::warn!(
                "Insert failed at incident {}/{} ({}): {e}",
                index + 1,
                incidents.len(),
                incident.kind
            );
            e
        })?;

        let Some(row) = rows.first() else {
            log::trace!("Incident already known: {}", incident.message);
            continue;
        };

        let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse incident id: {e}"),
        })?;
        new_ids.push(id);
    }

    Ok(new_ids)
}

/// Returns up to `limit` incidents, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn latest_incidents(
    pool: &ConnectionPool,
    limit: u32,
) -> Result<Vec<IncidentRow>, DbError> {
    let dialect = pool.dialect();
    let sql = format!(
        "{} ORDER BY traffic_incidents.created_at DESC, id DESC LIMIT {}",
        dialect.select_columns_sql(),
        dialect.placeholder(1)
    );

    let rows = pool
        .acquire()
        .await
        .query_raw_params(&sql, &[DatabaseValue::Int64(i64::from(limit))])
        .await?;

    rows.iter().map(row_to_incident).collect()
}

/// Looks up a single incident by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_incident(pool: &ConnectionPool, id: i64) -> Result<Option<IncidentRow>, DbError> {
    let dialect = pool.dialect();
    let sql = format!(
        "{} WHERE id = {}",
        dialect.select_columns_sql(),
        dialect.placeholder(1)
    );

    let rows = pool
        .acquire()
        .await
        .query_raw_params(&sql, &[DatabaseValue::Int64(id)])
        .await?;

    rows.first().map(row_to_incident).transpose()
}

/// Returns the total number of stored incidents.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_incidents(pool: &ConnectionPool) -> Result<u64, DbError> {
    let rows = pool
        .acquire()
        .await
        .query_raw_params("SELECT COUNT(*) AS count FROM traffic_incidents", &[])
        .await?;

    let count: i64 = rows
        .first()
        .and_then(|row| row.to_value("count").ok())
        .unwrap_or(0);

    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("Negative incident count {count}: {e}"),
    })
}

fn row_to_incident(row: &switchy_database::Row) -> Result<IncidentRow, DbError> {
    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse incident id: {e}"),
    })?;

    let created_at: Option<String> = row.to_value("created_at").unwrap_or(None);

    Ok(IncidentRow {
        id,
        kind: row.to_value("type").unwrap_or_default(),
        latitude: row.to_value("latitude").unwrap_or(0.0),
        longitude: row.to_value("longitude").unwrap_or(0.0),
        message: row.to_value("message").unwrap_or_default(),
        impact_score: row.to_value("impact_score").unwrap_or(None),
        ai_analysis: row.to_value("ai_analysis").unwrap_or(None),
        created_at: created_at.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool(name: &str) -> ConnectionPool {
        let path = std::env::temp_dir().join(format!(
            "sentinel_ops_queries_{name}_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let pool = crate::db::open_sqlite(&path, 1).unwrap();
        crate::ensure_schema(&pool).await.unwrap();
        pool
    }

    fn accident(message: &str) -> Incident {
        Incident::new("Accident", 1.3521, 103.8198, message)
    }

    #[tokio::test]
    async fn second_save_of_same_batch_inserts_nothing() {
        let pool = test_pool("idempotent").await;
        let batch = vec![
            accident("(19/1) 10:30 Accident on PIE"),
            Incident::new("Roadwork", 1.32, 103.891, "(19/1) 11:00 Roadworks on KPE"),
        ];

        let first = save_new_incidents(&pool, &batch).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(count_incidents(&pool).await.unwrap(), 2);

        let second = save_new_incidents(&pool, &batch).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(count_incidents(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn partial_conflict_returns_new_ids_in_input_order() {
        let pool = test_pool("partial").await;
        let existing = accident("existing");
        save_new_incidents(&pool, std::slice::from_ref(&existing))
            .await
            .unwrap();

        let batch = vec![accident("first"), existing, accident("third")];
        let ids = save_new_incidents(&pool, &batch).await.unwrap();
        assert_eq!(ids.len(), 2);

        let first = get_incident(&pool, ids[0]).await.unwrap().unwrap();
        let third = get_incident(&pool, ids[1]).await.unwrap().unwrap();
        assert_eq!(first.message, "first");
        assert_eq!(third.message, "third");
        assert!(ids[0] < ids[1]);
    }

    #[tokio::test]
    async fn natural_key_covers_all_four_fields() {
        let pool = test_pool("natural_key").await;

        let ids = save_new_incidents(&pool, &[accident("one"), accident("two")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let ids = save_new_incidents(&pool, &[accident("same"), accident("same")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        let moved = Incident::new("Accident", 1.3522, 103.8198, "same");
        let relabelled = Incident::new("Obstacle", 1.3521, 103.8198, "same");
        let ids = save_new_incidents(&pool, &[moved, relabelled]).await.unwrap();
        assert_eq!(ids.len(), 2);

        assert_eq!(count_incidents(&pool).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn storage_error_aborts_batch_but_keeps_earlier_rows() {
        let pool = test_pool("failure").await;
        pool.acquire()
            .await
            .exec_raw(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON traffic_incidents
                 WHEN NEW.message = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END",
            )
            .await
            .unwrap();

        let batch = vec![accident("kept"), accident("poison"), accident("never")];
        let result = save_new_incidents(&pool, &batch).await;
        assert!(matches!(result, Err(DbError::Database(_))), "{result:?}");

        let rows = latest_incidents(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "kept");
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let pool = test_pool("empty").await;
        assert!(save_new_incidents(&pool, &[]).await.unwrap().is_empty());
        assert_eq!(count_incidents(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn latest_incidents_are_newest_first_and_limited() {
        let pool = test_pool("latest").await;
        let batch: Vec<Incident> = (0..5).map(|i| accident(&format!("msg {i}"))).collect();
        save_new_incidents(&pool, &batch).await.unwrap();

        let rows = latest_incidents(&pool, 3).await.unwrap();
        let messages: Vec<&str> = rows.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["msg 4", "msg 3", "msg 2"]);

        let row = &rows[0];
        assert_eq!(row.kind, "Accident");
        assert!((row.latitude - 1.3521).abs() < 1e-9);
        assert!(row.impact_score.is_none());
        assert!(row.ai_analysis.is_none());
        assert!(row.created_at.is_some());
    }

    #[tokio::test]
    async fn missing_incident_is_none() {
        let pool = test_pool("missing").await;
        assert!(get_incident(&pool, 42).await.unwrap().is_none());
    }

    #[test]
    fn placeholders_follow_dialect() {
        assert_eq!(SqlDialect::Postgres.placeholder(2), "$2");
        assert_eq!(SqlDialect::Sqlite.placeholder(2), "?");
    }
}
