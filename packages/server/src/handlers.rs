//! HTTP handler functions for the read API.

use actix_web::{HttpResponse, web};
use sentinel_ops_database::queries;
use sentinel_ops_server_models::{ApiHealth, ApiIncident, IncidentListParams};

use crate::AppState;

/// `GET /api/health`
///
/// Reports whether the incident store answers a count query.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let incident_count = match queries::count_incidents(&state.pool).await {
        Ok(count) => Some(count),
        Err(e) => {
            log::error!("Health check failed: {e}");
            None
        }
    };

    let body = ApiHealth {
        healthy: incident_count.is_some(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        incident_count,
    };

    if body.healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// `GET /api/incidents`
///
/// Returns the most recently stored incidents, newest first.
pub async fn incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentListParams>,
) -> HttpResponse {
    match queries::latest_incidents(&state.pool, params.effective_limit()).await {
        Ok(rows) => {
            let api_incidents: Vec<ApiIncident> = rows.into_iter().map(ApiIncident::from).collect();
            HttpResponse::Ok().json(api_incidents)
        }
        Err(e) => {
            log::error!("Failed to query incidents: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to query incidents"
            }))
        }
    }
}

/// `GET /api/incidents/{id}`
pub async fn incident(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();

    match queries::get_incident(&state.pool, id).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiIncident::from(row)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Incident {id} not found")
        })),
        Err(e) => {
            log::error!("Failed to load incident {id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to load incident"
            }))
        }
    }
}
