use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::{
    country_from_headers, extract_client_ip, hash_visitor, AggregateQuery, StatsEngine,
    StatsError, StatsPayload,
};
use crate::config::VisitorConfig;
use crate::models::{NewVisit, RecordOutcome, RecordVisitRequest};

pub struct AppState {
    pub engine: Arc<StatsEngine>,
    pub visitor: VisitorConfig,
}

/// Envelope understood by the embedded widget
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: StatsError, action: &str) -> ApiError {
    match err {
        StatsError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        ),
        StatsError::Store(e) => {
            tracing::error!(error = %e, "{action} failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Failed to {action}"),
                }),
            )
        }
    }
}

/// Extractor failures keep axum's status but use the JSON envelope
fn rejection_response(status: StatusCode, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub path: Option<String>,
    pub days: Option<i64>,
}

/// Record a page view
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    payload: Result<Json<RecordVisitRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RecordOutcome>>, ApiError> {
    let Json(payload) = payload.map_err(|r| rejection_response(r.status(), r.body_text()))?;
    let path = payload.path.unwrap_or_default();

    let socket_ip = connect_info.map(|Extension(ConnectInfo(addr))| addr.ip());
    let client_ip = extract_client_ip(&headers, socket_ip, &state.visitor);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let visit = NewVisit {
        visitor_hash: hash_visitor(client_ip, &user_agent, &state.visitor.hash_salt),
        path,
        user_agent,
        referrer: payload.referrer.filter(|r| !r.is_empty()),
        country: country_from_headers(&headers),
    };

    let outcome = state
        .engine
        .record_visit(visit)
        .await
        .map_err(|e| error_response(e, "record visit"))?;

    let message = if outcome.recorded {
        "Visit recorded successfully"
    } else {
        "Visit already recorded recently"
    };
    Ok(ApiResponse::ok(message, outcome))
}

/// Summary, daily, page or recent statistics depending on `type`
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    params: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<StatsPayload>>, ApiError> {
    let Query(params) = params.map_err(|r| rejection_response(r.status(), r.body_text()))?;
    let query =
        AggregateQuery::from_params(params.kind.as_deref(), params.path.as_deref(), params.days)
            .map_err(|e| error_response(e, "parse stats query"))?;

    let payload = state
        .engine
        .execute(&query)
        .await
        .map_err(|e| error_response(e, "fetch stats"))?;

    Ok(ApiResponse::ok("Success", payload))
}

/// Health check endpoint
pub async fn health_check() -> Json<ApiResponse<()>> {
    ApiResponse::ok("OK", ())
}
