use axum::{
	Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use triage_service::{
	AutoFillRequest, AutoFillResponse, BacklogReport, Error, IndexIncidentResponse,
	RoutingSettingsView, SimilarRequest, SimilarResponse, SuggestRequest, SuggestResponse,
	UpdateRoutingSettingsRequest,
};
use triage_storage::models::EmbeddingStats;

#[derive(Debug, Serialize)]
struct HealthResponse {
	status: &'static str,
	embeddings: EmbeddingStats,
}

#[derive(Debug, Deserialize)]
struct ProcessBacklogParams {
	batch_size: Option<u32>,
	max_records: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } => {
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None)
			},
			Error::NotFound { message } => {
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None)
			},
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider error.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage error.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message, None)
			},
			err @ Error::Timeout { .. } => {
				tracing::warn!(error = %err, "Request timed out.");

				json_error(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", err.to_string(), None)
			},
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/routing/suggest", post(suggest))
		.route("/v1/routing/auto_fill", post(auto_fill))
		.route("/v1/routing/similar", get(similar))
		.route("/v1/settings/routing", get(get_settings).put(update_settings))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/embeddings/process", post(process_backlog))
		.route("/v1/admin/embeddings/{incident_id}", post(index_incident))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
	let embeddings = state.service.embedding_stats().await?;

	Ok(Json(HealthResponse { status: "ok", embeddings }))
}

async fn suggest(
	State(state): State<AppState>,
	payload: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<SuggestResponse>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.suggest(payload).await?;

	Ok(Json(response))
}

async fn auto_fill(
	State(state): State<AppState>,
	payload: Result<Json<AutoFillRequest>, JsonRejection>,
) -> Result<Json<AutoFillResponse>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.auto_fill(payload).await?;

	Ok(Json(response))
}

async fn similar(
	State(state): State<AppState>,
	params: Result<Query<SimilarRequest>, QueryRejection>,
) -> Result<Json<SimilarResponse>, ApiError> {
	let Query(params) = params?;
	let response = state.service.find_similar(params).await?;

	Ok(Json(response))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<RoutingSettingsView>, ApiError> {
	let response = state.service.get_routing_settings().await?;

	Ok(Json(response))
}

async fn update_settings(
	State(state): State<AppState>,
	payload: Result<Json<UpdateRoutingSettingsRequest>, JsonRejection>,
) -> Result<Json<RoutingSettingsView>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.update_routing_settings(payload).await?;

	Ok(Json(response))
}

async fn process_backlog(
	State(state): State<AppState>,
	params: Result<Query<ProcessBacklogParams>, QueryRejection>,
) -> Result<Json<BacklogReport>, ApiError> {
	let Query(params) = params?;
	let batch_size = params.batch_size.unwrap_or(state.service.cfg.backlog.batch_size);
	let response = state.service.process_embedding_backlog(batch_size, params.max_records).await?;

	Ok(Json(response))
}

async fn index_incident(
	State(state): State<AppState>,
	Path(incident_id): Path<Uuid>,
) -> Result<Json<IndexIncidentResponse>, ApiError> {
	let response = state.service.index_incident(incident_id).await?;

	Ok(Json(response))
}
