use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use engram_service::{
	CreateConversationRequest, CreateInsightRequest, CreateKnowledgeRequest,
	CreateRepoEventRequest, CreateTaskOutcomeRequest, CreateWeeklySummaryRequest, Error,
	GlobalSummaryRequest, InsightSearchRequest, KnowledgeSearchRequest, ListInsightsRequest,
	ListKnowledgeRequest, ListWeeklySummariesRequest, MessageSearchRequest, OutcomeSearchRequest,
	ReassignProjectRequest, RepoEventSearchRequest, RetrieveRequest, WeeklySummarySearchRequest,
};

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-engram-api-key";

pub fn router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/conversations", post(create_conversation))
		.route("/conversations/{conversation_id}", get(get_conversation))
		.route("/projects/reassign", post(reassign_project))
		.route("/search/messages", post(search_messages))
		.route("/retrieve", post(retrieve))
		.route("/knowledge", post(create_knowledge).get(list_knowledge))
		.route("/knowledge/search", post(search_knowledge))
		.route(
			"/knowledge/{entry_id}",
			get(get_knowledge).put(update_knowledge).delete(delete_knowledge),
		)
		.route("/insights", post(create_insight).get(list_insights))
		.route("/insights/search", post(search_insights))
		.route("/insights/{insight_id}", get(get_insight))
		.route("/task-outcomes", post(create_task_outcome))
		.route("/task-outcomes/search", post(search_task_outcomes))
		.route("/weekly-summaries", post(create_weekly_summary).get(list_weekly_summaries))
		.route("/weekly-summaries/search", post(search_weekly_summaries))
		.route("/weekly-summaries/{summary_id}", get(get_weekly_summary))
		.route("/summaries/global/generate", post(generate_global_summary))
		.route("/repo-events", post(create_repo_event))
		.route("/repo-events/webhook", post(ingest_webhook))
		.route("/repo-events/search", post(search_repo_events))
		.layer(middleware::from_fn_with_state(state.clone(), require_api_key));

	// The health probe stays outside the shared-secret check.
	Router::new().route("/health", get(health)).merge(protected).with_state(state)
}

/// Shared-secret gate. A missing configured token disables the check.
async fn require_api_key(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	if let Some(expected) = state.api_auth_token.as_deref() {
		let provided = req.headers().get(API_KEY_HEADER).and_then(|value| value.to_str().ok());

		if provided != Some(expected) {
			return Err(json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid API key."));
		}
	}

	Ok(next.run(req).await)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_conversation(
	State(state): State<AppState>,
	Json(payload): Json<CreateConversationRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_conversation(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn get_conversation(
	State(state): State<AppState>,
	Path(conversation_id): Path<String>,
) -> Result<Response, ApiError> {
	let response = state.service.get_conversation(&conversation_id).await?;

	Ok(Json(response).into_response())
}

async fn reassign_project(
	State(state): State<AppState>,
	Json(payload): Json<ReassignProjectRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.reassign_project(payload).await?;

	Ok(Json(response).into_response())
}

async fn search_messages(
	State(state): State<AppState>,
	Json(payload): Json<MessageSearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_messages(payload).await?;

	Ok(Json(response).into_response())
}

async fn retrieve(
	State(state): State<AppState>,
	Json(payload): Json<RetrieveRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.retrieve(payload).await?;

	Ok(Json(response).into_response())
}

async fn create_knowledge(
	State(state): State<AppState>,
	Json(payload): Json<CreateKnowledgeRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_knowledge(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn list_knowledge(
	State(state): State<AppState>,
	Query(payload): Query<ListKnowledgeRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.list_knowledge(payload).await?;

	Ok(Json(response).into_response())
}

async fn get_knowledge(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Response, ApiError> {
	let response = state.service.get_knowledge(&entry_id).await?;

	Ok(Json(response).into_response())
}

async fn update_knowledge(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Json(payload): Json<CreateKnowledgeRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.update_knowledge(&entry_id, payload).await?;

	Ok(Json(response).into_response())
}

async fn delete_knowledge(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Response, ApiError> {
	let response = state.service.delete_knowledge(&entry_id).await?;

	Ok(Json(response).into_response())
}

async fn search_knowledge(
	State(state): State<AppState>,
	Json(payload): Json<KnowledgeSearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_knowledge(payload).await?;

	Ok(Json(response).into_response())
}

async fn create_insight(
	State(state): State<AppState>,
	Json(payload): Json<CreateInsightRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_insight(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn list_insights(
	State(state): State<AppState>,
	Query(payload): Query<ListInsightsRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.list_insights(payload).await?;

	Ok(Json(response).into_response())
}

async fn get_insight(
	State(state): State<AppState>,
	Path(insight_id): Path<String>,
) -> Result<Response, ApiError> {
	let response = state.service.get_insight(&insight_id).await?;

	Ok(Json(response).into_response())
}

async fn search_insights(
	State(state): State<AppState>,
	Json(payload): Json<InsightSearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_insights(payload).await?;

	Ok(Json(response).into_response())
}

async fn create_task_outcome(
	State(state): State<AppState>,
	Json(payload): Json<CreateTaskOutcomeRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_task_outcome(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn search_task_outcomes(
	State(state): State<AppState>,
	Json(payload): Json<OutcomeSearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_task_outcomes(payload).await?;

	Ok(Json(response).into_response())
}

async fn create_weekly_summary(
	State(state): State<AppState>,
	Json(payload): Json<CreateWeeklySummaryRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_weekly_summary(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn list_weekly_summaries(
	State(state): State<AppState>,
	Query(payload): Query<ListWeeklySummariesRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.list_weekly_summaries(payload).await?;

	Ok(Json(response).into_response())
}

async fn get_weekly_summary(
	State(state): State<AppState>,
	Path(summary_id): Path<String>,
) -> Result<Response, ApiError> {
	let response = state.service.get_weekly_summary(&summary_id).await?;

	Ok(Json(response).into_response())
}

async fn search_weekly_summaries(
	State(state): State<AppState>,
	Json(payload): Json<WeeklySummarySearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_weekly_summaries(payload).await?;

	Ok(Json(response).into_response())
}

async fn generate_global_summary(
	State(state): State<AppState>,
	Json(payload): Json<GlobalSummaryRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.generate_global_summary(payload).await?;

	Ok(Json(response).into_response())
}

async fn create_repo_event(
	State(state): State<AppState>,
	Json(payload): Json<CreateRepoEventRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.create_repo_event(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn ingest_webhook(
	State(state): State<AppState>,
	Json(payload): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
	let response = state.service.ingest_webhook(payload).await?;

	Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn search_repo_events(
	State(state): State<AppState>,
	Json(payload): Json<RepoEventSearchRequest>,
) -> Result<Response, ApiError> {
	let response = state.service.search_repo_events(payload).await?;

	Ok(Json(response).into_response())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::NotFound { message } => json_error(StatusCode::NOT_FOUND, "not_found", message),
			Error::Configuration { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "configuration", message),
			Error::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message),
			Error::Storage { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
