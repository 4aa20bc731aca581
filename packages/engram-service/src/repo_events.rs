use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::datetime};
use uuid::Uuid;

use engram_domain::kinds::RepoEventType;
use engram_storage::models::RepoEvent;

use crate::{
	EngramService, Error, Result,
	search::{
		ProjectScope, order_by_distance, order_by_recency, push_eq, push_project_scope,
		recency_query, vector_query,
	},
};

const SELECT_COLUMNS: &str = "\
event_id, event_type, repo, project, git_ref, author, title, body, diff_summary, url, event_at, \
created_at";

/// Stand-in for provider timestamps that are missing or unparsable.
const FALLBACK_EVENT_AT: OffsetDateTime = datetime!(2000-01-01 0:00 UTC);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRepoEventRequest {
	pub event_type: RepoEventType,
	pub repo: String,
	pub project: Option<String>,
	pub git_ref: Option<String>,
	pub author: Option<String>,
	pub title: String,
	pub body: Option<String>,
	pub diff_summary: Option<String>,
	pub url: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub event_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoEventView {
	pub event_id: Uuid,
	pub event_type: String,
	pub repo: String,
	pub project: Option<String>,
	pub git_ref: Option<String>,
	pub author: Option<String>,
	pub title: String,
	pub body: Option<String>,
	pub url: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub event_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoEventSearchRequest {
	pub query: Option<String>,
	pub repo: Option<String>,
	pub project: Option<String>,
	pub event_type: Option<RepoEventType>,
	#[serde(default = "crate::default_true")]
	pub include_general: bool,
	#[serde(default = "default_k")]
	pub k: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
	pub ingested: usize,
}

fn default_k() -> i64 {
	20
}

/// One record mapped out of a raw webhook payload, before persistence.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WebhookEvent {
	pub event_type: RepoEventType,
	pub repo: String,
	pub git_ref: Option<String>,
	pub author: Option<String>,
	pub title: String,
	pub body: Option<String>,
	pub url: Option<String>,
	pub event_at: OffsetDateTime,
}

fn view(event: RepoEvent) -> RepoEventView {
	RepoEventView {
		event_id: event.event_id,
		event_type: event.event_type,
		repo: event.repo,
		project: event.project,
		git_ref: event.git_ref,
		author: event.author,
		title: event.title,
		body: event.body,
		url: event.url,
		event_at: event.event_at,
		created_at: event.created_at,
	}
}

fn embed_text(title: &str, body: Option<&str>) -> String {
	match body {
		Some(body) if !body.trim().is_empty() => format!("{title}\n{body}"),
		_ => title.to_string(),
	}
}

fn str_field(value: &Value, key: &str) -> Option<String> {
	value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_event_at(raw: Option<&str>) -> OffsetDateTime {
	raw.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok()).unwrap_or(FALLBACK_EVENT_AT)
}

/// Recognizes the three provider payload shapes. Anything else maps to no
/// events, which the webhook endpoint reports as `ingested: 0`.
pub(crate) fn map_webhook_payload(payload: &Value) -> Vec<WebhookEvent> {
	let repo = payload
		.get("repository")
		.and_then(|repository| repository.get("full_name"))
		.and_then(Value::as_str)
		.unwrap_or("")
		.to_string();

	if let Some(commits) = payload.get("commits").and_then(Value::as_array) {
		let git_ref = str_field(payload, "ref");

		return commits
			.iter()
			.map(|commit| {
				let message = commit.get("message").and_then(Value::as_str).unwrap_or("");
				let author = commit
					.get("author")
					.and_then(|author| {
						str_field(author, "username").or_else(|| str_field(author, "name"))
					});

				WebhookEvent {
					event_type: RepoEventType::Commit,
					repo: repo.clone(),
					git_ref: git_ref.clone(),
					author,
					title: message.lines().next().unwrap_or("").to_string(),
					body: Some(message.to_string()),
					url: str_field(commit, "url"),
					event_at: parse_event_at(
						commit.get("timestamp").and_then(Value::as_str),
					),
				}
			})
			.collect();
	}

	if let Some(pr) = payload.get("pull_request") {
		let event_at = pr
			.get("updated_at")
			.and_then(Value::as_str)
			.or_else(|| pr.get("created_at").and_then(Value::as_str));

		return vec![WebhookEvent {
			event_type: RepoEventType::Pr,
			repo,
			git_ref: pr.get("head").and_then(|head| str_field(head, "ref")),
			author: pr.get("user").and_then(|user| str_field(user, "login")),
			title: pr.get("title").and_then(Value::as_str).unwrap_or("").to_string(),
			body: str_field(pr, "body"),
			url: str_field(pr, "html_url"),
			event_at: parse_event_at(event_at),
		}];
	}

	if let Some(release) = payload.get("release") {
		let title = str_field(release, "name")
			.or_else(|| str_field(release, "tag_name"))
			.unwrap_or_default();
		let event_at = release
			.get("published_at")
			.and_then(Value::as_str)
			.or_else(|| release.get("created_at").and_then(Value::as_str));

		return vec![WebhookEvent {
			event_type: RepoEventType::Release,
			repo,
			git_ref: str_field(release, "tag_name"),
			author: release.get("author").and_then(|author| str_field(author, "login")),
			title,
			body: str_field(release, "body"),
			url: str_field(release, "html_url"),
			event_at: parse_event_at(event_at),
		}];
	}

	Vec::new()
}

impl EngramService {
	pub async fn create_repo_event(&self, req: CreateRepoEventRequest) -> Result<RepoEventView> {
		if req.repo.trim().is_empty() || req.title.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "repo and title must be non-empty.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let event_id = Uuid::new_v4();
		let embedding = self.try_embed_one(&embed_text(&req.title, req.body.as_deref())).await;

		sqlx::query(
			"\
INSERT INTO repo_events (
	event_id, event_type, repo, project, git_ref, author, title, body, diff_summary, url,
	embedding, event_at, created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::text::vector, $12, $13)",
		)
		.bind(event_id)
		.bind(req.event_type.as_str())
		.bind(req.repo.as_str())
		.bind(req.project.as_deref())
		.bind(req.git_ref.as_deref())
		.bind(req.author.as_deref())
		.bind(req.title.as_str())
		.bind(req.body.as_deref())
		.bind(req.diff_summary.as_deref())
		.bind(req.url.as_deref())
		.bind(embedding)
		.bind(req.event_at)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(RepoEventView {
			event_id,
			event_type: req.event_type.as_str().to_string(),
			repo: req.repo,
			project: req.project,
			git_ref: req.git_ref,
			author: req.author,
			title: req.title,
			body: req.body,
			url: req.url,
			event_at: req.event_at,
			created_at: now,
		})
	}

	/// Ingests a raw provider webhook payload. Embedding degradation is
	/// per-record: one event failing to embed nulls only its own vector.
	pub async fn ingest_webhook(&self, payload: Value) -> Result<WebhookResponse> {
		let events = map_webhook_payload(&payload);
		let now = OffsetDateTime::now_utc();
		let mut ingested = 0_usize;

		for event in events {
			let embedding =
				self.try_embed_one(&embed_text(&event.title, event.body.as_deref())).await;

			sqlx::query(
				"\
INSERT INTO repo_events (
	event_id, event_type, repo, project, git_ref, author, title, body, diff_summary, url,
	embedding, event_at, created_at
)
VALUES ($1, $2, $3, NULL, $4, $5, $6, $7, NULL, $8, $9::text::vector, $10, $11)",
			)
			.bind(Uuid::new_v4())
			.bind(event.event_type.as_str())
			.bind(event.repo.as_str())
			.bind(event.git_ref.as_deref())
			.bind(event.author.as_deref())
			.bind(event.title.as_str())
			.bind(event.body.as_deref())
			.bind(event.url.as_deref())
			.bind(embedding)
			.bind(event.event_at)
			.bind(now)
			.execute(&self.db.pool)
			.await?;

			ingested += 1;
		}

		Ok(WebhookResponse { ingested })
	}

	pub async fn search_repo_events(
		&self,
		req: RepoEventSearchRequest,
	) -> Result<Vec<RepoEventView>> {
		let scope =
			ProjectScope { project: req.project.as_deref(), include_general: req.include_general };

		match req.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
			Some(query) => {
				let vec_text = self.embed_query(query).await?;
				let mut builder =
					vector_query(SELECT_COLUMNS, "repo_events", "embedding", &vec_text);

				push_repo_filters(&mut builder, &req, scope);
				order_by_distance(&mut builder, req.k);

				let hits: Vec<RepoEventHit> =
					builder.build_query_as().fetch_all(&self.db.pool).await?;

				Ok(hits.into_iter().map(|hit| view(hit.event)).collect())
			},
			None => {
				let mut builder = recency_query(SELECT_COLUMNS, "repo_events");

				push_repo_filters(&mut builder, &req, scope);
				order_by_recency(&mut builder, "event_at", req.k);

				let events: Vec<RepoEvent> =
					builder.build_query_as().fetch_all(&self.db.pool).await?;

				Ok(events.into_iter().map(view).collect())
			},
		}
	}
}

fn push_repo_filters(
	builder: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
	req: &RepoEventSearchRequest,
	scope: ProjectScope<'_>,
) {
	push_project_scope(builder, "project", scope);

	if let Some(repo) = req.repo.as_deref() {
		push_eq(builder, "repo", repo.to_string());
	}
	if let Some(event_type) = req.event_type {
		push_eq(builder, "event_type", event_type.as_str().to_string());
	}
}

#[derive(Debug, sqlx::FromRow)]
struct RepoEventHit {
	#[sqlx(flatten)]
	event: RepoEvent,
	#[allow(dead_code)]
	distance: f32,
}
