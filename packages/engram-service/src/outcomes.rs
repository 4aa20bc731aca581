use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use engram_domain::kinds::TaskResult;
use engram_storage::models::TaskOutcome;

use crate::{
	EngramService, Error, Result, insights::split_tags,
	search::{
		ProjectScope, order_by_distance, order_by_recency, push_eq, push_project_scope,
		recency_query, vector_query,
	},
};

const SELECT_COLUMNS: &str = "\
outcome_id, project, result, task_description, cause, fix, recommendation, linked_commit, \
conversation_id, tags, created_at";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTaskOutcomeRequest {
	pub project: Option<String>,
	pub conversation_id: Option<Uuid>,
	pub task_description: String,
	pub result: TaskResult,
	pub cause: Option<String>,
	pub fix: Option<String>,
	pub recommendation: Option<String>,
	pub linked_commit: Option<String>,
	/// Comma-separated on the wire, stored as an array.
	pub tags: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOutcomeView {
	pub outcome_id: Uuid,
	pub project: Option<String>,
	pub result: String,
	pub task_description: String,
	pub cause: Option<String>,
	pub fix: Option<String>,
	pub recommendation: Option<String>,
	pub linked_commit: Option<String>,
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutcomeSearchRequest {
	pub query: Option<String>,
	pub project: Option<String>,
	pub result: Option<TaskResult>,
	#[serde(default = "crate::default_true")]
	pub include_general: bool,
	#[serde(default = "default_k")]
	pub k: i64,
}

fn default_k() -> i64 {
	10
}

fn view(outcome: TaskOutcome) -> TaskOutcomeView {
	TaskOutcomeView {
		outcome_id: outcome.outcome_id,
		project: outcome.project,
		result: outcome.result,
		task_description: outcome.task_description,
		cause: outcome.cause,
		fix: outcome.fix,
		recommendation: outcome.recommendation,
		linked_commit: outcome.linked_commit,
		tags: outcome.tags,
		created_at: outcome.created_at,
	}
}

impl EngramService {
	pub async fn create_task_outcome(
		&self,
		req: CreateTaskOutcomeRequest,
	) -> Result<TaskOutcomeView> {
		if req.task_description.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "task_description must be non-empty.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let outcome_id = Uuid::new_v4();
		let tags = split_tags(req.tags.as_deref());
		let embedding = self.try_embed_one(&req.task_description).await;

		sqlx::query(
			"\
INSERT INTO task_outcomes (
	outcome_id, project, result, task_description, cause, fix, recommendation, linked_commit,
	conversation_id, tags, embedding, created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::text::vector, $12)",
		)
		.bind(outcome_id)
		.bind(req.project.as_deref())
		.bind(req.result.as_str())
		.bind(req.task_description.as_str())
		.bind(req.cause.as_deref())
		.bind(req.fix.as_deref())
		.bind(req.recommendation.as_deref())
		.bind(req.linked_commit.as_deref())
		.bind(req.conversation_id)
		.bind(&tags)
		.bind(embedding)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(TaskOutcomeView {
			outcome_id,
			project: req.project,
			result: req.result.as_str().to_string(),
			task_description: req.task_description,
			cause: req.cause,
			fix: req.fix,
			recommendation: req.recommendation,
			linked_commit: req.linked_commit,
			tags,
			created_at: now,
		})
	}

	pub async fn search_task_outcomes(
		&self,
		req: OutcomeSearchRequest,
	) -> Result<Vec<TaskOutcomeView>> {
		let scope =
			ProjectScope { project: req.project.as_deref(), include_general: req.include_general };

		match req.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
			Some(query) => {
				let vec_text = self.embed_query(query).await?;

				self.outcomes_by_vector(&vec_text, scope, req.result, req.k).await
			},
			None => {
				let mut builder = recency_query(SELECT_COLUMNS, "task_outcomes");

				push_project_scope(&mut builder, "project", scope);

				if let Some(result) = req.result {
					push_eq(&mut builder, "result", result.as_str().to_string());
				}

				order_by_recency(&mut builder, "created_at", req.k);

				let outcomes: Vec<TaskOutcome> =
					builder.build_query_as().fetch_all(&self.db.pool).await?;

				Ok(outcomes.into_iter().map(view).collect())
			},
		}
	}

	pub(crate) async fn outcomes_by_vector(
		&self,
		vec_text: &str,
		scope: ProjectScope<'_>,
		result: Option<TaskResult>,
		k: i64,
	) -> Result<Vec<TaskOutcomeView>> {
		let mut builder = vector_query(SELECT_COLUMNS, "task_outcomes", "embedding", vec_text);

		push_project_scope(&mut builder, "project", scope);

		if let Some(result) = result {
			push_eq(&mut builder, "result", result.as_str().to_string());
		}

		order_by_distance(&mut builder, k);

		let hits: Vec<OutcomeHit> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(hits.into_iter().map(|hit| view(hit.outcome)).collect())
	}
}

#[derive(Debug, sqlx::FromRow)]
struct OutcomeHit {
	#[sqlx(flatten)]
	outcome: TaskOutcome,
	#[allow(dead_code)]
	distance: f32,
}
