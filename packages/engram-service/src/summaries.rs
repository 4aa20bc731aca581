use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use engram_storage::models::WeeklySummary;

use crate::{
	EngramService, Error, Result,
	search::{order_by_distance, order_by_recency, recency_query, vector_query},
};

const SELECT_COLUMNS: &str = "\
summary_id, week_start, week_end, summary, projects_active, ideas_mentioned, created_at";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateWeeklySummaryRequest {
	#[serde(with = "crate::time_serde")]
	pub week_start: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub week_end: OffsetDateTime,
	pub summary: String,
	pub projects_active: Option<Vec<String>>,
	pub ideas_mentioned: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeeklySummaryView {
	pub summary_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub week_start: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub week_end: OffsetDateTime,
	pub summary: String,
	pub projects_active: Option<String>,
	pub ideas_mentioned: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListWeeklySummariesRequest {
	#[serde(default = "default_list_limit")]
	pub limit: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeeklySummarySearchRequest {
	pub query: Option<String>,
	#[serde(default = "default_k")]
	pub k: i64,
}

fn default_list_limit() -> i64 {
	50
}

fn default_k() -> i64 {
	5
}

fn join_list(list: Option<Vec<String>>) -> Option<String> {
	list.filter(|items| !items.is_empty()).map(|items| items.join(","))
}

fn view(summary: WeeklySummary) -> WeeklySummaryView {
	WeeklySummaryView {
		summary_id: summary.summary_id,
		week_start: summary.week_start,
		week_end: summary.week_end,
		summary: summary.summary,
		projects_active: summary.projects_active,
		ideas_mentioned: summary.ideas_mentioned,
		created_at: summary.created_at,
	}
}

impl EngramService {
	pub async fn create_weekly_summary(
		&self,
		req: CreateWeeklySummaryRequest,
	) -> Result<WeeklySummaryView> {
		if req.summary.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "summary must be non-empty.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let summary_id = Uuid::new_v4();
		let embedding = self.try_embed_one(&req.summary).await;
		let projects_active = join_list(req.projects_active);
		let ideas_mentioned = join_list(req.ideas_mentioned);

		sqlx::query(
			"\
INSERT INTO weekly_summaries (
	summary_id, week_start, week_end, summary, projects_active, ideas_mentioned, embedding,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7::text::vector, $8)",
		)
		.bind(summary_id)
		.bind(req.week_start)
		.bind(req.week_end)
		.bind(req.summary.as_str())
		.bind(projects_active.as_deref())
		.bind(ideas_mentioned.as_deref())
		.bind(embedding)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(WeeklySummaryView {
			summary_id,
			week_start: req.week_start,
			week_end: req.week_end,
			summary: req.summary,
			projects_active,
			ideas_mentioned,
			created_at: now,
		})
	}

	pub async fn list_weekly_summaries(
		&self,
		req: ListWeeklySummariesRequest,
	) -> Result<Vec<WeeklySummaryView>> {
		let mut builder = recency_query(SELECT_COLUMNS, "weekly_summaries");

		order_by_recency(&mut builder, "week_start", req.limit);

		let summaries: Vec<WeeklySummary> =
			builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(summaries.into_iter().map(view).collect())
	}

	pub async fn get_weekly_summary(&self, summary_id: &str) -> Result<WeeklySummaryView> {
		let summary_id = crate::parse_uuid(summary_id, "summary_id")?;
		let sql = format!("SELECT {SELECT_COLUMNS} FROM weekly_summaries WHERE summary_id = $1");
		let summary: Option<WeeklySummary> =
			sqlx::query_as(&sql).bind(summary_id).fetch_optional(&self.db.pool).await?;

		summary
			.map(view)
			.ok_or_else(|| Error::NotFound { message: "Weekly summary not found.".to_string() })
	}

	pub async fn search_weekly_summaries(
		&self,
		req: WeeklySummarySearchRequest,
	) -> Result<Vec<WeeklySummaryView>> {
		match req.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
			Some(query) => {
				let vec_text = self.embed_query(query).await?;

				self.summaries_by_vector(&vec_text, req.k).await
			},
			None => self.list_weekly_summaries(ListWeeklySummariesRequest { limit: req.k }).await,
		}
	}

	/// Summaries span all projects; never project-scoped.
	pub(crate) async fn summaries_by_vector(
		&self,
		vec_text: &str,
		k: i64,
	) -> Result<Vec<WeeklySummaryView>> {
		let mut builder = vector_query(SELECT_COLUMNS, "weekly_summaries", "embedding", vec_text);

		order_by_distance(&mut builder, k);

		let hits: Vec<SummaryHit> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(hits.into_iter().map(|hit| view(hit.summary)).collect())
	}
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryHit {
	#[sqlx(flatten)]
	summary: WeeklySummary,
	#[allow(dead_code)]
	distance: f32,
}
