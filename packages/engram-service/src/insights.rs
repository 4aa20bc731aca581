use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use engram_domain::kinds::InsightType;
use engram_storage::models::Insight;

use crate::{
	EngramService, Error, Result,
	search::{
		ProjectScope, order_by_distance, order_by_recency, push_eq, push_project_scope,
		recency_query, vector_query,
	},
};

const SELECT_COLUMNS: &str = "\
insight_id, insight_type, project, title, content, tags, source_conversation_id, source_task_id, \
created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateInsightRequest {
	#[serde(rename = "type")]
	pub insight_type: InsightType,
	pub project: Option<String>,
	pub title: String,
	pub content: String,
	/// Comma-separated on the wire, stored as an array.
	pub tags: Option<String>,
	pub source_conversation_id: Option<Uuid>,
	pub source_task_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsightView {
	pub insight_id: Uuid,
	#[serde(rename = "type")]
	pub insight_type: String,
	pub project: Option<String>,
	pub title: String,
	pub content: String,
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListInsightsRequest {
	pub project: Option<String>,
	#[serde(rename = "type")]
	pub insight_type: Option<InsightType>,
	#[serde(default = "default_list_limit")]
	pub limit: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsightSearchRequest {
	pub query: Option<String>,
	pub project: Option<String>,
	#[serde(rename = "type")]
	pub insight_type: Option<InsightType>,
	#[serde(default = "crate::default_true")]
	pub include_general: bool,
	#[serde(default = "default_k")]
	pub k: i64,
}

fn default_list_limit() -> i64 {
	50
}

fn default_k() -> i64 {
	10
}

pub(crate) fn split_tags(tags: Option<&str>) -> Vec<String> {
	tags.map(|raw| {
		raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_string).collect()
	})
	.unwrap_or_default()
}

fn view(insight: Insight) -> InsightView {
	InsightView {
		insight_id: insight.insight_id,
		insight_type: insight.insight_type,
		project: insight.project,
		title: insight.title,
		content: insight.content,
		tags: insight.tags,
		created_at: insight.created_at,
		updated_at: insight.updated_at,
	}
}

impl EngramService {
	pub async fn create_insight(&self, req: CreateInsightRequest) -> Result<InsightView> {
		if req.title.trim().is_empty() || req.content.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "title and content must be non-empty.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let insight_id = Uuid::new_v4();
		let tags = split_tags(req.tags.as_deref());
		let embedding = self.try_embed_one(&format!("{}\n{}", req.title, req.content)).await;

		sqlx::query(
			"\
INSERT INTO insights (
	insight_id, insight_type, project, title, content, tags, source_conversation_id,
	source_task_id, embedding, created_at, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::text::vector, $10, $10)",
		)
		.bind(insight_id)
		.bind(req.insight_type.as_str())
		.bind(req.project.as_deref())
		.bind(req.title.as_str())
		.bind(req.content.as_str())
		.bind(&tags)
		.bind(req.source_conversation_id)
		.bind(req.source_task_id)
		.bind(embedding)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(InsightView {
			insight_id,
			insight_type: req.insight_type.as_str().to_string(),
			project: req.project,
			title: req.title,
			content: req.content,
			tags,
			created_at: now,
			updated_at: now,
		})
	}

	pub async fn get_insight(&self, insight_id: &str) -> Result<InsightView> {
		let insight_id = crate::parse_uuid(insight_id, "insight_id")?;
		let sql = format!("SELECT {SELECT_COLUMNS} FROM insights WHERE insight_id = $1");
		let insight: Option<Insight> =
			sqlx::query_as(&sql).bind(insight_id).fetch_optional(&self.db.pool).await?;

		insight
			.map(view)
			.ok_or_else(|| Error::NotFound { message: "Insight not found.".to_string() })
	}

	pub async fn list_insights(&self, req: ListInsightsRequest) -> Result<Vec<InsightView>> {
		let mut builder = recency_query(SELECT_COLUMNS, "insights");

		if let Some(project) = req.project {
			push_eq(&mut builder, "project", project);
		}
		if let Some(insight_type) = req.insight_type {
			push_eq(&mut builder, "insight_type", insight_type.as_str().to_string());
		}

		order_by_recency(&mut builder, "created_at", req.limit);

		let insights: Vec<Insight> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(insights.into_iter().map(view).collect())
	}

	pub async fn search_insights(&self, req: InsightSearchRequest) -> Result<Vec<InsightView>> {
		let scope =
			ProjectScope { project: req.project.as_deref(), include_general: req.include_general };

		match req.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
			Some(query) => {
				let vec_text = self.embed_query(query).await?;

				self.insights_by_vector(&vec_text, scope, req.insight_type, req.k).await
			},
			None => {
				let mut builder = recency_query(SELECT_COLUMNS, "insights");

				push_project_scope(&mut builder, "project", scope);

				if let Some(insight_type) = req.insight_type {
					push_eq(&mut builder, "insight_type", insight_type.as_str().to_string());
				}

				order_by_recency(&mut builder, "created_at", req.k);

				let insights: Vec<Insight> =
					builder.build_query_as().fetch_all(&self.db.pool).await?;

				Ok(insights.into_iter().map(view).collect())
			},
		}
	}

	pub(crate) async fn insights_by_vector(
		&self,
		vec_text: &str,
		scope: ProjectScope<'_>,
		insight_type: Option<InsightType>,
		k: i64,
	) -> Result<Vec<InsightView>> {
		let mut builder = vector_query(SELECT_COLUMNS, "insights", "embedding", vec_text);

		push_project_scope(&mut builder, "project", scope);

		if let Some(insight_type) = insight_type {
			push_eq(&mut builder, "insight_type", insight_type.as_str().to_string());
		}

		order_by_distance(&mut builder, k);

		let hits: Vec<InsightHit> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(hits.into_iter().map(|hit| view(hit.insight)).collect())
	}
}

#[derive(Debug, sqlx::FromRow)]
struct InsightHit {
	#[sqlx(flatten)]
	insight: Insight,
	#[allow(dead_code)]
	distance: f32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tags_split_on_commas_and_trim() {
		assert_eq!(split_tags(Some("a, b ,, c ")), vec!["a", "b", "c"]);
		assert!(split_tags(None).is_empty());
		assert!(split_tags(Some(" , ")).is_empty());
	}
}
