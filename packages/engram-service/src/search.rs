//! Shared query assembly for per-type search.
//!
//! Every record type searches the same way: a nearest-neighbor query over its
//! embedding column when query text is given, a recency scan otherwise, with
//! the same project-scope filter semantics. The helpers here are the single
//! implementation both paths share; record modules only supply their column
//! lists and extra equality filters.

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{EngramService, Result, clamp_limit, distance_to_score};

#[derive(Clone, Copy, Debug)]
pub(crate) struct ProjectScope<'a> {
	pub project: Option<&'a str>,
	pub include_general: bool,
}

/// No project filter when the scope is unset; otherwise equality, optionally
/// widened to rows with a NULL project (general records).
pub(crate) fn push_project_scope(
	builder: &mut QueryBuilder<'_, Postgres>,
	column: &str,
	scope: ProjectScope<'_>,
) {
	let Some(project) = scope.project else {
		return;
	};

	if scope.include_general {
		builder.push(format!(" AND ({column} = "));
		builder.push_bind(project.to_string());
		builder.push(format!(" OR {column} IS NULL)"));
	} else {
		builder.push(format!(" AND {column} = "));
		builder.push_bind(project.to_string());
	}
}

pub(crate) fn push_eq(builder: &mut QueryBuilder<'_, Postgres>, column: &str, value: String) {
	builder.push(format!(" AND {column} = "));
	builder.push_bind(value);
}

/// Starts a nearest-neighbor query. Distance is selected so callers can turn
/// it into a display score at assembly; ordering uses the raw distance.
pub(crate) fn vector_query(
	select: &str,
	from: &str,
	embedding_column: &str,
	vec_text: &str,
) -> QueryBuilder<'static, Postgres> {
	let mut builder = QueryBuilder::new(format!("SELECT {select}, ({embedding_column} <-> "));

	builder.push_bind(vec_text.to_string());
	builder.push(format!(
		"::text::vector)::real AS distance FROM {from} WHERE {embedding_column} IS NOT NULL"
	));

	builder
}

pub(crate) fn order_by_distance(builder: &mut QueryBuilder<'_, Postgres>, limit: i64) {
	builder.push(" ORDER BY distance LIMIT ");
	builder.push_bind(clamp_limit(limit));
}

pub(crate) fn recency_query(select: &str, from: &str) -> QueryBuilder<'static, Postgres> {
	QueryBuilder::new(format!("SELECT {select} FROM {from} WHERE TRUE"))
}

pub(crate) fn order_by_recency(
	builder: &mut QueryBuilder<'_, Postgres>,
	column: &str,
	limit: i64,
) {
	builder.push(format!(" ORDER BY {column} DESC LIMIT "));
	builder.push_bind(clamp_limit(limit));
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageHit {
	pub message_id: Uuid,
	pub conversation_id: Uuid,
	pub role: String,
	pub content: String,
	pub distance: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageSearchRequest {
	pub query: String,
	pub project: Option<String>,
	#[serde(default = "crate::default_true")]
	pub include_general: bool,
	#[serde(default = "default_k")]
	pub k: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageHitView {
	pub message_id: Uuid,
	pub conversation_id: Uuid,
	pub role: String,
	pub content: String,
	pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageSearchResponse {
	pub hits: Vec<MessageHitView>,
}

fn default_k() -> i64 {
	8
}

impl EngramService {
	pub async fn search_messages(&self, req: MessageSearchRequest) -> Result<MessageSearchResponse> {
		if req.query.trim().is_empty() {
			return Err(crate::Error::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let vec_text = self.embed_query(&req.query).await?;
		let scope =
			ProjectScope { project: req.project.as_deref(), include_general: req.include_general };
		let hits = self.messages_by_vector(&vec_text, scope, req.k).await?;

		Ok(MessageSearchResponse { hits: hits.into_iter().map(message_hit_view).collect() })
	}

	/// Message rows ranked by distance. Project scope lives on the owning
	/// conversation, hence the join.
	pub(crate) async fn messages_by_vector(
		&self,
		vec_text: &str,
		scope: ProjectScope<'_>,
		k: i64,
	) -> Result<Vec<MessageHit>> {
		let mut builder = vector_query(
			"m.message_id, m.conversation_id, m.role, m.content",
			"messages m JOIN conversations c ON c.conversation_id = m.conversation_id",
			"m.embedding",
			vec_text,
		);

		push_project_scope(&mut builder, "c.project", scope);
		order_by_distance(&mut builder, k);

		Ok(builder.build_query_as().fetch_all(&self.db.pool).await?)
	}
}

pub(crate) fn message_hit_view(hit: MessageHit) -> MessageHitView {
	MessageHitView {
		message_id: hit.message_id,
		conversation_id: hit.conversation_id,
		role: hit.role,
		content: hit.content,
		score: distance_to_score(hit.distance),
	}
}
