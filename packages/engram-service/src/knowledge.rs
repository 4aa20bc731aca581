use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use engram_domain::kinds::KnowledgeCategory;
use engram_storage::models::KnowledgeEntry;

use crate::{
	EngramService, Error, Result,
	search::{order_by_distance, order_by_recency, push_eq, recency_query, vector_query},
};

const SELECT_COLUMNS: &str = "\
entry_id, category, subject, content, confidence, source_conversation_id, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateKnowledgeRequest {
	pub category: KnowledgeCategory,
	pub subject: String,
	pub content: String,
	#[serde(default = "default_confidence")]
	pub confidence: f32,
	pub source_conversation_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeView {
	pub entry_id: Uuid,
	pub category: String,
	pub subject: String,
	pub content: String,
	pub confidence: f32,
	pub source_conversation_id: Option<Uuid>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListKnowledgeRequest {
	pub category: Option<KnowledgeCategory>,
	pub subject: Option<String>,
	#[serde(default = "default_list_limit")]
	pub limit: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnowledgeSearchRequest {
	pub query: Option<String>,
	pub category: Option<KnowledgeCategory>,
	#[serde(default = "default_k")]
	pub k: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteKnowledgeResponse {
	pub deleted: bool,
}

fn default_confidence() -> f32 {
	1.0
}

fn default_list_limit() -> i64 {
	50
}

fn default_k() -> i64 {
	10
}

fn embed_text(subject: &str, content: &str) -> String {
	format!("{subject}: {content}")
}

fn view(entry: KnowledgeEntry) -> KnowledgeView {
	KnowledgeView {
		entry_id: entry.entry_id,
		category: entry.category,
		subject: entry.subject,
		content: entry.content,
		confidence: entry.confidence,
		source_conversation_id: entry.source_conversation_id,
		created_at: entry.created_at,
		updated_at: entry.updated_at,
	}
}

impl EngramService {
	pub async fn create_knowledge(&self, req: CreateKnowledgeRequest) -> Result<KnowledgeView> {
		validate_entry(&req)?;

		let now = OffsetDateTime::now_utc();
		let entry_id = Uuid::new_v4();
		let embedding = self.try_embed_one(&embed_text(&req.subject, &req.content)).await;

		sqlx::query(
			"\
INSERT INTO knowledge_entries (
	entry_id, category, subject, content, confidence, source_conversation_id, embedding,
	created_at, updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7::text::vector, $8, $8)",
		)
		.bind(entry_id)
		.bind(req.category.as_str())
		.bind(req.subject.as_str())
		.bind(req.content.as_str())
		.bind(req.confidence)
		.bind(req.source_conversation_id)
		.bind(embedding)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(KnowledgeView {
			entry_id,
			category: req.category.as_str().to_string(),
			subject: req.subject,
			content: req.content,
			confidence: req.confidence,
			source_conversation_id: req.source_conversation_id,
			created_at: now,
			updated_at: now,
		})
	}

	pub async fn get_knowledge(&self, entry_id: &str) -> Result<KnowledgeView> {
		let entry_id = crate::parse_uuid(entry_id, "entry_id")?;
		let sql = format!("SELECT {SELECT_COLUMNS} FROM knowledge_entries WHERE entry_id = $1");
		let entry: Option<KnowledgeEntry> =
			sqlx::query_as(&sql).bind(entry_id).fetch_optional(&self.db.pool).await?;

		entry.map(view).ok_or_else(|| Error::NotFound {
			message: "Knowledge entry not found.".to_string(),
		})
	}

	pub async fn list_knowledge(&self, req: ListKnowledgeRequest) -> Result<Vec<KnowledgeView>> {
		let mut builder = recency_query(SELECT_COLUMNS, "knowledge_entries");

		if let Some(category) = req.category {
			push_eq(&mut builder, "category", category.as_str().to_string());
		}
		if let Some(subject) = req.subject {
			push_eq(&mut builder, "subject", subject);
		}

		order_by_recency(&mut builder, "updated_at", req.limit);

		let entries: Vec<KnowledgeEntry> =
			builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(entries.into_iter().map(view).collect())
	}

	/// Replaces category, subject, content, confidence, and the embedding in
	/// one statement, so readers never see a half-updated entry.
	pub async fn update_knowledge(
		&self,
		entry_id: &str,
		req: CreateKnowledgeRequest,
	) -> Result<KnowledgeView> {
		validate_entry(&req)?;

		let entry_id = crate::parse_uuid(entry_id, "entry_id")?;
		let now = OffsetDateTime::now_utc();
		let embedding = self.try_embed_one(&embed_text(&req.subject, &req.content)).await;
		let sql = format!(
			"\
UPDATE knowledge_entries
SET category = $2, subject = $3, content = $4, confidence = $5, source_conversation_id = $6,
	embedding = $7::text::vector, updated_at = $8
WHERE entry_id = $1
RETURNING {SELECT_COLUMNS}"
		);
		let updated: Option<KnowledgeEntry> = sqlx::query_as(&sql)
			.bind(entry_id)
			.bind(req.category.as_str())
			.bind(req.subject.as_str())
			.bind(req.content.as_str())
			.bind(req.confidence)
			.bind(req.source_conversation_id)
			.bind(embedding)
			.bind(now)
			.fetch_optional(&self.db.pool)
			.await?;

		updated.map(view).ok_or_else(|| Error::NotFound {
			message: "Knowledge entry not found.".to_string(),
		})
	}

	pub async fn delete_knowledge(&self, entry_id: &str) -> Result<DeleteKnowledgeResponse> {
		let entry_id = crate::parse_uuid(entry_id, "entry_id")?;
		let result = sqlx::query("DELETE FROM knowledge_entries WHERE entry_id = $1")
			.bind(entry_id)
			.execute(&self.db.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Error::NotFound { message: "Knowledge entry not found.".to_string() });
		}

		Ok(DeleteKnowledgeResponse { deleted: true })
	}

	pub async fn search_knowledge(&self, req: KnowledgeSearchRequest) -> Result<Vec<KnowledgeView>> {
		match req.query.as_deref().map(str::trim).filter(|query| !query.is_empty()) {
			Some(query) => {
				let vec_text = self.embed_query(query).await?;

				self.knowledge_by_vector(&vec_text, req.category, req.k).await
			},
			None => {
				self.list_knowledge(ListKnowledgeRequest {
					category: req.category,
					subject: None,
					limit: req.k,
				})
				.await
			},
		}
	}

	/// Knowledge is cross-project by design: no project scope here.
	pub(crate) async fn knowledge_by_vector(
		&self,
		vec_text: &str,
		category: Option<KnowledgeCategory>,
		k: i64,
	) -> Result<Vec<KnowledgeView>> {
		let mut builder = vector_query(SELECT_COLUMNS, "knowledge_entries", "embedding", vec_text);

		if let Some(category) = category {
			push_eq(&mut builder, "category", category.as_str().to_string());
		}

		order_by_distance(&mut builder, k);

		let entries: Vec<KnowledgeHit> = builder.build_query_as().fetch_all(&self.db.pool).await?;

		Ok(entries.into_iter().map(|hit| view(hit.entry)).collect())
	}
}

#[derive(Debug, sqlx::FromRow)]
struct KnowledgeHit {
	#[sqlx(flatten)]
	entry: KnowledgeEntry,
	#[allow(dead_code)]
	distance: f32,
}

fn validate_entry(req: &CreateKnowledgeRequest) -> Result<()> {
	if req.subject.trim().is_empty() || req.content.trim().is_empty() {
		return Err(Error::InvalidRequest {
			message: "subject and content must be non-empty.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&req.confidence) {
		// Convention, not a contract: log and store as given.
		tracing::warn!(confidence = req.confidence, "Knowledge confidence outside [0, 1].");
	}

	Ok(())
}
