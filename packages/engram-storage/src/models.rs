//! Row views. Embedding columns are written via SQL casts and intentionally
//! never read back into these structs.

use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct Conversation {
	pub conversation_id: Uuid,
	pub project: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Message {
	pub message_id: Uuid,
	pub conversation_id: Uuid,
	pub role: String,
	pub content: String,
	pub token_count: Option<i32>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct KnowledgeEntry {
	pub entry_id: Uuid,
	pub category: String,
	pub subject: String,
	pub content: String,
	pub confidence: f32,
	pub source_conversation_id: Option<Uuid>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Insight {
	pub insight_id: Uuid,
	pub insight_type: String,
	pub project: Option<String>,
	pub title: String,
	pub content: String,
	pub tags: Vec<String>,
	pub source_conversation_id: Option<Uuid>,
	pub source_task_id: Option<Uuid>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskOutcome {
	pub outcome_id: Uuid,
	pub project: Option<String>,
	pub result: String,
	pub task_description: String,
	pub cause: Option<String>,
	pub fix: Option<String>,
	pub recommendation: Option<String>,
	pub linked_commit: Option<String>,
	pub conversation_id: Option<Uuid>,
	pub tags: Vec<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RepoEvent {
	pub event_id: Uuid,
	pub event_type: String,
	pub repo: String,
	pub project: Option<String>,
	pub git_ref: Option<String>,
	pub author: Option<String>,
	pub title: String,
	pub body: Option<String>,
	pub diff_summary: Option<String>,
	pub url: Option<String>,
	pub event_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct WeeklySummary {
	pub summary_id: Uuid,
	pub week_start: OffsetDateTime,
	pub week_end: OffsetDateTime,
	pub summary: String,
	pub projects_active: Option<String>,
	pub ideas_mentioned: Option<String>,
	pub created_at: OffsetDateTime,
}
