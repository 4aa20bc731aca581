use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use engram_domain::kinds::MessageRole;
use engram_storage::models::{Conversation, Message};

use crate::{EngramService, Error, ExtractReport, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageIn {
	pub role: MessageRole,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateConversationRequest {
	pub project: Option<String>,
	pub title: Option<String>,
	pub messages: Vec<MessageIn>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationView {
	pub conversation_id: Uuid,
	pub project: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateConversationResponse {
	pub conversation: ConversationView,
	/// Telemetry from the best-effort extraction pass, not a guarantee.
	pub extraction: ExtractReport,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageView {
	pub message_id: Uuid,
	pub role: String,
	pub content: String,
	pub token_count: Option<i32>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationDetail {
	pub conversation_id: Uuid,
	pub project: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub messages: Vec<MessageView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReassignProjectRequest {
	pub conversation_id: String,
	pub project: Option<String>,
}

impl EngramService {
	/// Ingests a conversation with its messages, then runs the best-effort
	/// extraction pass over the committed rows.
	pub async fn create_conversation(
		&self,
		req: CreateConversationRequest,
	) -> Result<CreateConversationResponse> {
		let now = OffsetDateTime::now_utc();
		let conversation_id = Uuid::new_v4();
		let contents: Vec<String> = req.messages.iter().map(|m| m.content.clone()).collect();
		// One batch embedding call for the whole ingest; a failure stores the
		// messages without vectors rather than failing the write.
		let embeddings = self.try_embed_batch(&contents).await;
		let mut tx = self.db.pool.begin().await?;

		sqlx::query(
			"\
INSERT INTO conversations (conversation_id, project, title, summary, created_at, updated_at)
VALUES ($1, $2, $3, NULL, $4, $4)",
		)
		.bind(conversation_id)
		.bind(req.project.as_deref())
		.bind(req.title.as_deref())
		.bind(now)
		.execute(&mut *tx)
		.await?;

		for (message, embedding) in req.messages.iter().zip(embeddings) {
			sqlx::query(
				"\
INSERT INTO messages (message_id, conversation_id, role, content, embedding, token_count, created_at)
VALUES ($1, $2, $3, $4, $5::text::vector, $6, $7)",
			)
			.bind(Uuid::new_v4())
			.bind(conversation_id)
			.bind(message.role.as_str())
			.bind(message.content.as_str())
			.bind(embedding)
			.bind(self.count_tokens(&message.content))
			.bind(now)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		let transcript: Vec<(String, String)> = req
			.messages
			.iter()
			.map(|m| (m.role.as_str().to_string(), m.content.clone()))
			.collect();
		let extraction =
			self.auto_extract(conversation_id, req.project.as_deref(), &transcript).await;
		let conversation = ConversationView {
			conversation_id,
			project: req.project,
			title: req.title,
			summary: None,
			created_at: now,
			updated_at: now,
		};

		Ok(CreateConversationResponse { conversation, extraction })
	}

	pub async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationDetail> {
		let conversation_id = crate::parse_uuid(conversation_id, "conversation_id")?;
		let conversation: Option<Conversation> = sqlx::query_as(
			"\
SELECT conversation_id, project, title, summary, created_at, updated_at
FROM conversations
WHERE conversation_id = $1",
		)
		.bind(conversation_id)
		.fetch_optional(&self.db.pool)
		.await?;
		let Some(conversation) = conversation else {
			return Err(Error::NotFound { message: "Conversation not found.".to_string() });
		};
		let messages: Vec<Message> = sqlx::query_as(
			"\
SELECT message_id, conversation_id, role, content, token_count, created_at
FROM messages
WHERE conversation_id = $1
ORDER BY created_at ASC",
		)
		.bind(conversation_id)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(ConversationDetail {
			conversation_id: conversation.conversation_id,
			project: conversation.project,
			title: conversation.title,
			summary: conversation.summary,
			created_at: conversation.created_at,
			updated_at: conversation.updated_at,
			messages: messages
				.into_iter()
				.map(|m| MessageView {
					message_id: m.message_id,
					role: m.role,
					content: m.content,
					token_count: m.token_count,
					created_at: m.created_at,
				})
				.collect(),
		})
	}

	/// Moves a conversation into or out of a project. A NULL project makes it
	/// a general conversation.
	pub async fn reassign_project(&self, req: ReassignProjectRequest) -> Result<ConversationView> {
		let conversation_id = crate::parse_uuid(&req.conversation_id, "conversation_id")?;
		let now = OffsetDateTime::now_utc();
		let updated: Option<Conversation> = sqlx::query_as(
			"\
UPDATE conversations
SET project = $2, updated_at = $3
WHERE conversation_id = $1
RETURNING conversation_id, project, title, summary, created_at, updated_at",
		)
		.bind(conversation_id)
		.bind(req.project.as_deref())
		.bind(now)
		.fetch_optional(&self.db.pool)
		.await?;
		let Some(conversation) = updated else {
			return Err(Error::NotFound { message: "Conversation not found.".to_string() });
		};

		Ok(ConversationView {
			conversation_id: conversation.conversation_id,
			project: conversation.project,
			title: conversation.title,
			summary: conversation.summary,
			created_at: conversation.created_at,
			updated_at: conversation.updated_at,
		})
	}
}
