//! Map-reduce summarization over the full message history window.
//!
//! The window's messages are rendered into lines, packed into char-budget
//! chunks, summarized chunk by chunk, then reduced into one deduplicated
//! global summary that is embedded and stored as a periodic summary record.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use engram_domain::{
	headers,
	transcript::{self, TranscriptLine},
};

use crate::{EngramService, Error, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalSummaryRequest {
	pub days: Option<i64>,
	pub max_messages: Option<i64>,
	pub chunk_chars: Option<usize>,
	pub model: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryWindow {
	#[serde(with = "crate::time_serde")]
	pub start: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub end: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalSummaryResponse {
	pub summary_id: Uuid,
	pub window: SummaryWindow,
	pub summary: String,
	pub projects_active: Option<Vec<String>>,
	pub ideas_mentioned: Option<Vec<String>>,
	pub messages_considered: usize,
	pub chunks: usize,
}

#[derive(Debug, sqlx::FromRow)]
struct TranscriptRow {
	role: String,
	content: String,
	created_at: OffsetDateTime,
	project: Option<String>,
}

fn map_prompt(chunk: &str, index: usize, total: usize, window_start: OffsetDateTime) -> String {
	format!(
		"Summarize this slice of the conversation history. Be concise and factual.\n\n\
		Return bullets under these headings:\n\
		- Key events/changes (3-8 bullets)\n\
		- Decisions (0-6 bullets)\n\
		- Mistakes / failure patterns (0-6 bullets)\n\
		- Preferences (0-6 bullets)\n\
		- Open threads / next steps (0-6 bullets)\n\n\
		Slice {index}/{total} (time window starts {}):\n\n\
		Transcript:\n{chunk}",
		window_start.date(),
	)
}

fn reduce_prompt(chunk_summaries: &[String], start: OffsetDateTime, end: OffsetDateTime) -> String {
	format!(
		"Combine these partial summaries into ONE global summary of the full history window.\n\
		De-duplicate aggressively and keep it short.\n\n\
		Return in this exact format:\n\
		Projects active: comma-separated list\n\
		Themes: 3-8 bullets\n\
		Key decisions: 3-10 bullets\n\
		Recurring mistakes: 0-8 bullets\n\
		Preferences & patterns: 3-10 bullets\n\
		Current state: 3-8 bullets\n\
		Next steps: 3-10 bullets\n\
		Ideas mentioned: comma-separated list\n\n\
		Window: {} -> {}\n\n\
		Partial summaries:\n{}",
		start.date(),
		end.date(),
		chunk_summaries.join("\n\n---\n\n"),
	)
}

impl EngramService {
	/// Explicit summary generation: unlike extraction, a missing summarizer
	/// credential is a hard failure here.
	pub async fn generate_global_summary(
		&self,
		req: GlobalSummaryRequest,
	) -> Result<GlobalSummaryResponse> {
		if self.cfg.providers.llm.api_key.is_none() {
			return Err(Error::Configuration {
				message: "providers.llm.api_key is required for summary generation.".to_string(),
			});
		}

		let days = req.days.unwrap_or(self.cfg.summary.default_days);
		let max_messages = req.max_messages.unwrap_or(self.cfg.summary.default_max_messages);
		let chunk_chars = req.chunk_chars.unwrap_or(self.cfg.summary.default_chunk_chars);

		if !(1..=3_650).contains(&days) {
			return Err(Error::InvalidRequest {
				message: "days must be in the range 1-3650.".to_string(),
			});
		}
		if !(100..=50_000).contains(&max_messages) {
			return Err(Error::InvalidRequest {
				message: "max_messages must be in the range 100-50000.".to_string(),
			});
		}
		if !(5_000..=120_000).contains(&chunk_chars) {
			return Err(Error::InvalidRequest {
				message: "chunk_chars must be in the range 5000-120000.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let start = now - Duration::days(days);
		let rows: Vec<TranscriptRow> = sqlx::query_as(
			"\
SELECT m.role, m.content, m.created_at, c.project
FROM messages m
JOIN conversations c ON c.conversation_id = m.conversation_id
WHERE m.created_at >= $1
ORDER BY m.created_at ASC
LIMIT $2",
		)
		.bind(start)
		.bind(max_messages)
		.fetch_all(&self.db.pool)
		.await?;
		let messages_considered = rows.len();
		let lines: Vec<String> = rows
			.iter()
			.map(|row| {
				transcript::render_line(&TranscriptLine {
					created_at: row.created_at,
					project: row.project.as_deref(),
					role: &row.role,
					content: &row.content,
				})
			})
			.collect();
		let chunks = engram_chunking::pack_lines(&lines, chunk_chars);
		let model = req.model.as_deref();
		let mut chunk_summaries = Vec::with_capacity(chunks.len());

		for (index, chunk) in chunks.iter().enumerate() {
			let prompt = map_prompt(chunk, index + 1, chunks.len(), start);
			let summary = self
				.providers
				.summarizer
				.complete(&self.cfg.providers.llm, &prompt, model)
				.await?;

			chunk_summaries.push(summary);
		}

		let summary_text = self
			.providers
			.summarizer
			.complete(&self.cfg.providers.llm, &reduce_prompt(&chunk_summaries, start, now), model)
			.await?;
		let projects_active = headers::parse_header_list(&summary_text, "Projects active");
		let ideas_mentioned = headers::parse_header_list(&summary_text, "Ideas mentioned");
		let summary_id = Uuid::new_v4();
		let embedding = self.try_embed_one(&summary_text).await;

		sqlx::query(
			"\
INSERT INTO weekly_summaries (
	summary_id, week_start, week_end, summary, projects_active, ideas_mentioned, embedding,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7::text::vector, $8)",
		)
		.bind(summary_id)
		.bind(start)
		.bind(now)
		.bind(summary_text.as_str())
		.bind(projects_active.as_ref().map(|items| items.join(",")))
		.bind(ideas_mentioned.as_ref().map(|items| items.join(",")))
		.bind(embedding)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		Ok(GlobalSummaryResponse {
			summary_id,
			window: SummaryWindow { start, end: now },
			summary: summary_text,
			projects_active,
			ideas_mentioned,
			messages_considered,
			chunks: chunks.len(),
		})
	}
}
