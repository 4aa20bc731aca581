//! Post-ingest extraction of structured memory from a conversation.
//!
//! Best-effort: nothing in here may fail the ingest that triggered it. Every
//! failure is converted into a zero-or-partial `ExtractReport` with a soft
//! diagnostic tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use engram_domain::{
	kinds::{InsightType, KnowledgeCategory, TaskResult},
	transcript,
};

use crate::{
	CreateInsightRequest, CreateKnowledgeRequest, CreateTaskOutcomeRequest, EngramService,
};

const EXTRACTION_PROMPT: &str = "\
Extract structured memory items from the conversation.

Return STRICT JSON with shape:
{
  \"insights\": [{\"type\":\"lesson|mistake|retrospective|playbook|idea\",\"title\":\"...\",\"content\":\"...\",\"tags\":[\"...\"]}],
  \"knowledge\": [{\"category\":\"preference|pattern|entity|insight\",\"subject\":\"...\",\"content\":\"...\",\"confidence\":0.0}],
  \"task_outcomes\": [{\"result\":\"success|partial|failure\",\"task_description\":\"...\",\"cause\":null|\"...\",\"fix\":null|\"...\",\"recommendation\":null|\"...\",\"tags\":[\"...\"]}]
}

Rules:
- 0 to 5 items per list.
- Only include high-signal items that will matter later.
- Use short titles; content can be 1-4 sentences.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractReport {
	pub created: u32,
	pub error: Option<String>,
}
impl ExtractReport {
	fn skipped(tag: &str) -> Self {
		Self { created: 0, error: Some(tag.to_string()) }
	}
}

#[derive(Clone, Debug, Deserialize)]
struct ExtractedInsight {
	#[serde(rename = "type")]
	insight_type: Option<String>,
	title: Option<String>,
	content: Option<String>,
	#[serde(default)]
	tags: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct ExtractedKnowledge {
	category: Option<String>,
	subject: Option<String>,
	content: Option<String>,
	confidence: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
struct ExtractedOutcome {
	result: Option<String>,
	task_description: Option<String>,
	cause: Option<String>,
	fix: Option<String>,
	recommendation: Option<String>,
	#[serde(default)]
	tags: Vec<String>,
}

#[derive(Debug, Default)]
struct Extraction {
	insights: Vec<ExtractedInsight>,
	knowledge: Vec<ExtractedKnowledge>,
	task_outcomes: Vec<ExtractedOutcome>,
}

/// Tolerant parse of the extractor output: the whole text must be JSON, but a
/// malformed item only drops that item.
fn parse_extraction(text: &str, max_per_kind: usize) -> Option<Extraction> {
	let value: Value = serde_json::from_str(text).ok()?;
	let items = |key: &str| -> Vec<Value> {
		value
			.get(key)
			.and_then(Value::as_array)
			.map(|array| array.iter().take(max_per_kind).cloned().collect())
			.unwrap_or_default()
	};
	Some(Extraction {
		insights: collect_items(items("insights")),
		knowledge: collect_items(items("knowledge")),
		task_outcomes: collect_items(items("task_outcomes")),
	})
}

fn collect_items<T: serde::de::DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
	values.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect()
}

impl EngramService {
	/// Runs after a conversation commit. Returns telemetry only; the caller's
	/// write has already succeeded and stays successful no matter what
	/// happens here.
	pub(crate) async fn auto_extract(
		&self,
		conversation_id: Uuid,
		project: Option<&str>,
		messages: &[(String, String)],
	) -> ExtractReport {
		let lines =
			transcript::compact_transcript(messages, self.cfg.extraction.max_transcript_lines);

		if lines.is_empty() {
			return ExtractReport { created: 0, error: None };
		}
		if self.cfg.providers.llm.api_key.is_none() {
			return ExtractReport::skipped("summarizer_unconfigured");
		}

		let prompt = format!(
			"{EXTRACTION_PROMPT}\n\nProject: {}\nConversation ID: {conversation_id}\n\nTranscript:\n{}",
			project.unwrap_or("general"),
			lines.join("\n"),
		);
		let text = match self
			.providers
			.summarizer
			.complete(&self.cfg.providers.llm, &prompt, None)
			.await
		{
			Ok(text) => text,
			Err(err) => {
				tracing::warn!(error = %err, "Extraction summarizer call failed.");

				return ExtractReport::skipped("summarizer_failed");
			},
		};
		let Some(extraction) =
			parse_extraction(&text, self.cfg.extraction.max_items_per_kind as usize)
		else {
			return ExtractReport::skipped("invalid_json");
		};

		self.persist_extraction(conversation_id, project, extraction).await
	}

	async fn persist_extraction(
		&self,
		conversation_id: Uuid,
		project: Option<&str>,
		extraction: Extraction,
	) -> ExtractReport {
		let mut created = 0_u32;
		let mut error = None;
		let record_failure = |err: crate::Error, kind: &str| {
			tracing::warn!(error = %err, kind, "Failed to persist extracted item.");

			Some("partial_failure".to_string())
		};

		for item in extraction.insights {
			let (Some(title), Some(content)) = (trimmed(item.title), trimmed(item.content)) else {
				continue;
			};
			let request = CreateInsightRequest {
				insight_type: item
					.insight_type
					.as_deref()
					.and_then(InsightType::parse)
					.unwrap_or(InsightType::Lesson),
				project: project.map(str::to_string),
				title,
				content,
				tags: non_empty_tags(item.tags),
				source_conversation_id: Some(conversation_id),
				source_task_id: None,
			};

			match self.create_insight(request).await {
				Ok(_) => created += 1,
				Err(err) => error = record_failure(err, "insight"),
			}
		}

		for item in extraction.knowledge {
			let (Some(subject), Some(content)) = (trimmed(item.subject), trimmed(item.content))
			else {
				continue;
			};
			let request = CreateKnowledgeRequest {
				category: item
					.category
					.as_deref()
					.and_then(KnowledgeCategory::parse)
					.unwrap_or(KnowledgeCategory::Insight),
				subject,
				content,
				confidence: item.confidence.unwrap_or(1.0),
				source_conversation_id: Some(conversation_id),
			};

			match self.create_knowledge(request).await {
				Ok(_) => created += 1,
				Err(err) => error = record_failure(err, "knowledge"),
			}
		}

		for item in extraction.task_outcomes {
			let Some(task_description) = trimmed(item.task_description) else {
				continue;
			};
			let request = CreateTaskOutcomeRequest {
				project: project.map(str::to_string),
				conversation_id: Some(conversation_id),
				task_description,
				result: item
					.result
					.as_deref()
					.and_then(TaskResult::parse)
					.unwrap_or(TaskResult::Success),
				cause: item.cause,
				fix: item.fix,
				recommendation: item.recommendation,
				linked_commit: None,
				tags: non_empty_tags(item.tags),
			};

			match self.create_task_outcome(request).await {
				Ok(_) => created += 1,
				Err(err) => error = record_failure(err, "task_outcome"),
			}
		}

		ExtractReport { created, error }
	}
}

fn trimmed(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn non_empty_tags(tags: Vec<String>) -> Option<String> {
	if tags.is_empty() { None } else { Some(tags.join(",")) }
}
