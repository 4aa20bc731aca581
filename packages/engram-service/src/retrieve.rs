//! Unified retrieval: one embedding call fanned out across the record types.
//!
//! Each type keeps its own budget and its own ordering. Results are never
//! merged or re-ranked across types, and scores are never normalized across
//! types; a message score and an insight score are not comparable.

use serde::{Deserialize, Serialize};

use crate::{
	EngramService, Error, InsightView, KnowledgeView, MessageHitView, Result, TaskOutcomeView,
	WeeklySummaryView,
	search::{ProjectScope, message_hit_view},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrieveRequest {
	pub query: String,
	pub project: Option<String>,
	#[serde(default = "crate::default_true")]
	pub include_general: bool,
	#[serde(default = "default_k_messages")]
	pub k_messages: i64,
	#[serde(default = "default_k_insights")]
	pub k_insights: i64,
	#[serde(default = "default_k_knowledge")]
	pub k_knowledge: i64,
	#[serde(default = "default_k_outcomes")]
	pub k_outcomes: i64,
	#[serde(default = "default_k_summaries")]
	pub k_summaries: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrieveResponse {
	pub messages: Vec<MessageHitView>,
	pub insights: Vec<InsightView>,
	pub knowledge: Vec<KnowledgeView>,
	pub task_outcomes: Vec<TaskOutcomeView>,
	pub summaries: Vec<WeeklySummaryView>,
}

fn default_k_messages() -> i64 {
	5
}

fn default_k_insights() -> i64 {
	3
}

fn default_k_knowledge() -> i64 {
	3
}

fn default_k_outcomes() -> i64 {
	3
}

fn default_k_summaries() -> i64 {
	2
}

impl EngramService {
	/// Single-call retrieval across all memory layers.
	///
	/// The query is embedded exactly once; the per-type searches share that
	/// vector and run concurrently. Messages, insights, and task outcomes
	/// honor the project scope; knowledge and summaries are cross-project by
	/// design.
	pub async fn retrieve(&self, req: RetrieveRequest) -> Result<RetrieveResponse> {
		if req.query.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let vec_text = self.embed_query(&req.query).await?;
		let scope =
			ProjectScope { project: req.project.as_deref(), include_general: req.include_general };
		let (messages, insights, knowledge, task_outcomes, summaries) = tokio::join!(
			self.messages_by_vector(&vec_text, scope, req.k_messages),
			self.insights_by_vector(&vec_text, scope, None, req.k_insights),
			self.knowledge_by_vector(&vec_text, None, req.k_knowledge),
			self.outcomes_by_vector(&vec_text, scope, None, req.k_outcomes),
			self.summaries_by_vector(&vec_text, req.k_summaries),
		);

		Ok(RetrieveResponse {
			messages: messages?.into_iter().map(message_hit_view).collect(),
			insights: insights?,
			knowledge: knowledge?,
			task_outcomes: task_outcomes?,
			summaries: summaries?,
		})
	}
}
