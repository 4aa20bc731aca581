pub mod conversations;
pub mod extract;
pub mod global_summary;
pub mod insights;
pub mod knowledge;
pub mod outcomes;
pub mod repo_events;
pub mod retrieve;
pub mod search;
pub mod summaries;
pub mod time_serde;

mod error;

pub use error::{Error, Result};

pub use conversations::{
	ConversationDetail, ConversationView, CreateConversationRequest, CreateConversationResponse,
	MessageIn, MessageView, ReassignProjectRequest,
};
pub use extract::ExtractReport;
pub use global_summary::{GlobalSummaryRequest, GlobalSummaryResponse, SummaryWindow};
pub use insights::{CreateInsightRequest, InsightSearchRequest, InsightView, ListInsightsRequest};
pub use knowledge::{
	CreateKnowledgeRequest, DeleteKnowledgeResponse, KnowledgeSearchRequest, KnowledgeView,
	ListKnowledgeRequest,
};
pub use outcomes::{CreateTaskOutcomeRequest, OutcomeSearchRequest, TaskOutcomeView};
pub use repo_events::{
	CreateRepoEventRequest, RepoEventSearchRequest, RepoEventView, WebhookResponse,
};
pub use retrieve::{RetrieveRequest, RetrieveResponse};
pub use search::{MessageHitView, MessageSearchRequest, MessageSearchResponse};
pub use summaries::{
	CreateWeeklySummaryRequest, ListWeeklySummariesRequest, WeeklySummarySearchRequest,
	WeeklySummaryView,
};

use std::{future::Future, pin::Pin, sync::Arc};

use engram_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use engram_providers::{embedding, llm};
use engram_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait SummarizerProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		model_override: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub summarizer: Arc<dyn SummarizerProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, summarizer: Arc<dyn SummarizerProvider>) -> Self {
		Self { embedding, summarizer }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), summarizer: provider }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl SummarizerProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		model_override: Option<&'a str>,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(llm::complete(cfg, prompt, model_override))
	}
}

pub struct EngramService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	tokenizer: Option<engram_chunking::Tokenizer>,
}
impl EngramService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		let tokenizer = cfg.chunking.tokenizer_repo.as_deref().and_then(|repo| {
			match engram_chunking::load_tokenizer(repo) {
				Ok(tokenizer) => Some(tokenizer),
				Err(err) => {
					tracing::warn!(
						error = %err,
						"Failed to load tokenizer; token counts will be estimated."
					);

					None
				},
			}
		});

		Self { cfg, db, providers, tokenizer }
	}

	pub(crate) fn count_tokens(&self, text: &str) -> i32 {
		engram_chunking::count_tokens(text, self.tokenizer.as_ref()) as i32
	}

	/// Embeds a search query. Failures propagate: a query that cannot be
	/// embedded cannot be ranked.
	pub(crate) async fn embed_query(&self, text: &str) -> Result<String> {
		let cfg = &self.cfg.providers.embedding;
		let vectors = self.providers.embedding.embed(cfg, &[text.to_string()]).await?;
		let Some(vec) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vec.len() != cfg.dimensions as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector_to_pg(&vec))
	}

	/// Best-effort batch embedding for the write path. A provider failure
	/// yields all-None so records are stored without embeddings instead of
	/// failing the write.
	pub(crate) async fn try_embed_batch(&self, texts: &[String]) -> Vec<Option<String>> {
		if texts.is_empty() {
			return Vec::new();
		}

		let cfg = &self.cfg.providers.embedding;

		match self.providers.embedding.embed(cfg, texts).await {
			Ok(vectors) if vectors.len() == texts.len() => vectors
				.into_iter()
				.map(|vec| {
					if vec.len() == cfg.dimensions as usize {
						Some(vector_to_pg(&vec))
					} else {
						tracing::warn!("Embedding vector dimension mismatch; storing NULL.");

						None
					}
				})
				.collect(),
			Ok(_) => {
				tracing::warn!("Embedding provider returned a short batch; storing NULL.");

				vec![None; texts.len()]
			},
			Err(err) => {
				tracing::warn!(error = %err, "Embedding failed; storing records without vectors.");

				vec![None; texts.len()]
			},
		}
	}

	pub(crate) async fn try_embed_one(&self, text: &str) -> Option<String> {
		let texts = [text.to_string()];

		self.try_embed_batch(&texts).await.pop().flatten()
	}
}

pub(crate) fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

/// Display transform only. Ranking always orders by raw distance.
pub(crate) fn distance_to_score(distance: f32) -> f32 {
	1.0 / (1.0 + distance)
}

pub(crate) fn clamp_limit(k: i64) -> i64 {
	k.clamp(1, 1_000)
}

pub(crate) fn default_true() -> bool {
	true
}

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<uuid::Uuid> {
	uuid::Uuid::parse_str(raw.trim())
		.map_err(|_| Error::InvalidRequest { message: format!("Invalid {field}.") })
}
