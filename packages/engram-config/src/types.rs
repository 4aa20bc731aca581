use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub security: Security,
	#[serde(default)]
	pub extraction: Extraction,
	#[serde(default)]
	pub summary: Summary,
	#[serde(default)]
	pub chunking: Chunking,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	/// Unset selects the deterministic local fallback instead of the remote
	/// provider.
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub api_base: String,
	/// Unset makes explicit summary generation a configuration error and
	/// auto-extraction a silent no-op.
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Security {
	pub api_auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Extraction {
	pub max_items_per_kind: u32,
	pub max_transcript_lines: usize,
}
impl Default for Extraction {
	fn default() -> Self {
		Self { max_items_per_kind: 5, max_transcript_lines: 60 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Summary {
	pub default_days: i64,
	pub default_max_messages: i64,
	pub default_chunk_chars: usize,
}
impl Default for Summary {
	fn default() -> Self {
		Self { default_days: 90, default_max_messages: 8_000, default_chunk_chars: 45_000 }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub tokenizer_repo: Option<String>,
}
