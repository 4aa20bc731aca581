mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, Extraction, LlmProviderConfig, Postgres, Providers,
	Security, Service, Storage, Summary,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.extraction.max_items_per_kind == 0 {
		return Err(Error::Validation {
			message: "extraction.max_items_per_kind must be greater than zero.".to_string(),
		});
	}
	if cfg.extraction.max_transcript_lines == 0 {
		return Err(Error::Validation {
			message: "extraction.max_transcript_lines must be greater than zero.".to_string(),
		});
	}
	if !(1..=3_650).contains(&cfg.summary.default_days) {
		return Err(Error::Validation {
			message: "summary.default_days must be in the range 1-3650.".to_string(),
		});
	}
	if !(100..=50_000).contains(&cfg.summary.default_max_messages) {
		return Err(Error::Validation {
			message: "summary.default_max_messages must be in the range 100-50000.".to_string(),
		});
	}
	if !(5_000..=120_000).contains(&cfg.summary.default_chunk_chars) {
		return Err(Error::Validation {
			message: "summary.default_chunk_chars must be in the range 5000-120000.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for key in [
		&mut cfg.providers.embedding.api_key,
		&mut cfg.providers.llm.api_key,
		&mut cfg.security.api_auth_token,
		&mut cfg.chunking.tokenizer_repo,
	] {
		if key.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
			*key = None;
		}
	}
}
