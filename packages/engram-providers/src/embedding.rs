use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Embeds `texts` in one batch, one vector per input in input order.
///
/// With no configured key the deterministic fallback runs instead, so local
/// and test environments work without network access.
pub async fn embed(
	cfg: &engram_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let Some(api_key) = cfg.api_key.as_deref() else {
		return Ok(texts.iter().map(|text| fallback_embedding(text, cfg.dimensions)).collect());
	};
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client.post(url).headers(crate::auth_headers(api_key)?).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json)
}

/// Deterministic content-seeded pseudo-embedding: a blake3 XOF over the text
/// drives a Box-Muller normal sampler, and the result is L2-normalized.
/// Identical text always yields the identical vector.
pub fn fallback_embedding(text: &str, dimensions: u32) -> Vec<f32> {
	let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
	let dim = dimensions as usize;
	let mut vec = Vec::with_capacity(dim);
	let mut buf = [0_u8; 8];

	while vec.len() < dim {
		reader.fill(&mut buf);

		let a = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
		let b = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
		// Box-Muller: two uniforms to two standard normals. The first uniform
		// is shifted into (0, 1] so the log stays finite.
		let u1 = (f64::from(a) + 1.0) / (f64::from(u32::MAX) + 1.0);
		let u2 = f64::from(b) / (f64::from(u32::MAX) + 1.0);
		let radius = (-2.0 * u1.ln()).sqrt();
		let angle = 2.0 * std::f64::consts::PI * u2;

		vec.push((radius * angle.cos()) as f32);

		if vec.len() < dim {
			vec.push((radius * angle.sin()) as f32);
		}
	}

	let norm = vec.iter().map(|value| f64::from(*value) * f64::from(*value)).sum::<f64>().sqrt();
	let scale = (norm + 1e-8) as f32;

	for value in &mut vec {
		*value /= scale;
	}

	vec
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item
			.get("embedding")
			.and_then(|v| v.as_array())
			.ok_or_else(|| eyre::eyre!("Embedding item missing embedding array."))?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number =
				value.as_f64().ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fallback_is_deterministic() {
		let first = fallback_embedding("the same text", 1_536);
		let second = fallback_embedding("the same text", 1_536);

		assert_eq!(first, second);
		assert_eq!(first.len(), 1_536);
	}

	#[test]
	fn fallback_differs_for_different_text() {
		assert_ne!(fallback_embedding("alpha", 64), fallback_embedding("beta", 64));
	}

	#[test]
	fn fallback_is_unit_norm() {
		for text in ["", "x", "a much longer piece of text with many words in it"] {
			let vec = fallback_embedding(text, 1_536);
			let norm =
				vec.iter().map(|value| f64::from(*value) * f64::from(*value)).sum::<f64>().sqrt();

			assert!((norm - 1.0).abs() < 1e-3, "Norm for {text:?} was {norm}");
		}
	}

	#[test]
	fn fallback_handles_odd_dimensions() {
		assert_eq!(fallback_embedding("odd", 7).len(), 7);
	}

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn missing_data_array_is_an_error() {
		assert!(parse_embedding_response(serde_json::json!({"object": "list"})).is_err());
	}
}
