pub use tokenizers::Tokenizer;

pub type TokenizerError = tokenizers::Error;

pub fn load_tokenizer(repo: &str) -> Result<Tokenizer, TokenizerError> {
	Tokenizer::from_pretrained(repo, None)
}

/// Token count for `text`, falling back to a chars/4 estimate when no
/// tokenizer is configured or encoding fails.
pub fn count_tokens(text: &str, tokenizer: Option<&Tokenizer>) -> usize {
	if let Some(tokenizer) = tokenizer {
		match tokenizer.encode(text, false) {
			Ok(encoding) => return encoding.len(),
			Err(err) => {
				tracing::warn!(error = %err, "Tokenizer failed to encode text, estimating.");
			},
		}
	}

	text.chars().count().div_ceil(4)
}

/// Greedily packs `lines` into chunks whose joined length (newline-separated)
/// stays within `max_chars`. A chunk is flushed before it would overflow, so
/// every line lands in exactly one chunk in original order. A lone line longer
/// than the budget still forms its own chunk; lines are never split.
pub fn pack_lines<S: AsRef<str>>(lines: &[S], max_chars: usize) -> Vec<String> {
	let mut chunks = Vec::new();
	let mut buf: Vec<&str> = Vec::new();
	let mut buf_len = 0_usize;

	for line in lines {
		let line = line.as_ref();
		// +1 for the joining newline.
		let len = line.len() + 1;

		if !buf.is_empty() && buf_len + len > max_chars {
			chunks.push(buf.join("\n"));
			buf.clear();
			buf_len = 0;
		}

		buf.push(line);
		buf_len += len;
	}

	if !buf.is_empty() {
		chunks.push(buf.join("\n"));
	}

	chunks
}
