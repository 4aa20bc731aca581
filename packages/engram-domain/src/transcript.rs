use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// One message row as the summarizer sees it.
#[derive(Clone, Debug)]
pub struct TranscriptLine<'a> {
	pub created_at: OffsetDateTime,
	pub project: Option<&'a str>,
	pub role: &'a str,
	pub content: &'a str,
}

/// Renders `[timestamp] (project-or-"general") role: content`.
pub fn render_line(line: &TranscriptLine<'_>) -> String {
	let ts = line
		.created_at
		.format(&Rfc3339)
		.unwrap_or_else(|_| line.created_at.unix_timestamp().to_string());

	format!("[{ts}] ({}) {}: {}", line.project.unwrap_or("general"), line.role, line.content)
}

/// Builds the compact extraction transcript: non-empty `role: content` lines,
/// truncated to the trailing `max_lines`.
pub fn compact_transcript(messages: &[(String, String)], max_lines: usize) -> Vec<String> {
	let mut lines: Vec<String> = messages
		.iter()
		.filter(|(_, content)| !content.trim().is_empty())
		.map(|(role, content)| format!("{role}: {}", content.trim()))
		.collect();

	if lines.len() > max_lines {
		lines.drain(..lines.len() - max_lines);
	}

	lines
}
