/// Scans `text` for a line starting with `header` (case-insensitive) and
/// splits the remainder after the first `:` on commas.
///
/// Returns `None` when the header is absent or its remainder is empty, so a
/// missing list and an empty list are the same outcome.
pub fn parse_header_list(text: &str, header: &str) -> Option<Vec<String>> {
	let header_lower = header.to_lowercase();

	for line in text.lines() {
		if !line.to_lowercase().starts_with(&header_lower) {
			continue;
		}

		let rest = line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("");

		if rest.is_empty() {
			return None;
		}

		let items: Vec<String> = rest
			.split(',')
			.map(|item| item.trim())
			.filter(|item| !item.is_empty())
			.map(str::to_string)
			.collect();

		if items.is_empty() {
			return None;
		}

		return Some(items);
	}

	None
}
