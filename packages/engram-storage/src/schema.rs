pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_conversations.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_conversations.sql")),
				"tables/002_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_messages.sql")),
				"tables/003_knowledge_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_knowledge_entries.sql")),
				"tables/004_insights.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_insights.sql")),
				"tables/005_task_outcomes.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_task_outcomes.sql")),
				"tables/006_repo_events.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_repo_events.sql")),
				"tables/007_weekly_summaries.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_weekly_summaries.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
