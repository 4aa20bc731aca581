use engram_service::{CreateConversationRequest, MessageIn, MessageSearchRequest};
use serde_json::json;

use crate::acceptance;

async fn seed_conversation(
	service: &engram_service::EngramService,
	project: Option<&str>,
	contents: &[&str],
) {
	let request = CreateConversationRequest {
		project: project.map(str::to_string),
		title: None,
		messages: contents
			.iter()
			.map(|content| {
				serde_json::from_value::<MessageIn>(json!({
					"role": "user",
					"content": content,
				}))
				.expect("Failed to build message")
			})
			.collect(),
	};

	service.create_conversation(request).await.expect("Failed to seed conversation.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn project_scope_widen_and_strict() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping project_scope_widen_and_strict; set ENGRAM_PG_DSN to run this test.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;

	seed_conversation(&service, Some("atlas"), &["atlas work on retrieval"]).await;
	seed_conversation(&service, Some("muse"), &["muse work on rendering"]).await;
	seed_conversation(&service, None, &["general note about retrieval"]).await;

	let widened = service
		.search_messages(MessageSearchRequest {
			query: "retrieval work".to_string(),
			project: Some("atlas".to_string()),
			include_general: true,
			k: 10,
		})
		.await
		.expect("Widened search failed.");

	assert_eq!(widened.hits.len(), 2);
	assert!(widened.hits.iter().all(|hit| !hit.content.contains("muse")));

	let strict = service
		.search_messages(MessageSearchRequest {
			query: "retrieval work".to_string(),
			project: Some("atlas".to_string()),
			include_general: false,
			k: 10,
		})
		.await
		.expect("Strict search failed.");

	assert_eq!(strict.hits.len(), 1);
	assert!(strict.hits[0].content.contains("atlas"));

	let unscoped = service
		.search_messages(MessageSearchRequest {
			query: "retrieval work".to_string(),
			project: None,
			include_general: true,
			k: 10,
		})
		.await
		.expect("Unscoped search failed.");

	assert_eq!(unscoped.hits.len(), 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn budgets_cap_result_lengths() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping budgets_cap_result_lengths; set ENGRAM_PG_DSN to run this test.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;
	let contents: Vec<String> = (0..6).map(|i| format!("message number {i}")).collect();
	let refs: Vec<&str> = contents.iter().map(String::as_str).collect();

	seed_conversation(&service, None, &refs).await;

	let hits = service
		.search_messages(MessageSearchRequest {
			query: "message".to_string(),
			project: None,
			include_general: true,
			k: 4,
		})
		.await
		.expect("Search failed.");

	assert_eq!(hits.hits.len(), 4);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
