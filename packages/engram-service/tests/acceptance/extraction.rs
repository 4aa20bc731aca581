use std::sync::{Arc, atomic::AtomicUsize, atomic::Ordering};

use engram_service::{CreateConversationRequest, MessageIn, Providers};
use serde_json::json;

use crate::acceptance::{self, SpyEmbedding, SpySummarizer, StubSummarizer};

fn message(content: &str) -> MessageIn {
	serde_json::from_value(json!({ "role": "user", "content": content }))
		.expect("Failed to build message")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn empty_transcript_skips_both_collaborators() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping empty_transcript_skips_both_collaborators; set ENGRAM_PG_DSN.");

		return;
	};
	let embed_calls = Arc::new(AtomicUsize::new(0));
	let summarize_calls = Arc::new(AtomicUsize::new(0));
	let providers = Providers::new(
		Arc::new(SpyEmbedding { calls: embed_calls.clone() }),
		Arc::new(SpySummarizer { calls: summarize_calls.clone(), payload: "{}".to_string() }),
	);
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, providers).await;
	let response = service
		.create_conversation(CreateConversationRequest {
			project: None,
			title: Some("blank".to_string()),
			messages: vec![message("   "), message("")],
		})
		.await
		.expect("Ingest failed.");

	assert_eq!(response.extraction.created, 0);
	assert!(response.extraction.error.is_none());
	// Ingest embeds its message batch once; extraction adds no further
	// provider calls for an empty transcript.
	assert_eq!(embed_calls.load(Ordering::SeqCst), 1);
	assert_eq!(summarize_calls.load(Ordering::SeqCst), 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn malformed_summarizer_output_never_fails_the_ingest() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping malformed_summarizer_output_never_fails_the_ingest; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service =
		acceptance::build_service(cfg, acceptance::providers("Sure! Here are the items:")).await;
	let response = service
		.create_conversation(CreateConversationRequest {
			project: Some("atlas".to_string()),
			title: None,
			messages: vec![message("we shipped the retrieval endpoint")],
		})
		.await
		.expect("Ingest must survive a malformed extraction response.");

	assert_eq!(response.extraction.created, 0);
	assert_eq!(response.extraction.error.as_deref(), Some("invalid_json"));

	let message_count: i64 = sqlx::query_scalar("SELECT count(*) FROM messages")
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to count messages.");

	assert_eq!(message_count, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn extracted_items_are_persisted_with_source_links() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping extracted_items_are_persisted_with_source_links; set ENGRAM_PG_DSN.");

		return;
	};
	let payload = json!({
		"insights": [
			{"type": "mistake", "title": "Shipped without tests", "content": "The hotfix regressed scope filters.", "tags": ["process"]}
		],
		"knowledge": [
			{"category": "preference", "subject": "review_style", "content": "Wants small focused diffs.", "confidence": 0.7}
		],
		"task_outcomes": [
			{"result": "failure", "task_description": "Deploy hotfix", "cause": "missing test", "fix": "added scope test", "recommendation": "gate deploys on tests", "tags": ["deploy"]}
		]
	});
	let providers = Providers::new(
		Arc::new(acceptance::StubEmbedding),
		Arc::new(StubSummarizer { payload: payload.to_string() }),
	);
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, providers).await;
	let response = service
		.create_conversation(CreateConversationRequest {
			project: Some("atlas".to_string()),
			title: None,
			messages: vec![message("deploy went sideways, here is what happened")],
		})
		.await
		.expect("Ingest failed.");

	assert_eq!(response.extraction.created, 3);
	assert!(response.extraction.error.is_none());

	let conversation_id = response.conversation.conversation_id;
	let linked_insights: i64 =
		sqlx::query_scalar("SELECT count(*) FROM insights WHERE source_conversation_id = $1")
			.bind(conversation_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to count insights.");
	let linked_knowledge: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM knowledge_entries WHERE source_conversation_id = $1",
	)
	.bind(conversation_id)
	.fetch_one(&service.db.pool)
	.await
	.expect("Failed to count knowledge entries.");
	let linked_outcomes: i64 =
		sqlx::query_scalar("SELECT count(*) FROM task_outcomes WHERE conversation_id = $1")
			.bind(conversation_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to count task outcomes.");

	assert_eq!(linked_insights, 1);
	assert_eq!(linked_knowledge, 1);
	assert_eq!(linked_outcomes, 1);

	// Extracted outcomes inherit the conversation's project.
	let outcome_project: Option<String> =
		sqlx::query_scalar("SELECT project FROM task_outcomes LIMIT 1")
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to read outcome project.");

	assert_eq!(outcome_project.as_deref(), Some("atlas"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
