use engram_service::CreateKnowledgeRequest;
use serde_json::json;

use crate::acceptance;

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn update_replaces_fields_and_embedding_in_place() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping update_replaces_fields_and_embedding_in_place; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;
	let created = service
		.create_knowledge(CreateKnowledgeRequest {
			category: serde_json::from_value(json!("preference")).unwrap(),
			subject: "ui_style".to_string(),
			content: "Prefers minimal UI with dark mode".to_string(),
			confidence: 0.8,
			source_conversation_id: None,
		})
		.await
		.expect("Create failed.");
	let original_embedding: Option<String> =
		sqlx::query_scalar("SELECT embedding::text FROM knowledge_entries WHERE entry_id = $1")
			.bind(created.entry_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to read embedding.");

	assert!(original_embedding.is_some());

	let updated = service
		.update_knowledge(
			&created.entry_id.to_string(),
			CreateKnowledgeRequest {
				category: serde_json::from_value(json!("preference")).unwrap(),
				subject: "ui_style".to_string(),
				content: "Now prefers light mode with high contrast".to_string(),
				confidence: 0.3,
				source_conversation_id: None,
			},
		)
		.await
		.expect("Update failed.");

	assert_eq!(updated.entry_id, created.entry_id);
	assert!((updated.confidence - 0.3).abs() < 1e-6);

	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM knowledge_entries")
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to count entries.");

	assert_eq!(count, 1);

	// Different input text means a different deterministic embedding.
	let new_embedding: Option<String> =
		sqlx::query_scalar("SELECT embedding::text FROM knowledge_entries WHERE entry_id = $1")
			.bind(created.entry_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Failed to read embedding.");

	assert!(new_embedding.is_some());
	assert_ne!(original_embedding, new_embedding);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn delete_removes_the_entry_and_missing_ids_are_not_found() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping delete_removes_the_entry_and_missing_ids_are_not_found; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;
	let created = service
		.create_knowledge(CreateKnowledgeRequest {
			category: serde_json::from_value(json!("entity")).unwrap(),
			subject: "deploy_platform".to_string(),
			content: "Ships on the usual container host".to_string(),
			confidence: 1.0,
			source_conversation_id: None,
		})
		.await
		.expect("Create failed.");
	let deleted = service
		.delete_knowledge(&created.entry_id.to_string())
		.await
		.expect("Delete failed.");

	assert!(deleted.deleted);

	let missing = service.delete_knowledge(&created.entry_id.to_string()).await;

	assert!(matches!(missing, Err(engram_service::Error::NotFound { .. })));

	let invalid = service.get_knowledge("not-a-uuid").await;

	assert!(matches!(invalid, Err(engram_service::Error::InvalidRequest { .. })));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
