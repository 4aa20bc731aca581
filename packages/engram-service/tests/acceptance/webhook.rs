use serde_json::json;

use crate::acceptance;

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn push_payload_creates_one_embedded_event_per_commit() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping push_payload_creates_one_embedded_event_per_commit; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;
	let payload = json!({
		"ref": "refs/heads/main",
		"repository": { "full_name": "engram-dev/engram" },
		"commits": [
			{ "message": "Add scope filter", "timestamp": "2026-01-01T00:00:00Z" },
			{ "message": "Fix ordering", "timestamp": "2026-01-02T00:00:00Z" },
			{ "message": "Trim dead code", "timestamp": "2026-01-03T00:00:00Z" }
		]
	});
	let response = service.ingest_webhook(payload).await.expect("Webhook ingest failed.");

	assert_eq!(response.ingested, 3);

	let rows: Vec<(String, Option<String>)> = sqlx::query_as(
		"SELECT event_type, embedding::text FROM repo_events ORDER BY event_at ASC",
	)
	.fetch_all(&service.db.pool)
	.await
	.expect("Failed to read repo events.");

	assert_eq!(rows.len(), 3);

	for (event_type, embedding) in &rows {
		assert_eq!(event_type, "commit");
		assert!(embedding.is_some(), "Each commit embeds from its own message text.");
	}

	// Distinct messages embed to distinct vectors.
	assert_ne!(rows[0].1, rows[1].1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn unrecognized_payload_ingests_nothing() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping unrecognized_payload_ingests_nothing; set ENGRAM_PG_DSN to run.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;
	let response = service
		.ingest_webhook(json!({ "action": "starred", "sender": { "login": "someone" } }))
		.await
		.expect("Webhook ingest failed.");

	assert_eq!(response.ingested, 0);

	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM repo_events")
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to count repo events.");

	assert_eq!(count, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
