use axum::{
	body::Body,
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use engram_api::{routes, state::AppState};
use engram_config::{
	Chunking, Config, EmbeddingProviderConfig, Extraction, LlmProviderConfig, Postgres, Providers,
	Security, Service, Storage, Summary,
};
use engram_testkit::TestDatabase;

fn test_config(dsn: String, api_auth_token: Option<String>) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 2 } },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				api_base: "http://localhost".to_string(),
				api_key: None,
				path: "/v1/embeddings".to_string(),
				model: "text-embedding-3-small".to_string(),
				dimensions: 64,
				timeout_ms: 1_000,
			},
			llm: LlmProviderConfig {
				api_base: "http://localhost".to_string(),
				api_key: None,
				path: "/v1/chat/completions".to_string(),
				model: "gpt-4o-mini".to_string(),
				temperature: 0.2,
				timeout_ms: 1_000,
			},
		},
		security: Security { api_auth_token },
		extraction: Extraction::default(),
		summary: Summary::default(),
		chunking: Chunking::default(),
	}
}

async fn test_state(api_auth_token: Option<String>) -> Option<(TestDatabase, AppState)> {
	let base_dsn = engram_testkit::env_dsn()?;
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let state = AppState::new(test_config(test_db.dsn().to_string(), api_auth_token))
		.await
		.expect("Failed to build app state.");

	Some((test_db, state))
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn health_ok() {
	let Some((test_db, state)) = test_state(None).await else {
		eprintln!("Skipping health_ok; set ENGRAM_PG_DSN to run this test.");

		return;
	};
	let app = routes::router(state);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn shared_secret_gates_everything_but_health() {
	let Some((test_db, state)) = test_state(Some("sekrit".to_string())).await else {
		eprintln!("Skipping shared_secret_gates_everything_but_health; set ENGRAM_PG_DSN.");

		return;
	};
	let app = routes::router(state);
	let health = app
		.clone()
		.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
		.await
		.unwrap();

	assert_eq!(health.status(), StatusCode::OK);

	let denied = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/retrieve")
				.header("content-type", "application/json")
				.body(Body::from(r#"{"query":"anything"}"#))
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

	let allowed = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/retrieve")
				.header("content-type", "application/json")
				.header(routes::API_KEY_HEADER, "sekrit")
				.body(Body::from(r#"{"query":"anything"}"#))
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(allowed.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn webhook_ingests_push_payload() {
	let Some((test_db, state)) = test_state(None).await else {
		eprintln!("Skipping webhook_ingests_push_payload; set ENGRAM_PG_DSN to run this test.");

		return;
	};
	let pool = state.service.db.pool.clone();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"ref": "refs/heads/main",
		"repository": { "full_name": "engram-dev/engram" },
		"commits": [
			{ "message": "one", "timestamp": "2026-01-01T00:00:00Z" },
			{ "message": "two", "timestamp": "2026-01-02T00:00:00Z" },
			{ "message": "three", "timestamp": "2026-01-03T00:00:00Z" }
		]
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/repo-events/webhook")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::CREATED);

	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM repo_events")
		.fetch_one(&pool)
		.await
		.expect("Failed to count repo events.");

	assert_eq!(count, 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn unknown_ids_map_to_not_found() {
	let Some((test_db, state)) = test_state(None).await else {
		eprintln!("Skipping unknown_ids_map_to_not_found; set ENGRAM_PG_DSN to run this test.");

		return;
	};
	let app = routes::router(state);
	let missing = app
		.clone()
		.oneshot(
			Request::builder()
				.uri("/knowledge/00000000-0000-0000-0000-000000000000")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();

	assert_eq!(missing.status(), StatusCode::NOT_FOUND);

	let malformed = app
		.oneshot(Request::builder().uri("/knowledge/not-a-uuid").body(Body::empty()).unwrap())
		.await
		.unwrap();

	assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
