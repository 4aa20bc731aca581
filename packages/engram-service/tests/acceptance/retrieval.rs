use engram_service::{
	CreateConversationRequest, CreateInsightRequest, CreateKnowledgeRequest, MessageIn,
	RetrieveRequest,
};
use serde_json::json;

use crate::acceptance;

fn message(content: &str) -> MessageIn {
	serde_json::from_value(json!({ "role": "user", "content": content }))
		.expect("Failed to build message")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn returns_fewer_than_budget_when_store_is_small() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping returns_fewer_than_budget_when_store_is_small; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;

	service
		.create_conversation(CreateConversationRequest {
			project: None,
			title: None,
			messages: vec![message("first stored message"), message("second stored message")],
		})
		.await
		.expect("Failed to seed conversation.");

	let response = service
		.retrieve(RetrieveRequest {
			query: "stored message".to_string(),
			project: None,
			include_general: true,
			k_messages: 5,
			k_insights: 3,
			k_knowledge: 3,
			k_outcomes: 3,
			k_summaries: 2,
		})
		.await
		.expect("Retrieve failed.");

	assert_eq!(response.messages.len(), 2);
	assert!(response.insights.is_empty());
	assert!(response.knowledge.is_empty());
	assert!(response.task_outcomes.is_empty());
	assert!(response.summaries.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn ranks_by_distance_with_exact_match_first() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping ranks_by_distance_with_exact_match_first; set ENGRAM_PG_DSN.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;

	service
		.create_conversation(CreateConversationRequest {
			project: None,
			title: None,
			messages: vec![
				message("deploying the staging cluster"),
				message("notes about pasta recipes"),
				message("unrelated bookkeeping chatter"),
			],
		})
		.await
		.expect("Failed to seed conversation.");

	let response = service
		.retrieve(RetrieveRequest {
			query: "deploying the staging cluster".to_string(),
			project: None,
			include_general: true,
			k_messages: 3,
			k_insights: 3,
			k_knowledge: 3,
			k_outcomes: 3,
			k_summaries: 2,
		})
		.await
		.expect("Retrieve failed.");

	assert_eq!(response.messages.len(), 3);
	// Identical text embeds to the identical vector: distance 0, score 1.
	assert_eq!(response.messages[0].content, "deploying the staging cluster");
	assert!((response.messages[0].score - 1.0).abs() < 1e-5);

	// Scores are the reciprocal transform of distance: descending order.
	for pair in response.messages.windows(2) {
		assert!(pair[0].score >= pair[1].score);
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set ENGRAM_PG_DSN to run."]
async fn per_type_budgets_are_independent() {
	let Some(test_db) = acceptance::test_db().await else {
		eprintln!("Skipping per_type_budgets_are_independent; set ENGRAM_PG_DSN to run.");

		return;
	};
	let cfg = acceptance::test_config(test_db.dsn().to_string());
	let service = acceptance::build_service(cfg, acceptance::providers("{}")).await;

	service
		.create_conversation(CreateConversationRequest {
			project: None,
			title: None,
			messages: vec![message("alpha"), message("beta"), message("gamma")],
		})
		.await
		.expect("Failed to seed conversation.");

	for i in 0..3 {
		service
			.create_insight(CreateInsightRequest {
				insight_type: serde_json::from_value(json!("lesson")).unwrap(),
				project: None,
				title: format!("lesson {i}"),
				content: "always measure first".to_string(),
				tags: None,
				source_conversation_id: None,
				source_task_id: None,
			})
			.await
			.expect("Failed to seed insight.");
		service
			.create_knowledge(CreateKnowledgeRequest {
				category: serde_json::from_value(json!("pattern")).unwrap(),
				subject: format!("subject {i}"),
				content: "a recurring pattern".to_string(),
				confidence: 0.9,
				source_conversation_id: None,
			})
			.await
			.expect("Failed to seed knowledge.");
	}

	let response = service
		.retrieve(RetrieveRequest {
			query: "measure".to_string(),
			project: None,
			include_general: true,
			k_messages: 2,
			k_insights: 1,
			k_knowledge: 3,
			k_outcomes: 3,
			k_summaries: 2,
		})
		.await
		.expect("Retrieve failed.");

	assert_eq!(response.messages.len(), 2);
	assert_eq!(response.insights.len(), 1);
	assert_eq!(response.knowledge.len(), 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
