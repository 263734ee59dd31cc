use degul::ai::{Embedder, LanguageModel, WatsonxClient, WatsonxEmbeddings, WatsonxLlm};
use degul::errors::BotError;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_iam(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .and(body_string_contains("apikey=test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "iam-token",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> Arc<WatsonxClient> {
    Arc::new(WatsonxClient::new(
        "test-key".into(),
        "test-project".into(),
        &server.uri(),
        &format!("{}/identity/token", server.uri()),
    ))
}

#[tokio::test]
async fn test_generation_reuses_iam_token() {
    let server = MockServer::start().await;
    mount_iam(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/generation"))
        .and(query_param("version", "2023-05-29"))
        .and(header("authorization", "Bearer iam-token"))
        .and(body_string_contains("\"project_id\":\"test-project\""))
        .and(body_string_contains("\"model_id\":\"topic-model\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "generated_text": "Budget cuts", "stop_reason": "eos_token" }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let llm = WatsonxLlm::new(client(&server), "topic-model".into());
    assert_eq!(llm.generate("first").await.unwrap(), "Budget cuts");
    assert_eq!(llm.generate("second").await.unwrap(), "Budget cuts");
}

#[tokio::test]
async fn test_generation_error_status_is_llm_error() {
    let server = MockServer::start().await;
    mount_iam(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/generation"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let llm = WatsonxLlm::new(client(&server), "topic-model".into());
    match llm.generate("prompt").await {
        Err(BotError::LlmError(msg)) => assert!(msg.contains("rate limited")),
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_iam_exchange_is_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad apikey"))
        .mount(&server)
        .await;

    let llm = WatsonxLlm::new(client(&server), "topic-model".into());
    let err = llm.generate("prompt").await.unwrap_err();
    assert!(matches!(err, BotError::LlmError(_)));
    assert!(err.to_string().contains("bad apikey"));
}

#[tokio::test]
async fn test_embeddings_keep_input_order() {
    let server = MockServer::start().await;
    mount_iam(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/embeddings"))
        .and(query_param("version", "2023-10-25"))
        .and(body_string_contains("\"truncate_input_tokens\":128"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_id": "embed-model",
            "results": [
                { "embedding": [1.0, 0.0] },
                { "embedding": [0.0, 1.0] }
            ]
        })))
        .mount(&server)
        .await;

    let embedder = WatsonxEmbeddings::new(client(&server), "embed-model".into());
    let vectors = embedder
        .embed(&["budget".to_string(), "lunch".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_embeddings_count_mismatch_is_error() {
    let server = MockServer::start().await;
    mount_iam(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/ml/v1/text/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "embedding": [1.0] }]
        })))
        .mount(&server)
        .await;

    let embedder = WatsonxEmbeddings::new(client(&server), "embed-model".into());
    let err = embedder
        .embed(&["a".to_string(), "b".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Expected 2 embeddings, got 1"));
}
