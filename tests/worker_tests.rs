use async_trait::async_trait;
use degul::ai::{Embedder, LanguageModel};
use degul::core::config::AppConfig;
use degul::core::models::{AnalysisKind, AnalysisTask};
use degul::errors::BotError;
use degul::slack::{SlackBot, SlackClient};
use degul::worker::process_task;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

struct FixedReply(&'static str);

#[async_trait]
impl LanguageModel for FixedReply {
    async fn generate(&self, _prompt: &str) -> Result<String, BotError> {
        Ok(self.0.to_string())
    }
}

/// Puts anything mentioning the budget on one axis and everything else on the other.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BotError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("budget") {
                    vec![1.0, 0.1]
                } else {
                    vec![0.2, 1.0]
                }
            })
            .collect())
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn task(kind: AnalysisKind, response_url: Option<String>) -> AnalysisTask {
    AnalysisTask {
        correlation_id: "test-correlation".into(),
        user_id: "U1".into(),
        channel_id: "C1".into(),
        response_url,
        kind,
    }
}

fn bot(server: &MockServer) -> SlackBot {
    SlackBot::with_models(
        SlackClient::with_base_url("xoxb-test".into(), &server.uri()),
        Box::new(FixedReply("Budget")),
        Box::new(FixedReply("[4, 3, 5, 2]")),
        Box::new(KeywordEmbedder),
    )
}

fn config(server: &MockServer) -> AppConfig {
    AppConfig::for_endpoints(&server.uri(), "http://127.0.0.1:9", "http://127.0.0.1:9")
}

async fn mount_channel(server: &MockServer, messages: Value) {
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(ok(json!({ "ok": true, "user_id": "UBOT" })))
        .mount(server)
        .await;
    for (id, name) in [("U1", "alice"), ("U2", "bob"), ("UBOT", "degul")] {
        Mock::given(method("POST"))
            .and(path("/users.info"))
            .and(body_string_contains(format!("user={id}")))
            .respond_with(ok(json!({ "ok": true, "user": { "id": id, "real_name": name } })))
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/conversations.history"))
        .respond_with(ok(json!({ "ok": true, "has_more": false, "messages": messages })))
        .mount(server)
        .await;
}

async fn mount_delivery(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ok(json!({ "ok": true })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files.getUploadURLExternal"))
        .respond_with(ok(json!({
            "ok": true,
            "upload_url": format!("{}/upload", server.uri()),
            "file_id": "F1"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files.completeUploadExternal"))
        .respond_with(ok(json!({ "ok": true })))
        .mount(server)
        .await;
}

/// Newest first, as Slack returns them.
fn meeting() -> Value {
    json!([
        { "user": "U1", "text": "Let's settle the budget by Friday", "ts": "1700000400.000000",
          "reactions": [{ "name": "+1", "count": 3 }] },
        { "user": "U2", "text": "Anyone up for lunch?", "ts": "1700000300.000000" },
        { "user": "U2", "text": "The budget needs another review", "ts": "1700000200.000000" },
        { "user": "U1", "text": "Budget draft is in the doc", "ts": "1700000100.000000",
          "reactions": [{ "name": "eyes", "count": 1 }] },
        { "user": "UBOT", "text": "Previous results", "ts": "1700000050.000000" }
    ])
}

async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == endpoint)
        .collect()
}

fn body_of(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

#[tokio::test]
async fn test_participation_posts_chart_then_blocks() {
    let server = MockServer::start().await;
    mount_channel(&server, meeting()).await;
    mount_delivery(&server).await;

    let task = task(AnalysisKind::MessageCount, None);
    process_task(&bot(&server), &config(&server), &task).await.unwrap();

    let reservations = requests_to(&server, "/files.getUploadURLExternal").await;
    assert_eq!(reservations.len(), 1);
    assert!(body_of(&reservations[0]).contains("filename=participation_analysis.png"));

    let uploads = requests_to(&server, "/upload").await;
    assert!(uploads[0].body.starts_with(&[0x89, b'P', b'N', b'G']));

    let posts = requests_to(&server, "/chat.postMessage").await;
    assert_eq!(posts.len(), 1);
    let post = body_of(&posts[0]);
    assert!(post.contains("alice"));
    assert!(post.contains("bob"));
    assert!(!post.contains("Previous results"));
}

#[tokio::test]
async fn test_topic_relevance_posts_blocks_then_two_charts() {
    let server = MockServer::start().await;
    mount_channel(&server, meeting()).await;
    mount_delivery(&server).await;

    let task = task(AnalysisKind::TopicRelevance, None);
    process_task(&bot(&server), &config(&server), &task).await.unwrap();

    let posts = requests_to(&server, "/chat.postMessage").await;
    assert_eq!(posts.len(), 1);
    assert!(body_of(&posts[0]).contains("Budget"));

    let reservations: Vec<String> = requests_to(&server, "/files.getUploadURLExternal")
        .await
        .iter()
        .map(body_of)
        .collect();
    assert_eq!(reservations.len(), 2);
    assert!(reservations[0].contains("similarity_distribution.png"));
    assert!(reservations[1].contains("topic_relevance_analysis.png"));
}

#[tokio::test]
async fn test_contribution_posts_chart_and_leader() {
    let server = MockServer::start().await;
    mount_channel(&server, meeting()).await;
    mount_delivery(&server).await;

    let task = task(AnalysisKind::Contribution, None);
    process_task(&bot(&server), &config(&server), &task).await.unwrap();

    let reservations = requests_to(&server, "/files.getUploadURLExternal").await;
    assert_eq!(reservations.len(), 1);
    assert!(body_of(&reservations[0]).contains("contribution_analysis.png"));

    let posts = requests_to(&server, "/chat.postMessage").await;
    assert_eq!(posts.len(), 1);
    assert!(body_of(&posts[0]).contains("<@U"));
}

#[tokio::test]
async fn test_empty_channel_gets_notice() {
    let server = MockServer::start().await;
    mount_channel(&server, json!([])).await;
    mount_delivery(&server).await;

    let task = task(AnalysisKind::SpeechAmount, None);
    process_task(&bot(&server), &config(&server), &task).await.unwrap();

    let posts = requests_to(&server, "/chat.postMessage").await;
    assert_eq!(posts.len(), 1);
    assert!(body_of(&posts[0]).contains("no messages to analyse"));
    assert!(requests_to(&server, "/files.getUploadURLExternal").await.is_empty());
}

#[tokio::test]
async fn test_history_failure_is_reported_to_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(ok(json!({ "ok": true, "user_id": "UBOT" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/conversations.history"))
        .respond_with(ok(json!({ "ok": false, "error": "not_in_channel" })))
        .mount(&server)
        .await;
    mount_delivery(&server).await;

    let task = task(AnalysisKind::ReactionCount, None);
    process_task(&bot(&server), &config(&server), &task).await.unwrap();

    let posts = requests_to(&server, "/chat.postMessage").await;
    assert_eq!(posts.len(), 1);
    assert!(body_of(&posts[0]).contains("while fetching the chat log"));
}

#[tokio::test]
async fn test_failed_channel_post_falls_back_to_response_url() {
    let server = MockServer::start().await;
    mount_channel(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ok(json!({ "ok": false, "error": "not_in_channel" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/commands/1"))
        .and(body_string_contains("ephemeral"))
        .and(body_string_contains("A Slack API error occurred"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let task = task(
        AnalysisKind::MessageCount,
        Some(format!("{}/commands/1", server.uri())),
    );
    process_task(&bot(&server), &config(&server), &task).await.unwrap();
}

#[tokio::test]
async fn test_unreported_failure_is_returned() {
    let server = MockServer::start().await;
    mount_channel(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ok(json!({ "ok": false, "error": "not_in_channel" })))
        .mount(&server)
        .await;

    let task = task(AnalysisKind::MessageCount, None);
    let err = process_task(&bot(&server), &config(&server), &task)
        .await
        .unwrap_err();
    assert!(err.is_slack_api());
}

#[tokio::test]
async fn test_blank_only_channel_gets_text_notice() {
    for kind in [AnalysisKind::TopicRelevance, AnalysisKind::Contribution] {
        let server = MockServer::start().await;
        mount_channel(
            &server,
            json!([
                { "user": "U1", "text": "   ", "ts": "1700000200.000000" },
                { "user": "U2", "ts": "1700000100.000000",
                  "reactions": [{ "name": "+1", "count": 1 }] }
            ]),
        )
        .await;
        mount_delivery(&server).await;

        process_task(&bot(&server), &config(&server), &task(kind, None))
            .await
            .unwrap();

        let posts = requests_to(&server, "/chat.postMessage").await;
        assert_eq!(posts.len(), 1, "{kind:?}");
        assert!(body_of(&posts[0]).contains("no text messages to analyse"));
        assert!(!body_of(&posts[0]).contains("Oops"));
        assert!(requests_to(&server, "/files.getUploadURLExternal").await.is_empty());
    }
}
