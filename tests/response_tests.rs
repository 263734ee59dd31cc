use degul::api::helpers::{err_response, not_found_no_retry, ok_empty, ok_ephemeral};
use degul::slack::response_builder::create_ephemeral_payload;

#[test]
fn test_ephemeral_payload() {
    let payload = create_ephemeral_payload("Test ephemeral message");
    let payload_str = serde_json::to_string(&payload).unwrap();

    assert!(
        payload_str.contains("\"response_type\":\"ephemeral\""),
        "Payload should include ephemeral response_type"
    );
    assert!(
        payload_str.contains("\"text\":\"Test ephemeral message\""),
        "Payload should include the text field with correct content"
    );
}

#[test]
fn test_ok_ephemeral_wraps_payload_in_body() {
    let resp = ok_ephemeral("Starting topic relevance analysis...");
    assert_eq!(resp["statusCode"], 200);
    let body: serde_json::Value =
        serde_json::from_str(resp["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["response_type"], "ephemeral");
    assert_eq!(body["text"], "Starting topic relevance analysis...");
}

#[test]
fn test_status_helpers() {
    assert_eq!(ok_empty()["statusCode"], 200);

    let err = err_response(404, "Command not recognized");
    assert_eq!(err["statusCode"], 404);
    assert!(err["body"].as_str().unwrap().contains("Command not recognized"));

    let nf = not_found_no_retry("There are no slack request events");
    assert_eq!(nf["headers"]["X-Slack-No-Retry"], "1");
}
