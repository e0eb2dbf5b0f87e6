//! End-to-end tool calls: arguments in, result envelope out, mock API behind.

mod common;

use carapace_mcp_runtime::{CarapaceClient, ToolDispatcher};
use common::{API_KEY, args, dispatcher_for, request_count, unreachable_base_url};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn query_success_contains_remote_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "question": "How to handle memory?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": "abc-123",
                "claim": "Test insight",
                "confidence": 0.9,
                "score": 0.85
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .call("carapace_query", &args(json!({ "question": "How to handle memory?" })))
        .await;

    assert!(!result.is_error);
    assert!(result.text.contains("Test insight"));
    let envelope = result.to_value();
    assert_eq!(envelope["content"][0]["type"], "text");
    assert!(envelope.get("isError").is_none());
}

#[tokio::test]
async fn contribute_success_contains_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contributions"))
        .and(body_json(json!({ "claim": "Test insight", "confidence": 0.85 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "new-123",
            "claim": "Test insight",
            "confidence": 0.85
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .call(
            "carapace_contribute",
            &args(json!({ "claim": "Test insight", "confidence": 0.85 })),
        )
        .await;

    assert!(!result.is_error);
    assert!(result.text.contains("new-123"));
}

#[tokio::test]
async fn get_twice_yields_identical_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contributions/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc-123",
            "claim": "Test claim",
            "confidence": 0.9
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let call = args(json!({ "id": "abc-123" }));
    let first = dispatcher.call("carapace_get", &call).await;
    let second = dispatcher.call("carapace_get", &call).await;

    assert!(!first.is_error);
    assert!(first.text.contains("abc-123"));
    assert!(first.text.contains("Test claim"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn update_forwards_fields_without_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/contributions/abc-123"))
        .and(body_json(json!({ "reasoning": "Updated reasoning", "confidence": 0.95 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc-123",
            "reasoning": "Updated reasoning",
            "confidence": 0.95
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .call(
            "carapace_update",
            &args(json!({
                "id": "abc-123",
                "reasoning": "Updated reasoning",
                "confidence": 0.95
            })),
        )
        .await;

    assert!(!result.is_error, "{}", result.text);
    assert!(result.text.contains("Updated reasoning"));
}

#[tokio::test]
async fn delete_success_names_the_deleted_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/contributions/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .call("carapace_delete", &args(json!({ "id": "abc-123" })))
        .await;

    assert!(!result.is_error);
    assert_eq!(result.text, "Successfully deleted contribution abc-123");
    assert!(result.to_value().get("structuredContent").is_none());
}

#[tokio::test]
async fn rate_limit_becomes_failure_envelope_for_every_tool() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": "RATE_LIMITED", "message": "Rate limit exceeded", "retryAfter": 30 }
        })))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let calls = [
        ("carapace_query", json!({ "question": "test" }), "Error querying Carapace"),
        (
            "carapace_contribute",
            json!({ "claim": "c", "confidence": 0.5 }),
            "Error contributing to Carapace",
        ),
        ("carapace_get", json!({ "id": "abc-123" }), "Error fetching from Carapace"),
        (
            "carapace_update",
            json!({ "id": "abc-123", "claim": "c" }),
            "Error updating on Carapace",
        ),
        ("carapace_delete", json!({ "id": "abc-123" }), "Error deleting from Carapace"),
    ];

    for (tool, arguments, prefix) in calls {
        let result = dispatcher.call(tool, &args(arguments)).await;
        assert!(result.is_error, "{tool} should fail");
        assert_eq!(result.text, format!("{prefix}: Rate limit exceeded"));
        assert!(!result.text.contains("30"), "no fabricated retry guidance");
        assert_eq!(result.to_value()["isError"], true);
    }
}

#[tokio::test]
async fn non_json_error_reports_status_in_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = dispatcher_for(&server)
        .call("carapace_query", &args(json!({ "question": "test" })))
        .await;

    assert!(result.is_error);
    assert_eq!(result.text, "Error querying Carapace: API error: 502");
}

#[tokio::test]
async fn transport_failure_text_is_carried_unchanged() {
    let client = CarapaceClient::with_base_url(API_KEY, &unreachable_base_url()).unwrap();
    let direct = client
        .query(&carapace_core::QueryRequest::new("test"))
        .await
        .unwrap_err()
        .to_string();

    let result = ToolDispatcher::new(client)
        .call("carapace_query", &args(json!({ "question": "test" })))
        .await;

    assert!(result.is_error);
    assert_eq!(result.text, format!("Error querying Carapace: {direct}"));
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let invalid = [
        ("carapace_query", json!({})),
        ("carapace_query", json!({ "question": "q", "maxResults": 0 })),
        ("carapace_contribute", json!({ "claim": "c", "confidence": -0.1 })),
        ("carapace_contribute", json!({ "claim": "x".repeat(2001), "confidence": 0.5 })),
        (
            "carapace_contribute",
            json!({ "claim": "c", "confidence": 0.5, "reasoning": "r".repeat(5001) }),
        ),
        ("carapace_update", json!({ "claim": "c" })),
        ("carapace_update", json!({ "id": "abc-123", "applicability": "a".repeat(3001) })),
        ("carapace_get", json!({ "id": "" })),
        ("carapace_delete", json!({ "id": 42 })),
    ];

    for (tool, arguments) in invalid {
        let result = dispatcher.call(tool, &args(arguments)).await;
        assert!(result.is_error, "{tool} should reject its arguments");
    }
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let server = MockServer::start().await;
    for id in ["one", "two", "three"] {
        Mock::given(method("GET"))
            .and(path(format!("/contributions/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
            .mount(&server)
            .await;
    }

    let dispatcher = dispatcher_for(&server);
    let (one, two, three) = (
        args(json!({ "id": "one" })),
        args(json!({ "id": "two" })),
        args(json!({ "id": "three" })),
    );
    let (a, b, c) = tokio::join!(
        dispatcher.call("carapace_get", &one),
        dispatcher.call("carapace_get", &two),
        dispatcher.call("carapace_get", &three),
    );

    assert!(a.text.contains("\"one\""));
    assert!(b.text.contains("\"two\""));
    assert!(c.text.contains("\"three\""));
}
