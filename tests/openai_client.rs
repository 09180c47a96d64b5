use bookingBot::clients::openai_client::{ModelError, OpenAIClient};
use bookingBot::models::message::Message;
use bookingBot::models::tool::{ResponseSchema, ToolDefinition};
use bookingBot::service::openai_service::{LanguageModel, OpenAIService};
use mockito::{Matcher, Server};
use serde_json::json;

fn service(base_url: &str) -> OpenAIService {
    let client = OpenAIClient::new(reqwest::Client::new(), base_url, "sk-test");
    OpenAIService::new(client, "gpt-4o".to_string(), "gpt-4o-mini".to_string())
}

fn catalog() -> Vec<ToolDefinition> {
    vec![ToolDefinition::function(
        "get_scheduled_events",
        "List the user's scheduled meetings.",
        json!({"type": "object", "properties": {}}),
    )]
}

#[tokio::test]
async fn tool_selection_offers_catalog_and_parses_calls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "tool_choice": "auto",
            "tools": [{"type": "function", "function": {"name": "get_scheduled_events"}}],
            "messages": [{"role": "user", "content": "what's on my calendar?"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "finish_reason": "tool_calls",
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc",
                            "type": "function",
                            "function": {"name": "get_scheduled_events", "arguments": "{}"}
                        }]
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let reply = service(&server.url())
        .complete(&[Message::user("what's on my calendar?")], &catalog())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(reply.content.is_none());
    assert_eq!(reply.tool_calls.len(), 1);
    assert_eq!(reply.tool_calls[0].id, "call_abc");
    assert_eq!(reply.tool_calls[0].function.name, "get_scheduled_events");
}

#[tokio::test]
async fn synthesis_sends_no_tools() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex(r#"^\{"model":"gpt-4o","messages":\[.*\],"temperature""#.to_string()))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "You have no meetings."}}]})
                .to_string(),
        )
        .create_async()
        .await;

    let reply = service(&server.url())
        .complete(&[Message::user("anything today?")], &[])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.content.as_deref(), Some("You have no meetings."));
    assert!(reply.tool_calls.is_empty());
}

#[tokio::test]
async fn structured_completion_sends_response_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "MeetingId", "strict": true}
            }
        })))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"role": "assistant", "content": "{\"id\": 12}"}}]}).to_string())
        .create_async()
        .await;

    let schema = ResponseSchema::new("MeetingId", json!({"type": "object"}));
    let raw = service(&server.url())
        .complete_structured(&[Message::user("which one?")], &schema)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(raw.as_deref(), Some("{\"id\": 12}"));
}

#[tokio::test]
async fn error_status_is_surfaced_with_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("overloaded")
        .create_async()
        .await;

    let err = service(&server.url())
        .complete(&[Message::user("hi")], &catalog())
        .await
        .unwrap_err();

    match err {
        ModelError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_choices_are_an_empty_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let err = service(&server.url())
        .complete(&[Message::user("hi")], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::EmptyResponse));
}

#[tokio::test]
async fn structured_refusal_comes_back_as_no_content() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": null, "refusal": "I can't help with that."}}]})
                .to_string(),
        )
        .create_async()
        .await;

    let schema = ResponseSchema::new("MeetingId", json!({"type": "object"}));
    let raw = service(&server.url())
        .complete_structured(&[Message::user("which one?")], &schema)
        .await
        .unwrap();

    assert_eq!(raw, None);
}
