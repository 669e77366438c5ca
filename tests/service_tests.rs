//! Query service and context file tests

mod common;

use std::io::Write;

use common::*;
use mql::service::{Payload, PayloadType, QueryService};
use mql::{Context, MqlError, Object, Value};
use tempfile::NamedTempFile;

const PAYLOAD_QUERY: &str = "from payload as p \
     join twitter.getUserInfo(p.twitterId) as info on p.twitterId \
     select new { name = p.first, tweets = info.totalTweets }";

fn twitter_context() -> Context {
    Context::builder().capability("twitter", twitter()).build()
}

fn json_service() -> QueryService {
    QueryService::from_text("tweets", PAYLOAD_QUERY, PayloadType::Json).unwrap()
}

#[test]
fn test_json_array_payload() {
    let response = json_service()
        .process(
            Payload::json(
                r#"[{"first": "Joe", "twitterId": "joeschmoe"},
                    {"first": "Jane", "twitterId": "janeschmoe"}]"#,
            ),
            &twitter_context(),
        )
        .unwrap();

    match response {
        Payload::Text { body, content_type } => {
            assert_eq!(content_type.as_deref(), Some("application/json"));
            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(
                json,
                serde_json::json!([
                    {"name": "Joe", "tweets": 4},
                    {"name": "Jane", "tweets": 5}
                ])
            );
        }
        other => panic!("Expected text payload, got {:?}", other),
    }
}

#[test]
fn test_json_object_payload_is_single_row() {
    let response = json_service()
        .process(
            Payload::json(r#"{"first": "Jane", "twitterId": "janeschmoe"}"#),
            &twitter_context(),
        )
        .unwrap();

    match response {
        Payload::Text { body, .. } => assert_eq!(body, r#"[{"name":"Jane","tweets":5}]"#),
        other => panic!("Expected text payload, got {:?}", other),
    }
}

#[test]
fn test_form_payload() {
    let response = json_service()
        .process(
            Payload::form("first=Joe&twitterId=joeschmoe"),
            &twitter_context(),
        )
        .unwrap();

    match response {
        Payload::Text { body, .. } => assert_eq!(body, r#"[{"name":"Joe","tweets":4}]"#),
        other => panic!("Expected text payload, got {:?}", other),
    }
}

#[test]
fn test_native_payload() {
    let service = QueryService::from_text("tweets", PAYLOAD_QUERY, PayloadType::Native).unwrap();
    let response = service
        .process(Payload::native(persons_without_jane_handle()), &twitter_context())
        .unwrap();

    let expected = Value::from(vec![Value::Object(
        Object::new().with("name", "Joe").with("tweets", 4),
    )]);
    assert_eq!(response, Payload::Native(expected));
}

#[test]
fn test_payload_shadows_context_value() {
    let context = Context::builder()
        .value("payload", Value::from("stale"))
        .capability("twitter", twitter())
        .build();

    let response = json_service()
        .process(
            Payload::json(r#"[{"first": "Joe", "twitterId": "joeschmoe"}]"#),
            &context,
        )
        .unwrap();

    assert!(matches!(response, Payload::Text { ref body, .. } if body.contains("Joe")));
    assert_eq!(context.get("payload"), Some(Value::from("stale")));
}

#[test]
fn test_malformed_payload() {
    let service = json_service();
    let context = twitter_context();

    assert!(matches!(
        service.process(Payload::json("[{\"first\": "), &context),
        Err(MqlError::Json(_))
    ));
    assert!(matches!(
        service.process(Payload::json("\"just text\""), &context),
        Err(MqlError::Payload(_))
    ));
}

#[test]
fn test_context_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"persons": [{{"first": "Joe", "last": "Schmoe"}}], "greeting": "Hello"}}"#
    )
    .unwrap();

    let context = Context::from_json_file(file.path()).unwrap();
    let results = run(
        "from persons as p select new { text = greeting + ', ' + p.first }",
        &context,
    );
    assert_eq!(results[0].get("text"), Some(&Value::from("Hello, Joe")));
}

#[test]
fn test_context_file_must_hold_object() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[1, 2, 3]").unwrap();

    assert!(matches!(
        Context::from_json_file(file.path()),
        Err(MqlError::Payload(_))
    ));
    assert!(matches!(
        Context::from_json_file("/nonexistent/context.json"),
        Err(MqlError::Io(_))
    ));
}
