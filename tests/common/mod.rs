//! Common fixtures for MQL integration tests
//!
//! Provides:
//! - The persons collection used by the join scenarios
//! - A twitter capability with canned tweet counts
//! - Helpers to execute query text and read result fields

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mql::{Context, Object, OperationRegistry, Value};
use serde_json::json;

pub fn persons() -> Value {
    Value::from(json!([
        {"first": "Joe", "last": "Schmoe", "twitterId": "joeschmoe"},
        {"first": "Jane", "last": "Schmoe", "twitterId": "janeschmoe"}
    ]))
}

/// Persons where Jane has no twitter account.
pub fn persons_without_jane_handle() -> Value {
    Value::from(json!([
        {"first": "Joe", "last": "Schmoe", "twitterId": "joeschmoe"},
        {"first": "Jane", "last": "Schmoe", "twitterId": null}
    ]))
}

pub fn tweets_for(handle: &str) -> Option<i64> {
    match handle {
        "joeschmoe" => Some(4),
        "janeschmoe" => Some(5),
        _ => None,
    }
}

/// `getUserInfo(id)` returns `{totalTweets}`; unknown ids fail.
pub fn twitter() -> OperationRegistry {
    twitter_counting(Arc::new(AtomicUsize::new(0)))
}

pub fn twitter_counting(calls: Arc<AtomicUsize>) -> OperationRegistry {
    OperationRegistry::new("twitter").operation("getUserInfo", 1, move |args| {
        calls.fetch_add(1, Ordering::SeqCst);
        let handle = args[0]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("twitter id must be a string"))?;
        match tweets_for(handle) {
            Some(total) => Ok(Object::new().with("totalTweets", total).into()),
            None => anyhow::bail!("unknown twitter user '{}'", handle),
        }
    })
}

pub fn scenario_context() -> Context {
    Context::builder()
        .value("persons", persons())
        .capability("twitter", twitter())
        .build()
}

pub fn run(query: &str, context: &Context) -> Vec<Object> {
    mql::execute(query, context).unwrap_or_else(|e| panic!("Query failed: {}\n{}", query, e))
}

pub fn field<'a>(object: &'a Object, name: &str) -> &'a Value {
    object
        .get(name)
        .unwrap_or_else(|| panic!("missing field '{}' in {:?}", name, object))
}
