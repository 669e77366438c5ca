//! Query service: runs one compiled query per incoming payload.
//!
//! The payload is decoded, bound into the context as `payload`, the query is
//! executed and the results are handed back in the payload's own format.

use crate::error::{MqlError, MqlResult};
use crate::mql::{Context, Engine, Object, Query, Value};

/// Context name the decoded payload is bound to.
pub const PAYLOAD_VARIABLE: &str = "payload";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// Text bodies decoded from and encoded back to JSON
    Json,
    /// In-memory values passed through as-is
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text {
        body: String,
        content_type: Option<String>,
    },
    Native(Value),
}

impl Payload {
    pub fn json(body: impl Into<String>) -> Self {
        Payload::Text {
            body: body.into(),
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
        }
    }

    pub fn form(body: impl Into<String>) -> Self {
        Payload::Text {
            body: body.into(),
            content_type: Some(FORM_CONTENT_TYPE.to_string()),
        }
    }

    pub fn native(value: impl Into<Value>) -> Self {
        Payload::Native(value.into())
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            Payload::Text { content_type, .. } => content_type.as_deref(),
            Payload::Native(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct QueryService {
    name: String,
    query: Query,
    payload_type: PayloadType,
    engine: Engine,
}

impl QueryService {
    pub fn new(name: impl Into<String>, query: Query, payload_type: PayloadType) -> Self {
        Self::with_engine(name, query, payload_type, Engine::new())
    }

    /// Compile query text into a service.
    pub fn from_text(
        name: impl Into<String>,
        text: &str,
        payload_type: PayloadType,
    ) -> MqlResult<Self> {
        Ok(Self::new(name, crate::mql::parse(text)?, payload_type))
    }

    pub fn with_engine(
        name: impl Into<String>,
        query: Query,
        payload_type: PayloadType,
        engine: Engine,
    ) -> Self {
        Self {
            name: name.into(),
            query,
            payload_type,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn process(&self, payload: Payload, context: &Context) -> MqlResult<Payload> {
        let input = match (&self.payload_type, payload) {
            (_, Payload::Native(value)) => value,
            (PayloadType::Json, Payload::Text { body, content_type }) => {
                decode_text(&body, content_type.as_deref())?
            }
            (PayloadType::Native, Payload::Text { body, content_type }) => {
                if is_form(content_type.as_deref()) {
                    decode_form(&body)?
                } else {
                    Value::String(body)
                }
            }
        };

        tracing::debug!(
            "QueryService '{}': processing {} payload",
            self.name,
            input.type_name()
        );

        let scoped = context.with_binding(PAYLOAD_VARIABLE, input);
        let results = self.engine.execute(&self.query, &scoped)?;

        tracing::debug!("QueryService '{}': {} result(s)", self.name, results.len());

        match self.payload_type {
            PayloadType::Json => Ok(Payload::json(encode_json(&results)?)),
            PayloadType::Native => Ok(Payload::Native(
                results.into_iter().map(Value::Object).collect::<Vec<_>>().into(),
            )),
        }
    }
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains(FORM_CONTENT_TYPE))
}

/// Form bodies become an object of strings; JSON bodies starting with `[`
/// must be arrays, anything else must be an object.
fn decode_text(body: &str, content_type: Option<&str>) -> MqlResult<Value> {
    if is_form(content_type) {
        return decode_form(body);
    }

    let json: serde_json::Value = serde_json::from_str(body)?;
    let expects_array = body.trim_start().starts_with('[');
    match (&json, expects_array) {
        (serde_json::Value::Array(_), true) | (serde_json::Value::Object(_), false) => {
            Ok(Value::from(json))
        }
        (other, _) => Err(MqlError::Payload(format!(
            "expected a JSON {}, got {}",
            if expects_array { "array" } else { "object" },
            Value::from(other.clone()).type_name()
        ))),
    }
}

fn decode_form(body: &str) -> MqlResult<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
        .map_err(|e| MqlError::Payload(format!("invalid form body: {}", e)))?;
    Ok(Value::Object(pairs.into_iter().collect::<Object>()))
}

fn encode_json(results: &[Object]) -> MqlResult<String> {
    Ok(serde_json::to_string(results)?)
}
