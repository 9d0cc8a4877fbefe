//! Pagination strategies.
//!
//! A [`Paginator`] pulls the ordered item payloads out of a decoded listing
//! body. Which one applies depends on how the API envelopes its lists.

use crate::error::{RestError, Result};
use serde_json::Value;

/// Extracts item payloads from a decoded listing response
pub trait Paginator: Send + Sync {
    fn get_results(&self, body: Value) -> Result<Vec<Value>>;
}

/// The body is already the array of items
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPagination;

impl Paginator for NoPagination {
    fn get_results(&self, body: Value) -> Result<Vec<Value>> {
        match body {
            Value::Array(items) => Ok(items),
            other => Err(RestError::Pagination(format!(
                "expected a JSON array, got {}",
                kind_of(&other)
            ))),
        }
    }
}

/// Items live under a key of an envelope object
#[derive(Debug, Clone)]
pub struct KeyedPagination {
    key: String,
}

impl KeyedPagination {
    /// Read items from `key` of the envelope
    pub fn new(key: impl Into<String>) -> Self {
        KeyedPagination { key: key.into() }
    }
}

impl Paginator for KeyedPagination {
    fn get_results(&self, body: Value) -> Result<Vec<Value>> {
        let Value::Object(mut envelope) = body else {
            return Err(RestError::Pagination(format!(
                "expected an object with '{}', got {}",
                self.key,
                kind_of(&body)
            )));
        };
        match envelope.remove(&self.key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(RestError::Pagination(format!(
                "'{}' is {}, not an array",
                self.key,
                kind_of(&other)
            ))),
            None => Err(RestError::Pagination(format!(
                "response has no '{}' key",
                self.key
            ))),
        }
    }
}

/// `{"count": .., "next": .., "previous": .., "results": [..]}` pages
#[derive(Debug, Clone, Copy, Default)]
pub struct PageNumberPagination;

impl Paginator for PageNumberPagination {
    fn get_results(&self, body: Value) -> Result<Vec<Value>> {
        KeyedPagination::new("results").get_results(body)
    }
}

/// Limit/offset pages share the `results` envelope
pub type LimitOffsetPagination = PageNumberPagination;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
