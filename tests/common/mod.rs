//! Shared test helpers

#![allow(dead_code)]

use restkit::client::form_pairs;
use restkit::{
    HttpResponse, PayloadMode, PreparedRequest, RecordedRequest, RestError, Result, Transport,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport that answers from a queue and remembers every request
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body
    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.respond_raw(status, body.to_string().into_bytes())
    }

    /// Queue a response with a raw body
    pub fn respond_raw(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back((status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> PreparedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: PreparedRequest) -> Result<HttpResponse> {
        let recorded = record(&request);
        self.requests.lock().unwrap().push(request);

        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RestError::Transport("no response queued".to_string()))?;

        Ok(HttpResponse::new(
            status,
            vec![("content-type".to_string(), "application/json".to_string())],
            body,
            recorded,
        ))
    }
}

fn record(request: &PreparedRequest) -> RecordedRequest {
    let mut recorded = RecordedRequest::new(request.method.clone(), request.url.clone());
    if let Some(headers) = &request.headers {
        recorded.headers = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
    }
    recorded.body = request.body.as_ref().map(|body| match body.mode {
        PayloadMode::Json => Value::Object(body.fields.clone()).to_string().into_bytes(),
        PayloadMode::Data => url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form_pairs(&body.fields))
            .finish()
            .into_bytes(),
    });
    recorded
}

/// JSON view of a prepared request body
pub fn body_json(request: &PreparedRequest) -> Value {
    request
        .body
        .as_ref()
        .map(|b| Value::Object(b.fields.clone()))
        .unwrap_or(Value::Null)
}
