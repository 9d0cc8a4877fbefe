//! Transport boundary.
//!
//! Everything the resource layer needs from HTTP goes through [`Transport`]:
//! a fully resolved [`PreparedRequest`] goes in, an [`HttpResponse`] carrying
//! the recorded request comes out. [`ReqwestTransport`] is the default
//! implementation; tests and embedders can plug their own.

use crate::error::Result;
use crate::field::Upload;
use indexmap::IndexMap;
use reqwest::blocking::{multipart, Client, ClientBuilder};
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;

/// Header name to value, in insertion order
pub type Headers = IndexMap<String, String>;

/// Form field name to upload
pub type Files = IndexMap<String, Upload>;

/// Create the default HTTP client for resource requests
pub fn create_rest_client() -> Result<Client> {
    let client = ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Credentials handed to the transport as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic authentication
    Basic {
        username: String,
        password: Option<String>,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl Auth {
    /// Basic auth with a username and password
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    /// Bearer token auth
    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }
}

/// How a write payload is encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// `application/x-www-form-urlencoded`
    #[default]
    Data,
    /// `application/json`
    Json,
}

/// Request body after entity references and uploads have been resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub mode: PayloadMode,
    pub fields: Map<String, Value>,
}

/// A request with every default and override already applied.
///
/// `None` for timeout, headers or auth means "leave it to the transport".
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub timeout: Option<Duration>,
    pub headers: Option<Headers>,
    pub auth: Option<Auth>,
    pub files: Option<Files>,
    pub body: Option<Body>,
}

impl PreparedRequest {
    /// A bare request with nothing resolved yet
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        PreparedRequest {
            method,
            url: url.into(),
            timeout: None,
            headers: None,
            auth: None,
            files: None,
            body: None,
        }
    }
}

/// The request as it actually left the client, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Record a request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        RecordedRequest {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Response returned by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub request: RecordedRequest,
}

impl HttpResponse {
    /// Assemble a response from its parts
    pub fn new(
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        request: RecordedRequest,
    ) -> Self {
        HttpResponse {
            status,
            headers,
            body,
            request,
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First header with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Generic HTTP verb dispatch
pub trait Transport: Send + Sync {
    /// Send the request and return whatever status came back.
    ///
    /// Non-2xx statuses are not errors at this level.
    fn execute(&self, request: PreparedRequest) -> Result<HttpResponse>;
}

/// [`Transport`] over a blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the default client settings
    pub fn new() -> Result<Self> {
        Ok(ReqwestTransport {
            client: create_rest_client()?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: PreparedRequest) -> Result<HttpResponse> {
        let PreparedRequest {
            method,
            url,
            timeout,
            headers,
            auth,
            files,
            body,
        } = request;

        let mut builder = self.client.request(method, url.as_str());

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(headers) = headers {
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        builder = match auth {
            Some(Auth::Basic { username, password }) => builder.basic_auth(username, password),
            Some(Auth::Bearer(token)) => builder.bearer_auth(token),
            None => builder,
        };

        let files = files.unwrap_or_default();
        if !files.is_empty() {
            let mut form = multipart::Form::new();
            if let Some(body) = &body {
                for (name, value) in form_pairs(&body.fields) {
                    form = form.text(name, value);
                }
            }
            for (name, upload) in &files {
                let mut part = multipart::Part::bytes(upload.read_all()?)
                    .file_name(upload.file_name().unwrap_or(name.as_str()).to_string());
                if let Some(mime) = upload.mime_type() {
                    part = part.mime_str(mime)?;
                }
                form = form.part(name.clone(), part);
            }
            builder = builder.multipart(form);
        } else if let Some(body) = body {
            builder = match body.mode {
                PayloadMode::Data => builder.form(&form_pairs(&body.fields)),
                PayloadMode::Json => builder.json(&Value::Object(body.fields)),
            };
        }

        let http_request = builder.build()?;
        let recorded = RecordedRequest {
            method: http_request.method().clone(),
            url: http_request.url().to_string(),
            headers: header_pairs(http_request.headers()),
            body: http_request
                .body()
                .and_then(|b| b.as_bytes())
                .map(<[u8]>::to_vec),
        };

        let http_response = self.client.execute(http_request)?;
        let status = http_response.status().as_u16();
        let headers = header_pairs(http_response.headers());
        let body = http_response.bytes()?.to_vec();

        Ok(HttpResponse::new(status, headers, body, recorded))
    }
}

fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Flatten a JSON object into form pairs.
///
/// Strings go as-is, numbers and booleans as their text, `null` is skipped,
/// arrays become repeated keys and objects are sent as JSON text.
pub fn form_pairs(fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = form_text(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = form_text(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn form_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
