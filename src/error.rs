use crate::client::HttpResponse;
use thiserror::Error;

/// Main error type for resource operations
#[derive(Debug, Error)]
pub enum RestError {
    /// Operation invoked on a resource that did not register the capability
    #[error("{resource} does not support {capability}; register it on the resource builder")]
    Unsupported {
        resource: String,
        capability: &'static str,
    },

    /// Non-2xx HTTP status, carrying the full response
    #[error("HTTP error {status}: {}", .response.text())]
    Http {
        status: u16,
        response: Box<HttpResponse>,
    },

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Failure reported by a custom transport
    #[error("transport error: {0}")]
    Transport(String),

    /// A field was read (as identifier or template placeholder) but never set
    #[error("{resource} has no field '{field}'")]
    MissingField { resource: String, field: String },

    /// Malformed URL or display-label template
    #[error("template error: {0}")]
    Template(String),

    /// A nested-entity field held a value that cannot become an entity
    #[error("cannot cast field '{field}' into a nested entity: {reason}")]
    NestedCast { field: String, reason: String },

    /// The pagination strategy could not find an item list in the body
    #[error("pagination error: {0}")]
    Pagination(String),

    /// A response body did not have the shape an entity needs
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl RestError {
    /// Create a new HTTP error from a response
    pub fn http(response: HttpResponse) -> Self {
        RestError::Http {
            status: response.status,
            response: Box::new(response),
        }
    }

    pub(crate) fn missing_field(resource: &str, field: &str) -> Self {
        RestError::MissingField {
            resource: resource.to_string(),
            field: field.to_string(),
        }
    }

    /// Check if this error is a permission denied error (403)
    pub fn is_permission_denied(&self) -> bool {
        self.status_code() == Some(403)
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Get the HTTP status code if the error came with a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Http { status, .. } => Some(*status),
            RestError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The response embedded in the error, if any
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            RestError::Http { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Take the embedded response out of the error, or give the error back
    pub fn into_response(self) -> std::result::Result<HttpResponse, RestError> {
        match self {
            RestError::Http { response, .. } => Ok(*response),
            other => Err(other),
        }
    }
}

/// Result type for REST operations
pub type Result<T> = std::result::Result<T, RestError>;
