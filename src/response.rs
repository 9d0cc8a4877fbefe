use crate::client::{HttpResponse, RecordedRequest};
use crate::entity::Entity;
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Deref;

/// Meta pairs a transport response with the request that produced it.
///
/// Created once per call and never mutated afterwards. Two envelopes are
/// equal when their responses are; the receive time is not compared.
#[derive(Debug, Clone)]
pub struct Meta {
    response: HttpResponse,
    received_at: DateTime<Utc>,
}

impl Meta {
    /// Wrap a response, stamped with the current time
    pub fn new(response: HttpResponse) -> Self {
        Meta {
            response,
            received_at: Utc::now(),
        }
    }

    /// Response as returned by the transport
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// Request as it left the client
    pub fn request(&self) -> &RecordedRequest {
        &self.response.request
    }

    /// HTTP status of the response
    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// When the response was handed back by the transport
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Render the request as an equivalent curl command line
    pub fn to_curl(&self) -> String {
        let request = self.request();
        let mut parts = vec!["curl".to_string(), "-X".to_string(), request.method.to_string()];

        let mut headers: Vec<&(String, String)> = request.headers.iter().collect();
        headers.sort();
        for (name, value) in headers {
            parts.push("-H".to_string());
            parts.push(shell_quote(&format!("{}: {}", name, value)));
        }

        if let Some(body) = request.body.as_ref().filter(|b| !b.is_empty()) {
            parts.push("-d".to_string());
            parts.push(shell_quote(&String::from_utf8_lossy(body)));
        }

        parts.push(shell_quote(&request.url));
        parts.join(" ")
    }
}

impl PartialEq for Meta {
    fn eq(&self, other: &Self) -> bool {
        self.response == other.response
    }
}

fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
        });
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r#"'"'"'"#))
    }
}

/// Entities from a listing call, with the Meta of that call
#[derive(Debug, Clone, PartialEq)]
pub struct MetaList {
    items: Vec<Entity>,
    meta: Meta,
}

impl MetaList {
    /// Pair listed entities with the listing Meta
    pub fn new(items: Vec<Entity>, meta: Meta) -> Self {
        MetaList { items, meta }
    }

    /// Meta of the listing call
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Drop the Meta and keep the entities
    pub fn into_vec(self) -> Vec<Entity> {
        self.items
    }
}

impl Deref for MetaList {
    type Target = [Entity];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl IntoIterator for MetaList {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetaList {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// `[<Pet: a>, <Pet: b>]`
impl fmt::Display for MetaList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("]")
    }
}

/// Result of a successful deletion
#[derive(Debug, Clone, PartialEq)]
pub struct NoContent {
    meta: Meta,
}

impl NoContent {
    /// Wrap the Meta of a deletion
    pub fn new(meta: Meta) -> Self {
        NoContent { meta }
    }

    /// Meta of the deletion call
    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}

impl fmt::Display for NoContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<NO CONTENT>")
    }
}

/// What an operation produced when the transport call itself went through.
///
/// A status code other than the one the operation expects is not an error:
/// it comes back as `Unhandled` so the response can be inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Handled(T),
    Unhandled(Meta),
}

impl<T> Outcome<T> {
    /// Whether the expected status came back
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled(_))
    }

    /// Whether another status came back
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Outcome::Unhandled(_))
    }

    /// Borrow the handled value
    pub fn handled(&self) -> Option<&T> {
        match self {
            Outcome::Handled(value) => Some(value),
            Outcome::Unhandled(_) => None,
        }
    }

    /// Take the handled value
    pub fn into_handled(self) -> Option<T> {
        match self {
            Outcome::Handled(value) => Some(value),
            Outcome::Unhandled(_) => None,
        }
    }

    /// Meta of an unhandled response
    pub fn unhandled(&self) -> Option<&Meta> {
        match self {
            Outcome::Handled(_) => None,
            Outcome::Unhandled(meta) => Some(meta),
        }
    }

    /// Transform the handled value, keeping Unhandled as-is
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Handled(value) => Outcome::Handled(f(value)),
            Outcome::Unhandled(meta) => Outcome::Unhandled(meta),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Handled(value) => value.fmt(f),
            Outcome::Unhandled(_) => f.write_str("<UNHANDLED RESPONSE>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn meta(request: RecordedRequest) -> Meta {
        Meta::new(HttpResponse::new(200, Vec::new(), Vec::new(), request))
    }

    #[test]
    fn test_to_curl_get() {
        let mut request = RecordedRequest::new(Method::GET, "https://pokeapi.co/api/v2/pokemon");
        request.headers = vec![
            ("user-agent".to_string(), "restkit".to_string()),
            ("accept".to_string(), "*/*".to_string()),
        ];

        assert_eq!(
            meta(request).to_curl(),
            "curl -X GET -H 'accept: */*' -H 'user-agent: restkit' https://pokeapi.co/api/v2/pokemon"
        );
    }

    #[test]
    fn test_to_curl_with_body() {
        let mut request = RecordedRequest::new(Method::POST, "http://super.cool/api/pets?a=1&b=2");
        request.body = Some(b"name=Luna's".to_vec());

        assert_eq!(
            meta(request).to_curl(),
            r#"curl -X POST -d 'name=Luna'"'"'s' 'http://super.cool/api/pets?a=1&b=2'"#
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let meta = meta(RecordedRequest::new(Method::DELETE, "http://super.cool/api/pets/xx"));

        let done: Outcome<NoContent> = Outcome::Handled(NoContent::new(meta.clone()));
        assert!(done.is_handled());
        assert_eq!(done.to_string(), "<NO CONTENT>");

        let unhandled: Outcome<NoContent> = Outcome::Unhandled(meta);
        assert!(unhandled.is_unhandled());
        assert_eq!(unhandled.unhandled().map(Meta::status), Some(200));
        assert_eq!(unhandled.to_string(), "<UNHANDLED RESPONSE>");
        assert!(unhandled.into_handled().is_none());
    }

    #[test]
    fn test_meta_equality_ignores_receive_time() {
        let response = HttpResponse::new(
            200,
            Vec::new(),
            b"[]".to_vec(),
            RecordedRequest::new(Method::GET, "http://super.cool/api/pets"),
        );
        let first = Meta::new(response.clone());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = Meta::new(response);

        assert!(second.received_at() > first.received_at());
        assert_eq!(first, second);
        assert_eq!(MetaList::new(Vec::new(), first), MetaList::new(Vec::new(), second));
    }

    #[test]
    fn test_meta_list_display() {
        use crate::client::{PreparedRequest, Transport};
        use crate::error::{RestError, Result};
        use crate::resource::Resource;
        use std::sync::Arc;

        struct Offline;

        impl Transport for Offline {
            fn execute(&self, _request: PreparedRequest) -> Result<HttpResponse> {
                Err(RestError::Transport("offline".to_string()))
            }
        }

        let pets = Resource::builder("Pet", "http://super.cool/api/pets")
            .transport(Arc::new(Offline))
            .build()
            .unwrap();
        let items = vec![
            pets.existing_entity([("id", "a")]).unwrap(),
            pets.existing_entity([("id", "b")]).unwrap(),
        ];
        let list = MetaList::new(items, meta(RecordedRequest::new(Method::GET, "http://super.cool/api/pets")));
        assert_eq!(list.to_string(), "[<Pet: a>, <Pet: b>]");
        assert_eq!(MetaList::new(Vec::new(), list.meta().clone()).to_string(), "[]");

        let handled: Outcome<MetaList> = Outcome::Handled(list.clone());
        assert_eq!(handled.to_string(), "[<Pet: a>, <Pet: b>]");
        let unhandled: Outcome<MetaList> = Outcome::Unhandled(list.meta().clone());
        assert_eq!(unhandled.to_string(), "<UNHANDLED RESPONSE>");
    }
}
