use crate::client::{Auth, Body, Files, Headers, HttpResponse, PayloadMode, PreparedRequest};
use crate::entity::{Entity, Fields};
use crate::error::{RestError, Result};
use crate::field::{Field, Upload};
use crate::resource::Resource;
use crate::response::{Meta, MetaList};
use reqwest::Method;
use serde_json::Map;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-call payload and overrides.
///
/// Overrides win over the resource defaults; whatever is left unset at both
/// levels is left to the transport.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub payload: Option<(PayloadMode, Fields)>,
    pub timeout: Option<Duration>,
    pub headers: Option<Headers>,
    pub auth: Option<Auth>,
    pub files: Files,
}

impl CallOptions {
    /// Empty options: no payload and no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload sent with the given encoding
    pub fn payload(mut self, mode: PayloadMode, fields: Fields) -> Self {
        self.payload = Some((mode, fields));
        self
    }

    /// Form-encoded payload
    pub fn data(self, fields: Fields) -> Self {
        self.payload(PayloadMode::Data, fields)
    }

    /// JSON payload
    pub fn json(self, fields: Fields) -> Self {
        self.payload(PayloadMode::Json, fields)
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the request headers
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Override the credentials
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Attach a file part, in addition to uploads found in the payload
    pub fn file(mut self, name: impl Into<String>, upload: Upload) -> Self {
        self.files.insert(name.into(), upload);
        self
    }
}

/// What [`Resource::call_endpoint`] should turn the response into
#[derive(Debug, Clone)]
pub enum Target {
    /// Leave the response as-is
    Raw,
    /// One existing entity of the given resource
    One(Arc<Resource>),
    /// A paginated list of existing entities of the given resource
    Many(Arc<Resource>),
}

/// Result of [`Resource::call_endpoint`]
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Raw(HttpResponse),
    One(Entity),
    Many(MetaList),
}

impl Resource {
    /// Resolve a call into the request handed to the transport.
    ///
    /// Uploads in the payload move to the files map, entities in the payload
    /// are replaced by their identifier (top level only), and timeout,
    /// headers and auth fall back to the resource defaults.
    pub fn prepare_call(&self, method: Method, url: &str, options: CallOptions) -> Result<PreparedRequest> {
        let CallOptions {
            payload,
            timeout,
            headers,
            auth,
            mut files,
        } = options;

        let body = match payload {
            Some((mode, fields)) => {
                let mut out = Map::new();
                for (name, value) in fields {
                    match value {
                        Field::Upload(upload) => {
                            files.insert(name, upload);
                        }
                        Field::Entity(entity) => {
                            out.insert(name, entity.identifier()?);
                        }
                        other => {
                            out.insert(name, other.to_json());
                        }
                    }
                }
                for name in files.keys() {
                    out.remove(name);
                }
                Some(Body { mode, fields: out })
            }
            None => None,
        };

        debug!(
            resource = %self.name(),
            %method,
            url,
            mode = ?body.as_ref().map(|b| b.mode),
            files = files.len(),
            "Prepared request"
        );

        Ok(PreparedRequest {
            method,
            url: url.to_string(),
            timeout: timeout.or(self.request_timeout()),
            headers: headers.or_else(|| self.request_headers().cloned()),
            auth: auth.or_else(|| self.request_auth().cloned()),
            files: if files.is_empty() { None } else { Some(files) },
            body,
        })
    }

    /// Send a call through the transport.
    ///
    /// Non-2xx statuses become [`RestError::Http`]; any error, transport or
    /// status, goes through the resource's exception policy.
    pub fn request(&self, method: Method, url: &str, options: CallOptions) -> Result<HttpResponse> {
        let prepared = self.prepare_call(method.clone(), url, options)?;

        let start = Instant::now();
        let result = self.transport().execute(prepared).and_then(|response| {
            debug!(
                resource = %self.name(),
                %method,
                url,
                status = response.status,
                elapsed = ?start.elapsed(),
                "Received response"
            );
            if response.is_success() {
                Ok(response)
            } else {
                Err(RestError::http(response))
            }
        });

        result.or_else(|e| {
            warn!(
                resource = %self.name(),
                %method,
                url,
                error = %e,
                policy = ?self.on_exception(),
                "Request failed"
            );
            self.on_exception().handle(e)
        })
    }

    /// Issue a request and decode the response as asked by `target`
    pub fn call_endpoint(
        &self,
        method: Method,
        url: &str,
        options: CallOptions,
        target: Target,
    ) -> Result<Decoded> {
        let response = self.request(method, url, options)?;
        match target {
            Target::Raw => Ok(Decoded::Raw(response)),
            Target::One(resource) => Ok(Decoded::One(self.prepare_one(response, &resource)?)),
            Target::Many(resource) => Ok(Decoded::Many(self.prepare_many(response, &resource)?)),
        }
    }

    /// Build one existing entity of `target` from the response body
    pub fn prepare_one(&self, response: HttpResponse, target: &Arc<Resource>) -> Result<Entity> {
        let body = response.json()?;
        Entity::from_json(target, body, true, Some(Meta::new(response)))
    }

    /// Paginate the response body into existing entities of `target`
    pub fn prepare_many(&self, response: HttpResponse, target: &Arc<Resource>) -> Result<MetaList> {
        let items = self.paginator().get_results(response.json()?)?;
        let entities = items
            .into_iter()
            .map(|item| Entity::from_json(target, item, true, None))
            .collect::<Result<Vec<_>>>()?;
        Ok(MetaList::new(entities, Meta::new(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RecordedRequest, Transport};
    use crate::resource::OnException;
    use serde_json::json;
    use std::io::Cursor;

    struct Offline;

    impl Transport for Offline {
        fn execute(&self, _request: PreparedRequest) -> Result<HttpResponse> {
            Err(RestError::Transport("offline".to_string()))
        }
    }

    struct Canned(u16);

    impl Transport for Canned {
        fn execute(&self, request: PreparedRequest) -> Result<HttpResponse> {
            Ok(HttpResponse::new(
                self.0,
                Vec::new(),
                br#"{"id": "xx"}"#.to_vec(),
                RecordedRequest::new(request.method, request.url),
            ))
        }
    }

    fn canned(status: u16, policy: OnException) -> Arc<Resource> {
        Resource::builder("Pet", "http://super.cool/api/pets")
            .on_exception(policy)
            .transport(Arc::new(Canned(status)))
            .build()
            .unwrap()
    }

    fn lib1() -> Arc<Resource> {
        Resource::builder("MyLib1", "http://super.cool/api")
            .transport(Arc::new(Offline))
            .build()
            .unwrap()
    }

    fn lib2() -> Arc<Resource> {
        Resource::builder("MyLib2", "http://super.cool/api")
            .identifier_field("custom_identifier")
            .header("Authorization", "Token <TOKEN>")
            .request_timeout(Duration::from_secs(10))
            .request_auth(Auth::basic("username", "password"))
            .transport(Arc::new(Offline))
            .build()
            .unwrap()
    }

    fn fields<const N: usize>(pairs: [(&str, Field); N]) -> Fields {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_prepare_call_common() {
        let prepared = lib1()
            .prepare_call(Method::GET, "http://super.cool/api", CallOptions::new())
            .unwrap();

        assert_eq!(prepared.url, "http://super.cool/api");
        assert!(prepared.timeout.is_none());
        assert!(prepared.headers.is_none());
        assert!(prepared.auth.is_none());
        assert!(prepared.files.is_none());
        assert!(prepared.body.is_none());
    }

    #[test]
    fn test_prepare_call_resource_defaults_and_overrides() {
        let data = fields([("key1", Field::from("value1"))]);

        let prepared = lib2()
            .prepare_call(
                Method::POST,
                "http://super.cool/api",
                CallOptions::new().data(data.clone()),
            )
            .unwrap();
        assert_eq!(prepared.timeout, Some(Duration::from_secs(10)));
        assert_eq!(prepared.auth, Some(Auth::basic("username", "password")));
        assert_eq!(
            prepared.headers.as_ref().and_then(|h| h.get("Authorization")),
            Some(&"Token <TOKEN>".to_string())
        );
        assert_eq!(
            prepared.body,
            Some(Body {
                mode: PayloadMode::Data,
                fields: json!({"key1": "value1"}).as_object().unwrap().clone(),
            })
        );

        let prepared = lib2()
            .prepare_call(
                Method::PATCH,
                "http://super.cool/api",
                CallOptions::new().json(data).timeout(Duration::from_secs(20)),
            )
            .unwrap();
        assert_eq!(prepared.timeout, Some(Duration::from_secs(20)));
        assert_eq!(prepared.auth, Some(Auth::basic("username", "password")));
        assert_eq!(prepared.body.map(|b| b.mode), Some(PayloadMode::Json));
    }

    #[test]
    fn test_prepare_call_replaces_entities_with_identifiers() {
        let mylib1 = lib1()
            .new_entity([("id", "<mylib1.id>"), ("name", "Filipe")])
            .unwrap();
        let mylib2 = lib2()
            .new_entity([("custom_identifier", "<mylib2.custom_identifier>"), ("name", "Filipe")])
            .unwrap();

        for mode in [PayloadMode::Data, PayloadMode::Json] {
            let data = fields([
                ("key1", Field::from("value1")),
                ("mylib1", Field::from(mylib1.clone())),
                ("mylib2", Field::from(mylib2.clone())),
                ("many", Field::list([mylib1.clone()])),
            ]);
            let prepared = lib2()
                .prepare_call(Method::POST, "http://super.cool/api", CallOptions::new().payload(mode, data))
                .unwrap();

            let body = prepared.body.unwrap();
            assert_eq!(body.mode, mode);
            assert_eq!(
                serde_json::Value::Object(body.fields),
                json!({
                    "key1": "value1",
                    "mylib1": "<mylib1.id>",
                    "mylib2": "<mylib2.custom_identifier>",
                    "many": [{"id": "<mylib1.id>", "name": "Filipe"}]
                })
            );
        }
    }

    #[test]
    fn test_prepare_call_moves_uploads_to_files() {
        let upload = Upload::new(Cursor::new(b"sample".to_vec())).with_file_name("sample_file.txt");
        let data = fields([("key1", Field::from("value1")), ("f", Field::from(upload.clone()))]);

        let prepared = lib2()
            .prepare_call(Method::POST, "http://super.cool/api", CallOptions::new().data(data))
            .unwrap();

        let files = prepared.files.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files["f"].same_stream(&upload));
        assert_eq!(
            serde_json::Value::Object(prepared.body.unwrap().fields),
            json!({"key1": "value1"})
        );
    }

    #[test]
    fn test_prepare_call_explicit_file_shadows_payload_key() {
        let upload = Upload::new(Cursor::new(Vec::new()));
        let data = fields([("key1", Field::from("value1")), ("avatar", Field::from("ignored"))]);

        let prepared = lib1()
            .prepare_call(
                Method::POST,
                "http://super.cool/api",
                CallOptions::new().data(data).file("avatar", upload),
            )
            .unwrap();

        assert!(prepared.files.unwrap().contains_key("avatar"));
        assert!(!prepared.body.unwrap().fields.contains_key("avatar"));
    }

    #[test]
    fn test_prepare_many_and_one() {
        let resource = lib1();
        let response = HttpResponse::new(
            200,
            Vec::new(),
            br#"{"results": [{"id": "a"}, {"id": "b"}]}"#.to_vec(),
            RecordedRequest::new(Method::GET, "http://super.cool/api"),
        );
        let list = resource.prepare_many(response, &resource).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].identifier().unwrap(), json!("a"));
        assert_eq!(list[1].identifier().unwrap(), json!("b"));
        assert!(list.iter().all(|e| e.is_existing() && e.meta().is_none()));
        assert_eq!(list.meta().request().method, Method::GET);

        let response = HttpResponse::new(
            200,
            Vec::new(),
            br#"["not", "an", "object"]"#.to_vec(),
            RecordedRequest::new(Method::GET, "http://super.cool/api/xx"),
        );
        assert!(matches!(
            resource.prepare_one(response, &resource),
            Err(RestError::Payload(_))
        ));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_request_logs_and_succeeds() {
        let response = canned(200, OnException::Propagate)
            .request(Method::GET, "http://super.cool/api/pets/xx", CallOptions::new())
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(logs_contain("Received response"));
        assert!(!logs_contain("Request failed"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_request_error_goes_through_policy() {
        let err = canned(404, OnException::Propagate)
            .request(Method::GET, "http://super.cool/api/pets/xx", CallOptions::new())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(logs_contain("Request failed"));

        let response = canned(404, OnException::ReturnResponse)
            .request(Method::GET, "http://super.cool/api/pets/xx", CallOptions::new())
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_call_endpoint_targets() {
        let resource = canned(200, OnException::Propagate);
        let url = "http://super.cool/api/pets/xx";

        match resource.call_endpoint(Method::GET, url, CallOptions::new(), Target::Raw) {
            Ok(Decoded::Raw(response)) => assert_eq!(response.json().unwrap(), json!({"id": "xx"})),
            other => panic!("expected a raw response, got {:?}", other),
        }

        let target = Target::One(Arc::clone(&resource));
        match resource.call_endpoint(Method::GET, url, CallOptions::new(), target) {
            Ok(Decoded::One(entity)) => {
                assert_eq!(entity.repr().unwrap(), "<Pet: xx>");
                assert_eq!(entity.meta().map(Meta::status), Some(200));
            }
            other => panic!("expected one entity, got {:?}", other),
        }

        let target = Target::Many(Arc::clone(&resource));
        assert!(matches!(
            resource.call_endpoint(Method::GET, url, CallOptions::new(), target),
            Err(RestError::Pagination(_))
        ));
    }

    #[test]
    fn test_prepare_errors_skip_policy() {
        let resource = canned(200, OnException::custom(|_| Err(RestError::Other("handled".into()))));
        let anonymous = lib1().new_entity([("name", "nobody")]).unwrap();
        let data = fields([("owner", Field::from(anonymous))]);

        let err = resource
            .request(Method::POST, "http://super.cool/api/pets", CallOptions::new().data(data))
            .unwrap_err();
        assert!(matches!(err, RestError::MissingField { .. }));
    }
}
