//! Per-resource configuration.
//!
//! A [`Resource`] describes one remote collection: where it lives, how its
//! entities are identified and displayed, which fields hold nested entities,
//! the request defaults, and which operations it supports. Build one with
//! [`Resource::builder`]; the result is shared as `Arc<Resource>` and is
//! read-only from then on.

use crate::client::{Auth, Headers, HttpResponse, ReqwestTransport, Transport};
use crate::error::{RestError, Result};
use crate::mixins::{Capability, CreateOp, DeleteOp, ListOp, RetrieveOp, UpdateOp};
use crate::pagination::{PageNumberPagination, Paginator};
use crate::template;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default instance URL template
pub const DEFAULT_INSTANCE_URL: &str = "{base_api_url}/{identifier}";

/// Handler signature for [`OnException::Custom`]
pub type ExceptionHandler = dyn Fn(RestError) -> Result<HttpResponse> + Send + Sync;

/// What to do when a request fails, either at the transport or with a
/// non-2xx status
#[derive(Clone, Default)]
pub enum OnException {
    /// Return the error to the caller
    #[default]
    Propagate,
    /// Hand back the response carried by the error, if there is one
    ReturnResponse,
    /// Anything else
    Custom(Arc<ExceptionHandler>),
}

impl OnException {
    /// Route errors through a caller-supplied handler
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(RestError) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        OnException::Custom(Arc::new(handler))
    }

    /// Apply the policy to an error
    pub fn handle(&self, error: RestError) -> Result<HttpResponse> {
        match self {
            OnException::Propagate => Err(error),
            OnException::ReturnResponse => error.into_response(),
            OnException::Custom(handler) => handler(error),
        }
    }
}

impl fmt::Debug for OnException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnException::Propagate => f.write_str("Propagate"),
            OnException::ReturnResponse => f.write_str("ReturnResponse"),
            OnException::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Configuration of one remote resource collection
pub struct Resource {
    name: String,
    base_api_url: String,
    instance_url: String,
    identifier_field: String,
    pretty_identifier: String,
    label_in_repr: bool,
    nested: IndexMap<String, Arc<Resource>>,
    request_headers: Option<Headers>,
    request_timeout: Option<Duration>,
    request_auth: Option<Auth>,
    on_exception: OnException,
    paginator: Arc<dyn Paginator>,
    transport: Arc<dyn Transport>,
    pub(crate) list: Option<ListOp>,
    pub(crate) create: Option<CreateOp>,
    pub(crate) retrieve: Option<RetrieveOp>,
    pub(crate) update: Option<UpdateOp>,
    pub(crate) delete: Option<DeleteOp>,
}

impl Resource {
    /// Start configuring a resource named `name` rooted at `base_api_url`
    pub fn builder(name: impl Into<String>, base_api_url: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(name, base_api_url)
    }

    /// Type name used in representations and error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection URL, also `{base_api_url}` in templates
    pub fn base_api_url(&self) -> &str {
        &self.base_api_url
    }

    /// URL of a single entity
    pub fn instance_url(&self, identifier: &str) -> Result<String> {
        self.format_url(&self.instance_url, Some(identifier))
    }

    /// Field holding the entity identifier
    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    /// Template used by [`Entity::display_label`](crate::Entity::display_label)
    pub fn pretty_identifier(&self) -> &str {
        &self.pretty_identifier
    }

    /// Whether `repr()` uses the display label instead of the identifier
    pub fn label_in_repr(&self) -> bool {
        self.label_in_repr
    }

    /// Resource that values of `field` are cast into, if any
    pub fn nested(&self, field: &str) -> Option<&Arc<Resource>> {
        self.nested.get(field)
    }

    /// Default headers for every request
    pub fn request_headers(&self) -> Option<&Headers> {
        self.request_headers.as_ref()
    }

    /// Default request timeout
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Default credentials
    pub fn request_auth(&self) -> Option<&Auth> {
        self.request_auth.as_ref()
    }

    /// Policy applied to failed requests
    pub fn on_exception(&self) -> &OnException {
        &self.on_exception
    }

    /// Strategy used to read listings
    pub fn paginator(&self) -> &dyn Paginator {
        self.paginator.as_ref()
    }

    /// Transport every request goes through
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Whether the operation was registered on this resource
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::List => self.list.is_some(),
            Capability::Create => self.create.is_some(),
            Capability::Retrieve => self.retrieve.is_some(),
            Capability::Update => self.update.is_some(),
            Capability::Delete => self.delete.is_some(),
        }
    }

    pub(crate) fn unsupported(&self, capability: Capability) -> RestError {
        RestError::Unsupported {
            resource: self.name.clone(),
            capability: capability.op_name(),
        }
    }

    /// Expand `{base_api_url}` and, when given, `{identifier}` in a URL template
    pub(crate) fn format_url(&self, url_template: &str, identifier: Option<&str>) -> Result<String> {
        template::render(url_template, |name| match (name, identifier) {
            ("base_api_url", _) => Ok(self.base_api_url.clone()),
            ("identifier", Some(identifier)) => Ok(identifier.to_string()),
            (other, _) => Err(RestError::Template(format!(
                "unknown placeholder '{{{}}}' in URL template '{}'",
                other, url_template
            ))),
        })
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("base_api_url", &self.base_api_url)
            .field("instance_url", &self.instance_url)
            .field("identifier_field", &self.identifier_field)
            .field("nested", &self.nested.keys().collect::<Vec<_>>())
            .field("on_exception", &self.on_exception)
            .field("list", &self.list)
            .field("create", &self.create)
            .field("retrieve", &self.retrieve)
            .field("update", &self.update)
            .field("delete", &self.delete)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Resource`]
pub struct ResourceBuilder {
    name: String,
    base_api_url: String,
    instance_url: String,
    identifier_field: String,
    pretty_identifier: Option<String>,
    label_in_repr: bool,
    nested: IndexMap<String, Arc<Resource>>,
    request_headers: Option<Headers>,
    request_timeout: Option<Duration>,
    request_auth: Option<Auth>,
    on_exception: OnException,
    paginator: Arc<dyn Paginator>,
    transport: Option<Arc<dyn Transport>>,
    list: Option<ListOp>,
    create: Option<CreateOp>,
    retrieve: Option<RetrieveOp>,
    update: Option<UpdateOp>,
    delete: Option<DeleteOp>,
}

impl ResourceBuilder {
    /// Same as [`Resource::builder`]
    pub fn new(name: impl Into<String>, base_api_url: impl Into<String>) -> Self {
        ResourceBuilder {
            name: name.into(),
            base_api_url: base_api_url.into(),
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
            identifier_field: "id".to_string(),
            pretty_identifier: None,
            label_in_repr: false,
            nested: IndexMap::new(),
            request_headers: None,
            request_timeout: None,
            request_auth: None,
            on_exception: OnException::default(),
            paginator: Arc::new(PageNumberPagination),
            transport: None,
            list: None,
            create: None,
            retrieve: None,
            update: None,
            delete: None,
        }
    }

    /// Template for single-entity URLs, `{base_api_url}` and `{identifier}`
    /// are available
    pub fn instance_url(mut self, url_template: impl Into<String>) -> Self {
        self.instance_url = url_template.into();
        self
    }

    /// Field holding the entity identifier; defaults to `id`
    pub fn identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    /// Display label template; defaults to `{<identifier_field>}`
    pub fn pretty_identifier(mut self, label_template: impl Into<String>) -> Self {
        self.pretty_identifier = Some(label_template.into());
        self
    }

    /// Use the display label in `repr()`
    pub fn label_in_repr(mut self, enabled: bool) -> Self {
        self.label_in_repr = enabled;
        self
    }

    /// Cast values of `field` into entities of `resource`
    pub fn nested(mut self, field: impl Into<String>, resource: Arc<Resource>) -> Self {
        self.nested.insert(field.into(), resource);
        self
    }

    /// Replace the default headers
    pub fn request_headers(mut self, headers: Headers) -> Self {
        self.request_headers = Some(headers);
        self
    }

    /// Add one default header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    /// Default request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default credentials
    pub fn request_auth(mut self, auth: Auth) -> Self {
        self.request_auth = Some(auth);
        self
    }

    /// Policy applied to failed requests
    pub fn on_exception(mut self, policy: OnException) -> Self {
        self.on_exception = policy;
        self
    }

    /// Strategy used to read listings; defaults to [`PageNumberPagination`]
    pub fn paginator(mut self, paginator: impl Paginator + 'static) -> Self {
        self.paginator = Arc::new(paginator);
        self
    }

    /// Transport to use instead of [`ReqwestTransport`]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register the list capability
    pub fn list(mut self, op: ListOp) -> Self {
        self.list = Some(op);
        self
    }

    /// Register the create capability
    pub fn create(mut self, op: CreateOp) -> Self {
        self.create = Some(op);
        self
    }

    /// Register the retrieve capability
    pub fn retrieve(mut self, op: RetrieveOp) -> Self {
        self.retrieve = Some(op);
        self
    }

    /// Register the update capability
    pub fn update(mut self, op: UpdateOp) -> Self {
        self.update = Some(op);
        self
    }

    /// Register the delete capability
    pub fn delete(mut self, op: DeleteOp) -> Self {
        self.delete = Some(op);
        self
    }

    /// Register all five operations with their defaults
    pub fn viewset(self) -> Self {
        self.list(ListOp::default())
            .create(CreateOp::default())
            .retrieve(RetrieveOp::default())
            .update(UpdateOp::default())
            .delete(DeleteOp::default())
    }

    /// Validate the configuration and freeze it
    pub fn build(self) -> Result<Arc<Resource>> {
        Url::parse(&self.base_api_url)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let pretty_identifier = self
            .pretty_identifier
            .unwrap_or_else(|| format!("{{{}}}", self.identifier_field));

        Ok(Arc::new(Resource {
            name: self.name,
            base_api_url: self.base_api_url,
            instance_url: self.instance_url,
            identifier_field: self.identifier_field,
            pretty_identifier,
            label_in_repr: self.label_in_repr,
            nested: self.nested,
            request_headers: self.request_headers,
            request_timeout: self.request_timeout,
            request_auth: self.request_auth,
            on_exception: self.on_exception,
            paginator: self.paginator,
            transport,
            list: self.list,
            create: self.create,
            retrieve: self.retrieve,
            update: self.update,
            delete: self.delete,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PreparedRequest, RecordedRequest};
    use reqwest::Method;

    struct Offline;

    impl Transport for Offline {
        fn execute(&self, _request: PreparedRequest) -> Result<HttpResponse> {
            Err(RestError::Transport("offline".to_string()))
        }
    }

    fn builder() -> ResourceBuilder {
        Resource::builder("MyLib", "http://super.cool/api").transport(Arc::new(Offline))
    }

    #[test]
    fn test_defaults() {
        let resource = builder().build().unwrap();
        assert_eq!(resource.base_api_url(), "http://super.cool/api");
        assert_eq!(resource.identifier_field(), "id");
        assert_eq!(resource.pretty_identifier(), "{id}");
        assert!(resource.request_headers().is_none());
        assert!(resource.request_timeout().is_none());
        assert!(resource.request_auth().is_none());
        assert!(!resource.label_in_repr());
        for capability in Capability::ALL {
            assert!(!resource.supports(capability));
        }
    }

    #[test]
    fn test_instance_url() {
        let resource = builder().build().unwrap();
        assert_eq!(resource.instance_url("<ID>").unwrap(), "http://super.cool/api/<ID>");

        let resource = builder()
            .instance_url("http://super.cool/api/custom/{identifier}")
            .build()
            .unwrap();
        assert_eq!(
            resource.instance_url("<ID>").unwrap(),
            "http://super.cool/api/custom/<ID>"
        );

        let resource = builder().instance_url("{base_api_url}/{pk}").build().unwrap();
        assert!(matches!(resource.instance_url("1"), Err(RestError::Template(_))));
    }

    #[test]
    fn test_request_defaults() {
        let resource = builder()
            .header("Authorization", "Token <TOKEN>")
            .request_timeout(Duration::from_secs(10))
            .request_auth(Auth::basic("username", "password"))
            .build()
            .unwrap();

        assert_eq!(
            resource.request_headers().and_then(|h| h.get("Authorization")),
            Some(&"Token <TOKEN>".to_string())
        );
        assert_eq!(resource.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(resource.request_auth(), Some(&Auth::basic("username", "password")));
    }

    #[test]
    fn test_viewset_registers_everything() {
        let resource = builder().viewset().build().unwrap();
        for capability in Capability::ALL {
            assert!(resource.supports(capability));
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let result = Resource::builder("Broken", "not a url")
            .transport(Arc::new(Offline))
            .build();
        assert!(matches!(result, Err(RestError::UrlParse(_))));
    }

    #[test]
    fn test_exception_policies() {
        let response = HttpResponse::new(
            500,
            Vec::new(),
            b"Something is not good".to_vec(),
            RecordedRequest::new(Method::GET, "http://super.cool/api"),
        );

        let err = OnException::Propagate
            .handle(RestError::http(response.clone()))
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error 500: Something is not good");

        let returned = OnException::ReturnResponse
            .handle(RestError::http(response.clone()))
            .unwrap();
        assert_eq!(returned, response);

        let err = OnException::ReturnResponse
            .handle(RestError::Transport("connection refused".to_string()))
            .unwrap_err();
        assert!(matches!(err, RestError::Transport(_)));

        let crappy = OnException::custom(|_| Err(RestError::Other("API is crappy".to_string())));
        let err = crappy.handle(RestError::http(response)).unwrap_err();
        assert_eq!(err.to_string(), "API is crappy");
    }
}
