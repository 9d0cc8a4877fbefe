//! CRUD capabilities.
//!
//! Each operation is an independent value registered on a resource through
//! its builder. Calling an operation the resource did not register fails with
//! [`RestError::Unsupported`](crate::error::RestError::Unsupported) naming the
//! missing capability. A response whose status differs from the operation's
//! expected status comes back as [`Outcome::Unhandled`].

use crate::client::{HttpResponse, PayloadMode};
use crate::entity::{Entity, Fields};
use crate::error::Result;
use crate::field::Field;
use crate::query::add_querystring_to_url;
use crate::resource::Resource;
use crate::response::{Meta, MetaList, NoContent, Outcome};
use crate::rest::CallOptions;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The five operations a resource can support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    List,
    Create,
    Retrieve,
    Update,
    Delete,
}

impl Capability {
    /// Every capability, in CRUD order
    pub const ALL: [Capability; 5] = [
        Capability::List,
        Capability::Create,
        Capability::Retrieve,
        Capability::Update,
        Capability::Delete,
    ];

    /// Name of the value that registers this capability
    pub fn op_name(self) -> &'static str {
        match self {
            Capability::List => "ListOp",
            Capability::Create => "CreateOp",
            Capability::Retrieve => "RetrieveOp",
            Capability::Update => "UpdateOp",
            Capability::Delete => "DeleteOp",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op_name())
    }
}

/// `GET` on the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOp {
    pub expected_status: u16,
    /// Overrides the base URL; `{base_api_url}` is available
    pub url: Option<String>,
}

impl Default for ListOp {
    fn default() -> Self {
        ListOp {
            expected_status: 200,
            url: None,
        }
    }
}

impl ListOp {
    /// Status a listing must come back with
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the collection URL
    pub fn url(mut self, url_template: impl Into<String>) -> Self {
        self.url = Some(url_template.into());
        self
    }

    /// Resolve the listing URL
    pub fn get_list_url(&self, resource: &Resource) -> Result<String> {
        collection_url(resource, self.url.as_deref())
    }
}

/// `POST` on the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOp {
    pub payload_mode: PayloadMode,
    pub expected_status: u16,
    /// Overrides the base URL; `{base_api_url}` is available
    pub url: Option<String>,
}

impl Default for CreateOp {
    fn default() -> Self {
        CreateOp {
            payload_mode: PayloadMode::Data,
            expected_status: 201,
            url: None,
        }
    }
}

impl CreateOp {
    /// Encoding of the create payload
    pub fn payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Status a creation must come back with
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the collection URL
    pub fn url(mut self, url_template: impl Into<String>) -> Self {
        self.url = Some(url_template.into());
        self
    }

    /// Resolve the creation URL
    pub fn get_create_url(&self, resource: &Resource) -> Result<String> {
        collection_url(resource, self.url.as_deref())
    }
}

/// `GET` on one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveOp {
    pub expected_status: u16,
    /// Overrides the instance URL; `{base_api_url}` and `{identifier}` are available
    pub url: Option<String>,
}

impl Default for RetrieveOp {
    fn default() -> Self {
        RetrieveOp {
            expected_status: 200,
            url: None,
        }
    }
}

impl RetrieveOp {
    /// Status a retrieval must come back with
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the instance URL
    pub fn url(mut self, url_template: impl Into<String>) -> Self {
        self.url = Some(url_template.into());
        self
    }

    /// Resolve the retrieval URL for `identifier`
    pub fn get_retrieve_url(&self, resource: &Resource, identifier: &str) -> Result<String> {
        instance_url(resource, self.url.as_deref(), identifier)
    }
}

/// `PATCH` on one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOp {
    pub payload_mode: PayloadMode,
    pub expected_status: u16,
    /// Overrides the instance URL; `{base_api_url}` and `{identifier}` are available
    pub url: Option<String>,
}

impl Default for UpdateOp {
    fn default() -> Self {
        UpdateOp {
            payload_mode: PayloadMode::Data,
            expected_status: 200,
            url: None,
        }
    }
}

impl UpdateOp {
    /// Encoding of the update payload
    pub fn payload_mode(mut self, mode: PayloadMode) -> Self {
        self.payload_mode = mode;
        self
    }

    /// Status an update must come back with
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the instance URL
    pub fn url(mut self, url_template: impl Into<String>) -> Self {
        self.url = Some(url_template.into());
        self
    }

    /// Resolve the update URL for `identifier`
    pub fn get_update_url(&self, resource: &Resource, identifier: &str) -> Result<String> {
        instance_url(resource, self.url.as_deref(), identifier)
    }
}

/// `DELETE` on one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOp {
    pub expected_status: u16,
    /// Overrides the instance URL; `{base_api_url}` and `{identifier}` are available
    pub url: Option<String>,
}

impl Default for DeleteOp {
    fn default() -> Self {
        DeleteOp {
            expected_status: 204,
            url: None,
        }
    }
}

impl DeleteOp {
    /// Status a deletion must come back with
    pub fn expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the instance URL
    pub fn url(mut self, url_template: impl Into<String>) -> Self {
        self.url = Some(url_template.into());
        self
    }

    /// Resolve the deletion URL for `identifier`
    pub fn get_delete_url(&self, resource: &Resource, identifier: &str) -> Result<String> {
        instance_url(resource, self.url.as_deref(), identifier)
    }
}

fn collection_url(resource: &Resource, url_template: Option<&str>) -> Result<String> {
    match url_template {
        Some(url_template) => resource.format_url(url_template, None),
        None => Ok(resource.base_api_url().to_string()),
    }
}

fn instance_url(resource: &Resource, url_template: Option<&str>, identifier: &str) -> Result<String> {
    match url_template {
        Some(url_template) => resource.format_url(url_template, Some(identifier)),
        None => resource.instance_url(identifier),
    }
}

fn collect_fields<I, K, V>(fields: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Field>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl Resource {
    fn unhandled<T>(&self, response: HttpResponse, expected: u16) -> Outcome<T> {
        debug!(
            resource = %self.name(),
            status = response.status,
            expected,
            url = %response.request.url,
            "Unhandled response status"
        );
        Outcome::Unhandled(Meta::new(response))
    }

    fn op<'a, T>(&self, op: &'a Option<T>, capability: Capability) -> Result<&'a T> {
        op.as_ref().ok_or_else(|| self.unsupported(capability))
    }

    /// List the collection
    pub fn list(self: &Arc<Self>) -> Result<Outcome<MetaList>> {
        self.list_with(std::iter::empty::<(String, String)>())
    }

    /// List the collection with query parameters merged into the list URL
    pub fn list_with<I, K, V>(self: &Arc<Self>, params: I) -> Result<Outcome<MetaList>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let op = self.op(&self.list, Capability::List)?;
        let url = add_querystring_to_url(&op.get_list_url(self)?, params);

        let response = self.request(Method::GET, &url, CallOptions::new())?;
        if response.status != op.expected_status {
            return Ok(self.unhandled(response, op.expected_status));
        }
        Ok(Outcome::Handled(self.prepare_many(response, self)?))
    }

    /// Create an entity from the given fields
    pub fn create<I, K, V>(self: &Arc<Self>, fields: I) -> Result<Outcome<Entity>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Field>,
    {
        let op = self.op(&self.create, Capability::Create)?;
        let url = op.get_create_url(self)?;
        let options = CallOptions::new().payload(op.payload_mode, collect_fields(fields));

        let response = self.request(Method::POST, &url, options)?;
        if response.status != op.expected_status {
            return Ok(self.unhandled(response, op.expected_status));
        }
        Ok(Outcome::Handled(self.prepare_one(response, self)?))
    }

    /// Fetch one entity
    pub fn retrieve(self: &Arc<Self>, identifier: impl fmt::Display) -> Result<Outcome<Entity>> {
        let op = self.op(&self.retrieve, Capability::Retrieve)?;
        let url = op.get_retrieve_url(self, &identifier.to_string())?;

        let response = self.request(Method::GET, &url, CallOptions::new())?;
        if response.status != op.expected_status {
            return Ok(self.unhandled(response, op.expected_status));
        }
        Ok(Outcome::Handled(self.prepare_one(response, self)?))
    }

    /// Partially update one entity with the given fields
    pub fn update<I, K, V>(
        self: &Arc<Self>,
        identifier: impl fmt::Display,
        fields: I,
    ) -> Result<Outcome<Entity>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Field>,
    {
        let op = self.op(&self.update, Capability::Update)?;
        let url = op.get_update_url(self, &identifier.to_string())?;
        let options = CallOptions::new().payload(op.payload_mode, collect_fields(fields));

        let response = self.request(Method::PATCH, &url, options)?;
        if response.status != op.expected_status {
            return Ok(self.unhandled(response, op.expected_status));
        }
        Ok(Outcome::Handled(self.prepare_one(response, self)?))
    }

    /// Delete one entity
    pub fn delete(self: &Arc<Self>, identifier: impl fmt::Display) -> Result<Outcome<NoContent>> {
        let op = self.op(&self.delete, Capability::Delete)?;
        let url = op.get_delete_url(self, &identifier.to_string())?;

        let response = self.request(Method::DELETE, &url, CallOptions::new())?;
        if response.status != op.expected_status {
            return Ok(self.unhandled(response, op.expected_status));
        }
        Ok(Outcome::Handled(NoContent::new(Meta::new(response))))
    }
}

impl Entity {
    /// Send pending changes: create when the entity is fresh, partial update
    /// with the changed fields otherwise
    pub fn save(&self) -> Result<Outcome<Entity>> {
        let resource = self.resource();
        if !self.is_existing() {
            if !resource.supports(Capability::Create) {
                return Err(resource.unsupported(Capability::Create));
            }
            return resource.create(self.changed_data().clone());
        }

        if !resource.supports(Capability::Update) {
            return Err(resource.unsupported(Capability::Update));
        }
        let identifier = self.identifier_string()?;
        resource.update(identifier, self.changed_data().clone())
    }

    /// Delete this entity on the server.
    ///
    /// The entity itself stays usable afterwards.
    pub fn destroy(&self) -> Result<Outcome<NoContent>> {
        let resource = self.resource();
        if !resource.supports(Capability::Delete) {
            return Err(resource.unsupported(Capability::Delete));
        }
        resource.delete(self.identifier_string()?)
    }
}
