//! # restkit - declarative REST resource clients
//!
//! Describe a remote REST collection once, then work with its records as
//! entities: list, create, retrieve, update and delete them, track what
//! changed locally and send only that back.
//!
//! ## Features
//!
//! - Per-resource configuration: base URL, instance URL template, identifier
//!   field, display label, request defaults
//! - CRUD operations composed as independent capabilities; calling one that
//!   was not registered fails with [`RestError::Unsupported`]
//! - Change tracking on entities, with `save()` routing to create or update
//! - Nested entities cast from JSON objects and sequences
//! - Pluggable pagination strategies for listing envelopes
//! - Exception policy per resource: propagate, return the response, or a
//!   custom handler
//! - Response metadata with a curl rendering of the request
//!
//! ## Basic Usage
//!
//! ```no_run
//! use restkit::{Outcome, Resource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pets = Resource::builder("Pet", "https://api.example.com/pets")
//!         .pretty_identifier("{name}")
//!         .viewset()
//!         .build()?;
//!
//!     if let Outcome::Handled(list) = pets.list_with([("species", "cat")])? {
//!         for pet in &list {
//!             println!("{} -> {}", pet, pet.display_label()?);
//!         }
//!     }
//!
//!     let mut luna = pets.new_entity([("name", "Luna"), ("species", "cat")])?;
//!     if let Outcome::Handled(created) = luna.save()? {
//!         luna = created;
//!     }
//!
//!     luna.set("name", "Luna II");
//!     let updated = luna.save()?;
//!     println!("{}", updated);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use restkit::{OnException, Resource, RetrieveOp};
//!
//! let pets = Resource::builder("Pet", "https://api.example.com/pets")
//!     .retrieve(RetrieveOp::default())
//!     .on_exception(OnException::ReturnResponse)
//!     .build()?;
//!
//! // A 404 now comes back as an unhandled outcome instead of an error
//! let outcome = pets.retrieve("missing")?;
//! if let Some(meta) = outcome.unhandled() {
//!     println!("{} -> {}", meta.status(), meta.to_curl());
//! }
//! # Ok::<(), restkit::RestError>(())
//! ```

pub mod client;
pub mod entity;
pub mod error;
pub mod field;
pub mod mixins;
pub mod pagination;
pub mod query;
pub mod resource;
pub mod response;
pub mod rest;
mod template;

// Re-export main types for convenience
pub use client::{
    create_rest_client, Auth, Headers, HttpResponse, PayloadMode, PreparedRequest,
    RecordedRequest, ReqwestTransport, Transport,
};
pub use entity::{Entity, Fields};
pub use error::{RestError, Result};
pub use field::{Field, SeqKind, Upload};
pub use mixins::{Capability, CreateOp, DeleteOp, ListOp, RetrieveOp, UpdateOp};
pub use pagination::{
    KeyedPagination, LimitOffsetPagination, NoPagination, PageNumberPagination, Paginator,
};
pub use query::add_querystring_to_url;
pub use resource::{OnException, Resource, ResourceBuilder};
pub use response::{Meta, MetaList, NoContent, Outcome};
pub use rest::{CallOptions, Decoded, Target};

// Re-export serde_json for convenience
pub use serde_json::json;
