//! Entities: client-side records of one remote resource.
//!
//! An [`Entity`] keeps every field it was ever given in `instance_data` and
//! the fields assigned since it became clean in `changed_data`. Entities
//! built from a server response start clean; entities built locally start
//! with every initial field marked as changed. Field names starting with
//! [`INTERNAL_PREFIX`] are bookkeeping and never tracked.

use crate::error::{RestError, Result};
use crate::field::{render_value, Field, SeqKind};
use crate::resource::Resource;
use crate::response::Meta;
use crate::template;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Field names with this prefix bypass change tracking
pub const INTERNAL_PREFIX: &str = "_";

/// Field name to value, in assignment order
pub type Fields = IndexMap<String, Field>;

/// One remote resource record
#[derive(Clone)]
pub struct Entity {
    resource: Arc<Resource>,
    instance_data: Fields,
    changed_data: Fields,
    internal: Fields,
    existing: bool,
    meta: Option<Meta>,
}

impl Entity {
    /// Build an entity, casting nested fields and recording the delta for
    /// fresh entities
    pub(crate) fn build<I>(
        resource: &Arc<Resource>,
        fields: I,
        existing: bool,
        meta: Option<Meta>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Field)>,
    {
        let mut entity = Entity {
            resource: Arc::clone(resource),
            instance_data: Fields::new(),
            changed_data: Fields::new(),
            internal: Fields::new(),
            existing,
            meta,
        };

        for (name, value) in fields {
            let value = match resource.nested(&name) {
                Some(nested) => cast_nested(&name, nested, value)?,
                None => value,
            };
            entity.assign(name, value, !existing);
        }

        Ok(entity)
    }

    /// Build an existing entity from a decoded JSON object
    pub(crate) fn from_json(
        resource: &Arc<Resource>,
        value: Value,
        existing: bool,
        meta: Option<Meta>,
    ) -> Result<Self> {
        match value {
            Value::Object(map) => Entity::build(
                resource,
                map.into_iter().map(|(k, v)| (k, Field::Json(v))),
                existing,
                meta,
            ),
            other => Err(RestError::Payload(format!(
                "{} expects a JSON object, got {}",
                resource.name(),
                other
            ))),
        }
    }

    fn assign(&mut self, name: String, value: Field, track: bool) {
        if name.starts_with(INTERNAL_PREFIX) {
            self.internal.insert(name, value);
            return;
        }
        if track {
            self.changed_data.insert(name.clone(), value.clone());
        }
        self.instance_data.insert(name, value);
    }

    /// Assign a field, recording it as changed
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        self.assign(name.into(), value.into(), true);
    }

    /// Read a tracked or internal field
    pub fn get(&self, name: &str) -> Option<&Field> {
        if name.starts_with(INTERNAL_PREFIX) {
            self.internal.get(name)
        } else {
            self.instance_data.get(name)
        }
    }

    /// Resource this entity belongs to
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    /// Whether the entity is known to exist server-side
    pub fn is_existing(&self) -> bool {
        self.existing
    }

    /// Response envelope, for entities returned by a single-entity call
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Every field ever assigned
    pub fn instance_data(&self) -> &Fields {
        &self.instance_data
    }

    /// Fields assigned since construction or since the entity became clean
    pub fn changed_data(&self) -> &Fields {
        &self.changed_data
    }

    /// Flag the entity as existing server-side and forget pending changes
    pub fn mark_existing(&mut self) {
        self.existing = true;
        self.changed_data.clear();
    }

    /// Value of the configured identifier field
    pub fn identifier(&self) -> Result<Value> {
        let field = self.resource.identifier_field();
        self.get(field)
            .map(Field::to_json)
            .ok_or_else(|| RestError::missing_field(self.resource.name(), field))
    }

    /// Identifier as it appears in URLs: strings unquoted, other values as
    /// JSON text
    pub fn identifier_string(&self) -> Result<String> {
        self.identifier().map(|id| render_value(&id))
    }

    /// Format the configured label template against the instance data.
    ///
    /// `{a.b}` walks into nested entities and JSON objects.
    pub fn display_label(&self) -> Result<String> {
        template::render(self.resource.pretty_identifier(), |path| {
            self.lookup(path)
                .ok_or_else(|| RestError::missing_field(self.resource.name(), path))
        })
    }

    fn lookup(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.get(first)?.clone();
        for segment in segments {
            current = match current {
                Field::Entity(entity) => entity.get(segment)?.clone(),
                Field::Json(Value::Object(mut map)) => Field::Json(map.remove(segment)?),
                Field::Json(Value::Array(items)) => {
                    let index: usize = segment.parse().ok()?;
                    Field::Json(items.into_iter().nth(index)?)
                }
                Field::Seq(_, items) => {
                    let index: usize = segment.parse().ok()?;
                    items.into_iter().nth(index)?
                }
                _ => return None,
            };
        }
        Some(current.render())
    }

    /// `<Name: identifier>`, or the label form when the resource asks for it
    pub fn repr(&self) -> Result<String> {
        if self.resource.label_in_repr() {
            return self.label_repr();
        }
        Ok(format!("<{}: {}>", self.resource.name(), self.identifier_string()?))
    }

    /// `<Name: display label>`
    pub fn label_repr(&self) -> Result<String> {
        Ok(format!("<{}: {}>", self.resource.name(), self.display_label()?))
    }

    /// Instance data as a JSON object, nested entities included
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .instance_data
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Convert the instance data into a typed value
    pub fn deserialize<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.to_json()).map_err(|e| e.into())
    }
}

/// Nested entities always start fresh, whatever the parent is
fn cast_nested(name: &str, nested: &Arc<Resource>, value: Field) -> Result<Field> {
    match value {
        Field::Json(Value::Object(map)) => Ok(Field::Entity(Box::new(Entity::from_json(
            nested,
            Value::Object(map),
            false,
            None,
        )?))),
        Field::Json(Value::Array(items)) => {
            let items = items
                .into_iter()
                .map(|item| cast_nested(name, nested, Field::Json(item)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Field::Seq(SeqKind::List, items))
        }
        Field::Seq(kind, items) => {
            let items = items
                .into_iter()
                .map(|item| cast_nested(name, nested, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Field::Seq(kind, items))
        }
        Field::Json(Value::Null) => Ok(Field::Json(Value::Null)),
        Field::Entity(entity) => Ok(Field::Entity(entity)),
        Field::Json(other) => Err(RestError::NestedCast {
            field: name.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
        Field::Upload(_) => Err(RestError::NestedCast {
            field: name.to_string(),
            reason: "uploads cannot become entities".to_string(),
        }),
    }
}

impl Resource {
    /// Build a fresh entity; every initial field counts as changed
    pub fn new_entity<I, K, V>(self: &Arc<Self>, fields: I) -> Result<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Field>,
    {
        Entity::build(
            self,
            fields.into_iter().map(|(k, v)| (k.into(), v.into())),
            false,
            None,
        )
    }

    /// Build an entity that already exists server-side; nothing is tracked
    /// until fields are assigned
    pub fn existing_entity<I, K, V>(self: &Arc<Self>, fields: I) -> Result<Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Field>,
    {
        Entity::build(
            self,
            fields.into_iter().map(|(k, v)| (k.into(), v.into())),
            true,
            None,
        )
    }

    /// Build a fresh entity from a JSON object
    pub fn entity_from_json(self: &Arc<Self>, value: Value) -> Result<Entity> {
        Entity::from_json(self, value, false, None)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.resource.name() == other.resource.name() && self.instance_data == other.instance_data
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(repr) => f.write_str(&repr),
            Err(_) => write!(f, "<{}>", self.resource.name()),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("resource", &self.resource.name())
            .field("existing", &self.existing)
            .field("instance_data", &self.instance_data)
            .field("changed_data", &self.changed_data)
            .field("internal", &self.internal)
            .finish()
    }
}
