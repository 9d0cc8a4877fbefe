use crate::entity::Entity;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Container kind of a sequence field, kept through nested casting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqKind {
    #[default]
    List,
    Tuple,
    Set,
}

/// Value held by an entity field
#[derive(Debug, Clone)]
pub enum Field {
    /// Plain JSON data
    Json(Value),
    /// A nested entity, or an entity passed by reference in a payload
    Entity(Box<Entity>),
    /// A container of fields
    Seq(SeqKind, Vec<Field>),
    /// A readable stream sent as a multipart file part
    Upload(Upload),
}

impl Field {
    /// Build a list field
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        Field::Seq(SeqKind::List, items.into_iter().map(Into::into).collect())
    }

    /// Build a tuple field
    pub fn tuple<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        Field::Seq(SeqKind::Tuple, items.into_iter().map(Into::into).collect())
    }

    /// Build a set field
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        Field::Seq(SeqKind::Set, items.into_iter().map(Into::into).collect())
    }

    /// Plain JSON value, if the field holds one
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Field::Json(value) => Some(value),
            _ => None,
        }
    }

    /// String value, if the field holds a JSON string
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Nested entity, if the field holds one
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Field::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Container kind and items, if the field is a sequence
    pub fn as_seq(&self) -> Option<(SeqKind, &[Field])> {
        match self {
            Field::Seq(kind, items) => Some((*kind, items)),
            _ => None,
        }
    }

    /// Upload, if the field holds one
    pub fn as_upload(&self) -> Option<&Upload> {
        match self {
            Field::Upload(upload) => Some(upload),
            _ => None,
        }
    }

    /// JSON rendering; entities render their full instance data
    pub fn to_json(&self) -> Value {
        match self {
            Field::Json(value) => value.clone(),
            Field::Entity(entity) => entity.to_json(),
            Field::Seq(_, items) => Value::Array(items.iter().map(Field::to_json).collect()),
            Field::Upload(upload) => upload
                .file_name()
                .map(|name| Value::String(name.to_string()))
                .unwrap_or(Value::Null),
        }
    }

    /// Text used when the field appears in a label or URL
    pub(crate) fn render(&self) -> String {
        match self {
            Field::Json(value) => render_value(value),
            Field::Entity(entity) => entity.to_string(),
            Field::Seq(_, items) => {
                let parts: Vec<String> = items.iter().map(Field::render).collect();
                format!("[{}]", parts.join(", "))
            }
            Field::Upload(upload) => upload.file_name().unwrap_or("<upload>").to_string(),
        }
    }
}

/// Strings unquoted, everything else as JSON text
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Json(a), Field::Json(b)) => a == b,
            (Field::Entity(a), Field::Entity(b)) => a == b,
            (Field::Seq(ka, a), Field::Seq(kb, b)) => ka == kb && a == b,
            (Field::Upload(a), Field::Upload(b)) => a.same_stream(b),
            _ => false,
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Json(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Json(Value::String(value.to_string()))
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Json(Value::String(value))
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::Json(Value::Bool(value))
    }
}

impl From<i32> for Field {
    fn from(value: i32) -> Self {
        Field::Json(value.into())
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::Json(value.into())
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Field::Json(value.into())
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Json(value.into())
    }
}

impl From<Entity> for Field {
    fn from(value: Entity) -> Self {
        Field::Entity(Box::new(value))
    }
}

impl From<Upload> for Field {
    fn from(value: Upload) -> Self {
        Field::Upload(value)
    }
}

impl<T: Into<Field>> From<Vec<T>> for Field {
    fn from(value: Vec<T>) -> Self {
        Field::list(value)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Field::Json(Value::Null))
    }
}

/// A readable stream attached to a payload.
///
/// Any `Read + Send` source qualifies. Payload fields holding an upload are
/// moved out of the body and sent as multipart file parts.
#[derive(Clone)]
pub struct Upload {
    reader: Arc<Mutex<Box<dyn Read + Send>>>,
    file_name: Option<String>,
    mime_type: Option<String>,
}

impl Upload {
    /// Wrap any readable stream
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Upload {
            reader: Arc::new(Mutex::new(Box::new(reader))),
            file_name: None,
            mime_type: None,
        }
    }

    /// Open a file, using its name as the part file name
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut upload = Upload::new(file);
        upload.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(upload)
    }

    /// Set the file name sent with the part
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the part's content type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// File name sent with the part
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Content type of the part
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Drain the remaining content of the stream
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "upload stream lock poisoned"))?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Whether both handles share the same underlying stream
    pub fn same_stream(&self, other: &Upload) -> bool {
        Arc::ptr_eq(&self.reader, &other.reader)
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}
