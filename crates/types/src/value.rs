//! Domain values carried between chain steps.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::ValueKind;

/// Reference to a repository document, resolved by an adapter or a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocRef {
	Id(String),
	Path(String),
}

impl fmt::Display for DocRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DocRef::Id(id) => write!(f, "id:{id}"),
			DocRef::Path(path) => f.write_str(path),
		}
	}
}

/// Repository document as seen by operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
	pub id: String,
	pub path: String,
	pub doc_type: String,
	pub title: String,
	pub properties: BTreeMap<String, String>,
}

impl Document {
	pub fn new(id: impl Into<String>, path: impl Into<String>, doc_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			path: path.into(),
			doc_type: doc_type.into(),
			title: String::new(),
			properties: BTreeMap::new(),
		}
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.properties.insert(key.into(), value.into());
		self
	}

	pub fn doc_ref(&self) -> DocRef {
		DocRef::Id(self.id.clone())
	}
}

/// Binary content with a file name and MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
	pub filename: String,
	pub mime_type: String,
	pub data: Bytes,
}

impl Blob {
	pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
		Self {
			filename: filename.into(),
			mime_type: mime_type.into(),
			data: data.into(),
		}
	}

	pub fn text(filename: impl Into<String>, text: impl Into<String>) -> Self {
		Self::new(filename, "text/plain", Bytes::from(text.into()))
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}
}

/// A value of one [`ValueKind`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
	#[default]
	Void,
	Document(Document),
	DocumentList(Vec<Document>),
	Blob(Blob),
	BlobList(Vec<Blob>),
	DocRef(DocRef),
	DocRefList(Vec<DocRef>),
	Text(String),
	StringList(Vec<String>),
	Integer(i64),
	Float(f64),
	Boolean(bool),
	Date(DateTime<Utc>),
	Properties(BTreeMap<String, String>),
	List(Vec<Value>),
}

impl Value {
	/// Concrete kind of this value.
	pub fn kind(&self) -> ValueKind {
		match self {
			Value::Void => ValueKind::Void,
			Value::Document(_) => ValueKind::Document,
			Value::DocumentList(_) => ValueKind::DocumentList,
			Value::Blob(_) => ValueKind::Blob,
			Value::BlobList(_) => ValueKind::BlobList,
			Value::DocRef(_) => ValueKind::DocRef,
			Value::DocRefList(_) => ValueKind::DocRefList,
			Value::Text(_) => ValueKind::Text,
			Value::StringList(_) => ValueKind::StringList,
			Value::Integer(_) => ValueKind::Integer,
			Value::Float(_) => ValueKind::Float,
			Value::Boolean(_) => ValueKind::Boolean,
			Value::Date(_) => ValueKind::Date,
			Value::Properties(_) => ValueKind::Properties,
			Value::List(_) => ValueKind::List,
		}
	}

	pub fn is_void(&self) -> bool {
		matches!(self, Value::Void)
	}

	/// Splits a collection value into its elements. Scalars return `Err(self)`.
	pub fn into_elements(self) -> Result<Vec<Value>, Value> {
		match self {
			Value::DocumentList(v) => Ok(v.into_iter().map(Value::Document).collect()),
			Value::BlobList(v) => Ok(v.into_iter().map(Value::Blob).collect()),
			Value::DocRefList(v) => Ok(v.into_iter().map(Value::DocRef).collect()),
			Value::StringList(v) => Ok(v.into_iter().map(Value::Text).collect()),
			Value::List(v) => Ok(v),
			other => Err(other),
		}
	}

	pub fn as_document(&self) -> Option<&Document> {
		match self {
			Value::Document(d) => Some(d),
			_ => None,
		}
	}

	pub fn into_document(self) -> Option<Document> {
		match self {
			Value::Document(d) => Some(d),
			_ => None,
		}
	}

	pub fn as_blob(&self) -> Option<&Blob> {
		match self {
			Value::Blob(b) => Some(b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			Value::Integer(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Boolean(v) => Some(*v),
			_ => None,
		}
	}
}

impl From<Document> for Value {
	fn from(v: Document) -> Self {
		Value::Document(v)
	}
}

impl From<Vec<Document>> for Value {
	fn from(v: Vec<Document>) -> Self {
		Value::DocumentList(v)
	}
}

impl From<Blob> for Value {
	fn from(v: Blob) -> Self {
		Value::Blob(v)
	}
}

impl From<Vec<Blob>> for Value {
	fn from(v: Vec<Blob>) -> Self {
		Value::BlobList(v)
	}
}

impl From<DocRef> for Value {
	fn from(v: DocRef) -> Self {
		Value::DocRef(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Text(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_string())
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Integer(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Boolean(v)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(v: DateTime<Utc>) -> Self {
		Value::Date(v)
	}
}
