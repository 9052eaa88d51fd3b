//! Closed enumeration of domain value kinds.
//!
//! # Role
//!
//! Every value flowing through a chain has exactly one [`ValueKind`]. Matching a
//! method against an input is a question about kinds only, answered by the
//! precomputed [`KindTable`] instead of walking a hierarchy at lookup time.
//!
//! # Invariants
//!
//! - `ancestors(k)` is breadth-first, nearest parent first, and never contains `k`.
//! - `Object` is an ancestor of every kind except `Void` and itself.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Kind of a value carried between chain steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
	/// Marker for "no input" / "no output". Control operations consume it.
	Void,
	/// Universal supertype.
	Object,
	/// Abstract repository resource (documents and blobs).
	Resource,
	Document,
	DocumentList,
	Blob,
	BlobList,
	/// Reference to a document (id or path) not yet resolved.
	DocRef,
	DocRefList,
	Text,
	StringList,
	Integer,
	Float,
	Boolean,
	Date,
	/// Flat string key/value map.
	Properties,
	/// Heterogeneous list; supertype of every typed list.
	List,
}

impl ValueKind {
	/// Every kind, in declaration order.
	pub const ALL: [ValueKind; 17] = [
		ValueKind::Void,
		ValueKind::Object,
		ValueKind::Resource,
		ValueKind::Document,
		ValueKind::DocumentList,
		ValueKind::Blob,
		ValueKind::BlobList,
		ValueKind::DocRef,
		ValueKind::DocRefList,
		ValueKind::Text,
		ValueKind::StringList,
		ValueKind::Integer,
		ValueKind::Float,
		ValueKind::Boolean,
		ValueKind::Date,
		ValueKind::Properties,
		ValueKind::List,
	];

	/// Direct parents of this kind.
	pub const fn parents(self) -> &'static [ValueKind] {
		use ValueKind::*;
		match self {
			Void | Object => &[],
			Document | Blob => &[Resource],
			DocumentList | BlobList | DocRefList | StringList => &[List],
			Resource | DocRef | Text | Integer | Float | Boolean | Date | Properties | List => &[Object],
		}
	}

	/// Element kind of a collection kind.
	pub const fn element(self) -> Option<ValueKind> {
		use ValueKind::*;
		match self {
			DocumentList => Some(Document),
			BlobList => Some(Blob),
			DocRefList => Some(DocRef),
			StringList => Some(Text),
			List => Some(Object),
			_ => None,
		}
	}

	/// Collection kind holding elements of this kind.
	///
	/// Kinds without a dedicated list fall back to the heterogeneous [`ValueKind::List`].
	pub const fn list_of(self) -> ValueKind {
		use ValueKind::*;
		match self {
			Document => DocumentList,
			Blob => BlobList,
			DocRef => DocRefList,
			Text => StringList,
			_ => List,
		}
	}

	pub const fn is_list(self) -> bool {
		self.element().is_some()
	}

	/// Ancestor closure, nearest first.
	pub fn ancestors(self) -> &'static [ValueKind] {
		KindTable::get().ancestors(self)
	}

	/// Returns true if a value of this kind can be used where `target` is expected.
	pub fn is_assignable_to(self, target: ValueKind) -> bool {
		self == target || self.ancestors().contains(&target)
	}

	pub const fn name(self) -> &'static str {
		use ValueKind::*;
		match self {
			Void => "void",
			Object => "object",
			Resource => "resource",
			Document => "document",
			DocumentList => "documents",
			Blob => "blob",
			BlobList => "blobs",
			DocRef => "docref",
			DocRefList => "docrefs",
			Text => "string",
			StringList => "stringlist",
			Integer => "integer",
			Float => "float",
			Boolean => "boolean",
			Date => "date",
			Properties => "properties",
			List => "list",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Flat ancestor closure for every kind, built once.
pub struct KindTable {
	closure: Vec<Vec<ValueKind>>,
}

static KIND_TABLE: LazyLock<KindTable> = LazyLock::new(KindTable::build);

impl KindTable {
	pub fn get() -> &'static KindTable {
		&KIND_TABLE
	}

	fn build() -> Self {
		let closure = ValueKind::ALL
			.iter()
			.map(|&kind| {
				let mut out: Vec<ValueKind> = Vec::new();
				let mut frontier: Vec<ValueKind> = kind.parents().to_vec();
				while !frontier.is_empty() {
					let mut next = Vec::new();
					for k in frontier {
						if !out.contains(&k) {
							out.push(k);
							next.extend_from_slice(k.parents());
						}
					}
					frontier = next;
				}
				out
			})
			.collect();
		Self { closure }
	}

	pub fn ancestors(&self, kind: ValueKind) -> &[ValueKind] {
		&self.closure[kind.index()]
	}
}
