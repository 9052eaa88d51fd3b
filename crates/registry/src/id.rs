use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Registry key of an operation or chain.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(Arc<str>);

impl OperationId {
	pub fn new(id: impl Into<Arc<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn as_arc(&self) -> &Arc<str> {
		&self.0
	}
}

impl Borrow<str> for OperationId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for OperationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for OperationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for OperationId {
	fn from(id: &str) -> Self {
		Self(Arc::from(id))
	}
}

impl From<String> for OperationId {
	fn from(id: String) -> Self {
		Self(Arc::from(id))
	}
}

impl From<Arc<str>> for OperationId {
	fn from(id: Arc<str>) -> Self {
		Self(id)
	}
}

impl PartialEq<str> for OperationId {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for OperationId {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}
