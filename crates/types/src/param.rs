//! Operation parameter declarations, bindings and resolved values.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{Value, ValueKind};

/// Declared parameter of an operation or chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
	pub name: Arc<str>,
	pub kind: ValueKind,
	pub required: bool,
	pub default: Option<Value>,
	pub description: Arc<str>,
}

impl ParamSpec {
	pub fn required(name: impl Into<Arc<str>>, kind: ValueKind) -> Self {
		Self {
			name: name.into(),
			kind,
			required: true,
			default: None,
			description: Arc::from(""),
		}
	}

	pub fn optional(name: impl Into<Arc<str>>, kind: ValueKind) -> Self {
		Self {
			required: false,
			..Self::required(name, kind)
		}
	}

	pub fn with_default(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	pub fn describe(mut self, description: impl Into<Arc<str>>) -> Self {
		self.description = description.into();
		self
	}
}

/// Expression bound to a parameter in a chain step.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamExpr {
	/// Constant value.
	Literal(Value),
	/// Context variable, read at invocation time.
	Var(Arc<str>),
	/// Chain-scoped parameter of the innermost running chain.
	ChainParam(Arc<str>),
}

impl ParamExpr {
	pub fn literal(value: impl Into<Value>) -> Self {
		Self::Literal(value.into())
	}

	pub fn var(name: impl Into<Arc<str>>) -> Self {
		Self::Var(name.into())
	}

	pub fn chain_param(name: impl Into<Arc<str>>) -> Self {
		Self::ChainParam(name.into())
	}
}

impl From<Value> for ParamExpr {
	fn from(value: Value) -> Self {
		Self::Literal(value)
	}
}

/// Parameter expressions of one step, in declaration order.
pub type Bindings = IndexMap<Arc<str>, ParamExpr>;

/// Parameter values resolved for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
	values: IndexMap<Arc<str>, Value>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<Arc<str>>, value: Value) {
		self.values.insert(name.into(), value);
	}

	pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
		self.insert(name, value.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	pub fn get_bool(&self, name: &str) -> Option<bool> {
		self.get(name).and_then(Value::as_bool)
	}

	pub fn get_integer(&self, name: &str) -> Option<i64> {
		self.get(name).and_then(Value::as_integer)
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		self.values.shift_remove(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
		self.values.iter()
	}
}
