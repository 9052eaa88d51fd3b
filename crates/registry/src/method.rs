//! Invokable methods: one implementation entry point of an operation.
//!
//! # Role
//!
//! A method declares the kind it consumes and the kind it produces. The
//! compiler ranks methods with [`InvokableMethod::match_priority`]; the engine
//! calls [`InvokableMethod::invoke`], which adapts the input when needed and,
//! for iterable methods, runs the scalar logic once per element of a
//! collection input.
//!
//! # Ranking
//!
//! | Match | Score |
//! |-------|-------|
//! | any match, declared priority `p > 0` | [`USER_PRIORITY`] + `p` |
//! | exact kind | [`EXACT_PRIORITY`] |
//! | input assignable to consumed kind | [`ASSIGNABLE_PRIORITY`] |
//! | adapter registered | [`ADAPTABLE_PRIORITY`] |
//! | method consumes `Void` | [`VOID_PRIORITY`] |
//! | otherwise | 0 (no match) |

use std::fmt;
use std::sync::Arc;

use opchain_types::{Fault, OperationContext, Params, Value, ValueKind};

use crate::adapter::{AdaptError, AdapterTable};

pub const VOID_PRIORITY: u32 = 1;
pub const ADAPTABLE_PRIORITY: u32 = 2;
pub const ASSIGNABLE_PRIORITY: u32 = 3;
pub const EXACT_PRIORITY: u32 = 4;
/// Offset placing any declared priority above every built-in score.
pub const USER_PRIORITY: u32 = 1000;

/// Arguments of one method call.
pub struct Call<'a> {
	pub ctx: &'a mut OperationContext,
	/// Input already adapted to the consumed kind (one element for iterable calls).
	pub input: Value,
	pub params: &'a Params,
}

/// Implementation entry point.
pub type MethodFn = Arc<dyn Fn(Call<'_>) -> Result<Value, Fault> + Send + Sync>;

/// Accumulates per-element outputs of an iterable method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collector {
	Documents,
	Blobs,
	DocRefs,
	Strings,
	/// Heterogeneous list; accepts anything.
	Values,
}

impl Collector {
	/// Default collector for element outputs of `kind`.
	pub fn for_kind(kind: ValueKind) -> Self {
		match kind {
			ValueKind::Document => Collector::Documents,
			ValueKind::Blob => Collector::Blobs,
			ValueKind::DocRef => Collector::DocRefs,
			ValueKind::Text => Collector::Strings,
			_ => Collector::Values,
		}
	}

	pub fn output_kind(self) -> ValueKind {
		match self {
			Collector::Documents => ValueKind::DocumentList,
			Collector::Blobs => ValueKind::BlobList,
			Collector::DocRefs => ValueKind::DocRefList,
			Collector::Strings => ValueKind::StringList,
			Collector::Values => ValueKind::List,
		}
	}

	/// Builds the collection value, failing on the first element of the wrong kind.
	pub fn collect(self, outputs: Vec<Value>) -> Result<Value, ValueKind> {
		fn typed<T>(outputs: Vec<Value>, pick: impl Fn(Value) -> Result<T, Value>) -> Result<Vec<T>, ValueKind> {
			outputs
				.into_iter()
				.map(|v| pick(v).map_err(|v| v.kind()))
				.collect()
		}

		Ok(match self {
			Collector::Documents => Value::DocumentList(typed(outputs, |v| match v {
				Value::Document(d) => Ok(d),
				other => Err(other),
			})?),
			Collector::Blobs => Value::BlobList(typed(outputs, |v| match v {
				Value::Blob(b) => Ok(b),
				other => Err(other),
			})?),
			Collector::DocRefs => Value::DocRefList(typed(outputs, |v| match v {
				Value::DocRef(r) => Ok(r),
				other => Err(other),
			})?),
			Collector::Strings => Value::StringList(typed(outputs, |v| match v {
				Value::Text(s) => Ok(s),
				other => Err(other),
			})?),
			Collector::Values => Value::List(outputs),
		})
	}
}

/// Failure of [`InvokableMethod::invoke`].
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
	#[error(transparent)]
	Adapt(#[from] AdaptError),
	#[error("method `{method}` iterates over collections, got {found}")]
	NotIterable { method: Arc<str>, found: ValueKind },
	#[error("collector {collector:?} of method `{method}` cannot hold {found}")]
	Collect {
		method: Arc<str>,
		collector: Collector,
		found: ValueKind,
	},
	#[error(transparent)]
	Fault(#[from] Fault),
}

/// One kind-matched implementation of an operation.
#[derive(Clone)]
pub struct InvokableMethod {
	name: Arc<str>,
	consumes: ValueKind,
	produces: ValueKind,
	priority: u32,
	iterable: bool,
	collector: Option<Collector>,
	callable: MethodFn,
}

impl fmt::Debug for InvokableMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InvokableMethod")
			.field("name", &self.name)
			.field("consumes", &self.consumes)
			.field("produces", &self.produces)
			.field("priority", &self.priority)
			.field("iterable", &self.iterable)
			.field("collector", &self.collector)
			.finish()
	}
}

impl InvokableMethod {
	pub fn new<F>(name: impl Into<Arc<str>>, consumes: ValueKind, produces: ValueKind, f: F) -> Self
	where
		F: Fn(Call<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			consumes,
			produces,
			priority: 0,
			iterable: false,
			collector: None,
			callable: Arc::new(f),
		}
	}

	/// Declared priority; any positive value ranks above all built-in scores.
	pub fn with_priority(mut self, priority: u32) -> Self {
		self.priority = priority;
		self
	}

	/// Makes the method accept collections of its consumed kind, element by element.
	pub fn iterable(mut self) -> Self {
		self.iterable = true;
		self
	}

	pub fn with_collector(mut self, collector: Collector) -> Self {
		self.collector = Some(collector);
		self
	}

	/// Scalar view of an iterable method, sharing the callable.
	pub(crate) fn scalar(&self) -> Self {
		Self {
			iterable: false,
			collector: None,
			..self.clone()
		}
	}

	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	/// Declared consumed kind (the element kind for iterable methods).
	pub fn consumes(&self) -> ValueKind {
		self.consumes
	}

	/// Declared produced kind (per element for iterable methods).
	pub fn produces(&self) -> ValueKind {
		self.produces
	}

	pub fn priority(&self) -> u32 {
		self.priority
	}

	pub fn is_iterable(&self) -> bool {
		self.iterable
	}

	pub fn collector(&self) -> Collector {
		self.collector.unwrap_or_else(|| {
			let element = match self.produces {
				ValueKind::Void => self.consumes,
				other => other,
			};
			Collector::for_kind(element)
		})
	}

	/// Kind the method accepts as a whole input.
	pub fn input_kind(&self) -> ValueKind {
		if self.iterable { self.consumes.list_of() } else { self.consumes }
	}

	/// Kind the method hands to the next step.
	pub fn output_kind(&self) -> ValueKind {
		if self.iterable { self.collector().output_kind() } else { self.produces }
	}

	/// Scores how well `input` matches this method; 0 means no match.
	pub fn match_priority(&self, input: ValueKind, adapters: &AdapterTable) -> u32 {
		let expected = self.input_kind();
		let base = if input == expected {
			EXACT_PRIORITY
		} else if input.is_assignable_to(expected) {
			ASSIGNABLE_PRIORITY
		} else if adapters.get(input, expected).is_some() {
			ADAPTABLE_PRIORITY
		} else if expected == ValueKind::Void {
			VOID_PRIORITY
		} else {
			return 0;
		};
		if self.priority > 0 { USER_PRIORITY + self.priority } else { base }
	}

	/// Calls the method with `input`, adapting it and iterating over it as declared.
	pub fn invoke(
		&self,
		ctx: &mut OperationContext,
		input: Value,
		params: &Params,
		adapters: &AdapterTable,
	) -> Result<Value, MethodError> {
		if !self.iterable {
			// Void producers hand back the caller's value, not the adapted one.
			let original = (self.produces == ValueKind::Void).then(|| input.clone());
			let adapted = self.adapt_input(ctx, input, self.consumes, adapters)?;
			let output = self.call(ctx, adapted, params)?;
			return Ok(original.unwrap_or(output));
		}

		let input = adapters.adapt(ctx, input, self.input_kind())?;
		let elements = input.into_elements().map_err(|v| MethodError::NotIterable {
			method: self.name.clone(),
			found: v.kind(),
		})?;

		let saved = ctx.replace_input(Value::Void);
		let mut outputs = Vec::with_capacity(elements.len());
		for element in elements {
			let result = self
				.adapt_input(ctx, element, self.consumes, adapters)
				.and_then(|element| {
					ctx.set_input(element.clone());
					self.call(ctx, element, params)
				});
			match result {
				Ok(output) => outputs.push(output),
				Err(err) => {
					ctx.set_input(saved);
					return Err(err);
				}
			}
		}
		ctx.set_input(saved);

		let collector = self.collector();
		collector.collect(outputs).map_err(|found| MethodError::Collect {
			method: self.name.clone(),
			collector,
			found,
		})
	}

	fn adapt_input(
		&self,
		ctx: &mut OperationContext,
		input: Value,
		target: ValueKind,
		adapters: &AdapterTable,
	) -> Result<Value, MethodError> {
		if target == ValueKind::Void {
			return Ok(input);
		}
		Ok(adapters.adapt(ctx, input, target)?)
	}

	fn call(&self, ctx: &mut OperationContext, input: Value, params: &Params) -> Result<Value, MethodError> {
		if self.produces == ValueKind::Void {
			let passthrough = input.clone();
			(self.callable)(Call { ctx, input, params })?;
			return Ok(passthrough);
		}
		Ok((self.callable)(Call { ctx, input, params })?)
	}
}
