//! Operation descriptors and chain definitions.

use std::sync::Arc;

use opchain_types::{Bindings, ParamExpr, ParamSpec, Value, ValueKind};

use crate::method::InvokableMethod;
use crate::{OperationId, RegistryError};

/// One step of a chain: an operation id with its parameter expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationInvocation {
	pub operation_id: OperationId,
	pub bindings: Bindings,
}

impl OperationInvocation {
	pub fn new(operation_id: impl Into<OperationId>) -> Self {
		Self {
			operation_id: operation_id.into(),
			bindings: Bindings::new(),
		}
	}

	pub fn bind(mut self, name: impl Into<Arc<str>>, expr: ParamExpr) -> Self {
		self.bindings.insert(name.into(), expr);
		self
	}

	/// Binds a literal value.
	pub fn set(self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
		self.bind(name, ParamExpr::Literal(value.into()))
	}
}

/// Ordered list of operation invocations with chain-scoped parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDefinition {
	pub id: OperationId,
	pub description: Arc<str>,
	pub params: Vec<ParamSpec>,
	pub steps: Vec<OperationInvocation>,
}

impl ChainDefinition {
	pub fn new(id: impl Into<OperationId>) -> Self {
		Self {
			id: id.into(),
			description: Arc::from(""),
			params: Vec::new(),
			steps: Vec::new(),
		}
	}

	pub fn describe(mut self, description: impl Into<Arc<str>>) -> Self {
		self.description = description.into();
		self
	}

	pub fn param(mut self, spec: ParamSpec) -> Self {
		self.params.push(spec);
		self
	}

	pub fn step(mut self, invocation: OperationInvocation) -> Self {
		self.steps.push(invocation);
		self
	}

	/// Appends a step without bindings.
	pub fn op(self, operation_id: impl Into<OperationId>) -> Self {
		self.step(OperationInvocation::new(operation_id))
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}
}

/// Implementation of an operation.
#[derive(Debug, Clone)]
pub enum OperationBody {
	/// Kind-matched methods in registration order.
	Methods(Vec<Arc<InvokableMethod>>),
	/// Composite operation delegating to a nested chain.
	Chain(Arc<ChainDefinition>),
}

/// Published, immutable description of one operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
	pub id: OperationId,
	pub aliases: Vec<OperationId>,
	pub label: Arc<str>,
	pub category: Arc<str>,
	pub description: Arc<str>,
	pub params: Vec<ParamSpec>,
	pub body: OperationBody,
}

impl OperationDescriptor {
	pub fn builder(id: impl Into<OperationId>) -> OperationBuilder {
		let id = id.into();
		OperationBuilder {
			label: Arc::clone(id.as_arc()),
			id,
			aliases: Vec::new(),
			category: Arc::from("Misc"),
			description: Arc::from(""),
			params: Vec::new(),
			methods: Vec::new(),
		}
	}

	/// Wraps a chain definition as a composite operation.
	pub fn from_chain(chain: ChainDefinition) -> Result<Self, RegistryError> {
		if chain.is_empty() {
			return Err(RegistryError::InvalidDescriptor {
				id: chain.id.clone(),
				reason: "chain has no steps".into(),
			});
		}
		check_param_names(&chain.id, &chain.params)?;
		Ok(Self {
			id: chain.id.clone(),
			aliases: Vec::new(),
			label: Arc::clone(chain.id.as_arc()),
			category: Arc::from("Chain"),
			description: Arc::clone(&chain.description),
			params: chain.params.clone(),
			body: OperationBody::Chain(Arc::new(chain)),
		})
	}

	/// Methods of a simple operation; empty for chains.
	pub fn methods(&self) -> &[Arc<InvokableMethod>] {
		match &self.body {
			OperationBody::Methods(methods) => methods,
			OperationBody::Chain(_) => &[],
		}
	}

	pub fn chain(&self) -> Option<&Arc<ChainDefinition>> {
		match &self.body {
			OperationBody::Methods(_) => None,
			OperationBody::Chain(chain) => Some(chain),
		}
	}

	pub fn is_chain(&self) -> bool {
		matches!(self.body, OperationBody::Chain(_))
	}

	/// Canonical id followed by aliases.
	pub fn keys(&self) -> impl Iterator<Item = &OperationId> {
		std::iter::once(&self.id).chain(self.aliases.iter())
	}
}

/// Builder for simple (method-backed) operations.
#[derive(Debug)]
pub struct OperationBuilder {
	id: OperationId,
	aliases: Vec<OperationId>,
	label: Arc<str>,
	category: Arc<str>,
	description: Arc<str>,
	params: Vec<ParamSpec>,
	methods: Vec<InvokableMethod>,
}

impl OperationBuilder {
	pub fn alias(mut self, alias: impl Into<OperationId>) -> Self {
		self.aliases.push(alias.into());
		self
	}

	pub fn label(mut self, label: impl Into<Arc<str>>) -> Self {
		self.label = label.into();
		self
	}

	pub fn category(mut self, category: impl Into<Arc<str>>) -> Self {
		self.category = category.into();
		self
	}

	pub fn description(mut self, description: impl Into<Arc<str>>) -> Self {
		self.description = description.into();
		self
	}

	pub fn param(mut self, spec: ParamSpec) -> Self {
		self.params.push(spec);
		self
	}

	pub fn method(mut self, method: InvokableMethod) -> Self {
		self.methods.push(method);
		self
	}

	/// Validates and freezes the descriptor.
	///
	/// Iterable methods are expanded into their scalar view followed by the
	/// collection view, so both inputs rank in registration order.
	pub fn build(self) -> Result<OperationDescriptor, RegistryError> {
		let invalid = |reason: String| RegistryError::InvalidDescriptor {
			id: self.id.clone(),
			reason,
		};

		if self.methods.is_empty() {
			return Err(invalid("operation declares no methods".into()));
		}
		for (i, alias) in self.aliases.iter().enumerate() {
			if *alias == self.id || self.aliases[..i].contains(alias) {
				return Err(invalid(format!("alias `{alias}` repeats an existing key")));
			}
		}
		check_param_names(&self.id, &self.params)?;

		let mut methods = Vec::with_capacity(self.methods.len());
		for method in &self.methods {
			if method.is_iterable() {
				if method.consumes() == ValueKind::Void {
					return Err(invalid(format!("method `{}` iterates over void", method.name())));
				}
				methods.push(Arc::new(method.scalar()));
			}
			methods.push(Arc::new(method.clone()));
		}

		Ok(OperationDescriptor {
			id: self.id,
			aliases: self.aliases,
			label: self.label,
			category: self.category,
			description: self.description,
			params: self.params,
			body: OperationBody::Methods(methods),
		})
	}
}

fn check_param_names(id: &OperationId, params: &[ParamSpec]) -> Result<(), RegistryError> {
	for (i, spec) in params.iter().enumerate() {
		if params[..i].iter().any(|p| p.name == spec.name) {
			return Err(RegistryError::InvalidDescriptor {
				id: id.clone(),
				reason: format!("parameter `{}` declared twice", spec.name),
			});
		}
	}
	Ok(())
}
