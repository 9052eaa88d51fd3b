//! Per-invocation operation context.
//!
//! # Role
//!
//! An [`OperationContext`] is created by the caller for one chain run and owned
//! exclusively by that run. It carries the current input, variables, the stack
//! of chain-scoped parameter frames, the execution trace, the rollback mark, and
//! the lazily opened [`Session`] the engine commits at the end.
//!
//! # Invariants
//!
//! - A context is never shared between concurrent runs (`run` takes `&mut`).
//! - The session is opened at most once per context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{DocRef, Document, Params, Value, ValueKind};

/// Repository session collaborator committed once per top-level run.
pub trait Session: Send {
	/// Persists pending changes.
	fn save(&mut self) -> anyhow::Result<()>;

	/// Marks pending changes to be discarded.
	fn set_rollback_only(&mut self);

	/// Loads a document by reference.
	fn resolve(&mut self, doc: &DocRef) -> anyhow::Result<Document>;
}

/// Opens sessions on demand.
pub trait SessionProvider: Send + Sync {
	fn open(&self) -> anyhow::Result<Box<dyn Session>>;
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
	pub operation_id: Arc<str>,
	pub method: Arc<str>,
	pub input: ValueKind,
	/// Nesting depth of the chain that ran the step (0 = top level).
	pub depth: usize,
}

/// Mutable state of one chain invocation.
#[derive(Default)]
pub struct OperationContext {
	input: Value,
	vars: HashMap<Arc<str>, Value>,
	chain_params: Vec<Params>,
	trace: Vec<TraceEntry>,
	rollback: bool,
	depth: usize,
	provider: Option<Arc<dyn SessionProvider>>,
	session: Option<Box<dyn Session>>,
}

impl fmt::Debug for OperationContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OperationContext")
			.field("input", &self.input.kind())
			.field("vars", &self.vars.len())
			.field("chain_params", &self.chain_params.len())
			.field("trace", &self.trace.len())
			.field("rollback", &self.rollback)
			.field("depth", &self.depth)
			.field("session_open", &self.session.is_some())
			.finish()
	}
}

impl OperationContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_input(mut self, input: impl Into<Value>) -> Self {
		self.input = input.into();
		self
	}

	pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
		self.provider = Some(provider);
		self
	}

	pub fn with_var(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
		self.set_var(name, value);
		self
	}

	pub fn input(&self) -> &Value {
		&self.input
	}

	pub fn set_input(&mut self, input: Value) {
		self.input = input;
	}

	/// Replaces the input, returning the previous one.
	pub fn replace_input(&mut self, input: Value) -> Value {
		std::mem::replace(&mut self.input, input)
	}

	pub fn var(&self, name: &str) -> Option<&Value> {
		self.vars.get(name)
	}

	pub fn set_var(&mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) {
		self.vars.insert(name.into(), value.into());
	}

	pub fn remove_var(&mut self, name: &str) -> Option<Value> {
		self.vars.remove(name)
	}

	/// Looks up a chain-scoped parameter in the innermost frame.
	pub fn chain_param(&self, name: &str) -> Option<&Value> {
		self.chain_params.last().and_then(|frame| frame.get(name))
	}

	pub fn push_chain_params(&mut self, frame: Params) {
		self.chain_params.push(frame);
	}

	pub fn pop_chain_params(&mut self) -> Option<Params> {
		self.chain_params.pop()
	}

	pub fn trace(&self) -> &[TraceEntry] {
		&self.trace
	}

	pub fn record(&mut self, entry: TraceEntry) {
		self.trace.push(entry);
	}

	pub fn mark_rollback(&mut self) {
		self.rollback = true;
	}

	pub fn is_rollback(&self) -> bool {
		self.rollback
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Enters a nested run and returns the new depth.
	pub fn enter(&mut self) -> usize {
		self.depth += 1;
		self.depth
	}

	pub fn leave(&mut self) {
		self.depth = self.depth.saturating_sub(1);
	}

	/// Returns the session, opening it through the provider on first use.
	pub fn session(&mut self) -> anyhow::Result<&mut (dyn Session + 'static)> {
		if self.session.is_none() {
			let Some(provider) = &self.provider else {
				anyhow::bail!("no session provider configured for this context");
			};
			self.session = Some(provider.open()?);
		}
		self.session
			.as_deref_mut()
			.ok_or_else(|| anyhow::anyhow!("session unavailable"))
	}

	/// Returns the session only if the run already opened one.
	pub fn open_session(&mut self) -> Option<&mut (dyn Session + 'static)> {
		self.session.as_deref_mut()
	}

	pub fn has_session(&self) -> bool {
		self.session.is_some()
	}
}
