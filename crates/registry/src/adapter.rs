//! Type adapter table.
//!
//! # Role
//!
//! Converts a value of one kind into another when no method accepts it
//! directly. Adapters are registered for exact `(source, target)` pairs; a
//! lookup for a kind with no exact registration falls back to the nearest
//! ancestor of the source kind that has one.
//!
//! # Invariants
//!
//! - The resolved table is rebuilt on every put/remove, so [`AdapterTable::get`]
//!   is a single probe and never walks the kind hierarchy.
//! - `Object` is the universal marker and is never used as a fallback source.
//! - Tables are immutable once built; mutation returns a new table.

use std::fmt;
use std::sync::Arc;

use opchain_types::{OperationContext, Value, ValueKind};
use rustc_hash::FxHashMap;

/// Conversion callable stored for one `(source, target)` pair.
pub type AdapterFn = Arc<dyn Fn(&mut OperationContext, Value) -> anyhow::Result<Value> + Send + Sync>;

/// Wraps a closure as an [`AdapterFn`].
pub fn adapter<F>(f: F) -> AdapterFn
where
	F: Fn(&mut OperationContext, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
	Arc::new(f)
}

/// Adapter lookup and conversion failures.
#[derive(Debug, thiserror::Error)]
pub enum AdaptError {
	#[error("no adapter from {from} to {to}")]
	NotFound { from: ValueKind, to: ValueKind },
	#[error("adapting {from} to {to} failed")]
	Failed {
		from: ValueKind,
		to: ValueKind,
		#[source]
		cause: anyhow::Error,
	},
}

/// Immutable `(source, target) -> adapter` table with a precomputed ancestor fallback.
#[derive(Clone, Default)]
pub struct AdapterTable {
	registered: FxHashMap<(ValueKind, ValueKind), AdapterFn>,
	resolved: FxHashMap<(ValueKind, ValueKind), AdapterFn>,
}

impl fmt::Debug for AdapterTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut pairs: Vec<_> = self.registered.keys().copied().collect();
		pairs.sort();
		f.debug_struct("AdapterTable")
			.field("registered", &pairs)
			.field("resolved", &self.resolved.len())
			.finish()
	}
}

impl AdapterTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a table with `adapter` registered for `(source, target)`, replacing any previous one.
	pub fn with_adapter(&self, source: ValueKind, target: ValueKind, adapter: AdapterFn) -> Self {
		let mut registered = self.registered.clone();
		registered.insert((source, target), adapter);
		Self::from_registered(registered)
	}

	/// Returns a table without the `(source, target)` registration, or `None` if there was none.
	pub fn without_adapter(&self, source: ValueKind, target: ValueKind) -> Option<Self> {
		if !self.registered.contains_key(&(source, target)) {
			return None;
		}
		let mut registered = self.registered.clone();
		registered.remove(&(source, target));
		Some(Self::from_registered(registered))
	}

	fn from_registered(registered: FxHashMap<(ValueKind, ValueKind), AdapterFn>) -> Self {
		let mut targets: Vec<ValueKind> = registered.keys().map(|&(_, to)| to).collect();
		targets.sort();
		targets.dedup();

		let mut resolved = FxHashMap::default();
		for source in ValueKind::ALL {
			for &target in &targets {
				let walk = std::iter::once(source).chain(
					source
						.ancestors()
						.iter()
						.copied()
						.filter(|&k| k != ValueKind::Object),
				);
				for candidate in walk {
					if let Some(adapter) = registered.get(&(candidate, target)) {
						resolved.insert((source, target), Arc::clone(adapter));
						break;
					}
				}
			}
		}

		Self { registered, resolved }
	}

	/// Returns the adapter applicable to `(source, target)`, directly or through an ancestor of `source`.
	pub fn get(&self, source: ValueKind, target: ValueKind) -> Option<&AdapterFn> {
		self.resolved.get(&(source, target))
	}

	/// Returns true if an adapter was registered for exactly this pair.
	pub fn is_registered(&self, source: ValueKind, target: ValueKind) -> bool {
		self.registered.contains_key(&(source, target))
	}

	pub fn len(&self) -> usize {
		self.registered.len()
	}

	pub fn is_empty(&self) -> bool {
		self.registered.is_empty()
	}

	/// Converts `value` so it is assignable to `target`.
	///
	/// Values already assignable are returned unchanged. `Void` as a target accepts anything.
	pub fn adapt(&self, ctx: &mut OperationContext, value: Value, target: ValueKind) -> Result<Value, AdaptError> {
		let from = value.kind();
		if target == ValueKind::Void || from.is_assignable_to(target) {
			return Ok(value);
		}
		let adapter = self.get(from, target).ok_or(AdaptError::NotFound { from, to: target })?;
		let adapted = adapter(ctx, value).map_err(|cause| AdaptError::Failed { from, to: target, cause })?;
		if !adapted.kind().is_assignable_to(target) {
			return Err(AdaptError::Failed {
				from,
				to: target,
				cause: anyhow::anyhow!("adapter produced {} instead of {target}", adapted.kind()),
			});
		}
		Ok(adapted)
	}
}
