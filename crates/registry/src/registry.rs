//! Versioned operation registry with atomic snapshot publication.
//!
//! # Role
//!
//! Holds the directory of operation ids (and aliases) to descriptors, chains
//! registered as composite operations, and the type adapter table. Every
//! mutation builds a new [`RegistrySnapshot`] with `version + 1` and publishes
//! it with a single atomic store.
//!
//! # Concurrency
//!
//! - **Reads:** wait-free atomic load of the current snapshot. A reader pins
//!   one snapshot for a whole compile or execution.
//! - **Writes:** serialized under one writer lock; a writer reads the latest
//!   snapshot, derives the next one, and stores it before releasing the lock.
//!
//! # Invariants
//!
//! - Ids and aliases are unique across the published snapshot.
//! - `version` strictly increases with every successful mutation.
//! - Failed mutations publish nothing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use opchain_types::ValueKind;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::adapter::{AdapterFn, AdapterTable};
use crate::descriptor::{ChainDefinition, OperationDescriptor};
use crate::{OperationId, RegistryError};

/// Immutable view of the registry at one version.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
	version: u64,
	operations: Arc<FxHashMap<OperationId, Arc<OperationDescriptor>>>,
	/// Id or alias to canonical id.
	keys: Arc<FxHashMap<OperationId, OperationId>>,
	adapters: Arc<AdapterTable>,
}

impl RegistrySnapshot {
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Looks up a descriptor by id or alias.
	pub fn get(&self, key: &str) -> Option<&Arc<OperationDescriptor>> {
		let canonical = self.keys.get(key)?;
		self.operations.get(canonical)
	}

	pub fn resolve(&self, key: &str) -> Result<Arc<OperationDescriptor>, RegistryError> {
		self.get(key)
			.cloned()
			.ok_or_else(|| RegistryError::NotFound(OperationId::from(key)))
	}

	pub fn contains(&self, key: &str) -> bool {
		self.keys.contains_key(key)
	}

	pub fn adapters(&self) -> &AdapterTable {
		&self.adapters
	}

	/// Canonical ids in sorted order.
	pub fn ids(&self) -> Vec<OperationId> {
		let mut ids: Vec<_> = self.operations.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}
}

/// Thread-safe registry of operations, chains and adapters.
pub struct OperationRegistry {
	snap: ArcSwap<RegistrySnapshot>,
	write: Mutex<()>,
}

impl Default for OperationRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl OperationRegistry {
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(RegistrySnapshot::default()),
			write: Mutex::new(()),
		}
	}

	/// Returns the current snapshot.
	#[inline]
	pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
		self.snap.load_full()
	}

	pub fn version(&self) -> u64 {
		self.snap.load().version
	}

	pub fn resolve(&self, key: &str) -> Result<Arc<OperationDescriptor>, RegistryError> {
		self.snap.load().resolve(key)
	}

	/// Registers an operation and returns the published version.
	///
	/// Fails with [`RegistryError::Duplicate`] if the id is taken and `replace`
	/// is false, or if any alias belongs to another operation.
	pub fn register(&self, descriptor: OperationDescriptor, replace: bool) -> Result<u64, RegistryError> {
		let _guard = self.write.lock();
		let old = self.snap.load_full();

		for key in descriptor.keys() {
			if let Some(owner) = old.keys.get(key) {
				if *owner != descriptor.id || !replace {
					return Err(RegistryError::Duplicate {
						key: key.clone(),
						owner: owner.clone(),
					});
				}
			}
		}

		let mut operations = (*old.operations).clone();
		let mut keys = (*old.keys).clone();

		let replaced = operations.remove(&descriptor.id);
		if let Some(previous) = &replaced {
			for key in previous.keys() {
				keys.remove(key);
			}
		}
		for key in descriptor.keys() {
			keys.insert(key.clone(), descriptor.id.clone());
		}
		let id = descriptor.id.clone();
		let is_chain = descriptor.is_chain();
		operations.insert(id.clone(), Arc::new(descriptor));

		let version = self.publish(&old, Arc::new(operations), Arc::new(keys), Arc::clone(&old.adapters));
		info!(%id, version, replaced = replaced.is_some(), chain = is_chain, "registered operation");
		Ok(version)
	}

	/// Registers a chain as a composite operation.
	pub fn register_chain(&self, chain: ChainDefinition, replace: bool) -> Result<u64, RegistryError> {
		self.register(OperationDescriptor::from_chain(chain)?, replace)
	}

	/// Removes an operation by id or alias.
	pub fn unregister(&self, key: &str) -> Result<Arc<OperationDescriptor>, RegistryError> {
		let _guard = self.write.lock();
		let old = self.snap.load_full();
		let removed = old.resolve(key)?;

		let mut operations = (*old.operations).clone();
		let mut keys = (*old.keys).clone();
		operations.remove(&removed.id);
		for k in removed.keys() {
			keys.remove(k);
		}

		let version = self.publish(&old, Arc::new(operations), Arc::new(keys), Arc::clone(&old.adapters));
		info!(id = %removed.id, version, "unregistered operation");
		Ok(removed)
	}

	/// Registers (or replaces) the adapter for `(source, target)`.
	pub fn put_adapter(&self, source: ValueKind, target: ValueKind, adapter: AdapterFn) -> u64 {
		let _guard = self.write.lock();
		let old = self.snap.load_full();
		let adapters = Arc::new(old.adapters.with_adapter(source, target, adapter));
		let version = self.publish(&old, Arc::clone(&old.operations), Arc::clone(&old.keys), adapters);
		debug!(%source, %target, version, "registered adapter");
		version
	}

	/// Removes the adapter for `(source, target)`; returns false if none was registered.
	pub fn remove_adapter(&self, source: ValueKind, target: ValueKind) -> bool {
		let _guard = self.write.lock();
		let old = self.snap.load_full();
		let Some(adapters) = old.adapters.without_adapter(source, target) else {
			return false;
		};
		let version = self.publish(&old, Arc::clone(&old.operations), Arc::clone(&old.keys), Arc::new(adapters));
		debug!(%source, %target, version, "removed adapter");
		true
	}

	fn publish(
		&self,
		old: &RegistrySnapshot,
		operations: Arc<FxHashMap<OperationId, Arc<OperationDescriptor>>>,
		keys: Arc<FxHashMap<OperationId, OperationId>>,
		adapters: Arc<AdapterTable>,
	) -> u64 {
		let version = old.version + 1;
		self.snap.store(Arc::new(RegistrySnapshot {
			version,
			operations,
			keys,
			adapters,
		}));
		version
	}
}

#[cfg(test)]
mod tests;
