//! Compiled path cache.
//!
//! Entries are keyed by `(chain id, input kind)` and tagged with the registry
//! version they were compiled against. A lookup from a newer snapshot clears
//! the whole cache; a lookup from an older snapshot than the cache's compiles
//! without reading or writing entries. Misses go through [`SingleFlight`], so
//! concurrent callers of one key share a single search.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use opchain_registry::OperationId;
use opchain_types::ValueKind;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::CompileError;
use crate::compile::CompiledPath;
use crate::flight::SingleFlight;

type PathKey = (OperationId, ValueKind);
type Compiled = Result<Arc<CompiledPath>, CompileError>;

#[derive(Default)]
struct Entries {
	version: u64,
	paths: FxHashMap<PathKey, Arc<CompiledPath>>,
}

/// Version-tagged cache of compiled paths with single-flight misses.
#[derive(Default)]
pub struct PathCache {
	entries: Mutex<Entries>,
	flight: SingleFlight<(u64, OperationId, ValueKind), Compiled>,
	searches: AtomicU64,
	hits: AtomicU64,
}

enum Lookup {
	Hit(Arc<CompiledPath>),
	Miss,
	Stale,
}

impl PathCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached path for `(chain, kind)` at `version`, or runs `compile` once for all concurrent callers.
	pub fn get_or_compile(
		&self,
		version: u64,
		chain: &OperationId,
		kind: ValueKind,
		compile: impl FnOnce() -> Result<CompiledPath, CompileError>,
	) -> Compiled {
		match self.lookup(version, chain, kind) {
			Lookup::Hit(path) => return Ok(path),
			Lookup::Stale => {
				debug!(%chain, %kind, version, "compiling against stale snapshot, bypassing cache");
				return self.search(compile);
			}
			Lookup::Miss => {}
		}

		self.flight.run((version, chain.clone(), kind), || {
			// A previous leader may have stored the path after our miss.
			if let Lookup::Hit(path) = self.lookup(version, chain, kind) {
				return Ok(path);
			}
			let compiled = self.search(compile)?;
			let mut entries = self.entries.lock();
			if entries.version == version {
				entries.paths.insert((chain.clone(), kind), Arc::clone(&compiled));
			}
			Ok(compiled)
		})
	}

	fn lookup(&self, version: u64, chain: &OperationId, kind: ValueKind) -> Lookup {
		let mut entries = self.entries.lock();
		if version > entries.version {
			if !entries.paths.is_empty() {
				debug!(from = entries.version, to = version, dropped = entries.paths.len(), "path cache invalidated");
			}
			entries.paths.clear();
			entries.version = version;
		} else if version < entries.version {
			return Lookup::Stale;
		}
		match entries.paths.get(&(chain.clone(), kind)) {
			Some(path) => {
				self.hits.fetch_add(1, Ordering::Relaxed);
				Lookup::Hit(Arc::clone(path))
			}
			None => Lookup::Miss,
		}
	}

	fn search(&self, compile: impl FnOnce() -> Result<CompiledPath, CompileError>) -> Compiled {
		self.searches.fetch_add(1, Ordering::Relaxed);
		compile().map(Arc::new)
	}

	/// Number of backtracking searches started through this cache.
	pub fn searches(&self) -> u64 {
		self.searches.load(Ordering::Relaxed)
	}

	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Registry version the cached entries belong to.
	pub fn version(&self) -> u64 {
		self.entries.lock().version
	}

	pub fn len(&self) -> usize {
		self.entries.lock().paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().paths.is_empty()
	}

	pub fn clear(&self) {
		self.entries.lock().paths.clear();
	}
}
