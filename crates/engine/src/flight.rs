//! Single-flight deduplication of concurrent computations.
//!
//! The first caller for a key becomes the leader and runs the computation;
//! callers arriving while it runs block on the flight's condvar and receive a
//! clone of the leader's result. A leader that unwinds without completing
//! marks its flight abandoned, so waiters retry and one of them takes over.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

enum State<V> {
	Pending,
	Done(V),
	Abandoned,
}

struct Flight<V> {
	state: Mutex<State<V>>,
	ready: Condvar,
}

impl<V: Clone> Flight<V> {
	fn new() -> Self {
		Self {
			state: Mutex::new(State::Pending),
			ready: Condvar::new(),
		}
	}

	fn settle(&self, state: State<V>) {
		*self.state.lock() = state;
		self.ready.notify_all();
	}

	/// Blocks until the leader settles; `None` means the leader abandoned.
	fn wait(&self) -> Option<V> {
		let mut state = self.state.lock();
		loop {
			match &*state {
				State::Pending => self.ready.wait(&mut state),
				State::Done(value) => return Some(value.clone()),
				State::Abandoned => return None,
			}
		}
	}
}

/// Keyed single-flight group.
pub struct SingleFlight<K, V> {
	inflight: Mutex<FxHashMap<K, Arc<Flight<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
	fn default() -> Self {
		Self {
			inflight: Mutex::new(FxHashMap::default()),
		}
	}
}

enum Join<'a, K: Eq + Hash, V> {
	Leader(Leader<'a, K, V>),
	Shared(V),
	Retry,
}

impl<K, V> SingleFlight<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `compute` for `key` unless a computation for it is already in
	/// flight, in which case blocks and returns that computation's result.
	pub fn run(&self, key: K, compute: impl FnOnce() -> V) -> V {
		let leader = loop {
			match self.join(&key) {
				Join::Leader(leader) => break leader,
				Join::Shared(value) => return value,
				Join::Retry => continue,
			}
		};
		let value = compute();
		leader.complete(value.clone());
		value
	}

	/// Number of keys currently being computed.
	pub fn in_flight(&self) -> usize {
		self.inflight.lock().len()
	}

	fn join(&self, key: &K) -> Join<'_, K, V> {
		let flight = {
			let mut map = self.inflight.lock();
			match map.get(key) {
				Some(flight) => Arc::clone(flight),
				None => {
					let flight = Arc::new(Flight::new());
					map.insert(key.clone(), Arc::clone(&flight));
					return Join::Leader(Leader {
						group: &self.inflight,
						key: key.clone(),
						flight,
						completed: false,
					});
				}
			}
		};
		match flight.wait() {
			Some(value) => Join::Shared(value),
			None => Join::Retry,
		}
	}
}

/// Leader's claim on a flight; un-wedges waiters if dropped before completion.
struct Leader<'a, K: Eq + Hash, V> {
	group: &'a Mutex<FxHashMap<K, Arc<Flight<V>>>>,
	key: K,
	flight: Arc<Flight<V>>,
	completed: bool,
}

impl<K: Eq + Hash, V> Leader<'_, K, V> {
	fn release(&self) {
		let mut map = self.group.lock();
		if map.get(&self.key).is_some_and(|f| Arc::ptr_eq(f, &self.flight)) {
			map.remove(&self.key);
		}
	}
}

impl<K: Eq + Hash, V: Clone> Leader<'_, K, V> {
	fn complete(mut self, value: V) {
		self.completed = true;
		self.flight.settle(State::Done(value));
		self.release();
	}
}

impl<K: Eq + Hash, V> Drop for Leader<'_, K, V> {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		self.release();
		*self.flight.state.lock() = State::Abandoned;
		self.flight.ready.notify_all();
	}
}
