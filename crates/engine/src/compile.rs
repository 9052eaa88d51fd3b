//! Chain compiler.
//!
//! # Role
//!
//! Turns a [`ChainDefinition`] and a concrete input kind into a
//! [`CompiledPath`]: one chosen method (or nested compiled chain) per step,
//! such that every step accepts the kind the previous one produces.
//!
//! # Search
//!
//! Depth-first, first-success backtracking over an explicit stack of frames.
//! Each frame holds the ranked candidates of one step and a cursor. The last
//! step takes its best candidate outright; earlier steps advance their cursor
//! when everything after them fails. Candidates rank by score, then
//! registration order.
//!
//! # Invariants
//!
//! - Compilation is deterministic for a given snapshot, chain and kind.
//! - Producers of `Void` or `Object` propagate the incoming kind.
//! - A failing search reports the deepest step that had no candidate for the
//!   kind it received; ties keep the first one found.

use std::sync::Arc;

use opchain_registry::{ChainDefinition, InvokableMethod, OperationDescriptor, OperationId, RegistrySnapshot};
use opchain_types::{Bindings, ParamSpec, ValueKind};
use tracing::debug;

use crate::CompileError;

/// What a resolved step calls.
#[derive(Debug, Clone)]
pub enum StepTarget {
	Method(Arc<InvokableMethod>),
	Chain(Arc<CompiledPath>),
}

impl StepTarget {
	/// Method name, or the nested chain's id.
	pub fn name(&self) -> &str {
		match self {
			StepTarget::Method(method) => method.name(),
			StepTarget::Chain(path) => path.chain_id.as_str(),
		}
	}
}

/// One step of a compiled path.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
	pub operation_id: OperationId,
	pub target: StepTarget,
	pub bindings: Bindings,
	/// Declared parameters of the operation (chain-scoped ones for composites).
	pub params: Arc<[ParamSpec]>,
	pub input: ValueKind,
	pub output: ValueKind,
}

/// Type-resolved sequence of calls for one chain and input kind.
#[derive(Debug, Clone)]
pub struct CompiledPath {
	pub chain_id: OperationId,
	pub input: ValueKind,
	pub output: ValueKind,
	pub steps: Vec<ResolvedStep>,
}

impl CompiledPath {
	/// `(operation id, method or nested chain name)` per step, for comparisons and logs.
	pub fn signature(&self) -> Vec<(String, String)> {
		self.steps
			.iter()
			.map(|s| (s.operation_id.to_string(), s.target.name().to_string()))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}
}

struct Candidate {
	target: StepTarget,
	output: ValueKind,
	score: u32,
}

struct Frame {
	input: ValueKind,
	candidates: Vec<Candidate>,
	cursor: usize,
}

impl Frame {
	fn chosen(&self) -> &Candidate {
		&self.candidates[self.cursor]
	}
}

/// Compiles chains against one pinned registry snapshot.
pub struct Compiler<'a> {
	snapshot: &'a RegistrySnapshot,
	max_nesting: usize,
}

impl<'a> Compiler<'a> {
	pub fn new(snapshot: &'a RegistrySnapshot, max_nesting: usize) -> Self {
		Self { snapshot, max_nesting }
	}

	pub fn compile(&self, chain: &ChainDefinition, input: ValueKind) -> Result<CompiledPath, CompileError> {
		let mut stack = vec![chain.id.clone()];
		let result = self.compile_nested(chain, input, &mut stack);
		match &result {
			Ok(path) => debug!(chain = %chain.id, %input, output = %path.output, steps = path.len(), "compiled chain"),
			Err(err) => debug!(chain = %chain.id, %input, error = %err, "chain compilation failed"),
		}
		result
	}

	fn compile_nested(
		&self,
		chain: &ChainDefinition,
		input: ValueKind,
		stack: &mut Vec<OperationId>,
	) -> Result<CompiledPath, CompileError> {
		let descriptors = chain
			.steps
			.iter()
			.map(|step| {
				self.snapshot
					.get(step.operation_id.as_str())
					.cloned()
					.ok_or_else(|| CompileError::NotFound(step.operation_id.clone()))
			})
			.collect::<Result<Vec<_>, _>>()?;

		let mut frames: Vec<Frame> = Vec::with_capacity(descriptors.len());
		let mut deepest: Option<(usize, ValueKind)> = None;
		let mut kind = input;

		while frames.len() < descriptors.len() {
			let index = frames.len();
			let mut candidates = self.candidates(&descriptors[index], kind, stack)?;

			if candidates.is_empty() {
				if deepest.is_none_or(|(depth, _)| index > depth) {
					deepest = Some((index, kind));
				}
				kind = loop {
					let Some(frame) = frames.last_mut() else {
						let (index, kind) = deepest.unwrap_or((index, kind));
						return Err(CompileError::InvalidChain {
							operation_id: descriptors[index].id.clone(),
							kind,
						});
					};
					frame.cursor += 1;
					if frame.cursor < frame.candidates.len() {
						break frame.chosen().output;
					}
					frames.pop();
				};
				continue;
			}

			if index + 1 == descriptors.len() {
				candidates.truncate(1);
			}
			let frame = Frame {
				input: kind,
				candidates,
				cursor: 0,
			};
			kind = frame.chosen().output;
			frames.push(frame);
		}

		let steps = frames
			.into_iter()
			.zip(descriptors.iter().zip(&chain.steps))
			.map(|(mut frame, (desc, step))| {
				let chosen = frame.candidates.swap_remove(frame.cursor);
				ResolvedStep {
					operation_id: desc.id.clone(),
					target: chosen.target,
					bindings: step.bindings.clone(),
					params: Arc::from(desc.params.as_slice()),
					input: frame.input,
					output: chosen.output,
				}
			})
			.collect();

		Ok(CompiledPath {
			chain_id: chain.id.clone(),
			input,
			output: kind,
			steps,
		})
	}

	/// Ranked candidates of one operation for `input`; empty when nothing matches.
	fn candidates(
		&self,
		desc: &OperationDescriptor,
		input: ValueKind,
		stack: &mut Vec<OperationId>,
	) -> Result<Vec<Candidate>, CompileError> {
		let Some(chain) = desc.chain() else {
			let adapters = self.snapshot.adapters();
			let mut ranked: Vec<Candidate> = desc
				.methods()
				.iter()
				.filter_map(|method| {
					let score = method.match_priority(input, adapters);
					(score > 0).then(|| Candidate {
						target: StepTarget::Method(Arc::clone(method)),
						output: propagated(method, input),
						score,
					})
				})
				.collect();
			// Stable: equal scores keep registration order.
			ranked.sort_by(|a, b| b.score.cmp(&a.score));
			return Ok(ranked);
		};

		if stack.contains(&desc.id) {
			return Err(CompileError::RecursiveChain(desc.id.clone()));
		}
		if stack.len() > self.max_nesting {
			return Err(CompileError::TooDeep {
				chain: desc.id.clone(),
				max: self.max_nesting,
			});
		}

		stack.push(desc.id.clone());
		let nested = self.compile_nested(chain, input, stack);
		stack.pop();

		match nested {
			Ok(path) => Ok(vec![Candidate {
				output: path.output,
				target: StepTarget::Chain(Arc::new(path)),
				score: 1,
			}]),
			Err(CompileError::InvalidChain { .. }) => Ok(Vec::new()),
			Err(err) => Err(err),
		}
	}
}

/// Kind handed to the next step when `method` runs on `input`.
fn propagated(method: &InvokableMethod, input: ValueKind) -> ValueKind {
	match method.output_kind() {
		ValueKind::Void | ValueKind::Object => input,
		output => output,
	}
}

#[cfg(test)]
mod tests;
