//! Engine facade: resolves chain references, compiles through the path cache,
//! executes, and settles the session of top-level runs.

use std::sync::Arc;

use opchain_registry::{ChainDefinition, OperationDescriptor, OperationId, OperationInvocation, OperationRegistry, RegistryError, RegistrySnapshot};
use opchain_types::{OperationContext, ParamExpr, ParamSpec, Params, Value, ValueKind};
use tracing::{debug, warn};

use crate::cache::PathCache;
use crate::compile::{CompiledPath, Compiler};
use crate::describe::{self, OperationDoc};
use crate::exec::{Executor, Interrupt};
use crate::{ChainError, CompileError, EngineConfig};

/// What to run: a registered id or an inline definition.
#[derive(Debug, Clone)]
pub enum ChainRef {
	/// Registered chain, or plain operation run as a one-step chain.
	Id(OperationId),
	/// Unregistered definition; compiled on every run.
	Inline(Arc<ChainDefinition>),
}

impl From<&str> for ChainRef {
	fn from(id: &str) -> Self {
		ChainRef::Id(id.into())
	}
}

impl From<String> for ChainRef {
	fn from(id: String) -> Self {
		ChainRef::Id(id.into())
	}
}

impl From<OperationId> for ChainRef {
	fn from(id: OperationId) -> Self {
		ChainRef::Id(id)
	}
}

impl From<ChainDefinition> for ChainRef {
	fn from(chain: ChainDefinition) -> Self {
		ChainRef::Inline(Arc::new(chain))
	}
}

impl From<Arc<ChainDefinition>> for ChainRef {
	fn from(chain: Arc<ChainDefinition>) -> Self {
		ChainRef::Inline(chain)
	}
}

/// Chain definition to compile, and whether its paths may be cached.
struct Target {
	chain: Arc<ChainDefinition>,
	cached: bool,
}

/// Compiles and runs operation chains against a shared registry.
pub struct Engine {
	registry: Arc<OperationRegistry>,
	config: EngineConfig,
	cache: PathCache,
}

impl Engine {
	pub fn new(registry: Arc<OperationRegistry>, config: EngineConfig) -> Self {
		Self {
			registry,
			config,
			cache: PathCache::new(),
		}
	}

	pub fn registry(&self) -> &Arc<OperationRegistry> {
		&self.registry
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Path cache, exposed for diagnostics.
	pub fn cache(&self) -> &PathCache {
		&self.cache
	}

	/// Runs `chain` on the context's current input without caller parameters.
	pub fn run(&self, ctx: &mut OperationContext, chain: impl Into<ChainRef>) -> Result<Value, ChainError> {
		self.run_with(ctx, chain, Params::new())
	}

	/// Runs `chain` with `params` as its chain-scoped parameters.
	///
	/// For a plain operation id, `params` are the operation's own parameters.
	/// A top-level run (context depth 0) saves the session once on success when
	/// `auto_commit` is set and the run opened a session; a rollback mark makes
	/// it call `set_rollback_only` instead.
	pub fn run_with(
		&self,
		ctx: &mut OperationContext,
		chain: impl Into<ChainRef>,
		params: Params,
	) -> Result<Value, ChainError> {
		let snapshot = self.registry.snapshot();
		let target = target(&snapshot, chain.into())?;
		let path = self.compile_target(&snapshot, &target, ctx.input().kind())?;
		let frame = chain_frame(&snapshot, &target.chain, params, ctx)?;

		ctx.push_chain_params(frame);
		let outcome = Executor::new(snapshot.adapters(), &self.config).run_path(ctx, &path);
		ctx.pop_chain_params();

		let result = match outcome {
			Ok(value) => Ok(value),
			Err(Interrupt::Exit(signal)) => {
				debug!(chain = %path.chain_id, rollback = signal.rollback, "chain exited early");
				Ok(signal.value.unwrap_or_else(|| ctx.input().clone()))
			}
			Err(Interrupt::Error(err)) => Err(err),
		};
		self.settle(ctx, result)
	}

	/// Compiles `chain` for `kind` without running it.
	pub fn compile(&self, chain: impl Into<ChainRef>, kind: ValueKind) -> Result<Arc<CompiledPath>, CompileError> {
		let snapshot = self.registry.snapshot();
		let target = target(&snapshot, chain.into())?;
		self.compile_target(&snapshot, &target, kind)
	}

	/// Documentation record of one operation or chain.
	pub fn describe(&self, id: &str) -> Result<OperationDoc, RegistryError> {
		let snapshot = self.registry.snapshot();
		let desc = snapshot.resolve(id)?;
		Ok(describe::describe(&snapshot, &desc, self.config.max_nesting))
	}

	/// Documentation records of every registered operation, sorted by id.
	pub fn describe_all(&self) -> Vec<OperationDoc> {
		let snapshot = self.registry.snapshot();
		snapshot
			.ids()
			.iter()
			.filter_map(|id| snapshot.get(id.as_str()))
			.map(|desc| describe::describe(&snapshot, desc, self.config.max_nesting))
			.collect()
	}

	fn compile_target(
		&self,
		snapshot: &RegistrySnapshot,
		target: &Target,
		kind: ValueKind,
	) -> Result<Arc<CompiledPath>, CompileError> {
		let compiler = Compiler::new(snapshot, self.config.max_nesting);
		if !target.cached {
			return compiler.compile(&target.chain, kind).map(Arc::new);
		}
		self.cache
			.get_or_compile(snapshot.version(), &target.chain.id, kind, || compiler.compile(&target.chain, kind))
	}

	/// Commits or rolls back a top-level run; nested runs leave the session alone.
	fn settle(&self, ctx: &mut OperationContext, result: Result<Value, ChainError>) -> Result<Value, ChainError> {
		if ctx.depth() > 0 {
			return result;
		}
		let rollback = ctx.is_rollback();
		let Some(session) = ctx.open_session() else {
			return result;
		};
		if rollback {
			warn!("rolling back session");
			session.set_rollback_only();
			return result;
		}
		let value = result?;
		if self.config.auto_commit {
			session.save().map_err(ChainError::Commit)?;
			debug!("session committed");
		}
		Ok(value)
	}
}

fn target(snapshot: &RegistrySnapshot, chain: ChainRef) -> Result<Target, CompileError> {
	match chain {
		ChainRef::Inline(chain) => Ok(Target { chain, cached: false }),
		ChainRef::Id(id) => {
			let desc = snapshot.get(id.as_str()).ok_or(CompileError::NotFound(id))?;
			let chain = match desc.chain() {
				Some(chain) => Arc::clone(chain),
				None => Arc::new(single_step(desc)),
			};
			Ok(Target { chain, cached: true })
		}
	}
}

/// Wraps a plain operation as a chain whose parameters feed the operation's.
fn single_step(desc: &OperationDescriptor) -> ChainDefinition {
	let step = desc.params.iter().fold(OperationInvocation::new(desc.id.clone()), |step, spec| {
		step.bind(Arc::clone(&spec.name), ParamExpr::ChainParam(Arc::clone(&spec.name)))
	});
	let mut chain = ChainDefinition::new(desc.id.clone()).describe(Arc::clone(&desc.description)).step(step);
	chain.params = desc.params.clone();
	chain
}

/// Resolves caller parameters against the chain's declared ones.
///
/// Undeclared caller parameters are kept so inline chains can read them.
fn chain_frame(
	snapshot: &RegistrySnapshot,
	chain: &ChainDefinition,
	mut given: Params,
	ctx: &mut OperationContext,
) -> Result<Params, ChainError> {
	let mut frame = Params::new();
	for spec in &chain.params {
		let value = match given.remove(&spec.name).or_else(|| spec.default.clone()) {
			Some(value) => value,
			None if spec.required => {
				return Err(ChainError::MissingParameter {
					operation_id: chain.id.clone(),
					name: Arc::clone(&spec.name),
				});
			}
			None => continue,
		};
		frame.insert(Arc::clone(&spec.name), adapt_param(snapshot, ctx, &chain.id, spec, value)?);
	}
	for (name, value) in given.iter() {
		frame.insert(Arc::clone(name), value.clone());
	}
	Ok(frame)
}

fn adapt_param(
	snapshot: &RegistrySnapshot,
	ctx: &mut OperationContext,
	operation_id: &OperationId,
	spec: &ParamSpec,
	value: Value,
) -> Result<Value, ChainError> {
	snapshot
		.adapters()
		.adapt(ctx, value, spec.kind)
		.map_err(|cause| ChainError::Adapter {
			operation_id: operation_id.clone(),
			cause,
		})
}
