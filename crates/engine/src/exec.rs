//! Execution of compiled paths.
//!
//! Runs steps in order against one [`OperationContext`], resolving parameter
//! expressions per step and recursing into nested compiled chains. An
//! [`ExitSignal`] from any depth stops the whole run; faults abort it. Commit
//! and rollback of the session are the caller's concern (see `Engine::run`).

use opchain_registry::{AdapterTable, MethodError, OperationId};
use opchain_types::{ExitSignal, Fault, OperationContext, ParamExpr, Params, TraceEntry, Value};
use tracing::{trace, warn};

use crate::compile::{CompiledPath, ResolvedStep, StepTarget};
use crate::{ChainError, EngineConfig};

/// Why a path stopped before its last step.
#[derive(Debug)]
pub(crate) enum Interrupt {
	Exit(ExitSignal),
	Error(ChainError),
}

impl From<ChainError> for Interrupt {
	fn from(err: ChainError) -> Self {
		Interrupt::Error(err)
	}
}

pub(crate) struct Executor<'a> {
	adapters: &'a AdapterTable,
	config: &'a EngineConfig,
}

impl<'a> Executor<'a> {
	pub(crate) fn new(adapters: &'a AdapterTable, config: &'a EngineConfig) -> Self {
		Self { adapters, config }
	}

	/// Runs every step of `path`, leaving the last output as the context input.
	pub(crate) fn run_path(&self, ctx: &mut OperationContext, path: &CompiledPath) -> Result<Value, Interrupt> {
		for step in &path.steps {
			self.run_step(ctx, step)?;
		}
		Ok(ctx.input().clone())
	}

	fn run_step(&self, ctx: &mut OperationContext, step: &ResolvedStep) -> Result<(), Interrupt> {
		let input = ctx.input().kind();
		trace!(
			operation = %step.operation_id,
			target = step.target.name(),
			%input,
			depth = ctx.depth(),
			"executing step"
		);
		if self.config.trace {
			ctx.record(TraceEntry {
				operation_id: step.operation_id.as_arc().clone(),
				method: step.target.name().into(),
				input,
				depth: ctx.depth(),
			});
		}

		let params = self.resolve_params(ctx, step)?;
		let output = match &step.target {
			StepTarget::Method(method) => {
				let value = ctx.input().clone();
				method
					.invoke(ctx, value, &params, self.adapters)
					.map_err(|err| method_failure(ctx, &step.operation_id, err))?
			}
			StepTarget::Chain(nested) => {
				ctx.push_chain_params(params);
				ctx.enter();
				let result = self.run_path(ctx, nested);
				ctx.leave();
				ctx.pop_chain_params();
				result?
			}
		};
		ctx.set_input(output);
		Ok(())
	}

	/// Evaluates bindings against the context, falling back to declared defaults.
	pub(crate) fn resolve_params(&self, ctx: &mut OperationContext, step: &ResolvedStep) -> Result<Params, ChainError> {
		for name in step.bindings.keys() {
			if !step.params.iter().any(|spec| spec.name == *name) {
				warn!(operation = %step.operation_id, param = %name, "discarding binding of undeclared parameter");
			}
		}

		let mut params = Params::new();
		for spec in step.params.iter() {
			let bound = step.bindings.get(&spec.name).and_then(|expr| evaluate(ctx, expr));
			let value = match bound.or_else(|| spec.default.clone()) {
				Some(value) => value,
				None if spec.required => {
					return Err(ChainError::MissingParameter {
						operation_id: step.operation_id.clone(),
						name: spec.name.clone(),
					});
				}
				None => continue,
			};
			let value = self
				.adapters
				.adapt(ctx, value, spec.kind)
				.map_err(|cause| ChainError::Adapter {
					operation_id: step.operation_id.clone(),
					cause,
				})?;
			params.insert(spec.name.clone(), value);
		}
		Ok(params)
	}
}

/// Value of a parameter expression; `None` when the variable or chain parameter is unset.
fn evaluate(ctx: &OperationContext, expr: &ParamExpr) -> Option<Value> {
	match expr {
		ParamExpr::Literal(value) => Some(value.clone()),
		ParamExpr::Var(name) => ctx.var(name).cloned(),
		ParamExpr::ChainParam(name) => ctx.chain_param(name).cloned(),
	}
}

fn method_failure(ctx: &mut OperationContext, operation_id: &OperationId, err: MethodError) -> Interrupt {
	match err {
		MethodError::Fault(Fault::Exit(signal)) => {
			if signal.rollback {
				warn!(operation = %operation_id, "exit signal marks the run for rollback");
				ctx.mark_rollback();
			}
			Interrupt::Exit(signal)
		}
		MethodError::Fault(Fault::Error { cause, rollback }) => {
			if rollback {
				warn!(operation = %operation_id, error = %cause, "failure marks the run for rollback");
				ctx.mark_rollback();
			}
			Interrupt::Error(ChainError::Invocation {
				operation_id: operation_id.clone(),
				rollback,
				cause,
			})
		}
		MethodError::Adapt(cause) => Interrupt::Error(ChainError::Adapter {
			operation_id: operation_id.clone(),
			cause,
		}),
		other => Interrupt::Error(ChainError::Invocation {
			operation_id: operation_id.clone(),
			rollback: false,
			cause: anyhow::Error::new(other),
		}),
	}
}
