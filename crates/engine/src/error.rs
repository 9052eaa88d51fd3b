use std::sync::Arc;

use opchain_registry::{AdaptError, OperationId};
use opchain_types::ValueKind;

/// Chain compilation failures.
///
/// Clonable so one failed search can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
	#[error("operation not found: {0}")]
	NotFound(OperationId),
	#[error("no method of `{operation_id}` can continue from {kind}")]
	InvalidChain { operation_id: OperationId, kind: ValueKind },
	#[error("chain `{0}` invokes itself")]
	RecursiveChain(OperationId),
	#[error("chain `{chain}` nests deeper than {max} levels")]
	TooDeep { chain: OperationId, max: usize },
}

/// Failure of a chain run, as seen by the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	#[error(transparent)]
	Compile(#[from] CompileError),
	#[error("operation `{operation_id}` could not adapt its input")]
	Adapter {
		operation_id: OperationId,
		#[source]
		cause: AdaptError,
	},
	#[error("operation `{operation_id}` failed")]
	Invocation {
		operation_id: OperationId,
		rollback: bool,
		#[source]
		cause: anyhow::Error,
	},
	#[error("operation `{operation_id}` requires parameter `{name}`")]
	MissingParameter { operation_id: OperationId, name: Arc<str> },
	#[error("commit failed")]
	Commit(#[source] anyhow::Error),
}

impl ChainError {
	/// Id of the operation the failure is attributed to, if any.
	pub fn operation_id(&self) -> Option<&OperationId> {
		match self {
			ChainError::Compile(CompileError::NotFound(id))
			| ChainError::Compile(CompileError::RecursiveChain(id))
			| ChainError::Compile(CompileError::TooDeep { chain: id, .. })
			| ChainError::Compile(CompileError::InvalidChain { operation_id: id, .. })
			| ChainError::Adapter { operation_id: id, .. }
			| ChainError::Invocation { operation_id: id, .. }
			| ChainError::MissingParameter { operation_id: id, .. } => Some(id),
			ChainError::Commit(_) => None,
		}
	}
}
