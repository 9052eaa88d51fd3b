use crate::OperationId;

/// Registry mutation and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	#[error("operation `{0}` not found")]
	NotFound(OperationId),
	/// An id or alias is already taken; `owner` is the canonical id holding it.
	#[error("`{key}` is already registered by `{owner}`")]
	Duplicate { key: OperationId, owner: OperationId },
	#[error("invalid descriptor `{id}`: {reason}")]
	InvalidDescriptor { id: OperationId, reason: String },
}
