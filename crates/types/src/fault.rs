//! Failure model of operation implementations.
//!
//! Implementations return [`Fault`] for two distinct things: a controlled early
//! stop of the chain ([`ExitSignal`]) and a genuine error. Only the latter is an
//! error for the caller of a chain.

use crate::Value;

/// Control-flow request to stop the remaining steps of a chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitSignal {
	/// Marks the invocation's session for rollback.
	pub rollback: bool,
	/// Value returned by the chain. `None` returns the input of the raising step.
	pub value: Option<Value>,
}

impl ExitSignal {
	pub fn stop() -> Self {
		Self::default()
	}

	pub fn rollback() -> Self {
		Self {
			rollback: true,
			value: None,
		}
	}

	pub fn with_value(mut self, value: impl Into<Value>) -> Self {
		self.value = Some(value.into());
		self
	}
}

/// Outcome of a failed method call.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
	#[error("chain exit requested (rollback: {})", .0.rollback)]
	Exit(ExitSignal),
	#[error("{cause}")]
	Error {
		#[source]
		cause: anyhow::Error,
		rollback: bool,
	},
}

impl Fault {
	pub fn error(cause: impl Into<anyhow::Error>) -> Self {
		Self::Error {
			cause: cause.into(),
			rollback: false,
		}
	}

	/// Error that also marks the invocation for rollback.
	pub fn rollback(cause: impl Into<anyhow::Error>) -> Self {
		Self::Error {
			cause: cause.into(),
			rollback: true,
		}
	}

	pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
		Self::error(anyhow::Error::msg(message))
	}

	pub fn is_rollback(&self) -> bool {
		match self {
			Fault::Exit(signal) => signal.rollback,
			Fault::Error { rollback, .. } => *rollback,
		}
	}
}

impl From<ExitSignal> for Fault {
	fn from(signal: ExitSignal) -> Self {
		Fault::Exit(signal)
	}
}

impl From<anyhow::Error> for Fault {
	fn from(cause: anyhow::Error) -> Self {
		Fault::error(cause)
	}
}
