//! Compilation and execution of operation chains.
//!
//! An [`Engine`] resolves a chain against the current registry snapshot,
//! compiles it for the kind of the context's input (through the shared,
//! single-flight [`PathCache`]), runs the resulting path, and settles the
//! session of top-level runs.

pub mod builtins;
mod cache;
mod compile;
mod config;
mod describe;
mod engine;
mod error;
mod exec;
mod flight;

pub use cache::PathCache;
pub use compile::{CompiledPath, Compiler, ResolvedStep, StepTarget};
pub use config::EngineConfig;
pub use describe::{OperationDoc, ParamDoc, Signature};
pub use engine::{ChainRef, Engine};
pub use error::{ChainError, CompileError};
pub use flight::SingleFlight;
