//! Value kinds, domain values and per-invocation context shared by the
//! operation registry and the chain engine.

mod context;
mod fault;
mod kind;
mod param;
mod value;

pub use context::{OperationContext, Session, SessionProvider, TraceEntry};
pub use fault::{ExitSignal, Fault};
pub use kind::{KindTable, ValueKind};
pub use param::{Bindings, ParamExpr, ParamSpec, Params};
pub use value::{Blob, DocRef, Document, Value};
