//! Operation registry: descriptors, invokable methods, type adapters and the
//! versioned snapshot directory the chain engine reads from.

pub mod adapter;
mod descriptor;
mod error;
mod id;
pub mod method;
mod registry;

pub use adapter::{AdaptError, AdapterFn, AdapterTable, adapter};
pub use descriptor::{ChainDefinition, OperationBody, OperationBuilder, OperationDescriptor, OperationInvocation};
pub use error::RegistryError;
pub use id::OperationId;
pub use method::{Call, Collector, InvokableMethod, MethodError, MethodFn};
pub use registry::{OperationRegistry, RegistrySnapshot};
