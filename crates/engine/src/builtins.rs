//! Control operations over the invocation context.

use anyhow::anyhow;
use opchain_registry::{Call, InvokableMethod, OperationDescriptor, OperationRegistry, RegistryError};
use opchain_types::{ExitSignal, Fault, ParamSpec, Value, ValueKind};

pub const SET_VAR: &str = "Context.SetVar";
pub const SET_INPUT_AS_VAR: &str = "Context.SetInputAsVar";
pub const RESTORE_INPUT: &str = "Context.RestoreInput";
pub const RESTORE_DOCUMENT: &str = "Context.RestoreDocumentInput";
pub const RESTORE_BLOB: &str = "Context.RestoreBlobInput";
pub const RESTORE_TEXT: &str = "Context.RestoreTextInput";
pub const EXIT: &str = "Context.Exit";
pub const FAIL: &str = "Context.Fail";

const CATEGORY: &str = "Execution Context";

/// Registers the context control operations, replacing earlier registrations.
pub fn register_builtins(registry: &OperationRegistry) -> Result<(), RegistryError> {
	for desc in builtins()? {
		registry.register(desc, true)?;
	}
	Ok(())
}

fn required_str<'a>(call: &'a Call<'_>, name: &str) -> Result<&'a str, Fault> {
	call.params
		.get_str(name)
		.ok_or_else(|| Fault::error(anyhow!("parameter `{name}` must be a string")))
}

fn stored<'a>(call: &'a Call<'_>) -> Result<&'a Value, Fault> {
	let name = required_str(call, "name")?;
	call.ctx
		.var(name)
		.ok_or_else(|| Fault::error(anyhow!("context variable `{name}` is not set")))
}

/// Restore whose output kind is known at compile time, so later steps route on it.
fn typed_restore(id: &str, label: &str, kind: ValueKind) -> Result<OperationDescriptor, RegistryError> {
	OperationDescriptor::builder(id)
		.label(label)
		.category(CATEGORY)
		.description(format!("Replaces the input with a stored {} variable.", kind.name()))
		.param(ParamSpec::required("name", ValueKind::Text))
		.method(InvokableMethod::new("run", ValueKind::Void, kind, move |call: Call<'_>| {
			let value = stored(&call)?;
			if !value.kind().is_assignable_to(kind) {
				return Err(Fault::error(anyhow!(
					"context variable holds {}, expected {}",
					value.kind().name(),
					kind.name()
				)));
			}
			Ok(value.clone())
		}))
		.build()
}

fn builtins() -> Result<Vec<OperationDescriptor>, RegistryError> {
	Ok(vec![
		OperationDescriptor::builder(SET_VAR)
			.label("Set context variable")
			.category(CATEGORY)
			.description("Stores a value under a context variable; the input passes through.")
			.param(ParamSpec::required("name", ValueKind::Text))
			.param(ParamSpec::optional("value", ValueKind::Object))
			.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| {
				let name = required_str(&call, "name")?.to_owned();
				let value = call.params.get("value").cloned().unwrap_or_default();
				call.ctx.set_var(name, value);
				Ok(Value::Void)
			}))
			.build()?,
		OperationDescriptor::builder(SET_INPUT_AS_VAR)
			.label("Push input to variable")
			.category(CATEGORY)
			.description("Stores the current input under a context variable.")
			.param(ParamSpec::required("name", ValueKind::Text))
			.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| {
				let name = required_str(&call, "name")?.to_owned();
				call.ctx.set_var(name, call.input);
				Ok(Value::Void)
			}))
			.build()?,
		OperationDescriptor::builder(RESTORE_INPUT)
			.label("Restore input from variable")
			.category(CATEGORY)
			.description("Replaces the input with a stored context variable.")
			.param(ParamSpec::required("name", ValueKind::Text))
			.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Object, |call: Call<'_>| {
				stored(&call).cloned()
			}))
			.build()?,
		typed_restore(RESTORE_DOCUMENT, "Restore document input", ValueKind::Document)?,
		typed_restore(RESTORE_BLOB, "Restore blob input", ValueKind::Blob)?,
		typed_restore(RESTORE_TEXT, "Restore text input", ValueKind::Text)?,
		OperationDescriptor::builder(EXIT)
			.label("Exit chain")
			.category(CATEGORY)
			.description("Stops the chain, returning the current input.")
			.param(ParamSpec::optional("rollback", ValueKind::Boolean).with_default(false))
			.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| {
				let rollback = call.params.get_bool("rollback").unwrap_or(false);
				Err(ExitSignal {
					rollback,
					value: Some(call.input),
				}
				.into())
			}))
			.build()?,
		OperationDescriptor::builder(FAIL)
			.label("Fail chain")
			.category(CATEGORY)
			.description("Aborts the chain with an error.")
			.param(ParamSpec::optional("message", ValueKind::Text).with_default("chain failed"))
			.param(ParamSpec::optional("rollback", ValueKind::Boolean).with_default(false))
			.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| {
				let message = call.params.get_str("message").unwrap_or("chain failed").to_owned();
				let rollback = call.params.get_bool("rollback").unwrap_or(false);
				Err(Fault::Error {
					cause: anyhow!(message),
					rollback,
				})
			}))
			.build()?,
	])
}
