use std::thread;

use opchain_types::Value;

use super::*;
use crate::adapter::adapter;
use crate::method::{Call, InvokableMethod};

fn op(id: &str) -> OperationDescriptor {
	OperationDescriptor::builder(id)
		.method(InvokableMethod::new("run", ValueKind::Document, ValueKind::Document, |call: Call<'_>| Ok(call.input)))
		.build()
		.unwrap()
}

fn labelled(id: &str, label: &str) -> OperationDescriptor {
	OperationDescriptor::builder(id)
		.label(label)
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |_call: Call<'_>| Ok(Value::Void)))
		.build()
		.unwrap()
}

#[test]
fn register_then_resolve() {
	let registry = OperationRegistry::new();
	assert_eq!(registry.version(), 0);
	let version = registry.register(op("Document.Copy"), false).unwrap();
	assert_eq!(version, 1);
	assert_eq!(registry.resolve("Document.Copy").unwrap().id, "Document.Copy");
	assert!(matches!(registry.resolve("missing"), Err(RegistryError::NotFound(_))));
}

#[test]
fn duplicate_registration_keeps_original() {
	let registry = OperationRegistry::new();
	registry.register(labelled("X", "first"), false).unwrap();

	let err = registry.register(labelled("X", "second"), false).unwrap_err();
	assert_eq!(
		err,
		RegistryError::Duplicate {
			key: "X".into(),
			owner: "X".into()
		}
	);
	assert_eq!(&*registry.resolve("X").unwrap().label, "first");
	assert_eq!(registry.version(), 1, "failed mutation publishes nothing");
}

#[test]
fn replace_swaps_descriptor_and_bumps_version() {
	let registry = OperationRegistry::new();
	registry.register(labelled("X", "first"), false).unwrap();
	let version = registry.register(labelled("X", "second"), true).unwrap();
	assert_eq!(version, 2);
	assert_eq!(&*registry.resolve("X").unwrap().label, "second");
	assert_eq!(registry.snapshot().len(), 1);
}

#[test]
fn aliases_resolve_and_collide() {
	let registry = OperationRegistry::new();
	let desc = OperationDescriptor::builder("Document.Fetch")
		.alias("Fetch")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Document, |call: Call<'_>| Ok(call.input)))
		.build()
		.unwrap();
	registry.register(desc, false).unwrap();
	assert_eq!(registry.resolve("Fetch").unwrap().id, "Document.Fetch");

	let clash = OperationDescriptor::builder("Other")
		.alias("Fetch")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)))
		.build()
		.unwrap();
	let err = registry.register(clash, true).unwrap_err();
	assert!(matches!(err, RegistryError::Duplicate { ref owner, .. } if *owner == "Document.Fetch"));
}

#[test]
fn replacing_drops_stale_aliases() {
	let registry = OperationRegistry::new();
	let with_alias = OperationDescriptor::builder("A")
		.alias("old")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)))
		.build()
		.unwrap();
	registry.register(with_alias, false).unwrap();
	registry.register(labelled("A", "new"), true).unwrap();
	assert!(!registry.snapshot().contains("old"));
	assert!(registry.snapshot().contains("A"));
}

#[test]
fn unregister_by_alias_removes_all_keys() {
	let registry = OperationRegistry::new();
	let desc = OperationDescriptor::builder("A")
		.alias("a")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)))
		.build()
		.unwrap();
	registry.register(desc, false).unwrap();
	let removed = registry.unregister("a").unwrap();
	assert_eq!(removed.id, "A");
	assert!(registry.snapshot().is_empty());
	assert!(!registry.snapshot().contains("a"));
	assert!(registry.unregister("A").is_err());
}

#[test]
fn chains_share_the_operation_id_space() {
	let registry = OperationRegistry::new();
	registry.register(op("X"), false).unwrap();
	let err = registry.register_chain(ChainDefinition::new("X").op("X"), false).unwrap_err();
	assert!(matches!(err, RegistryError::Duplicate { .. }));

	registry.register_chain(ChainDefinition::new("chain").op("X"), false).unwrap();
	let chain = registry.resolve("chain").unwrap();
	assert!(chain.is_chain());
	assert!(chain.methods().is_empty());
	assert_eq!(&*chain.category, "Chain");
}

#[test]
fn empty_chains_are_rejected() {
	let registry = OperationRegistry::new();
	let err = registry.register_chain(ChainDefinition::new("empty"), false).unwrap_err();
	assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
}

#[test]
fn adapter_mutations_publish_new_versions() {
	let registry = OperationRegistry::new();
	let before = registry.snapshot();
	registry.put_adapter(ValueKind::Text, ValueKind::Integer, adapter(|_ctx, v| Ok(v)));
	assert_eq!(registry.version(), 1);
	assert!(registry.snapshot().adapters().get(ValueKind::Text, ValueKind::Integer).is_some());
	assert!(before.adapters().is_empty(), "pinned snapshots never change");

	assert!(registry.remove_adapter(ValueKind::Text, ValueKind::Integer));
	assert!(!registry.remove_adapter(ValueKind::Text, ValueKind::Integer));
	assert_eq!(registry.version(), 2);
}

#[test]
fn iterable_methods_expand_to_scalar_and_collection_views() {
	let desc = OperationDescriptor::builder("Blob.Attach")
		.method(InvokableMethod::new("run", ValueKind::Blob, ValueKind::Blob, |call: Call<'_>| Ok(call.input)).iterable())
		.build()
		.unwrap();
	let kinds: Vec<_> = desc.methods().iter().map(|m| (m.input_kind(), m.output_kind())).collect();
	assert_eq!(
		kinds,
		vec![
			(ValueKind::Blob, ValueKind::Blob),
			(ValueKind::BlobList, ValueKind::BlobList)
		]
	);
}

#[test]
fn invalid_descriptors_are_rejected() {
	let no_methods = OperationDescriptor::builder("empty").build();
	assert!(matches!(no_methods, Err(RegistryError::InvalidDescriptor { .. })));

	let void_iter = OperationDescriptor::builder("v")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)).iterable())
		.build();
	assert!(matches!(void_iter, Err(RegistryError::InvalidDescriptor { .. })));

	let self_alias = OperationDescriptor::builder("a")
		.alias("a")
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)))
		.build();
	assert!(matches!(self_alias, Err(RegistryError::InvalidDescriptor { .. })));

	let twice = OperationDescriptor::builder("p")
		.param(opchain_types::ParamSpec::required("x", ValueKind::Text))
		.param(opchain_types::ParamSpec::optional("x", ValueKind::Text))
		.method(InvokableMethod::new("run", ValueKind::Void, ValueKind::Void, |call: Call<'_>| Ok(call.input)))
		.build();
	assert!(matches!(twice, Err(RegistryError::InvalidDescriptor { .. })));
}

#[test]
fn concurrent_registrations_are_not_lost() {
	let registry = Arc::new(OperationRegistry::new());
	let handles: Vec<_> = (0..8)
		.map(|t| {
			let registry = Arc::clone(&registry);
			thread::spawn(move || {
				for i in 0..25 {
					registry.register(op(&format!("op.{t}.{i}")), false).unwrap();
				}
			})
		})
		.collect();
	for h in handles {
		h.join().unwrap();
	}
	assert_eq!(registry.snapshot().len(), 200);
	assert_eq!(registry.version(), 200);
}
