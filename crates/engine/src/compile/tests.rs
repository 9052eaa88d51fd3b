use opchain_registry::{Call, OperationRegistry, adapter};
use pretty_assertions::assert_eq;

use super::*;

fn method(name: &str, consumes: ValueKind, produces: ValueKind) -> InvokableMethod {
	InvokableMethod::new(name, consumes, produces, |call: Call<'_>| Ok(call.input))
}

fn register(registry: &OperationRegistry, id: &str, methods: Vec<InvokableMethod>) {
	let builder = methods
		.into_iter()
		.fold(OperationDescriptor::builder(id), |b, m| b.method(m));
	registry.register(builder.build().unwrap(), false).unwrap();
}

fn pairs(path: &CompiledPath) -> Vec<(&str, &str)> {
	path.steps
		.iter()
		.map(|s| (s.operation_id.as_str(), s.target.name()))
		.collect()
}

#[test]
fn compiles_straight_chain() {
	let registry = OperationRegistry::new();
	register(&registry, "opA", vec![method("m1", ValueKind::Document, ValueKind::Document)]);
	register(&registry, "opB", vec![method("m1", ValueKind::Document, ValueKind::Blob)]);
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("opA").op("opB");
	let path = Compiler::new(&snap, 16).compile(&chain, ValueKind::Document).unwrap();

	assert_eq!(pairs(&path), vec![("opA", "m1"), ("opB", "m1")]);
	assert_eq!(path.input, ValueKind::Document);
	assert_eq!(path.output, ValueKind::Blob);
	assert_eq!(path.steps[1].input, ValueKind::Document);
}

#[test]
fn unroutable_step_is_reported_with_its_kind() {
	let registry = OperationRegistry::new();
	register(&registry, "opA", vec![method("m1", ValueKind::Document, ValueKind::Document)]);
	register(&registry, "opB", vec![method("m1", ValueKind::Blob, ValueKind::Blob)]);
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("opA").op("opB");
	let err = Compiler::new(&snap, 16).compile(&chain, ValueKind::Document).unwrap_err();
	assert_eq!(
		err,
		CompileError::InvalidChain {
			operation_id: "opB".into(),
			kind: ValueKind::Document
		}
	);
}

#[test]
fn adapter_makes_a_step_routable() {
	let registry = OperationRegistry::new();
	register(&registry, "opA", vec![method("m1", ValueKind::Document, ValueKind::Document)]);
	register(&registry, "opB", vec![method("m1", ValueKind::Blob, ValueKind::Blob)]);
	registry.put_adapter(ValueKind::Document, ValueKind::Blob, adapter(|_ctx, v| Ok(v)));
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("opA").op("opB");
	let path = Compiler::new(&snap, 16).compile(&chain, ValueKind::Document).unwrap();
	assert_eq!(path.output, ValueKind::Blob);
}

#[test]
fn higher_priority_wins_unless_it_dead_ends() {
	let registry = OperationRegistry::new();
	register(
		&registry,
		"pick",
		vec![
			method("to_doc", ValueKind::Document, ValueKind::Document),
			method("to_blob", ValueKind::Document, ValueKind::Blob).with_priority(5),
		],
	);
	register(&registry, "docs_only", vec![method("m", ValueKind::Document, ValueKind::Document)]);
	register(&registry, "blobs_too", vec![
		method("doc", ValueKind::Document, ValueKind::Document),
		method("blob", ValueKind::Blob, ValueKind::Blob),
	]);
	let snap = registry.snapshot();
	let compiler = Compiler::new(&snap, 16);

	let fallback = compiler
		.compile(&ChainDefinition::new("a").op("pick").op("docs_only"), ValueKind::Document)
		.unwrap();
	assert_eq!(pairs(&fallback), vec![("pick", "to_doc"), ("docs_only", "m")]);

	let preferred = compiler
		.compile(&ChainDefinition::new("b").op("pick").op("blobs_too"), ValueKind::Document)
		.unwrap();
	assert_eq!(pairs(&preferred), vec![("pick", "to_blob"), ("blobs_too", "blob")]);
}

#[test]
fn equal_scores_keep_registration_order() {
	let registry = OperationRegistry::new();
	register(&registry, "two", vec![
		method("first", ValueKind::Document, ValueKind::Document),
		method("second", ValueKind::Document, ValueKind::Document),
	]);
	let snap = registry.snapshot();
	let path = Compiler::new(&snap, 16)
		.compile(&ChainDefinition::new("c").op("two"), ValueKind::Document)
		.unwrap();
	assert_eq!(pairs(&path), vec![("two", "first")]);
}

#[test]
fn deepest_dead_end_is_reported() {
	let registry = OperationRegistry::new();
	register(&registry, "A", vec![
		method("blob", ValueKind::Document, ValueKind::Blob).with_priority(1),
		method("text", ValueKind::Document, ValueKind::Text),
	]);
	register(&registry, "B", vec![method("count", ValueKind::Blob, ValueKind::Integer)]);
	register(&registry, "C", vec![method("flag", ValueKind::Boolean, ValueKind::Boolean)]);
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("A").op("B").op("C");
	let err = Compiler::new(&snap, 16).compile(&chain, ValueKind::Document).unwrap_err();
	assert_eq!(
		err,
		CompileError::InvalidChain {
			operation_id: "C".into(),
			kind: ValueKind::Integer
		}
	);
}

#[test]
fn void_producers_propagate_the_incoming_kind() {
	let registry = OperationRegistry::new();
	register(&registry, "mark", vec![method("m", ValueKind::Void, ValueKind::Void)]);
	register(&registry, "any", vec![method("m", ValueKind::Void, ValueKind::Object)]);
	register(&registry, "update", vec![method("m", ValueKind::Document, ValueKind::Document)]);
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("mark").op("any").op("update");
	let path = Compiler::new(&snap, 16).compile(&chain, ValueKind::Document).unwrap();
	assert_eq!(
		path.steps.iter().map(|s| s.output).collect::<Vec<_>>(),
		vec![ValueKind::Document, ValueKind::Document, ValueKind::Document]
	);
}

#[test]
fn iterable_method_routes_collections() {
	let registry = OperationRegistry::new();
	register(&registry, "fetch", vec![method("m", ValueKind::Void, ValueKind::DocumentList)]);
	register(&registry, "attach", vec![
		method("m", ValueKind::Document, ValueKind::Blob).iterable(),
	]);
	let snap = registry.snapshot();

	let chain = ChainDefinition::new("c").op("fetch").op("attach");
	let path = Compiler::new(&snap, 16).compile(&chain, ValueKind::Void).unwrap();
	assert_eq!(path.output, ValueKind::BlobList);
}

#[test]
fn unknown_operation_fails_before_searching() {
	let registry = OperationRegistry::new();
	register(&registry, "A", vec![method("m", ValueKind::Void, ValueKind::Void)]);
	let snap = registry.snapshot();
	let err = Compiler::new(&snap, 16)
		.compile(&ChainDefinition::new("c").op("A").op("nope"), ValueKind::Void)
		.unwrap_err();
	assert_eq!(err, CompileError::NotFound("nope".into()));
}

#[test]
fn nested_chain_compiles_into_one_step() {
	let registry = OperationRegistry::new();
	register(&registry, "opA", vec![method("m1", ValueKind::Document, ValueKind::Document)]);
	register(&registry, "opB", vec![method("m1", ValueKind::Document, ValueKind::Blob)]);
	registry
		.register_chain(ChainDefinition::new("inner").op("opA").op("opB"), false)
		.unwrap();
	register(&registry, "size", vec![method("m", ValueKind::Blob, ValueKind::Integer)]);
	let snap = registry.snapshot();

	let outer = ChainDefinition::new("outer").op("inner").op("size");
	let path = Compiler::new(&snap, 16).compile(&outer, ValueKind::Document).unwrap();
	assert_eq!(pairs(&path), vec![("inner", "inner"), ("size", "m")]);
	let StepTarget::Chain(nested) = &path.steps[0].target else {
		panic!("expected nested chain");
	};
	assert_eq!(pairs(nested), vec![("opA", "m1"), ("opB", "m1")]);
	assert_eq!(path.output, ValueKind::Integer);
}

#[test]
fn nested_chain_without_route_is_a_dead_end() {
	let registry = OperationRegistry::new();
	register(&registry, "blob", vec![method("m", ValueKind::Blob, ValueKind::Blob)]);
	registry.register_chain(ChainDefinition::new("inner").op("blob"), false).unwrap();
	let snap = registry.snapshot();

	let err = Compiler::new(&snap, 16)
		.compile(&ChainDefinition::new("outer").op("inner"), ValueKind::Text)
		.unwrap_err();
	assert_eq!(
		err,
		CompileError::InvalidChain {
			operation_id: "inner".into(),
			kind: ValueKind::Text
		}
	);
}

#[test]
fn self_referencing_chain_is_rejected() {
	let registry = OperationRegistry::new();
	register(&registry, "A", vec![method("m", ValueKind::Void, ValueKind::Void)]);
	registry.register_chain(ChainDefinition::new("loop").op("A").op("loop"), false).unwrap();
	let snap = registry.snapshot();
	let chain = snap.resolve("loop").unwrap().chain().cloned().unwrap();

	let err = Compiler::new(&snap, 16).compile(&chain, ValueKind::Void).unwrap_err();
	assert_eq!(err, CompileError::RecursiveChain("loop".into()));
}

#[test]
fn nesting_is_bounded() {
	let registry = OperationRegistry::new();
	register(&registry, "leaf", vec![method("m", ValueKind::Void, ValueKind::Void)]);
	registry.register_chain(ChainDefinition::new("c0").op("leaf"), false).unwrap();
	registry.register_chain(ChainDefinition::new("c1").op("c0"), false).unwrap();
	let snap = registry.snapshot();

	let top = ChainDefinition::new("top").op("c1");
	assert!(Compiler::new(&snap, 2).compile(&top, ValueKind::Void).is_ok());
	let err = Compiler::new(&snap, 1).compile(&top, ValueKind::Void).unwrap_err();
	assert_eq!(
		err,
		CompileError::TooDeep {
			chain: "c0".into(),
			max: 1
		}
	);
}

#[test]
fn compile_is_deterministic() {
	let registry = OperationRegistry::new();
	register(&registry, "A", vec![
		method("x", ValueKind::Resource, ValueKind::Text),
		method("y", ValueKind::Document, ValueKind::Blob),
	]);
	register(&registry, "B", vec![
		method("x", ValueKind::Text, ValueKind::Text),
		method("y", ValueKind::Blob, ValueKind::Document),
	]);
	let snap = registry.snapshot();
	let chain = ChainDefinition::new("c").op("A").op("B");
	let compiler = Compiler::new(&snap, 16);

	let first = compiler.compile(&chain, ValueKind::Document).unwrap();
	let second = compiler.compile(&chain, ValueKind::Document).unwrap();
	assert_eq!(first.signature(), second.signature());
	assert_eq!(pairs(&first), vec![("A", "y"), ("B", "y")]);
}
