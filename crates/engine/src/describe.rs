//! Documentation records derived from operation descriptors.

use opchain_registry::{ChainDefinition, OperationDescriptor, RegistrySnapshot};
use opchain_types::{ParamSpec, Value, ValueKind};
use serde::Serialize;

use crate::compile::Compiler;

/// One accepted `(input, output)` kind pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
	pub input: ValueKind,
	pub output: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDoc {
	pub name: String,
	pub kind: ValueKind,
	pub required: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default: Option<String>,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub description: String,
}

/// Stable documentation record of an operation or chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDoc {
	pub id: String,
	pub label: String,
	pub category: String,
	pub description: String,
	pub aliases: Vec<String>,
	pub params: Vec<ParamDoc>,
	pub signature: Vec<Signature>,
}

pub(crate) fn describe(snapshot: &RegistrySnapshot, desc: &OperationDescriptor, max_nesting: usize) -> OperationDoc {
	OperationDoc {
		id: desc.id.to_string(),
		label: desc.label.to_string(),
		category: desc.category.to_string(),
		description: desc.description.to_string(),
		aliases: desc.aliases.iter().map(ToString::to_string).collect(),
		params: desc.params.iter().map(param_doc).collect(),
		signature: signature(snapshot, desc, max_nesting),
	}
}

fn param_doc(spec: &ParamSpec) -> ParamDoc {
	ParamDoc {
		name: spec.name.to_string(),
		kind: spec.kind,
		required: spec.required,
		default: spec.default.as_ref().map(render),
		description: spec.description.to_string(),
	}
}

fn render(value: &Value) -> String {
	match value {
		Value::Text(s) => s.clone(),
		Value::Integer(v) => v.to_string(),
		Value::Float(v) => v.to_string(),
		Value::Boolean(v) => v.to_string(),
		Value::Date(v) => v.to_rfc3339(),
		Value::DocRef(r) => r.to_string(),
		other => other.kind().to_string(),
	}
}

/// Method signatures in registration order, or, for chains, every entry kind
/// the chain compiles from together with the resulting output kind.
fn signature(snapshot: &RegistrySnapshot, desc: &OperationDescriptor, max_nesting: usize) -> Vec<Signature> {
	let Some(chain) = desc.chain() else {
		let mut out = Vec::new();
		for method in desc.methods() {
			push_unique(
				&mut out,
				Signature {
					input: method.input_kind(),
					output: method.output_kind(),
				},
			);
		}
		return out;
	};

	let compiler = Compiler::new(snapshot, max_nesting);
	entry_kinds(snapshot, chain, max_nesting)
		.into_iter()
		.filter_map(|input| {
			compiler
				.compile(chain, input)
				.ok()
				.map(|path| Signature { input, output: path.output })
		})
		.collect()
}

/// Kinds consumed by the first step, looking through nested chains.
fn entry_kinds(snapshot: &RegistrySnapshot, chain: &ChainDefinition, budget: usize) -> Vec<ValueKind> {
	let Some(desc) = chain.steps.first().and_then(|step| snapshot.get(step.operation_id.as_str())) else {
		return Vec::new();
	};
	match desc.chain() {
		Some(nested) if budget > 0 => entry_kinds(snapshot, nested, budget - 1),
		Some(_) => Vec::new(),
		None => {
			let mut kinds = Vec::new();
			for method in desc.methods() {
				push_unique(&mut kinds, method.input_kind());
			}
			kinds
		}
	}
}

fn push_unique<T: PartialEq>(out: &mut Vec<T>, item: T) {
	if !out.contains(&item) {
		out.push(item);
	}
}
