#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use opchain_engine::{Engine, EngineConfig, builtins};
use opchain_registry::{Call, InvokableMethod, OperationDescriptor, OperationRegistry, adapter};
use opchain_types::{Blob, DocRef, Document, OperationContext, ParamSpec, Session, SessionProvider, Value, ValueKind};

/// Session calls observed across every session a provider opened.
#[derive(Debug, Default)]
pub struct Journal {
	pub opened: AtomicUsize,
	pub saves: AtomicUsize,
	pub rollbacks: AtomicUsize,
}

impl Journal {
	pub fn saves(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn rollbacks(&self) -> usize {
		self.rollbacks.load(Ordering::SeqCst)
	}

	pub fn opened(&self) -> usize {
		self.opened.load(Ordering::SeqCst)
	}
}

struct JournalSession(Arc<Journal>);

impl Session for JournalSession {
	fn save(&mut self) -> anyhow::Result<()> {
		self.0.saves.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn set_rollback_only(&mut self) {
		self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
	}

	fn resolve(&mut self, doc: &DocRef) -> anyhow::Result<Document> {
		match doc {
			DocRef::Id(id) => Ok(document(id)),
			DocRef::Path(path) => anyhow::bail!("no document at {path}"),
		}
	}
}

pub struct JournalProvider(pub Arc<Journal>);

impl SessionProvider for JournalProvider {
	fn open(&self) -> anyhow::Result<Box<dyn Session>> {
		self.0.opened.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(JournalSession(Arc::clone(&self.0))))
	}
}

pub fn document(id: &str) -> Document {
	Document::new(id, format!("/default-domain/{id}"), "File").with_title(id)
}

pub fn context(journal: &Arc<Journal>) -> OperationContext {
	OperationContext::new().with_session_provider(Arc::new(JournalProvider(Arc::clone(journal))))
}

pub fn method(name: &str, consumes: ValueKind, produces: ValueKind) -> InvokableMethod {
	InvokableMethod::new(name, consumes, produces, |call: Call<'_>| Ok(call.input))
}

pub fn register(registry: &OperationRegistry, id: &str, methods: Vec<InvokableMethod>) {
	let builder = methods
		.into_iter()
		.fold(OperationDescriptor::builder(id), |b, m| b.method(m));
	registry.register(builder.build().unwrap(), false).unwrap();
}

/// Registry with builtins and a small document-management vocabulary.
pub fn registry() -> Arc<OperationRegistry> {
	let registry = Arc::new(OperationRegistry::new());
	builtins::register_builtins(&registry).unwrap();

	let fetch = OperationDescriptor::builder("Document.Fetch")
		.category("Document")
		.method(InvokableMethod::new("resolve", ValueKind::DocRef, ValueKind::Document, |call: Call<'_>| {
			let Value::DocRef(doc) = call.input else {
				return Err(anyhow::anyhow!("expected a document reference").into());
			};
			Ok(Value::Document(call.ctx.session()?.resolve(&doc)?))
		}))
		.build()
		.unwrap();
	registry.register(fetch, false).unwrap();

	let update = OperationDescriptor::builder("Document.Update")
		.alias("Document.SetProperty")
		.category("Document")
		.param(ParamSpec::required("key", ValueKind::Text))
		.param(ParamSpec::required("value", ValueKind::Text))
		.method(
			InvokableMethod::new("update", ValueKind::Document, ValueKind::Document, |call: Call<'_>| {
				let Value::Document(doc) = call.input else {
					return Err(anyhow::anyhow!("expected a document").into());
				};
				let key = call.params.get_str("key").unwrap_or_default();
				let value = call.params.get_str("value").unwrap_or_default();
				Ok(Value::Document(doc.with_property(key, value)))
			})
			.iterable(),
		)
		.build()
		.unwrap();
	registry.register(update, false).unwrap();

	let to_blob = OperationDescriptor::builder("Document.ToBlob")
		.category("Blob")
		.method(InvokableMethod::new("export", ValueKind::Document, ValueKind::Blob, |call: Call<'_>| {
			let doc = call.input.into_document().unwrap_or_else(|| document("?"));
			Ok(Value::Blob(Blob::text(format!("{}.txt", doc.id), doc.title)))
		}))
		.build()
		.unwrap();
	registry.register(to_blob, false).unwrap();

	registry.put_adapter(
		ValueKind::Text,
		ValueKind::DocRef,
		adapter(|_ctx, value| match value {
			Value::Text(id) => Ok(Value::DocRef(DocRef::Id(id))),
			other => anyhow::bail!("cannot reference {}", other.kind()),
		}),
	);
	registry
}

pub fn engine() -> Engine {
	Engine::new(registry(), EngineConfig::default())
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
