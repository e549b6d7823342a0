//! Shared fixtures for seekpage-db integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bson::{Bson, Document};
use std::sync::atomic::{AtomicUsize, Ordering};

use seekpage_core::exception::{DriverError, DriverResult};
use seekpage_db::backends::memory::MemoryCollection;
use seekpage_db::collection::{Collection, FindOptions, TextSearchOptions};

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Which collection calls fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
	None,
	/// Counting calls (`count`, `count_text_matches`, and aggregations ending in `$count`)
	Count,
	/// Page queries
	Page,
}

/// A memory collection that records calls and can inject driver failures
pub struct ProbeCollection {
	inner: MemoryCollection,
	fault: Fault,
	error: fn(String) -> DriverError,
	calls: AtomicUsize,
	pipelines: parking_lot::Mutex<Vec<Vec<Document>>>,
}

impl ProbeCollection {
	pub fn new(documents: Vec<Document>) -> Self {
		Self {
			inner: MemoryCollection::with_documents("probe", documents),
			fault: Fault::None,
			error: DriverError::Execution,
			calls: AtomicUsize::new(0),
			pipelines: parking_lot::Mutex::new(Vec::new()),
		}
	}

	pub fn failing(mut self, fault: Fault, error: fn(String) -> DriverError) -> Self {
		self.fault = fault;
		self.error = error;
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Every pipeline passed to `aggregate`, in call order
	pub fn pipelines(&self) -> Vec<Vec<Document>> {
		self.pipelines.lock().clone()
	}

	pub fn inner(&self) -> &MemoryCollection {
		&self.inner
	}

	fn enter(&self, kind: Fault, what: &str) -> DriverResult<()> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.fault == kind {
			Err((self.error)(format!("injected {what} failure")))
		} else {
			Ok(())
		}
	}
}

fn is_count_pipeline(pipeline: &[Document]) -> bool {
	pipeline.last().is_some_and(|stage| stage.contains_key("$count"))
}

#[async_trait]
impl Collection for ProbeCollection {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn find_many(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
		self.enter(Fault::Page, "find")?;
		self.inner.find_many(filter, options).await
	}

	async fn count(&self, filter: Document) -> DriverResult<u64> {
		self.enter(Fault::Count, "count")?;
		self.inner.count(filter).await
	}

	async fn aggregate(&self, pipeline: Vec<Document>) -> DriverResult<Vec<Document>> {
		self.pipelines.lock().push(pipeline.clone());
		let kind = if is_count_pipeline(&pipeline) { Fault::Count } else { Fault::Page };
		self.enter(kind, "aggregate")?;
		self.inner.aggregate(pipeline).await
	}

	async fn text_search(
		&self,
		query: &str,
		filter: Document,
		options: TextSearchOptions,
	) -> DriverResult<Vec<(Document, Bson)>> {
		self.enter(Fault::Page, "text search")?;
		self.inner.text_search(query, filter, options).await
	}

	async fn count_text_matches(&self, query: &str, filter: Document) -> DriverResult<u64> {
		self.enter(Fault::Count, "text count")?;
		self.inner.count_text_matches(query, filter).await
	}
}

/// `_id` values of a page's items
pub fn ids(items: &[Document]) -> Vec<i32> {
	items
		.iter()
		.filter_map(|doc| doc.get_i32("_id").ok())
		.collect()
}
