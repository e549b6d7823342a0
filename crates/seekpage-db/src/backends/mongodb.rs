//! MongoDB collection backend
//!
//! # Example
//!
//! ```rust,no_run
//! use seekpage_db::backends::mongodb::MongoCollection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let users = MongoCollection::builder()
//!     .url("mongodb://localhost:27017")
//!     .database("app")
//!     .collection("users")
//!     .max_pool_size(20)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::stream::TryStreamExt;
use mongodb::Client;
use std::time::Duration;

use seekpage_core::exception::{DriverError, DriverResult};

use crate::collection::{Collection, FindOptions, TextSearchOptions};

/// Map a driver error onto the backend error taxonomy
fn driver_error(err: mongodb::error::Error) -> DriverError {
	use mongodb::error::ErrorKind;

	match *err.kind {
		ErrorKind::Authentication { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
			DriverError::Connection(err.to_string())
		}
		ErrorKind::ServerSelection { .. } => DriverError::Timeout(err.to_string()),
		ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
			DriverError::Serialization(err.to_string())
		}
		ErrorKind::Shutdown => DriverError::Cancelled(err.to_string()),
		_ => DriverError::Execution(err.to_string()),
	}
}

/// Builder for [`MongoCollection`]
#[derive(Debug, Clone)]
pub struct MongoCollectionBuilder {
	url: String,
	database: String,
	collection: String,
	max_pool_size: Option<u32>,
	min_pool_size: Option<u32>,
	max_idle_time_secs: Option<u64>,
	server_selection_timeout_secs: Option<u64>,
}

impl Default for MongoCollectionBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl MongoCollectionBuilder {
	/// Create a builder targeting `mongodb://localhost:27017`, database `test`
	pub fn new() -> Self {
		Self {
			url: "mongodb://localhost:27017".to_string(),
			database: "test".to_string(),
			collection: String::new(),
			max_pool_size: None,
			min_pool_size: None,
			max_idle_time_secs: None,
			server_selection_timeout_secs: None,
		}
	}

	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	pub fn database(mut self, database: impl Into<String>) -> Self {
		self.database = database.into();
		self
	}

	pub fn collection(mut self, collection: impl Into<String>) -> Self {
		self.collection = collection.into();
		self
	}

	pub fn max_pool_size(mut self, size: u32) -> Self {
		self.max_pool_size = Some(size);
		self
	}

	pub fn min_pool_size(mut self, size: u32) -> Self {
		self.min_pool_size = Some(size);
		self
	}

	/// Set the maximum idle time for pooled connections in seconds
	pub fn max_idle_time_secs(mut self, secs: u64) -> Self {
		self.max_idle_time_secs = Some(secs);
		self
	}

	/// Fail operations that cannot reach a server within `secs`
	pub fn server_selection_timeout_secs(mut self, secs: u64) -> Self {
		self.server_selection_timeout_secs = Some(secs);
		self
	}

	/// Connect and bind the configured collection
	pub async fn build(self) -> DriverResult<MongoCollection> {
		use mongodb::options::ClientOptions;

		if self.collection.is_empty() {
			return Err(DriverError::Connection("collection name is required".to_string()));
		}

		let mut options = ClientOptions::parse(&self.url)
			.await
			.map_err(|e| DriverError::Connection(e.to_string()))?;

		if let Some(max_size) = self.max_pool_size {
			options.max_pool_size = Some(max_size);
		}
		if let Some(min_size) = self.min_pool_size {
			options.min_pool_size = Some(min_size);
		}
		if let Some(idle_time) = self.max_idle_time_secs {
			options.max_idle_time = Some(Duration::from_secs(idle_time));
		}
		if let Some(timeout) = self.server_selection_timeout_secs {
			options.server_selection_timeout = Some(Duration::from_secs(timeout));
		}

		let client = Client::with_options(options).map_err(|e| DriverError::Connection(e.to_string()))?;
		let collection = client
			.database(&self.database)
			.collection::<Document>(&self.collection);

		tracing::debug!(
			database = %self.database,
			collection = %self.collection,
			"bound MongoDB collection"
		);

		Ok(MongoCollection::new(collection))
	}
}

/// [`Collection`] over a MongoDB collection
///
/// Text search requires a text index on the collection.
#[derive(Clone)]
pub struct MongoCollection {
	inner: mongodb::Collection<Document>,
	name: String,
}

impl MongoCollection {
	/// Wrap an existing driver collection handle
	pub fn new(inner: mongodb::Collection<Document>) -> Self {
		let name = inner.name().to_string();
		Self { inner, name }
	}

	/// Connect with default pool settings
	pub async fn connect(url: &str, database: &str, collection: &str) -> DriverResult<Self> {
		MongoCollectionBuilder::new()
			.url(url)
			.database(database)
			.collection(collection)
			.build()
			.await
	}

	pub fn builder() -> MongoCollectionBuilder {
		MongoCollectionBuilder::new()
	}

	/// The underlying driver handle
	pub fn inner(&self) -> &mongodb::Collection<Document> {
		&self.inner
	}
}

/// Build the scored text-search pipeline.
///
/// `$text` must open the pipeline, so the caller's filter is matched after
/// the score has been materialized.
fn text_search_pipeline(query: &str, filter: Document, options: TextSearchOptions) -> Vec<Document> {
	let mut pipeline = vec![
		doc! { "$match": { "$text": { "$search": query } } },
		doc! { "$addFields": { options.score_field.as_str(): { "$meta": "textScore" } } },
	];
	if !filter.is_empty() {
		pipeline.push(doc! { "$match": filter });
	}
	if !options.sort.is_empty() {
		pipeline.push(doc! { "$sort": options.sort });
	}
	if let Some(limit) = options.limit {
		pipeline.push(doc! { "$limit": limit });
	}
	if let Some(projection) = options.projection {
		pipeline.push(doc! { "$project": projection });
	}
	pipeline
}

fn text_count_filter(query: &str, filter: Document) -> Document {
	let text = doc! { "$text": { "$search": query } };
	if filter.is_empty() {
		text
	} else {
		doc! { "$and": [text, filter] }
	}
}

#[async_trait]
impl Collection for MongoCollection {
	fn name(&self) -> &str {
		&self.name
	}

	async fn find_many(&self, filter: Document, options: FindOptions) -> DriverResult<Vec<Document>> {
		let mut mongo_options = mongodb::options::FindOptions::default();
		mongo_options.limit = options.limit;
		if !options.sort.is_empty() {
			mongo_options.sort = Some(options.sort);
		}
		mongo_options.projection = options.projection;

		let cursor = self
			.inner
			.find(filter)
			.with_options(mongo_options)
			.await
			.map_err(driver_error)?;

		cursor.try_collect().await.map_err(driver_error)
	}

	async fn count(&self, filter: Document) -> DriverResult<u64> {
		self.inner.count_documents(filter).await.map_err(driver_error)
	}

	async fn aggregate(&self, pipeline: Vec<Document>) -> DriverResult<Vec<Document>> {
		let cursor = self.inner.aggregate(pipeline).await.map_err(driver_error)?;
		cursor.try_collect().await.map_err(driver_error)
	}

	async fn text_search(
		&self,
		query: &str,
		filter: Document,
		options: TextSearchOptions,
	) -> DriverResult<Vec<(Document, Bson)>> {
		let score_field = options.score_field.clone();
		let docs = self.aggregate(text_search_pipeline(query, filter, options)).await?;
		Ok(docs
			.into_iter()
			.map(|doc| {
				let score = doc.get(&score_field).cloned().unwrap_or(Bson::Null);
				(doc, score)
			})
			.collect())
	}

	async fn count_text_matches(&self, query: &str, filter: Document) -> DriverResult<u64> {
		self.count(text_count_filter(query, filter)).await
	}
}
