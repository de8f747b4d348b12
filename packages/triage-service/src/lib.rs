pub mod backlog;
pub mod pg;
pub mod settings;
pub mod similar;
pub mod suggest;

mod error;

pub use backlog::{BacklogReport, IndexIncidentResponse};
pub use error::{Error, Result};
pub use settings::{RoutingSettingsView, UpdateRoutingSettingsRequest};
pub use similar::{AutoFillRequest, AutoFillResponse, SimilarItem, SimilarRequest, SimilarResponse};
pub use suggest::{
	CandidateSummary, DepartmentSuggestion, SuggestDiagnostics, SuggestOutcome, SuggestRequest,
	SuggestResponse,
};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use time::OffsetDateTime;
use uuid::Uuid;

use triage_config::{Config, EmbeddingProviderConfig};
use triage_storage::{
	db::Db,
	models::{
		EmbeddingStats, IncidentSnapshot, SimilarIncident, StoredSettings, UnvectorizedIncident,
		VectorWrite,
	},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text to vector. Vectors must be unit-normalized and have the configured dimension.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbor lookup over resolved incidents.
///
/// `query` only returns incidents with both a vector and a department, ordered by
/// similarity in `[0, 1]` descending.
pub trait SimilarityIndex
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		vec: &'a [f32],
		limit: u32,
		min_similarity: f64,
	) -> BoxFuture<'a, Result<Vec<SimilarIncident>>>;

	fn upsert_vector<'a>(&'a self, incident_id: Uuid, vec: &'a [f32]) -> BoxFuture<'a, Result<()>>;

	/// Returns the number of vectors written. Incidents that already have a vector are skipped.
	fn upsert_vectors_batch<'a>(&'a self, rows: &'a [VectorWrite]) -> BoxFuture<'a, Result<u64>>;
}

/// Source of incidents that still need a vector.
pub trait RecordSource
where
	Self: Send + Sync,
{
	fn count_unvectorized(&self, min_chars: u32) -> BoxFuture<'_, Result<u64>>;

	/// Claims up to `limit` unvectorized incidents in one atomic step. Claims older than
	/// `lease_seconds` are considered abandoned and can be taken again.
	fn claim_unvectorized(
		&self,
		limit: u32,
		min_chars: u32,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'_, Result<Vec<UnvectorizedIncident>>>;

	fn release_claims<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<()>>;

	fn fetch_incident(&self, incident_id: Uuid) -> BoxFuture<'_, Result<Option<IncidentSnapshot>>>;

	fn embedding_stats(&self) -> BoxFuture<'_, Result<EmbeddingStats>>;
}

pub trait SettingsStore
where
	Self: Send + Sync,
{
	fn read(&self) -> BoxFuture<'_, Result<Option<StoredSettings>>>;

	fn write<'a>(&'a self, settings: &'a StoredSettings) -> BoxFuture<'a, Result<()>>;

	/// Number of incidents currently eligible for retrieval.
	fn current_sample_count(&self) -> BoxFuture<'_, Result<u64>>;
}

#[derive(Clone)]
pub struct Backends {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub index: Arc<dyn SimilarityIndex>,
	pub records: Arc<dyn RecordSource>,
	pub settings: Arc<dyn SettingsStore>,
}
impl Backends {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn SimilarityIndex>,
		records: Arc<dyn RecordSource>,
		settings: Arc<dyn SettingsStore>,
	) -> Self {
		Self { embedding, index, records, settings }
	}

	/// Postgres for every store and the configured HTTP endpoint for embeddings.
	pub fn postgres(db: Db) -> Self {
		let store = Arc::new(pg::PgBackend::new(db));

		Self {
			embedding: Arc::new(pg::HttpEmbedding),
			index: store.clone(),
			records: store.clone(),
			settings: store,
		}
	}
}

pub struct TriageService {
	pub cfg: Config,
	pub backends: Backends,
}
impl TriageService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, backends: Backends::postgres(db) }
	}

	pub fn with_backends(cfg: Config, backends: Backends) -> Self {
		Self { cfg, backends }
	}

	pub async fn embedding_stats(&self) -> Result<EmbeddingStats> {
		self.within_request("embedding stats", self.backends.records.embedding_stats()).await
	}

	/// Embeds one routing query, applying the configured query prefix.
	pub(crate) async fn embed_query(&self, description: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let text = match cfg.query_prefix.as_deref() {
			Some(prefix) => format!("{prefix}{}", description.trim()),
			None => description.trim().to_string(),
		};
		let texts = [text];
		let mut vectors =
			self.within_request("query embedding", self.backends.embedding.embed(cfg, &texts)).await?;

		match vectors.pop() {
			Some(vec) if vectors.is_empty() => Ok(vec),
			_ => Err(Error::Provider {
				message: "Embedding provider must return exactly one vector for a query."
					.to_string(),
			}),
		}
	}

	pub(crate) async fn within_request<T, F>(&self, operation: &str, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		within(self.cfg.routing.request_timeout_ms, operation, fut).await
	}
}

/// Runs `fut` under a deadline of `timeout_ms`. An elapsed deadline drops the future and
/// surfaces as [`Error::Timeout`].
pub async fn within<T, F>(timeout_ms: u64, operation: &str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
		Ok(res) => res,
		Err(_) => Err(Error::Timeout { operation: operation.to_string(), timeout_ms }),
	}
}
