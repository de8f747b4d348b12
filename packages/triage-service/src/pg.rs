//! Production backends: Postgres with pgvector for every store and an OpenAI-compatible
//! HTTP endpoint for embeddings.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{BoxFuture, EmbeddingProvider, RecordSource, Result, SettingsStore, SimilarityIndex};
use triage_config::EmbeddingProviderConfig;
use triage_providers::embedding;
use triage_storage::{
	db::Db,
	incidents,
	models::{
		EmbeddingStats, IncidentSnapshot, SimilarIncident, StoredSettings, UnvectorizedIncident,
		VectorWrite,
	},
	settings,
};

pub struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

#[derive(Clone)]
pub struct PgBackend {
	db: Db,
}
impl PgBackend {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl SimilarityIndex for PgBackend {
	fn query<'a>(
		&'a self,
		vec: &'a [f32],
		limit: u32,
		min_similarity: f64,
	) -> BoxFuture<'a, Result<Vec<SimilarIncident>>> {
		Box::pin(async move {
			Ok(incidents::find_similar(&self.db, vec, limit, min_similarity).await?)
		})
	}

	fn upsert_vector<'a>(&'a self, incident_id: Uuid, vec: &'a [f32]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(incidents::save_embedding(&self.db.pool, incident_id, vec).await?) })
	}

	fn upsert_vectors_batch<'a>(&'a self, rows: &'a [VectorWrite]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(incidents::save_embeddings_batch(&self.db, rows).await?) })
	}
}

impl RecordSource for PgBackend {
	fn count_unvectorized(&self, min_chars: u32) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(incidents::count_unvectorized(&self.db, min_chars).await?) })
	}

	fn claim_unvectorized(
		&self,
		limit: u32,
		min_chars: u32,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'_, Result<Vec<UnvectorizedIncident>>> {
		Box::pin(async move {
			let stale_before = now - Duration::seconds(lease_seconds);

			Ok(incidents::claim_unvectorized(&self.db, limit, min_chars, now, stale_before).await?)
		})
	}

	fn release_claims<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			incidents::release_claims(&self.db, ids).await?;

			Ok(())
		})
	}

	fn fetch_incident(&self, incident_id: Uuid) -> BoxFuture<'_, Result<Option<IncidentSnapshot>>> {
		Box::pin(async move { Ok(incidents::fetch_incident(&self.db, incident_id).await?) })
	}

	fn embedding_stats(&self) -> BoxFuture<'_, Result<EmbeddingStats>> {
		Box::pin(async move { Ok(incidents::embedding_stats(&self.db).await?) })
	}
}

impl SettingsStore for PgBackend {
	fn read(&self) -> BoxFuture<'_, Result<Option<StoredSettings>>> {
		Box::pin(async move { Ok(settings::read_settings(&self.db).await?) })
	}

	fn write<'a>(&'a self, stored: &'a StoredSettings) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(settings::write_settings(&self.db, stored).await?) })
	}

	fn current_sample_count(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move { Ok(incidents::count_eligible(&self.db).await?) })
	}
}
