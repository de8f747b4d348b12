use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, TriageService, within};
use triage_storage::{
	models::{UnvectorizedIncident, VectorWrite},
	vector,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BacklogReport {
	pub processed: u64,
	pub failed: u64,
	pub elapsed_seconds: f64,
	pub records_per_second: f64,
}
impl BacklogReport {
	fn finish(processed: u64, failed: u64, started: Instant) -> Self {
		let elapsed_seconds = started.elapsed().as_secs_f64();
		let records_per_second =
			if elapsed_seconds > 0.0 { processed as f64 / elapsed_seconds } else { 0.0 };

		Self { processed, failed, elapsed_seconds, records_per_second }
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct IndexIncidentResponse {
	pub incident_id: Uuid,
	pub department_id: Uuid,
	/// The incident already had a vector, which was replaced.
	pub replaced: bool,
}

impl TriageService {
	/// Vectorizes resolved incidents that still lack a vector, one claimed page at a time.
	///
	/// Work is re-derived from persisted state on every run, so a second run with no new
	/// incidents processes nothing. A page whose embedding or write fails is counted as
	/// failed, its claims are released, and the run moves on.
	pub async fn process_embedding_backlog(
		&self,
		batch_size: u32,
		max_records: Option<u64>,
	) -> Result<BacklogReport> {
		let cfg = &self.cfg.backlog;

		if batch_size == 0 || batch_size > cfg.max_batch_size {
			return Err(Error::InvalidRequest {
				message: format!("batch_size must be between 1 and {}.", cfg.max_batch_size),
			});
		}
		if max_records == Some(0) {
			return Err(Error::InvalidRequest {
				message: "max_records must be greater than zero.".to_string(),
			});
		}

		let started = Instant::now();
		let backlog = within(
			cfg.batch_timeout_ms,
			"backlog count",
			self.backends.records.count_unvectorized(cfg.min_description_chars),
		)
		.await?;
		let target = max_records.map_or(backlog, |max| backlog.min(max));

		if target == 0 {
			tracing::debug!("Embedding backlog is empty.");

			return Ok(BacklogReport::finish(0, 0, started));
		}

		tracing::info!(backlog, target, batch_size, "Processing embedding backlog.");

		let mut processed = 0_u64;
		let mut failed = 0_u64;
		let mut seen = 0_u64;
		let mut unfinished: Vec<Uuid> = Vec::new();

		while seen < target {
			let limit = (target - seen).min(u64::from(batch_size)) as u32;
			let claimed = within(
				cfg.batch_timeout_ms,
				"backlog claim",
				self.backends.records.claim_unvectorized(
					limit,
					cfg.min_description_chars,
					OffsetDateTime::now_utc(),
					cfg.claim_lease_seconds,
				),
			)
			.await;
			let page = match claimed {
				Ok(page) => page,
				Err(err) => {
					self.release_unfinished(&unfinished).await;

					return Err(err);
				},
			};

			if page.is_empty() {
				break;
			}

			seen += page.len() as u64;

			match self.vectorize_page(&page).await {
				Ok(written) => {
					let missing = page.len() as u64 - written.min(page.len() as u64);

					processed += written;
					failed += missing;

					if missing > 0 {
						unfinished.extend(page.iter().map(|row| row.id));
					}
				},
				Err(err) => {
					tracing::warn!(error = %err, page_size = page.len(), "Embedding page failed.");

					failed += page.len() as u64;
					unfinished.extend(page.iter().map(|row| row.id));
				},
			}
		}

		self.release_unfinished(&unfinished).await;

		let report = BacklogReport::finish(processed, failed, started);

		tracing::info!(
			processed = report.processed,
			failed = report.failed,
			elapsed_seconds = report.elapsed_seconds,
			"Embedding backlog run finished."
		);

		Ok(report)
	}

	/// Computes and stores the vector of one resolved incident.
	pub async fn index_incident(&self, incident_id: Uuid) -> Result<IndexIncidentResponse> {
		let Some(incident) = self
			.within_request("incident fetch", self.backends.records.fetch_incident(incident_id))
			.await?
		else {
			return Err(Error::NotFound { message: format!("Incident {incident_id} not found.") });
		};
		let Some(description) =
			incident.description.as_deref().map(str::trim).filter(|text| !text.is_empty())
		else {
			return Err(Error::InvalidRequest {
				message: "Incident has no description.".to_string(),
			});
		};
		let Some(department_id) = incident.assigned_department_id else {
			return Err(Error::InvalidRequest {
				message: "Incident has no assigned department.".to_string(),
			});
		};
		let cfg = &self.cfg.providers.embedding;
		let texts = [description.to_string()];
		let vectors =
			self.within_request("incident embedding", self.backends.embedding.embed(cfg, &texts)).await?;
		let vec = match vectors.as_slice() {
			[vec] if vector::is_writable(vec, self.cfg.storage.vector_dim) => vec,
			_ => {
				return Err(Error::Provider {
					message: "Embedding provider returned an unusable vector.".to_string(),
				});
			},
		};

		self.within_request("incident write", self.backends.index.upsert_vector(incident_id, vec))
			.await?;

		tracing::info!(%incident_id, %department_id, "Indexed resolved incident.");

		Ok(IndexIncidentResponse { incident_id, department_id, replaced: incident.has_embedding })
	}

	/// Hands claims back so the next run can retry them. A failed release only delays the retry
	/// until the lease expires.
	async fn release_unfinished(&self, ids: &[Uuid]) {
		if ids.is_empty() {
			return;
		}

		let released = within(
			self.cfg.backlog.batch_timeout_ms,
			"claim release",
			self.backends.records.release_claims(ids),
		)
		.await;

		if let Err(err) = released {
			tracing::warn!(error = %err, count = ids.len(), "Failed to release claims.");
		}
	}

	/// Embeds a page in one provider call and writes it in one batch. Returns the number of
	/// vectors written.
	async fn vectorize_page(&self, page: &[UnvectorizedIncident]) -> Result<u64> {
		let timeout_ms = self.cfg.backlog.batch_timeout_ms;
		let texts: Vec<String> = page.iter().map(|row| row.description.clone()).collect();
		let vectors = within(
			timeout_ms,
			"backlog embedding",
			self.backends.embedding.embed(&self.cfg.providers.embedding, &texts),
		)
		.await?;

		if vectors.len() != page.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} records.",
					vectors.len(),
					page.len()
				),
			});
		}

		let rows: Vec<VectorWrite> = page
			.iter()
			.zip(vectors)
			.filter(|(_, vec)| vector::is_writable(vec, self.cfg.storage.vector_dim))
			.map(|(row, vec)| VectorWrite { incident_id: row.id, vec })
			.collect();

		within(timeout_ms, "backlog write", self.backends.index.upsert_vectors_batch(&rows)).await
	}
}
