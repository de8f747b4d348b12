use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A resolved incident returned by a similarity query, with its similarity to the query
/// vector mapped onto `[0, 1]`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimilarIncident {
	pub id: Uuid,
	pub title: Option<String>,
	pub description: Option<String>,
	pub location: Option<String>,
	pub incident_type: Option<String>,
	pub priority: Option<String>,
	pub status: Option<String>,
	pub department_id: Uuid,
	pub department_name: String,
	pub similarity: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnvectorizedIncident {
	pub id: Uuid,
	pub description: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IncidentSnapshot {
	pub id: Uuid,
	pub description: Option<String>,
	pub assigned_department_id: Option<Uuid>,
	pub status: Option<String>,
	pub has_embedding: bool,
}

#[derive(Debug, Clone)]
pub struct VectorWrite {
	pub incident_id: Uuid,
	pub vec: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStats {
	pub total: i64,
	pub with_embedding: i64,
	pub without_embedding: i64,
	pub percentage: f64,
}
impl EmbeddingStats {
	pub fn new(total: i64, with_embedding: i64) -> Self {
		let percentage =
			if total > 0 { with_embedding as f64 / total as f64 * 100.0 } else { 0.0 };

		Self { total, with_embedding, without_embedding: total - with_embedding, percentage }
	}
}

/// The persisted `rag_auto_assign` settings document. Missing keys fall back to
/// configured defaults when read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSettings {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub threshold: Option<f64>,
	#[serde(default)]
	pub min_samples: Option<u32>,
}
