use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, TriageService};
use triage_storage::models::SimilarIncident;

#[derive(Clone, Debug, Deserialize)]
pub struct SimilarRequest {
	pub description: String,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimilarItem {
	pub incident_id: Uuid,
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
impl From<SimilarIncident> for SimilarItem {
	fn from(row: SimilarIncident) -> Self {
		Self {
			incident_id: row.id,
			title: row.title,
			description: row.description,
			location: row.location,
			incident_type: row.incident_type,
			priority: row.priority,
			status: row.status,
			department_id: row.department_id,
			department_name: row.department_name,
			similarity: row.similarity,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct SimilarResponse {
	pub items: Vec<SimilarItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AutoFillRequest {
	pub description: String,
}

/// Department of the single nearest resolved incident. All fields are empty when nothing
/// eligible clears the similarity floor.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AutoFillResponse {
	pub department_id: Option<Uuid>,
	pub department_name: Option<String>,
	pub confidence: f64,
	pub reference_incident_id: Option<Uuid>,
}

impl TriageService {
	pub async fn find_similar(&self, req: SimilarRequest) -> Result<SimilarResponse> {
		let routing = &self.cfg.routing;
		let limit = req.limit.unwrap_or(routing.similar_default_limit);

		if limit == 0 || limit > routing.similar_max_limit {
			return Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {}.", routing.similar_max_limit),
			});
		}

		let description = non_empty_description(&req.description)?;
		let query_vec = self.embed_query(description).await?;
		let rows = self
			.within_request(
				"similarity query",
				self.backends.index.query(&query_vec, limit, routing.min_similarity),
			)
			.await?;

		Ok(SimilarResponse { items: rows.into_iter().map(SimilarItem::from).collect() })
	}

	pub async fn auto_fill(&self, req: AutoFillRequest) -> Result<AutoFillResponse> {
		let description = non_empty_description(&req.description)?;
		let query_vec = self.embed_query(description).await?;
		let rows = self
			.within_request(
				"similarity query",
				self.backends.index.query(&query_vec, 1, self.cfg.routing.min_similarity),
			)
			.await?;
		let Some(best) = rows.into_iter().next() else {
			return Ok(AutoFillResponse::default());
		};

		Ok(AutoFillResponse {
			department_id: Some(best.department_id),
			department_name: Some(best.department_name),
			confidence: best.similarity,
			reference_incident_id: Some(best.id),
		})
	}
}

fn non_empty_description(description: &str) -> Result<&str> {
	let trimmed = description.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: "description must be non-empty.".to_string() });
	}

	Ok(trimmed)
}
