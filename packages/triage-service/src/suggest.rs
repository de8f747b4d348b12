use std::{collections::BTreeMap, time::Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, TriageService};
use triage_domain::{
	aggregation::{self, DepartmentAggregate, Vote},
	auto_assign::{self, AutoAssignDecision},
	scoring::{FieldPresence, IncidentFields, SubScores, Weights},
	validation::{self, Rejection},
};
use triage_storage::models::SimilarIncident;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SuggestRequest {
	pub description: String,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub incident_type: Option<String>,
	#[serde(default)]
	pub priority: Option<String>,
	/// Attach the diagnostics block to the response.
	#[serde(default)]
	pub explain: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestOutcome {
	Suggested,
	NoMatch,
	Rejected,
}

#[derive(Clone, Debug, Serialize)]
pub struct DepartmentSuggestion {
	pub department_id: String,
	pub department_name: String,
	pub confidence: f64,
	pub vote_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CandidateSummary {
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
	pub composite_score: f64,
	pub sub_scores: SubScores,
}

#[derive(Clone, Debug, Serialize)]
pub struct SuggestDiagnostics {
	pub presence: FieldPresence,
	pub weights: Weights,
	pub min_similarity: f64,
	pub retrieved: usize,
	pub after_floor: usize,
	pub top_k: usize,
	pub elapsed_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SuggestResponse {
	pub outcome: SuggestOutcome,
	pub suggestion: Option<DepartmentSuggestion>,
	pub validation_error: Option<Rejection>,
	pub similar_incidents: Vec<CandidateSummary>,
	pub department_scores: BTreeMap<String, DepartmentAggregate>,
	pub auto_assign: Option<AutoAssignDecision>,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub diagnostics: Option<SuggestDiagnostics>,
}
impl SuggestResponse {
	fn rejected(rejection: Rejection) -> Self {
		Self {
			outcome: SuggestOutcome::Rejected,
			suggestion: None,
			message: format!("Description rejected: {}.", rejection.detail),
			validation_error: Some(rejection),
			similar_incidents: Vec::new(),
			department_scores: BTreeMap::new(),
			auto_assign: None,
			diagnostics: None,
		}
	}
}

impl TriageService {
	/// Routes one incident description to the department most likely to resolve it.
	///
	/// Degenerate input is rejected before any provider or index call. An empty candidate
	/// set after the similarity floor is a `NoMatch` outcome, not an error.
	pub async fn suggest(&self, req: SuggestRequest) -> Result<SuggestResponse> {
		let started = Instant::now();
		let routing = &self.cfg.routing;

		if let Err(rejection) = validation::validate(&req.description, &routing.validation) {
			tracing::debug!(code = rejection.code.as_str(), "Suggest input rejected.");

			return Ok(SuggestResponse::rejected(rejection));
		}

		let query_vec = self.embed_query(&req.description).await?;
		let retrieved = self
			.within_request(
				"similarity query",
				self.backends.index.query(&query_vec, routing.retrieval_limit, routing.min_similarity),
			)
			.await?;
		let query_fields = IncidentFields::new(
			req.location.as_deref(),
			req.incident_type.as_deref(),
			req.priority.as_deref(),
		);
		let presence = query_fields.presence();
		let weights = Weights::for_presence(presence);
		let retrieved_count = retrieved.len();
		let mut scored: Vec<CandidateSummary> =
			retrieved.into_iter().map(|row| score_candidate(&query_fields, &weights, row)).collect();

		scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

		let top_k = routing.top_k_mean as usize;
		let examples = routing.suggestion_examples as usize;
		let (kept, dropped): (Vec<_>, Vec<_>) =
			scored.into_iter().partition(|candidate| candidate.similarity >= routing.min_similarity);
		let diagnostics = req.explain.then(|| SuggestDiagnostics {
			presence,
			weights,
			min_similarity: routing.min_similarity,
			retrieved: retrieved_count,
			after_floor: kept.len(),
			top_k,
			elapsed_ms: 0.0,
		});

		if kept.is_empty() {
			tracing::info!(retrieved = retrieved_count, "No candidate passed the similarity floor.");

			return Ok(SuggestResponse {
				outcome: SuggestOutcome::NoMatch,
				suggestion: None,
				validation_error: None,
				similar_incidents: dropped.into_iter().take(examples).collect(),
				department_scores: BTreeMap::new(),
				auto_assign: None,
				message: "No sufficiently similar resolved incidents were found.".to_string(),
				diagnostics: with_elapsed(diagnostics, started),
			});
		}

		let department_keys: Vec<String> =
			kept.iter().map(|candidate| candidate.department_id.to_string()).collect();
		let department_scores = aggregation::aggregate(
			kept.iter().zip(&department_keys).map(|(candidate, key)| Vote {
				department_id: key.as_str(),
				department_name: candidate.department_name.as_str(),
				score: candidate.composite_score,
			}),
			top_k,
		);
		let suggestion = aggregation::winner(&department_scores).map(|best| DepartmentSuggestion {
			department_id: best.department_id.clone(),
			department_name: best.department_name.clone(),
			confidence: best.score,
			vote_count: best.vote_count,
		});
		let Some(suggestion) = suggestion else {
			return Ok(SuggestResponse {
				outcome: SuggestOutcome::NoMatch,
				suggestion: None,
				validation_error: None,
				similar_incidents: Vec::new(),
				department_scores,
				auto_assign: None,
				message: "No sufficiently similar resolved incidents were found.".to_string(),
				diagnostics: with_elapsed(diagnostics, started),
			});
		};
		let settings = self.effective_settings().await?;
		let current_samples = self.current_sample_count().await?;
		let decision = auto_assign::decide(suggestion.confidence, &settings, current_samples);
		let message = if decision.auto_assign {
			format!(
				"Auto-assigned to {} ({:.1}% confidence).",
				suggestion.department_name,
				suggestion.confidence * 100.0
			)
		} else {
			format!(
				"Suggested department {} ({:.1}% confidence from {} similar incidents).",
				suggestion.department_name,
				suggestion.confidence * 100.0,
				suggestion.vote_count
			)
		};

		tracing::info!(
			department_id = %suggestion.department_id,
			confidence = suggestion.confidence,
			votes = suggestion.vote_count,
			auto_assign = decision.auto_assign,
			"Routing suggestion computed."
		);

		Ok(SuggestResponse {
			outcome: SuggestOutcome::Suggested,
			suggestion: Some(suggestion),
			validation_error: None,
			similar_incidents: kept.into_iter().take(examples).collect(),
			department_scores,
			auto_assign: Some(decision),
			message,
			diagnostics: with_elapsed(diagnostics, started),
		})
	}
}

fn score_candidate(
	query: &IncidentFields<'_>,
	weights: &Weights,
	row: SimilarIncident,
) -> CandidateSummary {
	let candidate = IncidentFields::new(
		row.location.as_deref(),
		row.incident_type.as_deref(),
		row.priority.as_deref(),
	);
	let sub_scores = triage_domain::scoring::score_fields(query, &candidate, row.similarity);
	let composite_score = weights.composite(&sub_scores);

	CandidateSummary {
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
		composite_score,
		sub_scores,
	}
}

fn with_elapsed(
	diagnostics: Option<SuggestDiagnostics>,
	started: Instant,
) -> Option<SuggestDiagnostics> {
	diagnostics.map(|mut diagnostics| {
		diagnostics.elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

		diagnostics
	})
}
