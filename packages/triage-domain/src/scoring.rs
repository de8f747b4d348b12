use std::collections::HashSet;

use serde::Serialize;

/// A-priori informativeness of each signal when every optional field is supplied.
pub const BASE_WEIGHTS: Weights =
	Weights { semantic: 0.60, location: 0.20, incident_type: 0.15, priority: 0.05 };
/// Pure semantic ranking, used when the caller supplied no structured context.
pub const SEMANTIC_ONLY: Weights =
	Weights { semantic: 1.0, location: 0.0, incident_type: 0.0, priority: 0.0 };

const LOCATION_CONTAINS_SCORE: f64 = 0.7;
const LOCATION_TOKEN_SCORE: f64 = 0.5;

/// Structured fields of an incident, on either the query or the candidate side.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncidentFields<'a> {
	pub location: Option<&'a str>,
	pub incident_type: Option<&'a str>,
	pub priority: Option<&'a str>,
}
impl<'a> IncidentFields<'a> {
	pub fn new(
		location: Option<&'a str>,
		incident_type: Option<&'a str>,
		priority: Option<&'a str>,
	) -> Self {
		Self {
			location: supplied(location),
			incident_type: supplied(incident_type),
			priority: priority.filter(|value| !value.trim().is_empty()),
		}
	}

	pub fn presence(&self) -> FieldPresence {
		FieldPresence {
			location: self.location.is_some(),
			incident_type: self.incident_type.is_some(),
			priority: self.priority.is_some(),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldPresence {
	pub location: bool,
	pub incident_type: bool,
	pub priority: bool,
}
impl FieldPresence {
	pub fn any(self) -> bool {
		self.location || self.incident_type || self.priority
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Weights {
	pub semantic: f64,
	pub location: f64,
	pub incident_type: f64,
	pub priority: f64,
}
impl Weights {
	/// Zeroes the weight of every absent field and rescales the survivors to sum to one.
	pub fn for_presence(presence: FieldPresence) -> Self {
		if !presence.any() {
			return SEMANTIC_ONLY;
		}

		let mut weights = BASE_WEIGHTS;

		if !presence.location {
			weights.location = 0.0;
		}
		if !presence.incident_type {
			weights.incident_type = 0.0;
		}
		if !presence.priority {
			weights.priority = 0.0;
		}

		let total = weights.total();

		Self {
			semantic: weights.semantic / total,
			location: weights.location / total,
			incident_type: weights.incident_type / total,
			priority: weights.priority / total,
		}
	}

	pub fn total(&self) -> f64 {
		self.semantic + self.location + self.incident_type + self.priority
	}

	pub fn composite(&self, scores: &SubScores) -> f64 {
		self.semantic * scores.semantic
			+ self.location * scores.location
			+ self.incident_type * scores.incident_type
			+ self.priority * scores.priority
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SubScores {
	pub semantic: f64,
	pub location: f64,
	pub incident_type: f64,
	pub priority: f64,
}

pub fn score_fields(
	query: &IncidentFields<'_>,
	candidate: &IncidentFields<'_>,
	semantic: f64,
) -> SubScores {
	SubScores {
		semantic,
		location: location_similarity(query.location, candidate.location),
		incident_type: type_similarity(query.incident_type, candidate.incident_type),
		priority: priority_similarity(query.priority, candidate.priority),
	}
}

pub fn location_similarity(left: Option<&str>, right: Option<&str>) -> f64 {
	let (Some(left), Some(right)) = (supplied(left), supplied(right)) else {
		return 0.0;
	};
	let left = left.to_lowercase();
	let right = right.to_lowercase();

	if left == right {
		return 1.0;
	}
	if left.contains(right.as_str()) || right.contains(left.as_str()) {
		return LOCATION_CONTAINS_SCORE;
	}

	let left_tokens: Vec<&str> = left.split_whitespace().collect();
	let right_tokens: Vec<&str> = right.split_whitespace().collect();
	let left_set: HashSet<&str> = left_tokens.iter().copied().collect();
	let right_set: HashSet<&str> = right_tokens.iter().copied().collect();
	let shared = left_set.intersection(&right_set).count();

	if shared == 0 {
		return 0.0;
	}

	LOCATION_TOKEN_SCORE * shared as f64 / left_tokens.len().max(right_tokens.len()) as f64
}

pub fn type_similarity(left: Option<&str>, right: Option<&str>) -> f64 {
	match (supplied(left), supplied(right)) {
		(Some(left), Some(right)) if left.to_lowercase() == right.to_lowercase() => 1.0,
		_ => 0.0,
	}
}

/// Priorities are labels from a fixed vocabulary and are compared verbatim.
pub fn priority_similarity(left: Option<&str>, right: Option<&str>) -> f64 {
	match (left, right) {
		(Some(left), Some(right)) if !left.trim().is_empty() && left == right => 1.0,
		_ => 0.0,
	}
}

fn supplied(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn location_scores_follow_match_strength() {
		assert_eq!(location_similarity(Some("Line 3"), Some("line 3 ")), 1.0);
		assert_eq!(location_similarity(Some("Line 3"), Some("Line 3 north bay")), 0.7);
		assert_eq!(location_similarity(Some("Line 3"), Some("Warehouse line")), 0.25);
		assert_eq!(location_similarity(Some("Line 3"), Some("Warehouse")), 0.0);
		assert_eq!(location_similarity(None, Some("Warehouse")), 0.0);
		assert_eq!(location_similarity(Some("  "), Some("Warehouse")), 0.0);
	}

	#[test]
	fn type_match_is_case_insensitive() {
		assert_eq!(type_similarity(Some("Equipment"), Some("equipment")), 1.0);
		assert_eq!(type_similarity(Some("equipment"), Some("safety")), 0.0);
		assert_eq!(type_similarity(Some("equipment"), None), 0.0);
	}

	#[test]
	fn priority_requires_both_sides() {
		assert_eq!(priority_similarity(Some("high"), Some("high")), 1.0);
		assert_eq!(priority_similarity(Some("high"), Some("low")), 0.0);
		assert_eq!(priority_similarity(None, None), 0.0);
		assert_eq!(priority_similarity(Some("  "), Some("  ")), 0.0);
	}

	#[test]
	fn priority_is_compared_verbatim() {
		assert_eq!(priority_similarity(Some("High"), Some("high")), 0.0);
		assert_eq!(priority_similarity(Some("high "), Some("high")), 0.0);

		let query = IncidentFields::new(None, None, Some("high "));
		let candidate = IncidentFields::new(None, None, Some("high"));

		assert!(query.presence().priority);
		assert_eq!(score_fields(&query, &candidate, 0.5).priority, 0.0);
	}
}
