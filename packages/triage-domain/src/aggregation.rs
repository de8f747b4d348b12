use std::collections::BTreeMap;

use serde::Serialize;

/// Number of best candidate scores averaged per department.
pub const DEFAULT_TOP_K: usize = 3;

/// One scored candidate's vote for the department that resolved it.
#[derive(Clone, Copy, Debug)]
pub struct Vote<'a> {
	pub department_id: &'a str,
	pub department_name: &'a str,
	pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentAggregate {
	pub department_id: String,
	pub department_name: String,
	/// Composite scores of every contributing candidate, best first.
	pub scores: Vec<f64>,
	/// Mean of the best `top_k` entries of `scores`.
	pub score: f64,
	pub vote_count: usize,
}
impl DepartmentAggregate {
	pub fn best_score(&self) -> f64 {
		self.scores.first().copied().unwrap_or(0.0)
	}
}

/// Groups votes by department and reduces each group with a top-K truncated mean.
///
/// Keys are department ids, so iteration order is lexical and independent of the order
/// in which the index returned candidates.
pub fn aggregate<'a, I>(votes: I, top_k: usize) -> BTreeMap<String, DepartmentAggregate>
where
	I: IntoIterator<Item = Vote<'a>>,
{
	let mut departments: BTreeMap<String, DepartmentAggregate> = BTreeMap::new();

	for vote in votes {
		let entry = departments.entry(vote.department_id.to_string()).or_insert_with(|| {
			DepartmentAggregate {
				department_id: vote.department_id.to_string(),
				department_name: vote.department_name.to_string(),
				scores: Vec::new(),
				score: 0.0,
				vote_count: 0,
			}
		});

		entry.scores.push(vote.score);
		entry.vote_count += 1;
	}

	for aggregate in departments.values_mut() {
		aggregate.scores.sort_by(|a, b| b.total_cmp(a));
		aggregate.score = top_k_mean(&aggregate.scores, top_k);
	}

	departments
}

/// Mean of the first `k` entries of a descending score list.
pub fn top_k_mean(sorted_desc: &[f64], k: usize) -> f64 {
	let top = &sorted_desc[..sorted_desc.len().min(k.max(1))];

	if top.is_empty() {
		return 0.0;
	}

	top.iter().sum::<f64>() / top.len() as f64
}

/// Highest reduced score wins. Ties go to the higher single best candidate, then to the
/// lexically smallest department id.
pub fn winner(departments: &BTreeMap<String, DepartmentAggregate>) -> Option<&DepartmentAggregate> {
	let mut best: Option<&DepartmentAggregate> = None;

	for candidate in departments.values() {
		let replace = match best {
			None => true,
			Some(current) => candidate
				.score
				.total_cmp(&current.score)
				.then_with(|| candidate.best_score().total_cmp(&current.best_score()))
				.is_gt(),
		};

		if replace {
			best = Some(candidate);
		}
	}

	best
}
