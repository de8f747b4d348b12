use serde::{Deserialize, Serialize};

use triage_config::InputValidation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCode {
	Empty,
	TooShort,
	TooFewWords,
	Spam,
}
impl RejectCode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty",
			Self::TooShort => "too_short",
			Self::TooFewWords => "too_few_words",
			Self::Spam => "spam",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rejection {
	pub code: RejectCode,
	pub detail: String,
}
impl Rejection {
	fn new(code: RejectCode, detail: impl Into<String>) -> Self {
		Self { code, detail: detail.into() }
	}
}

/// Gates degenerate descriptions before any embedding or index work is spent on them.
///
/// Rules run in order and the first failing rule wins.
pub fn validate(text: &str, rules: &InputValidation) -> Result<(), Rejection> {
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return Err(Rejection::new(RejectCode::Empty, "Empty"));
	}

	let chars = trimmed.chars().count();

	if chars < rules.min_chars as usize {
		return Err(Rejection::new(
			RejectCode::TooShort,
			format!("Too short ({chars} < {})", rules.min_chars),
		));
	}

	let words = trimmed.split_whitespace().count();

	if words < rules.min_words as usize {
		return Err(Rejection::new(
			RejectCode::TooFewWords,
			format!("Too few words ({words} < {})", rules.min_words),
		));
	}
	if has_repeated_run(trimmed, rules.spam_run as usize) {
		return Err(Rejection::new(RejectCode::Spam, "Spam detected"));
	}

	Ok(())
}

/// True when some character repeats `run` or more times in a row once spaces are removed.
/// Comparison is case-insensitive.
fn has_repeated_run(text: &str, run: usize) -> bool {
	if run == 0 {
		return false;
	}

	let folded = text.replace(' ', "").to_lowercase();
	let mut previous = None;
	let mut length = 0_usize;

	for ch in folded.chars() {
		if previous == Some(ch) {
			length += 1;
		} else {
			previous = Some(ch);
			length = 1;
		}

		if length >= run {
			return true;
		}
	}

	false
}
