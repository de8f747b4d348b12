use serde::{Deserialize, Serialize};

use triage_config::AutoAssign;

pub const ALL_CONDITIONS_MET: &str = "All conditions met";

/// Operator-controlled gate for applying a suggestion without human confirmation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
	pub enabled: bool,
	pub threshold: f64,
	pub min_samples: u32,
}
impl RoutingSettings {
	pub fn validate(&self) -> Result<(), String> {
		if !self.threshold.is_finite() {
			return Err("threshold must be a finite number.".to_string());
		}
		if !(0.0..=1.0).contains(&self.threshold) {
			return Err("threshold must be in the range 0.0-1.0.".to_string());
		}

		Ok(())
	}
}
impl From<&AutoAssign> for RoutingSettings {
	fn from(cfg: &AutoAssign) -> Self {
		Self { enabled: cfg.enabled, threshold: cfg.threshold, min_samples: cfg.min_samples }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AutoAssignDecision {
	pub auto_assign: bool,
	pub confidence: f64,
	pub threshold: f64,
	pub enabled: bool,
	pub current_samples: u64,
	pub min_samples: u32,
	pub reasons: Vec<String>,
}

/// Auto-assign requires the flag, enough historical samples, and enough confidence. Every
/// failing condition is reported so callers can explain a suggestion-only outcome.
pub fn decide(
	confidence: f64,
	settings: &RoutingSettings,
	current_samples: u64,
) -> AutoAssignDecision {
	let min_samples = u64::from(settings.min_samples);
	let mut reasons = Vec::new();

	if !settings.enabled {
		reasons.push("Auto-assign is disabled".to_string());
	}
	if current_samples < min_samples {
		reasons.push(format!(
			"Not enough samples ({current_samples}/{min_samples}, {} more needed)",
			min_samples - current_samples
		));
	}
	if confidence < settings.threshold {
		reasons.push(format!(
			"Confidence too low ({:.1}% < {:.1}%)",
			confidence * 100.0,
			settings.threshold * 100.0
		));
	}

	let auto_assign = reasons.is_empty();

	if auto_assign {
		reasons.push(ALL_CONDITIONS_MET.to_string());
	}

	AutoAssignDecision {
		auto_assign,
		confidence,
		threshold: settings.threshold,
		enabled: settings.enabled,
		current_samples,
		min_samples: settings.min_samples,
		reasons,
	}
}

pub fn recommendation(settings: &RoutingSettings, current_samples: u64) -> String {
	let min_samples = u64::from(settings.min_samples);

	if current_samples < min_samples {
		return format!(
			"Needs {} more resolved incidents before auto-assign can take effect.",
			min_samples - current_samples
		);
	}
	if !settings.enabled {
		return "Enough samples collected; auto-assign can be enabled.".to_string();
	}

	"Auto-assign is active.".to_string()
}
