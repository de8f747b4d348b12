use serde::{Deserialize, Serialize};

use crate::{Error, Result, TriageService};
use triage_domain::auto_assign::{self, RoutingSettings};
use triage_storage::models::StoredSettings;

#[derive(Clone, Debug, Serialize)]
pub struct RoutingSettingsView {
	pub enabled: bool,
	pub threshold: f64,
	pub min_samples: u32,
	pub current_samples: u64,
	/// Whether enough eligible incidents exist for the sample gate to pass.
	pub ready: bool,
	pub recommendation: String,
}

/// Absent fields keep their current value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateRoutingSettingsRequest {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub threshold: Option<f64>,
	#[serde(default)]
	pub min_samples: Option<u32>,
}

impl TriageService {
	pub async fn get_routing_settings(&self) -> Result<RoutingSettingsView> {
		let settings = self.effective_settings().await?;

		self.settings_view(settings).await
	}

	pub async fn update_routing_settings(
		&self,
		req: UpdateRoutingSettingsRequest,
	) -> Result<RoutingSettingsView> {
		let current = self.effective_settings().await?;
		let updated = RoutingSettings {
			enabled: req.enabled.unwrap_or(current.enabled),
			threshold: req.threshold.unwrap_or(current.threshold),
			min_samples: req.min_samples.unwrap_or(current.min_samples),
		};

		updated.validate().map_err(|message| Error::InvalidRequest { message })?;

		let stored = StoredSettings {
			enabled: Some(updated.enabled),
			threshold: Some(updated.threshold),
			min_samples: Some(updated.min_samples),
		};

		self.within_request("settings write", self.backends.settings.write(&stored)).await?;

		tracing::info!(
			enabled = updated.enabled,
			threshold = updated.threshold,
			min_samples = updated.min_samples,
			"Routing settings updated."
		);

		self.settings_view(updated).await
	}

	/// Stored settings layered over the configured defaults, field by field.
	pub(crate) async fn effective_settings(&self) -> Result<RoutingSettings> {
		let defaults = RoutingSettings::from(&self.cfg.auto_assign);
		let Some(stored) =
			self.within_request("settings read", self.backends.settings.read()).await?
		else {
			return Ok(defaults);
		};
		let merged = RoutingSettings {
			enabled: stored.enabled.unwrap_or(defaults.enabled),
			threshold: stored.threshold.unwrap_or(defaults.threshold),
			min_samples: stored.min_samples.unwrap_or(defaults.min_samples),
		};

		if let Err(message) = merged.validate() {
			tracing::warn!(%message, "Stored routing settings are invalid. Using configured defaults.");

			return Ok(defaults);
		}

		Ok(merged)
	}

	pub(crate) async fn current_sample_count(&self) -> Result<u64> {
		self.within_request("sample count", self.backends.settings.current_sample_count()).await
	}

	async fn settings_view(&self, settings: RoutingSettings) -> Result<RoutingSettingsView> {
		let current_samples = self.current_sample_count().await?;

		Ok(RoutingSettingsView {
			enabled: settings.enabled,
			threshold: settings.threshold,
			min_samples: settings.min_samples,
			current_samples,
			ready: current_samples >= u64::from(settings.min_samples),
			recommendation: auto_assign::recommendation(&settings, current_samples),
		})
	}
}
