mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	AutoAssign, Backlog, Config, EmbeddingProviderConfig, InputValidation, Postgres, Providers,
	Routing, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.vector_dim.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_unit_interval("routing.min_similarity", cfg.routing.min_similarity)?;
	validate_unit_interval("auto_assign.threshold", cfg.auto_assign.threshold)?;

	if cfg.routing.top_k_mean == 0 {
		return Err(Error::Validation {
			message: "routing.top_k_mean must be greater than zero.".to_string(),
		});
	}
	if cfg.routing.retrieval_limit < cfg.routing.top_k_mean {
		return Err(Error::Validation {
			message: "routing.retrieval_limit must be at least routing.top_k_mean.".to_string(),
		});
	}
	if cfg.routing.similar_default_limit == 0
		|| cfg.routing.similar_default_limit > cfg.routing.similar_max_limit
	{
		return Err(Error::Validation {
			message: "routing.similar_default_limit must be between 1 and routing.similar_max_limit."
				.to_string(),
		});
	}
	if cfg.routing.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "routing.request_timeout_ms must be greater than zero.".to_string(),
		});
	}

	let validation = &cfg.routing.validation;

	if validation.min_chars == 0 || validation.min_words == 0 {
		return Err(Error::Validation {
			message: "routing.validation.min_chars and min_words must be greater than zero."
				.to_string(),
		});
	}
	if validation.spam_run < 2 {
		return Err(Error::Validation {
			message: "routing.validation.spam_run must be at least 2.".to_string(),
		});
	}
	if cfg.backlog.batch_size == 0 || cfg.backlog.batch_size > cfg.backlog.max_batch_size {
		return Err(Error::Validation {
			message: "backlog.batch_size must be between 1 and backlog.max_batch_size.".to_string(),
		});
	}
	if cfg.backlog.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "backlog.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("backlog.poll_interval_ms", cfg.backlog.poll_interval_ms),
		("backlog.batch_timeout_ms", cfg.backlog.batch_timeout_ms),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn validate_unit_interval(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.embedding
		.query_prefix
		.as_deref()
		.map(|prefix| prefix.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.embedding.query_prefix = None;
	}
}
