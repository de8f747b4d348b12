use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use triage_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("triage_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = triage_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Sample config must be valid.");

	assert_eq!(cfg.routing.retrieval_limit, 20);
	assert_eq!(cfg.routing.validation.spam_run, 5);
	assert!(cfg.providers.embedding.query_prefix.is_none());
}

#[test]
fn missing_file_is_a_read_error() {
	let path = env::temp_dir().join("triage_config_test_missing.toml");
	let err = triage_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err}");
}

#[test]
fn dimensions_must_match_vector_dim() {
	let payload = sample_toml_with("storage", "vector_dim", Value::Integer(384));
	let path = write_temp_config(payload);
	let result = triage_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected dimension validation error.");

	assert!(
		err.to_string().contains("providers.embedding.dimensions must match storage.vector_dim."),
		"Unexpected error: {err}"
	);
}

#[test]
fn threshold_must_be_within_unit_interval() {
	let payload = sample_toml_with("auto_assign", "threshold", Value::Float(1.5));
	let path = write_temp_config(payload);
	let result = triage_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected threshold validation error.");

	assert!(
		err.to_string().contains("auto_assign.threshold must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn routing_defaults_apply_when_omitted() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let routing = root
		.get_mut("routing")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [routing].");

	routing.remove("retrieval_limit");
	routing.remove("min_similarity");
	routing.remove("validation");

	let cfg: Config = toml::from_str(&toml::to_string(&root).expect("Failed to render config."))
		.expect("Failed to parse config.");

	assert_eq!(cfg.routing.retrieval_limit, 20);
	assert!((cfg.routing.min_similarity - 0.1).abs() < f64::EPSILON);
	assert_eq!(cfg.routing.validation.min_chars, 10);
	assert_eq!(cfg.routing.validation.min_words, 2);
	assert!(triage_config::validate(&cfg).is_ok());
}

#[test]
fn retrieval_limit_must_cover_top_k_mean() {
	let mut cfg = base_config();

	cfg.routing.retrieval_limit = 2;

	let err = triage_config::validate(&cfg).expect_err("Expected retrieval limit error.");

	assert!(
		err.to_string().contains("routing.retrieval_limit must be at least routing.top_k_mean."),
		"Unexpected error: {err}"
	);
}

#[test]
fn batch_size_must_respect_maximum() {
	let mut cfg = base_config();

	cfg.backlog.batch_size = 500;

	let err = triage_config::validate(&cfg).expect_err("Expected batch size error.");

	assert!(
		err.to_string().contains("backlog.batch_size must be between 1 and backlog.max_batch_size."),
		"Unexpected error: {err}"
	);

	cfg = base_config();
	cfg.backlog.batch_timeout_ms = 0;

	let err = triage_config::validate(&cfg).expect_err("Expected batch timeout error.");

	assert!(
		err.to_string().contains("backlog.batch_timeout_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn spam_run_must_be_at_least_two() {
	let mut cfg = base_config();

	cfg.routing.validation.spam_run = 1;

	let err = triage_config::validate(&cfg).expect_err("Expected spam run error.");

	assert!(
		err.to_string().contains("routing.validation.spam_run must be at least 2."),
		"Unexpected error: {err}"
	);
}
