use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub routing: Routing,
	pub auto_assign: AutoAssign,
	pub backlog: Backlog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Optional. Prepended to query-side texts for models trained with asymmetric prefixes.
	#[serde(default)]
	pub query_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Routing {
	#[serde(default = "default_retrieval_limit")]
	pub retrieval_limit: u32,
	#[serde(default = "default_min_similarity")]
	pub min_similarity: f64,
	#[serde(default = "default_top_k_mean")]
	pub top_k_mean: u32,
	#[serde(default = "default_similar_default_limit")]
	pub similar_default_limit: u32,
	#[serde(default = "default_similar_max_limit")]
	pub similar_max_limit: u32,
	#[serde(default = "default_suggestion_examples")]
	pub suggestion_examples: u32,
	pub request_timeout_ms: u64,
	#[serde(default)]
	pub validation: InputValidation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputValidation {
	pub min_chars: u32,
	pub min_words: u32,
	/// Length of a run of one repeated character that marks the input as spam.
	pub spam_run: u32,
}
impl Default for InputValidation {
	fn default() -> Self {
		Self { min_chars: 10, min_words: 2, spam_run: 5 }
	}
}

/// Fallback routing settings used until an operator stores their own.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoAssign {
	pub enabled: bool,
	pub threshold: f64,
	pub min_samples: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Backlog {
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	#[serde(default = "default_max_batch_size")]
	pub max_batch_size: u32,
	#[serde(default = "default_min_description_chars")]
	pub min_description_chars: u32,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: i64,
	pub poll_interval_ms: u64,
	pub batch_timeout_ms: u64,
}

fn default_retrieval_limit() -> u32 {
	20
}

fn default_min_similarity() -> f64 {
	0.1
}

fn default_top_k_mean() -> u32 {
	3
}

fn default_similar_default_limit() -> u32 {
	5
}

fn default_similar_max_limit() -> u32 {
	20
}

fn default_suggestion_examples() -> u32 {
	5
}

fn default_batch_size() -> u32 {
	50
}

fn default_max_batch_size() -> u32 {
	200
}

fn default_min_description_chars() -> u32 {
	5
}

fn default_claim_lease_seconds() -> i64 {
	300
}
