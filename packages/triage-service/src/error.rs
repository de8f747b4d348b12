pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Timed out: {operation} exceeded {timeout_ms} ms.")]
	Timeout { operation: String, timeout_ms: u64 },
}
impl From<triage_storage::Error> for Error {
	fn from(err: triage_storage::Error) -> Self {
		match err {
			triage_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			triage_storage::Error::SerdeJson(inner) => Self::Storage { message: inner.to_string() },
			triage_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<triage_providers::Error> for Error {
	fn from(err: triage_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
