use crate::{Result, db::Db, models::StoredSettings};

pub const SETTINGS_KEY: &str = "rag_auto_assign";

const SETTINGS_DESCRIPTION: &str = "Automatic department assignment for routed incidents.";

pub async fn read_settings(db: &Db) -> Result<Option<StoredSettings>> {
	let value: Option<serde_json::Value> =
		sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
			.bind(SETTINGS_KEY)
			.fetch_optional(&db.pool)
			.await?;

	match value {
		Some(value) if !value.is_null() => Ok(Some(serde_json::from_value(value)?)),
		_ => Ok(None),
	}
}

/// Replaces the stored settings document in a single upsert, so readers observe either the
/// previous or the new document.
pub async fn write_settings(db: &Db, settings: &StoredSettings) -> Result<()> {
	let value = serde_json::to_value(settings)?;

	sqlx::query(
		"\
INSERT INTO system_settings (key, value, description, updated_at)
VALUES ($1, $2, $3, now())
ON CONFLICT (key) DO UPDATE
SET value = EXCLUDED.value,
\tupdated_at = EXCLUDED.updated_at",
	)
	.bind(SETTINGS_KEY)
	.bind(value)
	.bind(SETTINGS_DESCRIPTION)
	.execute(&db.pool)
	.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_documents_deserialize() {
		let parsed: StoredSettings =
			serde_json::from_value(serde_json::json!({ "threshold": 0.8 })).expect("parse failed");

		assert_eq!(parsed.threshold, Some(0.8));
		assert_eq!(parsed.enabled, None);
		assert_eq!(parsed.min_samples, None);
	}
}
