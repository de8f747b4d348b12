use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{
		EmbeddingStats, IncidentSnapshot, SimilarIncident, UnvectorizedIncident, VectorWrite,
	},
	vector,
};

/// Nearest resolved incidents to `query_vec` by cosine distance.
///
/// Only incidents carrying both a vector and a department are visible. Similarity is
/// `1 - distance` clamped to `[0, 1]`.
pub async fn find_similar(
	db: &Db,
	query_vec: &[f32],
	limit: u32,
	min_similarity: f64,
) -> Result<Vec<SimilarIncident>> {
	let query_text = vector::vector_to_pg(query_vec);
	let rows = sqlx::query_as::<_, SimilarIncident>(
		"\
SELECT
\ti.id,
\ti.title,
\ti.description,
\ti.location,
\ti.incident_type,
\ti.priority,
\ti.status,
\ti.assigned_department_id AS department_id,
\tCOALESCE(d.name, 'Unknown') AS department_name,
\tGREATEST(0.0, LEAST(1.0, 1 - (i.embedding <=> $1::text::vector)))::float8 AS similarity
FROM incidents i
LEFT JOIN departments d ON d.id = i.assigned_department_id
WHERE i.embedding IS NOT NULL
\tAND i.assigned_department_id IS NOT NULL
\tAND 1 - (i.embedding <=> $1::text::vector) >= $2
ORDER BY i.embedding <=> $1::text::vector ASC, i.id ASC
LIMIT $3",
	)
	.bind(query_text.as_str())
	.bind(min_similarity)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Atomically selects and claims up to `limit` unvectorized incidents.
///
/// A row is claimable when its description is longer than `min_chars` after trimming and it
/// has no claim newer than `stale_before`. Rows locked by a concurrent claim are skipped, so
/// two runs never receive the same incident.
pub async fn claim_unvectorized(
	db: &Db,
	limit: u32,
	min_chars: u32,
	now: OffsetDateTime,
	stale_before: OffsetDateTime,
) -> Result<Vec<UnvectorizedIncident>> {
	let rows = sqlx::query_as::<_, UnvectorizedIncident>(
		"\
UPDATE incidents
SET embedding_claimed_at = $1
WHERE id IN (
\tSELECT id
\tFROM incidents
\tWHERE embedding IS NULL
\t\tAND description IS NOT NULL
\t\tAND char_length(btrim(description)) > $2
\t\tAND (embedding_claimed_at IS NULL OR embedding_claimed_at < $3)
\tORDER BY id ASC
\tLIMIT $4
\tFOR UPDATE SKIP LOCKED
)
RETURNING id, description",
	)
	.bind(now)
	.bind(i32::try_from(min_chars).unwrap_or(i32::MAX))
	.bind(stale_before)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Drops the claim on incidents that could not be vectorized so the next run retries them.
pub async fn release_claims(db: &Db, ids: &[Uuid]) -> Result<u64> {
	if ids.is_empty() {
		return Ok(0);
	}

	let res = sqlx::query(
		"\
UPDATE incidents
SET embedding_claimed_at = NULL
WHERE id = ANY($1::uuid[]) AND embedding IS NULL",
	)
	.bind(ids)
	.execute(&db.pool)
	.await?;

	Ok(res.rows_affected())
}

/// Writes every vector in one statement and clears the claims. Incidents that already carry
/// a vector are left untouched, so the returned count only covers new writes.
pub async fn save_embeddings_batch(db: &Db, rows: &[VectorWrite]) -> Result<u64> {
	if rows.is_empty() {
		return Ok(0);
	}

	let mut ids = Vec::with_capacity(rows.len());
	let mut vectors = Vec::with_capacity(rows.len());

	for row in rows {
		ids.push(row.incident_id);
		vectors.push(vector::vector_to_pg(&row.vec));
	}

	let res = sqlx::query(
		"\
UPDATE incidents AS t
SET embedding = v.embedding::vector,
\tembedding_claimed_at = NULL
FROM UNNEST($1::uuid[], $2::text[]) AS v(id, embedding)
WHERE t.id = v.id AND t.embedding IS NULL",
	)
	.bind(&ids)
	.bind(&vectors)
	.execute(&db.pool)
	.await?;

	Ok(res.rows_affected())
}

/// Stores the vector of a single incident, replacing any previous one.
pub async fn save_embedding<'e, E>(executor: E, incident_id: Uuid, vec: &[f32]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let res = sqlx::query(
		"\
UPDATE incidents
SET embedding = $1::text::vector,
\tembedding_claimed_at = NULL
WHERE id = $2",
	)
	.bind(vector::vector_to_pg(vec))
	.bind(incident_id)
	.execute(executor)
	.await?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Incident {incident_id} does not exist.")));
	}

	Ok(())
}

/// Size of the backlog, using the same predicate as [`claim_unvectorized`] minus the claim.
pub async fn count_unvectorized(db: &Db, min_chars: u32) -> Result<u64> {
	let count: i64 = sqlx::query_scalar(
		"\
SELECT COUNT(*)
FROM incidents
WHERE embedding IS NULL
\tAND description IS NOT NULL
\tAND char_length(btrim(description)) > $1",
	)
	.bind(i32::try_from(min_chars).unwrap_or(i32::MAX))
	.fetch_one(&db.pool)
	.await?;

	Ok(u64::try_from(count).unwrap_or(0))
}

/// Incidents visible to retrieval: vectorized and assigned to a department.
pub async fn count_eligible(db: &Db) -> Result<u64> {
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM incidents WHERE embedding IS NOT NULL AND assigned_department_id IS NOT NULL",
	)
	.fetch_one(&db.pool)
	.await?;

	Ok(u64::try_from(count).unwrap_or(0))
}

pub async fn embedding_stats(db: &Db) -> Result<EmbeddingStats> {
	let (total, with_embedding): (i64, i64) =
		sqlx::query_as("SELECT COUNT(*), COUNT(embedding) FROM incidents")
			.fetch_one(&db.pool)
			.await?;

	Ok(EmbeddingStats::new(total, with_embedding))
}

pub async fn fetch_incident(db: &Db, incident_id: Uuid) -> Result<Option<IncidentSnapshot>> {
	let row = sqlx::query_as::<_, IncidentSnapshot>(
		"\
SELECT
\tid,
\tdescription,
\tassigned_department_id,
\tstatus,
\tembedding IS NOT NULL AS has_embedding
FROM incidents
WHERE id = $1",
	)
	.bind(incident_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
