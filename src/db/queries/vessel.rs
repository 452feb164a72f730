//! Vessel master queries

use sqlx::PgConnection;

use crate::types::VesselReference;

/// Null out a soft reference on every vessel pointing at one of `keys`.
///
/// Stamps `modified_at` on the touched vessels and returns how many there
/// were. Matching nothing is a no-op returning zero.
pub async fn clear_references(
    conn: &mut PgConnection,
    reference: VesselReference,
    keys: &[String],
) -> Result<u64, sqlx::Error> {
    if keys.is_empty() {
        return Ok(0);
    }

    let column = reference.column();
    let sql = format!(
        "UPDATE vessel_masters SET {column} = NULL, modified_at = NOW() WHERE {column} = ANY($1)"
    );

    let result = sqlx::query(&sql)
        .bind(keys)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
