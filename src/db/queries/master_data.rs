//! Master data table queries
//!
//! Table and column names come from the constant table specs, never from
//! request input.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

use crate::types::{EntityRow, TableSpec};

/// Rows per multi-row INSERT, well below the Postgres bind parameter limit
const INSERT_CHUNK_ROWS: usize = 1000;

/// List all rows of a table in display order
pub async fn list_rows(pool: &PgPool, table: &TableSpec) -> Result<Vec<EntityRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}, {}",
        table.column_list(),
        table.table,
        table.columns[table.order_by].column,
        table.key().column,
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter()
        .map(|row| -> Result<EntityRow, sqlx::Error> {
            let values = (0..table.columns.len())
                .map(|idx| row.try_get::<Option<String>, _>(idx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EntityRow::new(values))
        })
        .collect()
}

/// Primary keys currently stored in a table
pub async fn existing_keys(conn: &mut PgConnection, table: &TableSpec) -> Result<Vec<String>, sqlx::Error> {
    let sql = format!("SELECT {} FROM {}", table.key().column, table.table);
    sqlx::query_scalar::<_, String>(&sql).fetch_all(conn).await
}

/// Delete every row of a table
pub async fn delete_rows(conn: &mut PgConnection, table: &TableSpec) -> Result<u64, sqlx::Error> {
    let sql = format!("DELETE FROM {}", table.table);
    let result = sqlx::query(&sql).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Insert rows using chunked multi-row INSERT statements
pub async fn insert_rows(
    conn: &mut PgConnection,
    table: &TableSpec,
    rows: &[EntityRow],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", table.table, table.column_list()));

        builder.push_values(chunk, |mut b, row| {
            for value in &row.values {
                b.push_bind(value.clone());
            }
        });

        inserted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}
