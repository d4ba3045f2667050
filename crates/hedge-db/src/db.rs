use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &str = include_str!("../../../schema.sql");
const MAX_CONNECTIONS: u32 = 5;

/// Handle to the platform database. Cheap to clone; every store shares the
/// underlying pool.
#[derive(Clone)]
pub struct HedgeDb {
    pool: SqlitePool,
}

impl HedgeDb {
    /// Open the database, creating the file if needed, and bring the schema
    /// up. All DDL in schema.sql is `IF NOT EXISTS`, so opening an existing
    /// database is a no-op.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;

        apply_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Run the bootstrap DDL one statement at a time, in a single transaction.
/// The sqlite driver rejects multi-statement strings, so the schema file is
/// split on `;` first.
async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in schema_statements(SCHEMA) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("schema statement failed:\n{statement}"))?;
    }
    tx.commit().await?;

    Ok(())
}

fn schema_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Fresh TEXT primary key for a new row.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
