use anyhow::Result;
use chrono::NaiveDate;

use crate::db::{new_id, HedgeDb};
use crate::models::ScoringRun;

#[derive(Clone)]
pub struct RunStore {
    db: HedgeDb,
}

impl RunStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Open the audit record for a run. Written and committed before any
    /// score row so score writes can be joined back to their run date.
    pub async fn start(&self, run_date: NaiveDate, scoring_version: &str) -> Result<ScoringRun> {
        let id = new_id();
        let run = sqlx::query_as::<_, ScoringRun>(
            r#"
            INSERT INTO scoring_runs (id, run_date, status, scoring_version)
            VALUES (?, ?, 'running', ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(run_date)
        .bind(scoring_version)
        .fetch_one(self.db.pool())
        .await?;

        Ok(run)
    }

    pub async fn complete(
        &self,
        id: &str,
        companies_scored: i64,
        companies_failed: i64,
        avg_score: Option<f64>,
        median_score: Option<f64>,
        duration_seconds: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scoring_runs
            SET status = 'completed',
                companies_scored = ?,
                companies_failed = ?,
                avg_score = ?,
                median_score = ?,
                duration_seconds = ?,
                completed_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(companies_scored)
        .bind(companies_failed)
        .bind(avg_score)
        .bind(median_score)
        .bind(duration_seconds)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn fail(&self, id: &str, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scoring_runs
            SET status = 'failed',
                error_message = ?,
                completed_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(error_message)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScoringRun>> {
        let run = sqlx::query_as::<_, ScoringRun>("SELECT * FROM scoring_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(run)
    }

    pub async fn latest(&self) -> Result<Option<ScoringRun>> {
        let run = sqlx::query_as::<_, ScoringRun>(
            "SELECT * FROM scoring_runs ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(self.db.pool())
        .await?;

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_lifecycle() {
        let store = RunStore::new(HedgeDb::new("sqlite::memory:").await.unwrap());
        let date: NaiveDate = "2026-07-01".parse().unwrap();

        let run = store.start(date, "1.0.0").await.unwrap();
        assert_eq!(run.status.as_deref(), Some("running"));
        assert!(run.completed_at.is_none());

        store
            .complete(&run.id, 120, 3, Some(58.4), Some(57.1), 42)
            .await
            .unwrap();

        let finished = store.get(&run.id).await.unwrap().unwrap();
        assert_eq!(finished.status.as_deref(), Some("completed"));
        assert_eq!(finished.companies_scored, Some(120));
        assert_eq!(finished.companies_failed, Some(3));
        assert_eq!(finished.duration_seconds, Some(42));
        assert!(finished.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_run_failure_records_message() {
        let store = RunStore::new(HedgeDb::new("sqlite::memory:").await.unwrap());
        let run = store.start("2026-07-01".parse().unwrap(), "1.0.0").await.unwrap();

        store.fail(&run.id, "wall clock exceeded").await.unwrap();

        let failed = store.get(&run.id).await.unwrap().unwrap();
        assert_eq!(failed.status.as_deref(), Some("failed"));
        assert_eq!(failed.error_message.as_deref(), Some("wall clock exceeded"));
        assert!(failed.completed_at.is_some());
    }
}
