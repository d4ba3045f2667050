use anyhow::Result;

use crate::db::{new_id, HedgeDb};
use crate::models::{Alert, AlertInput};

#[derive(Clone)]
pub struct AlertStore {
    db: HedgeDb,
}

impl AlertStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: AlertInput) -> Result<Alert> {
        let id = new_id();
        let alert = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts
            (id, user_id, company_id, portfolio_id, alert_type,
             threshold_value, threshold_direction, change_percent,
             notify_email, notify_push)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&input.user_id)
        .bind(&input.company_id)
        .bind(&input.portfolio_id)
        .bind(&input.alert_type)
        .bind(input.threshold_value)
        .bind(&input.threshold_direction)
        .bind(input.change_percent)
        .bind(input.notify_email)
        .bind(input.notify_push)
        .fetch_one(self.db.pool())
        .await?;

        Ok(alert)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(alert)
    }

    /// All alerts the evaluator should look at.
    pub async fn list_active(&self) -> Result<Vec<Alert>> {
        let alerts =
            sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE is_active = 1 ORDER BY created_at")
                .fetch_all(self.db.pool())
                .await?;

        Ok(alerts)
    }

    /// Record a firing: stamp the trigger time and bump the counter.
    pub async fn mark_triggered(&self, id: &str, triggered_at: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE alerts
            SET last_triggered_at = ?,
                trigger_count = trigger_count + 1,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(triggered_at)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<()> {
        sqlx::query("UPDATE alerts SET is_active = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> AlertStore {
        AlertStore::new(HedgeDb::new("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_list_active() {
        let store = setup().await;

        let alert = store
            .create(AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some("company-1".to_string()),
                alert_type: "threshold".to_string(),
                threshold_value: Some(50.0),
                threshold_direction: Some("below".to_string()),
                notify_email: true,
                notify_push: false,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(alert.trigger_count, 0);
        assert!(alert.is_active);

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);

        store.set_active(&alert.id, false).await.unwrap();
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_triggered_bumps_count() {
        let store = setup().await;
        let alert = store
            .create(AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some("company-1".to_string()),
                alert_type: "score_drop".to_string(),
                change_percent: Some(10.0),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            })
            .await
            .unwrap();

        store
            .mark_triggered(&alert.id, "2026-07-01T12:00:00+00:00")
            .await
            .unwrap();
        store
            .mark_triggered(&alert.id, "2026-07-01T13:30:00+00:00")
            .await
            .unwrap();

        let fetched = store.get(&alert.id).await.unwrap().unwrap();
        assert_eq!(fetched.trigger_count, 2);
        assert_eq!(
            fetched.last_triggered_at.as_deref(),
            Some("2026-07-01T13:30:00+00:00")
        );
    }
}
