//! Periodic alert scan over the survival-score time series.
//!
//! Each alert is evaluated in isolation: read the score history, decide,
//! write the trigger bookkeeping, dispatch notifications. A failing alert
//! never stops the scan.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use hedge_db::{Alert, AlertStore, CompanyStore, HedgeDb, ScoreStore};
use notification_service::{Notification, NotificationKind, NotificationService};

/// Minimum seconds between two firings of the same alert. Without this a
/// true condition would re-fire on every scan.
const COOLDOWN_SECS: i64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub checked: usize,
    pub triggered: usize,
}

pub struct AlertEvaluator {
    alerts: AlertStore,
    scores: ScoreStore,
    companies: CompanyStore,
    notifications: Arc<NotificationService>,
}

impl AlertEvaluator {
    pub fn new(db: HedgeDb, notifications: Arc<NotificationService>) -> Self {
        Self {
            alerts: AlertStore::new(db.clone()),
            scores: ScoreStore::new(db.clone()),
            companies: CompanyStore::new(db),
            notifications,
        }
    }

    /// Evaluate all active alerts once.
    pub async fn scan(&self) -> Result<ScanSummary> {
        let alerts = self.alerts.list_active().await?;
        let mut summary = ScanSummary {
            checked: alerts.len(),
            triggered: 0,
        };

        for alert in &alerts {
            match self.process_alert(alert).await {
                Ok(true) => summary.triggered += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Error evaluating alert {}: {}", alert.id, e);
                }
            }
        }

        tracing::info!(
            "Alert check complete: {} checked, {} triggered",
            summary.checked,
            summary.triggered
        );
        Ok(summary)
    }

    async fn process_alert(&self, alert: &Alert) -> Result<bool> {
        if self.in_cooldown(alert) {
            return Ok(false);
        }

        let Some(kind) = self.evaluate(alert).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        self.alerts
            .mark_triggered(&alert.id, &now.to_rfc3339())
            .await?;

        let (title, message) = describe(&kind);
        self.notifications
            .dispatch(
                &Notification::new(kind, title, message),
                alert.notify_email,
                alert.notify_push,
            )
            .await;

        Ok(true)
    }

    fn in_cooldown(&self, alert: &Alert) -> bool {
        let Some(last) = alert.last_triggered_at.as_deref() else {
            return false;
        };
        match DateTime::parse_from_rfc3339(last) {
            Ok(last) => Utc::now() - last.with_timezone(&Utc) < Duration::seconds(COOLDOWN_SECS),
            Err(_) => false,
        }
    }

    /// Decide whether an alert's condition currently holds. Alerts with
    /// missing prerequisites or too little history are skipped, not errors.
    async fn evaluate(&self, alert: &Alert) -> Result<Option<NotificationKind>> {
        match alert.alert_type.as_str() {
            "threshold" => self.evaluate_threshold(alert).await,
            "score_drop" => self.evaluate_change(alert, false).await,
            "score_rise" => self.evaluate_change(alert, true).await,
            other => {
                tracing::warn!("Unknown alert type '{}' on alert {}", other, alert.id);
                Ok(None)
            }
        }
    }

    async fn evaluate_threshold(&self, alert: &Alert) -> Result<Option<NotificationKind>> {
        let (Some(company_id), Some(threshold)) =
            (alert.company_id.as_deref(), alert.threshold_value)
        else {
            return Ok(None);
        };

        let Some(score) = self.scores.latest_for_company(company_id).await? else {
            return Ok(None);
        };

        let direction = alert.threshold_direction.as_deref().unwrap_or("below");
        let fired = match direction {
            "below" => score.total_score < threshold,
            "above" => score.total_score > threshold,
            _ => false,
        };

        if !fired {
            return Ok(None);
        }

        Ok(Some(NotificationKind::ThresholdCrossed {
            ticker: self.ticker_for(company_id).await,
            score: score.total_score,
            threshold,
            direction: direction.to_string(),
        }))
    }

    async fn evaluate_change(&self, alert: &Alert, rise: bool) -> Result<Option<NotificationKind>> {
        let (Some(company_id), Some(change_percent)) =
            (alert.company_id.as_deref(), alert.change_percent)
        else {
            return Ok(None);
        };

        let scores = self.scores.latest_two_for_company(company_id).await?;
        if scores.len() < 2 {
            return Ok(None);
        }

        let current = scores[0].total_score;
        let previous = scores[1].total_score;
        if previous == 0.0 {
            return Ok(None);
        }
        let change_pct = (current - previous) / previous * 100.0;

        let fired = if rise {
            change_pct >= change_percent
        } else {
            change_pct <= -change_percent
        };
        if !fired {
            return Ok(None);
        }

        let ticker = self.ticker_for(company_id).await;
        Ok(Some(if rise {
            NotificationKind::ScoreRose {
                ticker,
                previous,
                current,
                change_pct,
            }
        } else {
            NotificationKind::ScoreDropped {
                ticker,
                previous,
                current,
                change_pct,
            }
        }))
    }

    async fn ticker_for(&self, company_id: &str) -> String {
        match self.companies.get(company_id).await {
            Ok(Some(company)) => company.ticker,
            _ => company_id.to_string(),
        }
    }
}

fn describe(kind: &NotificationKind) -> (String, String) {
    match kind {
        NotificationKind::ThresholdCrossed {
            ticker,
            score,
            threshold,
            direction,
        } => (
            format!("{} survival score {} {:.0}", ticker, direction, threshold),
            format!(
                "{} survival score is {:.2}, {} your threshold of {:.2}.",
                ticker, score, direction, threshold
            ),
        ),
        NotificationKind::ScoreDropped {
            ticker, change_pct, ..
        } => (
            format!("{} survival score dropped {:.1}%", ticker, change_pct.abs()),
            format!(
                "{} survival score fell {:.2}% since the previous scoring run.",
                ticker,
                change_pct.abs()
            ),
        ),
        NotificationKind::ScoreRose {
            ticker, change_pct, ..
        } => (
            format!("{} survival score rose {:.1}%", ticker, change_pct),
            format!(
                "{} survival score gained {:.2}% since the previous scoring run.",
                ticker, change_pct
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hedge_db::{AlertInput, CompanyInput, SurvivalScoreInput};
    use notification_service::{NotificationConfig, SmtpTls};

    fn silent_notifications() -> Arc<NotificationService> {
        // No channels configured: dispatch is a no-op.
        Arc::new(NotificationService::new(&NotificationConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            smtp_to: Vec::new(),
            smtp_tls: SmtpTls::StartTls,
            push_webhook_url: None,
        }))
    }

    async fn setup() -> (HedgeDb, AlertEvaluator) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        let evaluator = AlertEvaluator::new(db.clone(), silent_notifications());
        (db, evaluator)
    }

    async fn seed_company(db: &HedgeDb, ticker: &str) -> String {
        CompanyStore::new(db.clone())
            .upsert(CompanyInput {
                ticker: ticker.to_string(),
                name: ticker.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_score(db: &HedgeDb, company_id: &str, date: &str, total: f64) {
        let date: NaiveDate = date.parse().unwrap();
        ScoreStore::new(db.clone())
            .upsert(SurvivalScoreInput {
                company_id: company_id.to_string(),
                score_date: date,
                total_score: total,
                confidence: 0.8,
                tier: "MODERATE".to_string(),
                hard_assets_score: total,
                precious_metals_score: total,
                commodity_score: total,
                foreign_revenue_score: total,
                pricing_power_score: total,
                debt_structure_score: total,
                essential_services_score: total,
                scenario_gradual: total,
                scenario_rapid: total,
                scenario_hyper: total,
                scoring_version: "1.0.0".to_string(),
            })
            .await
            .unwrap();
    }

    async fn seed_alert(db: &HedgeDb, input: AlertInput) -> Alert {
        AlertStore::new(db.clone()).create(input).await.unwrap()
    }

    #[tokio::test]
    async fn test_threshold_below_fires() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 42.0).await;

        let alert = seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "threshold".to_string(),
                threshold_value: Some(50.0),
                threshold_direction: Some("below".to_string()),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;
        assert_eq!(alert.trigger_count, 0);

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.triggered, 1);

        let fetched = AlertStore::new(db).get(&alert.id).await.unwrap().unwrap();
        assert_eq!(fetched.trigger_count, 1);
        assert!(fetched.last_triggered_at.is_some());
    }

    #[tokio::test]
    async fn test_threshold_above_does_not_fire_below_bound() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 42.0).await;

        seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "threshold".to_string(),
                threshold_value: Some(50.0),
                threshold_direction: Some("above".to_string()),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.triggered, 0);
    }

    #[tokio::test]
    async fn test_score_drop_fires_on_large_enough_decline() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        // 60 -> 50 is a 16.67% drop
        seed_score(&db, &company, "2026-07-01", 60.0).await;
        seed_score(&db, &company, "2026-07-02", 50.0).await;

        let sensitive = seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company.clone()),
                alert_type: "score_drop".to_string(),
                change_percent: Some(10.0),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;
        let insensitive = seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "score_drop".to_string(),
                change_percent: Some(20.0),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.triggered, 1);

        let alerts = AlertStore::new(db);
        assert_eq!(alerts.get(&sensitive.id).await.unwrap().unwrap().trigger_count, 1);
        assert_eq!(alerts.get(&insensitive.id).await.unwrap().unwrap().trigger_count, 0);
    }

    #[tokio::test]
    async fn test_score_rise_fires_symmetrically() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 50.0).await;
        seed_score(&db, &company, "2026-07-02", 60.0).await;

        seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "score_rise".to_string(),
                change_percent: Some(15.0),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.triggered, 1);
    }

    #[tokio::test]
    async fn test_change_alert_skips_with_single_score() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 60.0).await;

        seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "score_drop".to_string(),
                change_percent: Some(1.0),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.triggered, 0);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_refire() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 42.0).await;

        let alert = seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "threshold".to_string(),
                threshold_value: Some(50.0),
                threshold_direction: Some("below".to_string()),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;

        let first = evaluator.scan().await.unwrap();
        assert_eq!(first.triggered, 1);

        // Condition still true, but the alert just fired.
        let second = evaluator.scan().await.unwrap();
        assert_eq!(second.triggered, 0);

        let fetched = AlertStore::new(db).get(&alert.id).await.unwrap().unwrap();
        assert_eq!(fetched.trigger_count, 1);
    }

    #[tokio::test]
    async fn test_inactive_alerts_are_ignored() {
        let (db, evaluator) = setup().await;
        let company = seed_company(&db, "NEM").await;
        seed_score(&db, &company, "2026-07-01", 42.0).await;

        let alert = seed_alert(
            &db,
            AlertInput {
                user_id: "user-1".to_string(),
                company_id: Some(company),
                alert_type: "threshold".to_string(),
                threshold_value: Some(50.0),
                threshold_direction: Some("below".to_string()),
                notify_email: true,
                notify_push: true,
                ..Default::default()
            },
        )
        .await;
        AlertStore::new(db.clone())
            .set_active(&alert.id, false)
            .await
            .unwrap();

        let summary = evaluator.scan().await.unwrap();
        assert_eq!(summary.checked, 0);
        assert_eq!(summary.triggered, 0);
    }
}
