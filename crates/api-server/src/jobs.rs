//! Scheduled job adapters for the background dispatcher.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono_tz::America::New_York;

use alert_engine::AlertEvaluator;
use batch_scorer::BatchScorer;
use job_scheduler::Job;

/// Runs the daily scoring pass for "today" on the exchange clock.
pub struct DailyScoringJob {
    scorer: BatchScorer,
}

impl DailyScoringJob {
    pub fn new(scorer: BatchScorer) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl Job for DailyScoringJob {
    fn name(&self) -> &str {
        "daily-scoring"
    }

    async fn run(&self) -> Result<()> {
        let today = chrono::Utc::now().with_timezone(&New_York).date_naive();
        let summary = self.scorer.run_daily(today).await?;
        tracing::info!(
            "Daily scoring run {}: {} scored, {} failed",
            summary.run_id,
            summary.companies_scored,
            summary.companies_failed
        );
        Ok(())
    }
}

/// Evaluates active alerts against the latest scores.
pub struct AlertScanJob {
    evaluator: Arc<AlertEvaluator>,
}

impl AlertScanJob {
    pub fn new(evaluator: Arc<AlertEvaluator>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl Job for AlertScanJob {
    fn name(&self) -> &str {
        "alert-scan"
    }

    async fn run(&self) -> Result<()> {
        self.evaluator.scan().await?;
        Ok(())
    }
}
