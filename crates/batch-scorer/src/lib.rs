//! Daily scoring run: scores every active company exactly once per calendar
//! date and persists an audit record for the run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use hedge_db::{
    Company, CompanyStore, Fundamental, FundamentalStore, HedgeDb, RunStore, ScoreStore,
    SurvivalScore, SurvivalScoreInput,
};
use scoring_engine::{CompanyData, ScoreResult, ScoringEngine};

/// Max companies scored concurrently within one run.
const DEFAULT_CONCURRENCY: usize = 16;

/// A run that outlives this is marked failed.
const WALL_CLOCK_LIMIT: Duration = Duration::from_secs(60 * 60);

/// Outcome of one daily run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub companies_scored: i64,
    pub companies_failed: i64,
    pub avg_score: Option<f64>,
    pub median_score: Option<f64>,
    pub duration_seconds: i64,
}

/// Project a company and its latest fundamental snapshot into the scoring
/// kernel's input shape.
pub fn project_company_data(company: &Company, fundamental: Option<&Fundamental>) -> CompanyData {
    let mut data = CompanyData {
        ticker: company.ticker.clone(),
        sector: company.sector.clone(),
        industry: company.industry.clone(),
        ..Default::default()
    };

    if let Some(f) = fundamental {
        data.total_assets = f.total_assets;
        data.tangible_assets = f.tangible_assets;
        data.intangible_assets = f.intangible_assets;
        data.total_revenue = f.total_revenue;
        data.foreign_revenue = f.foreign_revenue;
        data.foreign_revenue_pct = f.foreign_revenue_pct.and_then(Decimal::from_f64);
        data.commodity_revenue = f.commodity_revenue;
        data.commodity_revenue_pct = f.commodity_revenue_pct.and_then(Decimal::from_f64);
        data.precious_metals_revenue = f.precious_metals_revenue;
        data.precious_metals_revenue_pct =
            f.precious_metals_revenue_pct.and_then(Decimal::from_f64);
        data.total_debt = f.total_debt;
        data.fixed_rate_debt_pct = f.fixed_rate_debt_pct.and_then(Decimal::from_f64);
        data.avg_debt_maturity_years = f.avg_debt_maturity_years.and_then(Decimal::from_f64);
        data.gross_margin = f.gross_margin.and_then(Decimal::from_f64);
        data.gross_margin_5yr_std = f.gross_margin_5yr_std.and_then(Decimal::from_f64);
        data.proven_reserves_oz = f.proven_reserves_oz;
    }

    data
}

fn to_score_input(company_id: &str, score_date: NaiveDate, result: &ScoreResult) -> SurvivalScoreInput {
    let to_f64 = |d: Decimal| d.to_f64().unwrap_or(0.0);

    SurvivalScoreInput {
        company_id: company_id.to_string(),
        score_date,
        total_score: to_f64(result.total_score),
        confidence: to_f64(result.confidence),
        tier: result.tier.as_str().to_string(),
        hard_assets_score: to_f64(result.factors.hard_assets),
        precious_metals_score: to_f64(result.factors.precious_metals),
        commodity_score: to_f64(result.factors.commodities),
        foreign_revenue_score: to_f64(result.factors.foreign_revenue),
        pricing_power_score: to_f64(result.factors.pricing_power),
        debt_structure_score: to_f64(result.factors.debt_structure),
        essential_services_score: to_f64(result.factors.essential_services),
        scenario_gradual: to_f64(result.scenario_scores.gradual),
        scenario_rapid: to_f64(result.scenario_scores.rapid),
        scenario_hyper: to_f64(result.scenario_scores.hyper),
        scoring_version: ScoringEngine::VERSION.to_string(),
    }
}

/// Coordinates the daily scoring run. Scoring itself is pure; each worker
/// only writes its own company's score row, the coordinator owns the run row.
#[derive(Clone)]
pub struct BatchScorer {
    companies: CompanyStore,
    fundamentals: FundamentalStore,
    scores: ScoreStore,
    runs: RunStore,
    engine: Arc<ScoringEngine>,
    concurrency: usize,
}

impl BatchScorer {
    pub fn new(db: HedgeDb) -> Self {
        Self {
            companies: CompanyStore::new(db.clone()),
            fundamentals: FundamentalStore::new(db.clone()),
            scores: ScoreStore::new(db.clone()),
            runs: RunStore::new(db),
            engine: Arc::new(ScoringEngine::new()),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Score every active company for `run_date`. Re-running on the same
    /// date overwrites the day's score rows in place.
    pub async fn run_daily(&self, run_date: NaiveDate) -> Result<RunSummary> {
        tracing::info!("Starting daily scoring run for {}", run_date);
        let run = self.runs.start(run_date, ScoringEngine::VERSION).await?;
        let started = std::time::Instant::now();

        let outcome = match tokio::time::timeout(WALL_CLOCK_LIMIT, self.score_universe(run_date)).await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.runs.fail(&run.id, &e.to_string()).await?;
                return Err(e);
            }
            Err(_) => {
                let message = "wall clock limit exceeded";
                self.runs.fail(&run.id, message).await?;
                return Err(anyhow!("scoring run {} {}", run.id, message));
            }
        };

        let (avg_score, median_score) = score_stats(&outcome.totals);
        let duration_seconds = started.elapsed().as_secs() as i64;

        self.runs
            .complete(
                &run.id,
                outcome.scored,
                outcome.failed,
                avg_score,
                median_score,
                duration_seconds,
            )
            .await?;

        tracing::info!(
            "Scoring complete: {} scored, {} failed in {}s",
            outcome.scored,
            outcome.failed,
            duration_seconds
        );

        Ok(RunSummary {
            run_id: run.id,
            run_date,
            companies_scored: outcome.scored,
            companies_failed: outcome.failed,
            avg_score,
            median_score,
            duration_seconds,
        })
    }

    /// Score one company on demand, outside the daily run.
    pub async fn score_company(&self, company: &Company, score_date: NaiveDate) -> Result<SurvivalScore> {
        let fundamental = self.fundamentals.latest_for_company(&company.id).await?;
        let data = project_company_data(company, fundamental.as_ref());
        let result = self.engine.score(&data);
        self.scores
            .upsert(to_score_input(&company.id, score_date, &result))
            .await
    }

    async fn score_universe(&self, run_date: NaiveDate) -> Result<UniverseOutcome> {
        let companies = self.companies.list_active().await?;
        tracing::info!("Scoring {} active companies", companies.len());

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for company in companies {
            let scorer = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (company.ticker.clone(), Err(anyhow!("worker pool closed"))),
                };
                let result = scorer
                    .score_company(&company, run_date)
                    .await
                    .map(|score| score.total_score);
                (company.ticker.clone(), result)
            });
        }

        let mut outcome = UniverseOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(total))) => {
                    outcome.scored += 1;
                    outcome.totals.push(total);
                }
                Ok((ticker, Err(e))) => {
                    outcome.failed += 1;
                    tracing::error!("Error scoring {}: {}", ticker, e);
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!("Scoring worker panicked: {}", e);
                }
            }
        }

        Ok(outcome)
    }
}

#[derive(Default)]
struct UniverseOutcome {
    scored: i64,
    failed: i64,
    totals: Vec<f64>,
}

/// Mean and median of the run's total scores, rounded to two decimals.
/// Median takes the lower-middle element on even counts.
fn score_stats(totals: &[f64]) -> (Option<f64>, Option<f64>) {
    if totals.is_empty() {
        return (None, None);
    }

    let round2 = |v: f64| {
        Decimal::from_f64(v)
            .map(|d| {
                d.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            })
            .and_then(|d| d.to_f64())
            .unwrap_or(v)
    };

    let avg = totals.iter().sum::<f64>() / totals.len() as f64;

    let mut sorted = totals.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[(sorted.len() - 1) / 2];

    (Some(round2(avg)), Some(round2(median)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_db::{CompanyInput, FundamentalInput};

    async fn seed_db() -> (HedgeDb, Vec<Company>) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        let companies = CompanyStore::new(db.clone());
        let fundamentals = FundamentalStore::new(db.clone());

        let miner = companies
            .upsert(CompanyInput {
                ticker: "NEM".to_string(),
                name: "Newmont".to_string(),
                sector: Some("Materials".to_string()),
                industry: Some("Gold Mining".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        fundamentals
            .upsert(FundamentalInput {
                company_id: miner.id.clone(),
                fiscal_year: 2025,
                fiscal_quarter: Some(4),
                total_assets: Some(35_000_000_000),
                tangible_assets: Some(30_000_000_000),
                foreign_revenue_pct: Some(45.0),
                gross_margin: Some(35.0),
                gross_margin_5yr_std: Some(5.0),
                total_debt: Some(8_000_000_000),
                fixed_rate_debt_pct: Some(75.0),
                avg_debt_maturity_years: Some(8.0),
                commodity_revenue_pct: Some(95.0),
                proven_reserves_oz: Some(100_000_000),
                ..Default::default()
            })
            .await
            .unwrap();

        let bank = companies
            .upsert(CompanyInput {
                ticker: "JPM".to_string(),
                name: "JPMorgan Chase".to_string(),
                sector: Some("Financials".to_string()),
                industry: Some("Banks".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        // No fundamentals at all for the bank: scored on neutral defaults.
        (db, vec![miner, bank])
    }

    #[tokio::test]
    async fn test_run_scores_all_active_companies() {
        let (db, seeded) = seed_db().await;
        let scorer = BatchScorer::new(db.clone());
        let run_date: NaiveDate = "2026-07-01".parse().unwrap();

        let summary = scorer.run_daily(run_date).await.unwrap();

        assert_eq!(summary.companies_scored, 2);
        assert_eq!(summary.companies_failed, 0);
        assert!(summary.avg_score.is_some());
        assert!(summary.median_score.is_some());

        let scores = ScoreStore::new(db.clone());
        for company in &seeded {
            let score = scores.latest_for_company(&company.id).await.unwrap().unwrap();
            assert_eq!(score.score_date, run_date);
            assert_eq!(score.scoring_version.as_deref(), Some("1.0.0"));
        }

        let run = RunStore::new(db).get(&summary.run_id).await.unwrap().unwrap();
        assert_eq!(run.status.as_deref(), Some("completed"));
        assert_eq!(run.companies_scored, Some(2));
        assert!(run.duration_seconds.is_some());
    }

    #[tokio::test]
    async fn test_rerun_same_day_is_idempotent() {
        let (db, seeded) = seed_db().await;
        let scorer = BatchScorer::new(db.clone());
        let run_date: NaiveDate = "2026-07-01".parse().unwrap();

        let first = scorer.run_daily(run_date).await.unwrap();
        let second = scorer.run_daily(run_date).await.unwrap();

        assert_eq!(first.companies_failed, second.companies_failed);
        assert_eq!(first.avg_score, second.avg_score);
        assert_eq!(first.median_score, second.median_score);

        // Still one score row per company for the date.
        let scores = ScoreStore::new(db);
        for company in &seeded {
            let history = scores
                .history_for_company(&company.id, None, None, 10)
                .await
                .unwrap();
            assert_eq!(history.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_inactive_companies_are_skipped() {
        let (db, seeded) = seed_db().await;
        CompanyStore::new(db.clone())
            .deactivate(&seeded[1].id)
            .await
            .unwrap();

        let scorer = BatchScorer::new(db);
        let summary = scorer.run_daily("2026-07-01".parse().unwrap()).await.unwrap();

        assert_eq!(summary.companies_scored, 1);
    }

    #[tokio::test]
    async fn test_miner_outranks_bank() {
        let (db, seeded) = seed_db().await;
        let scorer = BatchScorer::new(db.clone());
        scorer.run_daily("2026-07-01".parse().unwrap()).await.unwrap();

        let scores = ScoreStore::new(db);
        let miner = scores.latest_for_company(&seeded[0].id).await.unwrap().unwrap();
        let bank = scores.latest_for_company(&seeded[1].id).await.unwrap().unwrap();

        assert!(miner.total_score > bank.total_score);
        assert_eq!(miner.tier.as_deref(), Some("RESILIENT"));
        assert!(miner.total_score >= 70.0);
    }

    #[test]
    fn test_median_takes_lower_middle() {
        let (_, median) = score_stats(&[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(median, Some(20.0));

        let (_, median) = score_stats(&[10.0, 20.0, 30.0]);
        assert_eq!(median, Some(20.0));

        let (avg, median) = score_stats(&[]);
        assert!(avg.is_none() && median.is_none());
    }
}
