use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{new_id, HedgeDb};
use crate::models::{CompanyWithScore, ScoreMover, SurvivalScore, SurvivalScoreInput, TierCount};

/// Ranking order column per scenario name.
fn scenario_column(scenario: &str) -> &'static str {
    match scenario {
        "gradual" => "s.scenario_gradual",
        "rapid" => "s.scenario_rapid",
        "hyper" => "s.scenario_hyper",
        _ => "s.total_score",
    }
}

#[derive(Clone)]
pub struct ScoreStore {
    db: HedgeDb,
}

impl ScoreStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Write a company's score for a date. Re-running the same day
    /// overwrites the row in place, so a scoring run is idempotent.
    pub async fn upsert(&self, input: SurvivalScoreInput) -> Result<SurvivalScore> {
        let id = new_id();
        let row = sqlx::query_as::<_, SurvivalScore>(
            r#"
            INSERT INTO survival_scores
            (id, company_id, score_date, total_score, confidence, tier,
             hard_assets_score, precious_metals_score, commodity_score,
             foreign_revenue_score, pricing_power_score, debt_structure_score,
             essential_services_score, scenario_gradual, scenario_rapid, scenario_hyper,
             scoring_version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company_id, score_date) DO UPDATE SET
                total_score = excluded.total_score,
                confidence = excluded.confidence,
                tier = excluded.tier,
                hard_assets_score = excluded.hard_assets_score,
                precious_metals_score = excluded.precious_metals_score,
                commodity_score = excluded.commodity_score,
                foreign_revenue_score = excluded.foreign_revenue_score,
                pricing_power_score = excluded.pricing_power_score,
                debt_structure_score = excluded.debt_structure_score,
                essential_services_score = excluded.essential_services_score,
                scenario_gradual = excluded.scenario_gradual,
                scenario_rapid = excluded.scenario_rapid,
                scenario_hyper = excluded.scenario_hyper,
                scoring_version = excluded.scoring_version
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&input.company_id)
        .bind(input.score_date)
        .bind(input.total_score)
        .bind(input.confidence)
        .bind(&input.tier)
        .bind(input.hard_assets_score)
        .bind(input.precious_metals_score)
        .bind(input.commodity_score)
        .bind(input.foreign_revenue_score)
        .bind(input.pricing_power_score)
        .bind(input.debt_structure_score)
        .bind(input.essential_services_score)
        .bind(input.scenario_gradual)
        .bind(input.scenario_rapid)
        .bind(input.scenario_hyper)
        .bind(&input.scoring_version)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row)
    }

    pub async fn latest_for_company(&self, company_id: &str) -> Result<Option<SurvivalScore>> {
        let row = sqlx::query_as::<_, SurvivalScore>(
            "SELECT * FROM survival_scores WHERE company_id = ? ORDER BY score_date DESC LIMIT 1",
        )
        .bind(company_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row)
    }

    /// The two most recent scores, newest first. Used by change alerts.
    pub async fn latest_two_for_company(&self, company_id: &str) -> Result<Vec<SurvivalScore>> {
        let rows = sqlx::query_as::<_, SurvivalScore>(
            "SELECT * FROM survival_scores WHERE company_id = ? ORDER BY score_date DESC LIMIT 2",
        )
        .bind(company_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// Score history for a company within an optional date window,
    /// newest first.
    pub async fn history_for_company(
        &self,
        company_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        limit: i64,
    ) -> Result<Vec<SurvivalScore>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM survival_scores WHERE company_id = ");
        qb.push_bind(company_id);
        if let Some(start) = start_date {
            qb.push(" AND score_date >= ").push_bind(start);
        }
        if let Some(end) = end_date {
            qb.push(" AND score_date <= ").push_bind(end);
        }
        qb.push(" ORDER BY score_date DESC LIMIT ").push_bind(limit);

        let rows = qb
            .build_query_as::<SurvivalScore>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }

    /// Companies ranked by a scenario's latest score, best first.
    pub async fn rankings(
        &self,
        scenario: &str,
        sector: Option<&str>,
        tier: Option<&str>,
        limit: i64,
    ) -> Result<Vec<CompanyWithScore>> {
        let column = scenario_column(scenario);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT c.id, c.ticker, c.name, c.sector, c.industry, c.market_cap, c.exchange, \
             s.total_score, s.confidence, s.tier, s.score_date, \
             s.scenario_gradual, s.scenario_rapid, s.scenario_hyper \
             FROM companies c \
             JOIN survival_scores s ON s.company_id = c.id \
             AND s.score_date = (SELECT MAX(s2.score_date) FROM survival_scores s2 WHERE s2.company_id = c.id) \
             WHERE c.is_active = 1",
        );
        if let Some(sector) = sector {
            qb.push(" AND c.sector = ").push_bind(sector.to_string());
        }
        if let Some(tier) = tier {
            qb.push(" AND s.tier = ").push_bind(tier.to_string());
        }
        qb.push(format!(" ORDER BY {column} DESC, c.ticker ASC LIMIT "));
        qb.push_bind(limit);

        let rows = qb
            .build_query_as::<CompanyWithScore>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }

    /// Score deltas over a lookback window, largest gain first. The
    /// comparison row is the newest score at or before the cutoff.
    pub async fn movers(&self, period_days: i64) -> Result<Vec<ScoreMover>> {
        let rows = sqlx::query_as::<_, ScoreMover>(
            r#"
            SELECT c.ticker, c.name, c.sector,
                   cur.total_score AS current_score,
                   prev.total_score AS previous_score,
                   cur.total_score - prev.total_score AS delta
            FROM companies c
            JOIN survival_scores cur ON cur.company_id = c.id
             AND cur.score_date = (SELECT MAX(s2.score_date) FROM survival_scores s2 WHERE s2.company_id = c.id)
            JOIN survival_scores prev ON prev.company_id = c.id
             AND prev.score_date = (
                 SELECT MAX(s3.score_date) FROM survival_scores s3
                 WHERE s3.company_id = c.id
                   AND s3.score_date <= date(cur.score_date, '-' || ? || ' days')
             )
            WHERE c.is_active = 1
            ORDER BY delta DESC, c.ticker ASC
            "#,
        )
        .bind(period_days)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// Count of companies per tier, over latest scores.
    pub async fn tier_distribution(&self) -> Result<Vec<TierCount>> {
        let rows = sqlx::query_as::<_, TierCount>(
            r#"
            SELECT s.tier AS tier, COUNT(*) AS count
            FROM companies c
            JOIN survival_scores s ON s.company_id = c.id
             AND s.score_date = (SELECT MAX(s2.score_date) FROM survival_scores s2 WHERE s2.company_id = c.id)
            WHERE c.is_active = 1
            GROUP BY s.tier
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companies::CompanyStore;
    use crate::models::CompanyInput;

    async fn setup() -> (CompanyStore, ScoreStore) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        (CompanyStore::new(db.clone()), ScoreStore::new(db))
    }

    fn score_input(company_id: &str, date: &str, total: f64) -> SurvivalScoreInput {
        SurvivalScoreInput {
            company_id: company_id.to_string(),
            score_date: date.parse().unwrap(),
            total_score: total,
            confidence: 0.8,
            tier: "MODERATE".to_string(),
            hard_assets_score: 50.0,
            precious_metals_score: 50.0,
            commodity_score: 50.0,
            foreign_revenue_score: 50.0,
            pricing_power_score: 50.0,
            debt_structure_score: 50.0,
            essential_services_score: 50.0,
            scenario_gradual: total,
            scenario_rapid: total,
            scenario_hyper: total,
            scoring_version: "1.0.0".to_string(),
        }
    }

    async fn company(store: &CompanyStore, ticker: &str) -> String {
        store
            .upsert(CompanyInput {
                ticker: ticker.to_string(),
                name: ticker.to_string(),
                sector: Some("Materials".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_date() {
        let (companies, scores) = setup().await;
        let id = company(&companies, "NEM").await;

        let first = scores.upsert(score_input(&id, "2026-07-01", 70.0)).await.unwrap();
        let second = scores.upsert(score_input(&id, "2026-07-01", 75.0)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.total_score, 75.0);

        let history = scores.history_for_company(&id, None, None, 10).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_latest_two_ordering() {
        let (companies, scores) = setup().await;
        let id = company(&companies, "NEM").await;

        scores.upsert(score_input(&id, "2026-07-01", 60.0)).await.unwrap();
        scores.upsert(score_input(&id, "2026-07-02", 50.0)).await.unwrap();

        let latest = scores.latest_two_for_company(&id).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].total_score, 50.0);
        assert_eq!(latest[1].total_score, 60.0);
    }

    #[tokio::test]
    async fn test_movers_over_window() {
        let (companies, scores) = setup().await;
        let up = company(&companies, "NEM").await;
        let down = company(&companies, "JPM").await;

        scores.upsert(score_input(&up, "2026-07-01", 60.0)).await.unwrap();
        scores.upsert(score_input(&up, "2026-07-08", 70.0)).await.unwrap();
        scores.upsert(score_input(&down, "2026-07-01", 50.0)).await.unwrap();
        scores.upsert(score_input(&down, "2026-07-08", 42.0)).await.unwrap();

        let movers = scores.movers(7).await.unwrap();
        assert_eq!(movers.len(), 2);
        assert_eq!(movers[0].ticker, "NEM");
        assert!((movers[0].delta - 10.0).abs() < 1e-9);
        assert_eq!(movers[1].ticker, "JPM");
        assert!((movers[1].delta + 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rankings_by_scenario() {
        let (companies, scores) = setup().await;
        let a = company(&companies, "AAA").await;
        let b = company(&companies, "BBB").await;

        let mut input = score_input(&a, "2026-07-01", 60.0);
        input.scenario_hyper = 90.0;
        scores.upsert(input).await.unwrap();

        let mut input = score_input(&b, "2026-07-01", 80.0);
        input.scenario_hyper = 40.0;
        scores.upsert(input).await.unwrap();

        let by_total = scores.rankings("current", None, None, 10).await.unwrap();
        assert_eq!(by_total[0].ticker, "BBB");

        let by_hyper = scores.rankings("hyper", None, None, 10).await.unwrap();
        assert_eq!(by_hyper[0].ticker, "AAA");
    }

    #[tokio::test]
    async fn test_tier_distribution_counts_latest_only() {
        let (companies, scores) = setup().await;
        let id = company(&companies, "NEM").await;

        let mut early = score_input(&id, "2026-07-01", 80.0);
        early.tier = "FORTRESS".to_string();
        scores.upsert(early).await.unwrap();

        let mut late = score_input(&id, "2026-07-02", 60.0);
        late.tier = "MODERATE".to_string();
        scores.upsert(late).await.unwrap();

        let dist = scores.tier_distribution().await.unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].tier.as_deref(), Some("MODERATE"));
        assert_eq!(dist[0].count, 1);
    }
}
