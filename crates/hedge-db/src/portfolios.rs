use anyhow::Result;

use crate::db::{new_id, HedgeDb};
use crate::models::{HoldingInput, HoldingWithScore, Portfolio, PortfolioHolding};

#[derive(Clone)]
pub struct PortfolioStore {
    db: HedgeDb,
}

impl PortfolioStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Create a portfolio. A user's first portfolio becomes their primary.
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Portfolio> {
        let id = new_id();
        let portfolio = sqlx::query_as::<_, Portfolio>(
            r#"
            INSERT INTO portfolios (id, user_id, name, description, is_primary)
            VALUES (?, ?, ?, ?,
                    NOT EXISTS (SELECT 1 FROM portfolios WHERE user_id = ?))
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(portfolio)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Portfolio>> {
        let portfolio = sqlx::query_as::<_, Portfolio>("SELECT * FROM portfolios WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(portfolio)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Portfolio>> {
        let portfolios = sqlx::query_as::<_, Portfolio>(
            "SELECT * FROM portfolios WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(portfolios)
    }

    /// Add a holding, or replace the position when the company is already
    /// held in this portfolio.
    pub async fn upsert_holding(
        &self,
        portfolio_id: &str,
        input: HoldingInput,
    ) -> Result<PortfolioHolding> {
        let id = new_id();
        let gain_loss = match (input.current_value, input.cost_basis) {
            (Some(value), Some(cost)) => Some(value - cost),
            _ => None,
        };
        let gain_loss_pct = match (gain_loss, input.cost_basis) {
            (Some(gain), Some(cost)) if cost != 0.0 => Some(gain / cost * 100.0),
            _ => None,
        };

        let holding = sqlx::query_as::<_, PortfolioHolding>(
            r#"
            INSERT INTO portfolio_holdings
            (id, portfolio_id, company_id, shares, cost_basis, cost_per_share,
             current_price, current_value, gain_loss, gain_loss_pct, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(portfolio_id, company_id) DO UPDATE SET
                shares = excluded.shares,
                cost_basis = excluded.cost_basis,
                cost_per_share = excluded.cost_per_share,
                current_price = excluded.current_price,
                current_value = excluded.current_value,
                gain_loss = excluded.gain_loss,
                gain_loss_pct = excluded.gain_loss_pct,
                notes = excluded.notes,
                updated_at = datetime('now')
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(portfolio_id)
        .bind(&input.company_id)
        .bind(input.shares)
        .bind(input.cost_basis)
        .bind(input.cost_per_share)
        .bind(input.current_price)
        .bind(input.current_value)
        .bind(gain_loss)
        .bind(gain_loss_pct)
        .bind(&input.notes)
        .fetch_one(self.db.pool())
        .await?;

        Ok(holding)
    }

    pub async fn holdings(&self, portfolio_id: &str) -> Result<Vec<PortfolioHolding>> {
        let holdings = sqlx::query_as::<_, PortfolioHolding>(
            "SELECT * FROM portfolio_holdings WHERE portfolio_id = ? ORDER BY added_at",
        )
        .bind(portfolio_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(holdings)
    }

    /// Holdings joined with company identity and each company's latest
    /// survival score. This is the aggregator's working set.
    pub async fn holdings_with_scores(&self, portfolio_id: &str) -> Result<Vec<HoldingWithScore>> {
        let rows = sqlx::query_as::<_, HoldingWithScore>(
            r#"
            SELECT h.id AS holding_id, h.company_id, c.ticker, c.sector,
                   h.shares, h.current_value,
                   s.total_score, s.tier,
                   s.hard_assets_score, s.precious_metals_score, s.commodity_score,
                   s.foreign_revenue_score, s.pricing_power_score, s.debt_structure_score,
                   s.essential_services_score,
                   s.scenario_gradual, s.scenario_rapid, s.scenario_hyper
            FROM portfolio_holdings h
            JOIN companies c ON c.id = h.company_id
            LEFT JOIN survival_scores s ON s.company_id = h.company_id
             AND s.score_date = (SELECT MAX(s2.score_date) FROM survival_scores s2 WHERE s2.company_id = h.company_id)
            WHERE h.portfolio_id = ?
            ORDER BY h.added_at
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// Write back the cached aggregate columns after an analysis pass.
    pub async fn update_cached_scores(
        &self,
        portfolio_id: &str,
        total_value: f64,
        survival_score: Option<f64>,
        scenario_gradual: Option<f64>,
        scenario_rapid: Option<f64>,
        scenario_hyper: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE portfolios
            SET total_value = ?,
                survival_score = ?,
                scenario_gradual_score = ?,
                scenario_rapid_score = ?,
                scenario_hyper_score = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(total_value)
        .bind(survival_score)
        .bind(scenario_gradual)
        .bind(scenario_rapid)
        .bind(scenario_hyper)
        .bind(portfolio_id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn delete_holding(&self, portfolio_id: &str, company_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM portfolio_holdings WHERE portfolio_id = ? AND company_id = ?")
            .bind(portfolio_id)
            .bind(company_id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companies::CompanyStore;
    use crate::models::CompanyInput;

    async fn setup() -> (CompanyStore, PortfolioStore) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        (CompanyStore::new(db.clone()), PortfolioStore::new(db))
    }

    #[tokio::test]
    async fn test_first_portfolio_is_primary() {
        let (_, portfolios) = setup().await;

        let first = portfolios.create("user-1", "Main", None).await.unwrap();
        let second = portfolios.create("user-1", "Trading", None).await.unwrap();
        let other = portfolios.create("user-2", "Main", None).await.unwrap();

        assert!(first.is_primary);
        assert!(!second.is_primary);
        assert!(other.is_primary);
    }

    #[tokio::test]
    async fn test_holding_upsert_replaces_position() {
        let (companies, portfolios) = setup().await;
        let company = companies
            .upsert(CompanyInput {
                ticker: "NEM".to_string(),
                name: "Newmont".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        let first = portfolios
            .upsert_holding(
                &portfolio.id,
                HoldingInput {
                    company_id: company.id.clone(),
                    shares: 100.0,
                    cost_basis: Some(4_000.0),
                    current_value: Some(5_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.gain_loss, Some(1_000.0));

        let second = portfolios
            .upsert_holding(
                &portfolio.id,
                HoldingInput {
                    company_id: company.id.clone(),
                    shares: 150.0,
                    cost_basis: Some(6_000.0),
                    current_value: Some(7_500.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.shares, 150.0);

        let holdings = portfolios.holdings(&portfolio.id).await.unwrap();
        assert_eq!(holdings.len(), 1);
    }
}
