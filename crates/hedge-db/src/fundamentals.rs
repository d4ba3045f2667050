use anyhow::Result;

use crate::db::{new_id, HedgeDb};
use crate::models::{Fundamental, FundamentalInput};

#[derive(Clone)]
pub struct FundamentalStore {
    db: HedgeDb,
}

impl FundamentalStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Insert or replace the snapshot for a fiscal period.
    pub async fn upsert(&self, input: FundamentalInput) -> Result<Fundamental> {
        let id = new_id();
        let row = sqlx::query_as::<_, Fundamental>(
            r#"
            INSERT INTO fundamentals
            (id, company_id, fiscal_year, fiscal_quarter, report_type,
             total_assets, tangible_assets, intangible_assets, current_assets,
             total_liabilities, total_debt, cash_and_equivalents,
             short_term_debt, long_term_debt, fixed_rate_debt_pct, floating_rate_debt_pct,
             avg_debt_maturity_years, avg_interest_rate,
             total_revenue, domestic_revenue, domestic_revenue_pct,
             foreign_revenue, foreign_revenue_pct, revenue_by_region,
             commodity_revenue, commodity_revenue_pct,
             precious_metals_revenue, precious_metals_revenue_pct,
             proven_reserves_oz, probable_reserves_oz, reserve_value_usd, production_cost_per_oz,
             gross_profit, gross_margin, operating_income, operating_margin, net_income, net_margin,
             gross_margin_5yr_avg, gross_margin_5yr_std, revenue_growth_3yr_cagr,
             filing_url, filing_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company_id, fiscal_year, fiscal_quarter) DO UPDATE SET
                report_type = excluded.report_type,
                total_assets = excluded.total_assets,
                tangible_assets = excluded.tangible_assets,
                intangible_assets = excluded.intangible_assets,
                current_assets = excluded.current_assets,
                total_liabilities = excluded.total_liabilities,
                total_debt = excluded.total_debt,
                cash_and_equivalents = excluded.cash_and_equivalents,
                short_term_debt = excluded.short_term_debt,
                long_term_debt = excluded.long_term_debt,
                fixed_rate_debt_pct = excluded.fixed_rate_debt_pct,
                floating_rate_debt_pct = excluded.floating_rate_debt_pct,
                avg_debt_maturity_years = excluded.avg_debt_maturity_years,
                avg_interest_rate = excluded.avg_interest_rate,
                total_revenue = excluded.total_revenue,
                domestic_revenue = excluded.domestic_revenue,
                domestic_revenue_pct = excluded.domestic_revenue_pct,
                foreign_revenue = excluded.foreign_revenue,
                foreign_revenue_pct = excluded.foreign_revenue_pct,
                revenue_by_region = excluded.revenue_by_region,
                commodity_revenue = excluded.commodity_revenue,
                commodity_revenue_pct = excluded.commodity_revenue_pct,
                precious_metals_revenue = excluded.precious_metals_revenue,
                precious_metals_revenue_pct = excluded.precious_metals_revenue_pct,
                proven_reserves_oz = excluded.proven_reserves_oz,
                probable_reserves_oz = excluded.probable_reserves_oz,
                reserve_value_usd = excluded.reserve_value_usd,
                production_cost_per_oz = excluded.production_cost_per_oz,
                gross_profit = excluded.gross_profit,
                gross_margin = excluded.gross_margin,
                operating_income = excluded.operating_income,
                operating_margin = excluded.operating_margin,
                net_income = excluded.net_income,
                net_margin = excluded.net_margin,
                gross_margin_5yr_avg = excluded.gross_margin_5yr_avg,
                gross_margin_5yr_std = excluded.gross_margin_5yr_std,
                revenue_growth_3yr_cagr = excluded.revenue_growth_3yr_cagr,
                filing_url = excluded.filing_url,
                filing_date = excluded.filing_date,
                updated_at = datetime('now')
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&input.company_id)
        .bind(input.fiscal_year)
        .bind(input.fiscal_quarter)
        .bind(&input.report_type)
        .bind(input.total_assets)
        .bind(input.tangible_assets)
        .bind(input.intangible_assets)
        .bind(input.current_assets)
        .bind(input.total_liabilities)
        .bind(input.total_debt)
        .bind(input.cash_and_equivalents)
        .bind(input.short_term_debt)
        .bind(input.long_term_debt)
        .bind(input.fixed_rate_debt_pct)
        .bind(input.floating_rate_debt_pct)
        .bind(input.avg_debt_maturity_years)
        .bind(input.avg_interest_rate)
        .bind(input.total_revenue)
        .bind(input.domestic_revenue)
        .bind(input.domestic_revenue_pct)
        .bind(input.foreign_revenue)
        .bind(input.foreign_revenue_pct)
        .bind(&input.revenue_by_region)
        .bind(input.commodity_revenue)
        .bind(input.commodity_revenue_pct)
        .bind(input.precious_metals_revenue)
        .bind(input.precious_metals_revenue_pct)
        .bind(input.proven_reserves_oz)
        .bind(input.probable_reserves_oz)
        .bind(input.reserve_value_usd)
        .bind(input.production_cost_per_oz)
        .bind(input.gross_profit)
        .bind(input.gross_margin)
        .bind(input.operating_income)
        .bind(input.operating_margin)
        .bind(input.net_income)
        .bind(input.net_margin)
        .bind(input.gross_margin_5yr_avg)
        .bind(input.gross_margin_5yr_std)
        .bind(input.revenue_growth_3yr_cagr)
        .bind(&input.filing_url)
        .bind(input.filing_date)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row)
    }

    /// Most recent snapshot for a company: latest fiscal year, then latest
    /// quarter, annual reports (NULL quarter) last.
    pub async fn latest_for_company(&self, company_id: &str) -> Result<Option<Fundamental>> {
        let row = sqlx::query_as::<_, Fundamental>(
            r#"
            SELECT * FROM fundamentals
            WHERE company_id = ?
            ORDER BY fiscal_year DESC, fiscal_quarter DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row)
    }

    /// Snapshot history for a company, newest first.
    pub async fn history_for_company(&self, company_id: &str, limit: i64) -> Result<Vec<Fundamental>> {
        let rows = sqlx::query_as::<_, Fundamental>(
            r#"
            SELECT * FROM fundamentals
            WHERE company_id = ?
            ORDER BY fiscal_year DESC, fiscal_quarter DESC NULLS LAST
            LIMIT ?
            "#,
        )
        .bind(company_id)
        .bind(limit)
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

    async fn setup() -> (CompanyStore, FundamentalStore) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        (
            CompanyStore::new(db.clone()),
            FundamentalStore::new(db),
        )
    }

    #[tokio::test]
    async fn test_latest_prefers_newer_year_and_quarter() {
        let (companies, fundamentals) = setup().await;
        let company = companies
            .upsert(CompanyInput {
                ticker: "XOM".to_string(),
                name: "Exxon Mobil".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        for (fy, fq, revenue) in [(2023, Some(4), 80), (2024, None, 330), (2024, Some(1), 83)] {
            fundamentals
                .upsert(FundamentalInput {
                    company_id: company.id.clone(),
                    fiscal_year: fy,
                    fiscal_quarter: fq,
                    total_revenue: Some(revenue * 1_000_000_000),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let latest = fundamentals
            .latest_for_company(&company.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.fiscal_year, 2024);
        assert_eq!(latest.fiscal_quarter, Some(1));
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_period() {
        let (companies, fundamentals) = setup().await;
        let company = companies
            .upsert(CompanyInput {
                ticker: "NEM".to_string(),
                name: "Newmont".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let input = FundamentalInput {
            company_id: company.id.clone(),
            fiscal_year: 2024,
            fiscal_quarter: Some(2),
            gross_margin: Some(30.0),
            ..Default::default()
        };
        let first = fundamentals.upsert(input.clone()).await.unwrap();

        let mut revised = input;
        revised.gross_margin = Some(35.0);
        let second = fundamentals.upsert(revised).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.gross_margin, Some(35.0));
        assert_eq!(
            fundamentals.history_for_company(&company.id, 10).await.unwrap().len(),
            1
        );
    }
}
