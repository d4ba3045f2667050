use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{new_id, HedgeDb};
use crate::models::{Company, CompanyInput, CompanyWithScore};

/// Sort keys accepted by the company list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanySort {
    Score,
    Ticker,
    MarketCap,
    Name,
}

impl CompanySort {
    pub fn parse(value: &str) -> Option<CompanySort> {
        match value {
            "score" => Some(CompanySort::Score),
            "ticker" => Some(CompanySort::Ticker),
            "market_cap" => Some(CompanySort::MarketCap),
            "name" => Some(CompanySort::Name),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            CompanySort::Score => "s.total_score",
            CompanySort::Ticker => "c.ticker",
            CompanySort::MarketCap => "c.market_cap",
            CompanySort::Name => "c.name",
        }
    }
}

/// Filters for the paginated company list.
#[derive(Debug, Clone, Default)]
pub struct CompanyListQuery {
    pub sector: Option<String>,
    pub tier: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub search: Option<String>,
    pub sort: Option<CompanySort>,
    pub sort_desc: bool,
    pub limit: i64,
    pub offset: i64,
}

const LATEST_SCORE_JOIN: &str = "LEFT JOIN survival_scores s ON s.company_id = c.id \
     AND s.score_date = (SELECT MAX(s2.score_date) FROM survival_scores s2 WHERE s2.company_id = c.id)";

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, query: &'a CompanyListQuery) {
    qb.push(" WHERE c.is_active = 1");

    if let Some(sector) = &query.sector {
        qb.push(" AND c.sector = ").push_bind(sector);
    }
    if let Some(tier) = &query.tier {
        qb.push(" AND s.tier = ").push_bind(tier);
    }
    if let Some(min_score) = query.min_score {
        qb.push(" AND s.total_score >= ").push_bind(min_score);
    }
    if let Some(max_score) = query.max_score {
        qb.push(" AND s.total_score <= ").push_bind(max_score);
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (c.ticker LIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[derive(Clone)]
pub struct CompanyStore {
    db: HedgeDb,
}

impl CompanyStore {
    pub fn new(db: HedgeDb) -> Self {
        Self { db }
    }

    /// Insert a company, or refresh its mutable profile fields when the
    /// ticker already exists.
    pub async fn upsert(&self, input: CompanyInput) -> Result<Company> {
        let id = new_id();
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies
            (id, ticker, name, sector, industry, market_cap, country, exchange, description, website, logo_url, cik)
            VALUES (?, ?, ?, ?, ?, ?, COALESCE(?, 'USA'), ?, ?, ?, ?, ?)
            ON CONFLICT(ticker) DO UPDATE SET
                name = excluded.name,
                sector = excluded.sector,
                industry = excluded.industry,
                market_cap = excluded.market_cap,
                exchange = excluded.exchange,
                description = excluded.description,
                website = excluded.website,
                logo_url = excluded.logo_url,
                cik = excluded.cik,
                updated_at = datetime('now')
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&input.ticker)
        .bind(&input.name)
        .bind(&input.sector)
        .bind(&input.industry)
        .bind(input.market_cap)
        .bind(&input.country)
        .bind(&input.exchange)
        .bind(&input.description)
        .bind(&input.website)
        .bind(&input.logo_url)
        .bind(&input.cik)
        .fetch_one(self.db.pool())
        .await?;

        Ok(company)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(company)
    }

    pub async fn get_by_ticker(&self, ticker: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE ticker = ?")
            .bind(ticker)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(company)
    }

    /// All active companies, the batch scorer's universe.
    pub async fn list_active(&self) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE is_active = 1 ORDER BY ticker",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(companies)
    }

    /// Soft delete; scores and fundamentals stay behind for history.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE companies SET is_active = 0, updated_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Filtered, sorted, paginated company list joined with each company's
    /// latest score.
    pub async fn list_with_scores(&self, query: &CompanyListQuery) -> Result<Vec<CompanyWithScore>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT c.id, c.ticker, c.name, c.sector, c.industry, c.market_cap, c.exchange, \
             s.total_score, s.confidence, s.tier, s.score_date, \
             s.scenario_gradual, s.scenario_rapid, s.scenario_hyper \
             FROM companies c ",
        );
        qb.push(LATEST_SCORE_JOIN);
        push_filters(&mut qb, query);

        let direction = if query.sort_desc { "DESC" } else { "ASC" };
        let column = query.sort.unwrap_or(CompanySort::Score).column();
        qb.push(format!(" ORDER BY {column} {direction}, c.ticker ASC"));
        qb.push(" LIMIT ").push_bind(query.limit);
        qb.push(" OFFSET ").push_bind(query.offset);

        let rows = qb
            .build_query_as::<CompanyWithScore>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }

    /// Total row count for the same filters, for pagination metadata.
    pub async fn count_with_scores(&self, query: &CompanyListQuery) -> Result<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM companies c ");
        qb.push(LATEST_SCORE_JOIN);
        push_filters(&mut qb, query);

        let (count,): (i64,) = qb.build_query_as().fetch_one(self.db.pool()).await?;

        Ok(count)
    }
}
