use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<i64>,
    pub country: Option<String>,
    pub exchange: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub cik: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInput {
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<i64>,
    pub country: Option<String>,
    pub exchange: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub cik: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Fundamental {
    pub id: String,
    pub company_id: String,
    pub fiscal_year: i64,
    pub fiscal_quarter: Option<i64>,
    pub report_type: Option<String>,

    // Balance sheet
    pub total_assets: Option<i64>,
    pub tangible_assets: Option<i64>,
    pub intangible_assets: Option<i64>,
    pub current_assets: Option<i64>,
    pub total_liabilities: Option<i64>,
    pub total_debt: Option<i64>,
    pub cash_and_equivalents: Option<i64>,

    // Debt structure
    pub short_term_debt: Option<i64>,
    pub long_term_debt: Option<i64>,
    pub fixed_rate_debt_pct: Option<f64>,
    pub floating_rate_debt_pct: Option<f64>,
    pub avg_debt_maturity_years: Option<f64>,
    pub avg_interest_rate: Option<f64>,

    // Revenue breakdown
    pub total_revenue: Option<i64>,
    pub domestic_revenue: Option<i64>,
    pub domestic_revenue_pct: Option<f64>,
    pub foreign_revenue: Option<i64>,
    pub foreign_revenue_pct: Option<f64>,
    /// JSON map of region name to revenue.
    pub revenue_by_region: Option<String>,

    // Commodity / asset exposure
    pub commodity_revenue: Option<i64>,
    pub commodity_revenue_pct: Option<f64>,
    pub precious_metals_revenue: Option<i64>,
    pub precious_metals_revenue_pct: Option<f64>,

    // Mining reserves
    pub proven_reserves_oz: Option<i64>,
    pub probable_reserves_oz: Option<i64>,
    pub reserve_value_usd: Option<i64>,
    pub production_cost_per_oz: Option<f64>,

    // Profitability
    pub gross_profit: Option<i64>,
    pub gross_margin: Option<f64>,
    pub operating_income: Option<i64>,
    pub operating_margin: Option<f64>,
    pub net_income: Option<i64>,
    pub net_margin: Option<f64>,

    // Stability
    pub gross_margin_5yr_avg: Option<f64>,
    pub gross_margin_5yr_std: Option<f64>,
    pub revenue_growth_3yr_cagr: Option<f64>,

    pub filing_url: Option<String>,
    pub filing_date: Option<NaiveDate>,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalInput {
    pub company_id: String,
    pub fiscal_year: i64,
    pub fiscal_quarter: Option<i64>,
    pub report_type: Option<String>,

    pub total_assets: Option<i64>,
    pub tangible_assets: Option<i64>,
    pub intangible_assets: Option<i64>,
    pub current_assets: Option<i64>,
    pub total_liabilities: Option<i64>,
    pub total_debt: Option<i64>,
    pub cash_and_equivalents: Option<i64>,

    pub short_term_debt: Option<i64>,
    pub long_term_debt: Option<i64>,
    pub fixed_rate_debt_pct: Option<f64>,
    pub floating_rate_debt_pct: Option<f64>,
    pub avg_debt_maturity_years: Option<f64>,
    pub avg_interest_rate: Option<f64>,

    pub total_revenue: Option<i64>,
    pub domestic_revenue: Option<i64>,
    pub domestic_revenue_pct: Option<f64>,
    pub foreign_revenue: Option<i64>,
    pub foreign_revenue_pct: Option<f64>,
    pub revenue_by_region: Option<String>,

    pub commodity_revenue: Option<i64>,
    pub commodity_revenue_pct: Option<f64>,
    pub precious_metals_revenue: Option<i64>,
    pub precious_metals_revenue_pct: Option<f64>,

    pub proven_reserves_oz: Option<i64>,
    pub probable_reserves_oz: Option<i64>,
    pub reserve_value_usd: Option<i64>,
    pub production_cost_per_oz: Option<f64>,

    pub gross_profit: Option<i64>,
    pub gross_margin: Option<f64>,
    pub operating_income: Option<i64>,
    pub operating_margin: Option<f64>,
    pub net_income: Option<i64>,
    pub net_margin: Option<f64>,

    pub gross_margin_5yr_avg: Option<f64>,
    pub gross_margin_5yr_std: Option<f64>,
    pub revenue_growth_3yr_cagr: Option<f64>,

    pub filing_url: Option<String>,
    pub filing_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SurvivalScore {
    pub id: String,
    pub company_id: String,
    pub score_date: NaiveDate,

    pub total_score: f64,
    pub confidence: Option<f64>,
    pub tier: Option<String>,

    pub hard_assets_score: Option<f64>,
    pub precious_metals_score: Option<f64>,
    pub commodity_score: Option<f64>,
    pub foreign_revenue_score: Option<f64>,
    pub pricing_power_score: Option<f64>,
    pub debt_structure_score: Option<f64>,
    pub essential_services_score: Option<f64>,

    pub scenario_gradual: Option<f64>,
    pub scenario_rapid: Option<f64>,
    pub scenario_hyper: Option<f64>,

    pub scoring_version: Option<String>,
    pub created_at: Option<String>,
}

/// One day's score for one company, as produced by the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalScoreInput {
    pub company_id: String,
    pub score_date: NaiveDate,

    pub total_score: f64,
    pub confidence: f64,
    pub tier: String,

    pub hard_assets_score: f64,
    pub precious_metals_score: f64,
    pub commodity_score: f64,
    pub foreign_revenue_score: f64,
    pub pricing_power_score: f64,
    pub debt_structure_score: f64,
    pub essential_services_score: f64,

    pub scenario_gradual: f64,
    pub scenario_rapid: f64,
    pub scenario_hyper: f64,

    pub scoring_version: String,
}

/// Company joined with its most recent score, for list/ranking reads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyWithScore {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<i64>,
    pub exchange: Option<String>,

    pub total_score: Option<f64>,
    pub confidence: Option<f64>,
    pub tier: Option<String>,
    pub score_date: Option<NaiveDate>,
    pub scenario_gradual: Option<f64>,
    pub scenario_rapid: Option<f64>,
    pub scenario_hyper: Option<f64>,
}

/// A company's score delta over a lookback window.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoreMover {
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub current_score: f64,
    pub previous_score: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TierCount {
    pub tier: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MacroData {
    pub id: String,
    pub data_date: NaiveDate,

    pub dxy_value: Option<f64>,
    pub dxy_change_1d: Option<f64>,
    pub dxy_change_ytd: Option<f64>,

    pub gold_price: Option<f64>,
    pub silver_price: Option<f64>,
    pub platinum_price: Option<f64>,

    pub oil_wti_price: Option<f64>,
    pub copper_price: Option<f64>,

    pub m2_supply_trillions: Option<f64>,
    pub m2_yoy_change: Option<f64>,

    pub fed_funds_rate: Option<f64>,
    pub ten_year_yield: Option<f64>,

    pub cpi_yoy: Option<f64>,
    pub pce_yoy: Option<f64>,

    pub eur_usd: Option<f64>,
    pub usd_jpy: Option<f64>,
    pub gbp_usd: Option<f64>,
    pub usd_cny: Option<f64>,

    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroDataInput {
    pub data_date: NaiveDate,

    pub dxy_value: Option<f64>,
    pub dxy_change_1d: Option<f64>,
    pub dxy_change_ytd: Option<f64>,

    pub gold_price: Option<f64>,
    pub silver_price: Option<f64>,
    pub platinum_price: Option<f64>,

    pub oil_wti_price: Option<f64>,
    pub copper_price: Option<f64>,

    pub m2_supply_trillions: Option<f64>,
    pub m2_yoy_change: Option<f64>,

    pub fed_funds_rate: Option<f64>,
    pub ten_year_yield: Option<f64>,

    pub cpi_yoy: Option<f64>,
    pub pce_yoy: Option<f64>,

    pub eur_usd: Option<f64>,
    pub usd_jpy: Option<f64>,
    pub gbp_usd: Option<f64>,
    pub usd_cny: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,

    pub total_value: Option<f64>,
    pub survival_score: Option<f64>,
    pub scenario_gradual_score: Option<f64>,
    pub scenario_rapid_score: Option<f64>,
    pub scenario_hyper_score: Option<f64>,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioHolding {
    pub id: String,
    pub portfolio_id: String,
    pub company_id: String,

    pub shares: f64,
    pub cost_basis: Option<f64>,
    pub cost_per_share: Option<f64>,

    pub current_price: Option<f64>,
    pub current_value: Option<f64>,
    pub gain_loss: Option<f64>,
    pub gain_loss_pct: Option<f64>,

    pub notes: Option<String>,
    pub added_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoldingInput {
    pub company_id: String,
    pub shares: f64,
    pub cost_basis: Option<f64>,
    pub cost_per_share: Option<f64>,
    pub current_price: Option<f64>,
    pub current_value: Option<f64>,
    pub notes: Option<String>,
}

/// Holding joined with company identity and the latest survival score,
/// the read shape the portfolio aggregator works from.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HoldingWithScore {
    pub holding_id: String,
    pub company_id: String,
    pub ticker: String,
    pub sector: Option<String>,
    pub shares: f64,
    pub current_value: Option<f64>,

    pub total_score: Option<f64>,
    pub tier: Option<String>,

    pub hard_assets_score: Option<f64>,
    pub precious_metals_score: Option<f64>,
    pub commodity_score: Option<f64>,
    pub foreign_revenue_score: Option<f64>,
    pub pricing_power_score: Option<f64>,
    pub debt_structure_score: Option<f64>,
    pub essential_services_score: Option<f64>,

    pub scenario_gradual: Option<f64>,
    pub scenario_rapid: Option<f64>,
    pub scenario_hyper: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: String,
    pub user_id: String,
    pub company_id: Option<String>,
    pub portfolio_id: Option<String>,

    pub alert_type: String,

    pub threshold_value: Option<f64>,
    pub threshold_direction: Option<String>,
    pub change_percent: Option<f64>,

    pub is_active: bool,
    pub last_triggered_at: Option<String>,
    pub trigger_count: i64,

    pub notify_email: bool,
    pub notify_push: bool,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertInput {
    pub user_id: String,
    pub company_id: Option<String>,
    pub portfolio_id: Option<String>,
    pub alert_type: String,
    pub threshold_value: Option<f64>,
    pub threshold_direction: Option<String>,
    pub change_percent: Option<f64>,
    pub notify_email: bool,
    pub notify_push: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoringRun {
    pub id: String,
    pub run_date: NaiveDate,

    pub companies_scored: Option<i64>,
    pub companies_failed: Option<i64>,
    pub avg_score: Option<f64>,
    pub median_score: Option<f64>,

    pub duration_seconds: Option<i64>,
    pub scoring_version: Option<String>,

    pub status: Option<String>,
    pub error_message: Option<String>,

    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}
