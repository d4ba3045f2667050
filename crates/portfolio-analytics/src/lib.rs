//! Value-weighted portfolio roll-up and devaluation scenario projection.
//!
//! Nothing here is persisted except the cached aggregate columns on the
//! portfolio row; analysis and projections are computed on read from each
//! holding's latest survival score.

use anyhow::{anyhow, Result};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use hedge_db::{HedgeDb, HoldingWithScore, Portfolio, PortfolioStore};
use scoring_engine::{FactorScores, Scenario, ScenarioScores, Tier};

/// Score assumed for a holding whose company has never been scored.
const UNSCORED_DEFAULT: Decimal = dec!(50);

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64)
}

/// One holding's contribution to the analysis, largest score first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingAnalysis {
    pub ticker: String,
    pub sector: Option<String>,
    pub value: Decimal,
    pub weight_pct: Decimal,
    pub score: Decimal,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorAllocation {
    pub sector: String,
    pub value: Decimal,
    pub weight_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub portfolio_id: String,
    pub overall_score: Option<Decimal>,
    pub tier: Option<Tier>,
    pub total_value: Decimal,
    pub factor_breakdown: Option<FactorScores>,
    pub scenario_scores: Option<ScenarioScores>,
    pub holdings: Vec<HoldingAnalysis>,
    pub sector_allocation: Vec<SectorAllocation>,
}

/// Overrides for the scenario endpoint's `custom_params`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    pub dollar_decline_pct: Option<Decimal>,
    pub timeline_months: Option<u32>,
    pub inflation_rate_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionParams {
    pub dollar_decline_pct: Decimal,
    pub timeline_months: u32,
    pub inflation_rate_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingProjection {
    pub ticker: String,
    pub current_value: Decimal,
    pub scenario_score: Decimal,
    pub projected_nominal: Decimal,
    pub projected_real: Decimal,
    pub real_change_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub scenario: Scenario,
    pub params: ProjectionParams,
    pub current_value: Decimal,
    pub projected_nominal: Decimal,
    pub projected_real: Decimal,
    pub real_change_pct: Decimal,
    pub holdings: Vec<HoldingProjection>,
}

struct ScoredHolding {
    ticker: String,
    sector: Option<String>,
    value: Decimal,
    total: Decimal,
    factors: FactorScores,
    scenarios: ScenarioScores,
}

impl ScoredHolding {
    /// Fallback chain: scenario score, then total, then the unscored
    /// default.
    fn from_row(row: &HoldingWithScore) -> ScoredHolding {
        let value = decimal(row.current_value).unwrap_or(Decimal::ZERO);
        let total = decimal(row.total_score).unwrap_or(UNSCORED_DEFAULT);

        let factor = |field: Option<f64>| decimal(field).unwrap_or(UNSCORED_DEFAULT);
        let factors = FactorScores {
            hard_assets: factor(row.hard_assets_score),
            precious_metals: factor(row.precious_metals_score),
            commodities: factor(row.commodity_score),
            foreign_revenue: factor(row.foreign_revenue_score),
            pricing_power: factor(row.pricing_power_score),
            debt_structure: factor(row.debt_structure_score),
            essential_services: factor(row.essential_services_score),
        };

        let scenario = |field: Option<f64>| decimal(field).unwrap_or(total);
        let scenarios = ScenarioScores {
            current: total,
            gradual: scenario(row.scenario_gradual),
            rapid: scenario(row.scenario_rapid),
            hyper: scenario(row.scenario_hyper),
        };

        ScoredHolding {
            ticker: row.ticker.clone(),
            sector: row.sector.clone(),
            value,
            total,
            factors,
            scenarios,
        }
    }
}

#[derive(Clone)]
pub struct PortfolioAnalyzer {
    portfolios: PortfolioStore,
}

impl PortfolioAnalyzer {
    pub fn new(db: HedgeDb) -> Self {
        Self {
            portfolios: PortfolioStore::new(db),
        }
    }

    /// Value-weighted analysis of a portfolio. Also refreshes the cached
    /// aggregate columns on the portfolio row.
    pub async fn analyze(&self, portfolio: &Portfolio) -> Result<PortfolioAnalysis> {
        let rows = self.portfolios.holdings_with_scores(&portfolio.id).await?;
        let holdings: Vec<ScoredHolding> = rows.iter().map(ScoredHolding::from_row).collect();

        let total_value: Decimal = holdings.iter().map(|h| h.value).sum();

        if holdings.is_empty() || total_value <= Decimal::ZERO {
            self.portfolios
                .update_cached_scores(&portfolio.id, 0.0, None, None, None, None)
                .await?;
            return Ok(PortfolioAnalysis {
                portfolio_id: portfolio.id.clone(),
                overall_score: None,
                tier: None,
                total_value: Decimal::ZERO,
                factor_breakdown: None,
                scenario_scores: None,
                holdings: holdings
                    .iter()
                    .map(|h| HoldingAnalysis {
                        ticker: h.ticker.clone(),
                        sector: h.sector.clone(),
                        value: h.value,
                        weight_pct: Decimal::ZERO,
                        score: h.total,
                        tier: Tier::from_score(h.total),
                    })
                    .collect(),
                sector_allocation: Vec::new(),
            });
        }

        let weighted = |pick: &dyn Fn(&ScoredHolding) -> Decimal| {
            round2(
                holdings
                    .iter()
                    .map(|h| h.value * pick(h))
                    .sum::<Decimal>()
                    / total_value,
            )
        };

        let overall_score = weighted(&|h| h.total);
        let factor_breakdown = FactorScores {
            hard_assets: weighted(&|h| h.factors.hard_assets),
            precious_metals: weighted(&|h| h.factors.precious_metals),
            commodities: weighted(&|h| h.factors.commodities),
            foreign_revenue: weighted(&|h| h.factors.foreign_revenue),
            pricing_power: weighted(&|h| h.factors.pricing_power),
            debt_structure: weighted(&|h| h.factors.debt_structure),
            essential_services: weighted(&|h| h.factors.essential_services),
        };
        let scenario_scores = ScenarioScores {
            current: weighted(&|h| h.scenarios.current),
            gradual: weighted(&|h| h.scenarios.gradual),
            rapid: weighted(&|h| h.scenarios.rapid),
            hyper: weighted(&|h| h.scenarios.hyper),
        };

        let mut holding_analysis: Vec<HoldingAnalysis> = holdings
            .iter()
            .map(|h| HoldingAnalysis {
                ticker: h.ticker.clone(),
                sector: h.sector.clone(),
                value: h.value,
                weight_pct: round2(h.value / total_value * dec!(100)),
                score: h.total,
                tier: Tier::from_score(h.total),
            })
            .collect();
        holding_analysis.sort_by(|a, b| b.score.cmp(&a.score));

        let sector_allocation = sector_allocation(&holdings, total_value);

        self.portfolios
            .update_cached_scores(
                &portfolio.id,
                total_value.to_f64().unwrap_or(0.0),
                overall_score.to_f64(),
                scenario_scores.gradual.to_f64(),
                scenario_scores.rapid.to_f64(),
                scenario_scores.hyper.to_f64(),
            )
            .await?;

        tracing::debug!(
            "Analyzed portfolio {}: {} holdings, total value {}",
            portfolio.id,
            holding_analysis.len(),
            total_value
        );

        Ok(PortfolioAnalysis {
            portfolio_id: portfolio.id.clone(),
            overall_score: Some(overall_score),
            tier: Some(Tier::from_score(overall_score)),
            total_value,
            factor_breakdown: Some(factor_breakdown),
            scenario_scores: Some(scenario_scores),
            holdings: holding_analysis,
            sector_allocation,
        })
    }

    /// Project nominal and real portfolio value under a devaluation
    /// scenario. Not persisted; computed on read.
    pub async fn project_scenario(
        &self,
        portfolio: &Portfolio,
        scenario: Scenario,
        overrides: Option<ScenarioOverrides>,
    ) -> Result<ScenarioProjection> {
        // `current` carries no devaluation parameters; fall back to gradual
        // like the scenario catalogue does for unknown names.
        let scenario = match scenario {
            Scenario::Current => Scenario::Gradual,
            other => other,
        };
        let base = scenario
            .params()
            .ok_or_else(|| anyhow!("scenario {} has no projection parameters", scenario.as_str()))?;

        let overrides = overrides.unwrap_or_default();
        let params = ProjectionParams {
            dollar_decline_pct: overrides
                .dollar_decline_pct
                .unwrap_or(base.dollar_decline_pct),
            timeline_months: overrides.timeline_months.unwrap_or(base.timeline_months),
            inflation_rate_pct: overrides
                .inflation_rate_pct
                .unwrap_or(base.inflation_rate_pct),
        };

        let inflation = params.inflation_rate_pct / dec!(100);
        let years = Decimal::from(params.timeline_months) / dec!(12);

        // Fractional exponent: computed in f64, the rest stays in Decimal.
        let cumulative_inflation = Decimal::from_f64(
            (1.0 + inflation.to_f64().unwrap_or(0.0)).powf(years.to_f64().unwrap_or(0.0)),
        )
        .unwrap_or(Decimal::ONE);

        let rows = self.portfolios.holdings_with_scores(&portfolio.id).await?;

        let mut holdings = Vec::with_capacity(rows.len());
        let mut current_total = Decimal::ZERO;
        let mut nominal_total = Decimal::ZERO;
        let mut real_total = Decimal::ZERO;

        for row in &rows {
            let scored = ScoredHolding::from_row(row);
            let scenario_score = scored.scenarios.get(scenario);

            let protection_factor = scenario_score / dec!(100);
            let nominal_growth = Decimal::ONE + inflation * protection_factor * years;
            let projected_nominal = scored.value * nominal_growth;
            let projected_real = projected_nominal / cumulative_inflation;
            let real_change_pct = if scored.value > Decimal::ZERO {
                (projected_real / scored.value - Decimal::ONE) * dec!(100)
            } else {
                Decimal::ZERO
            };

            current_total += scored.value;
            nominal_total += projected_nominal;
            real_total += projected_real;

            holdings.push(HoldingProjection {
                ticker: scored.ticker,
                current_value: round2(scored.value),
                scenario_score,
                projected_nominal: round2(projected_nominal),
                projected_real: round2(projected_real),
                real_change_pct: round2(real_change_pct),
            });
        }

        let real_change_pct = if current_total > Decimal::ZERO {
            round2((real_total / current_total - Decimal::ONE) * dec!(100))
        } else {
            Decimal::ZERO
        };

        Ok(ScenarioProjection {
            scenario,
            params,
            current_value: round2(current_total),
            projected_nominal: round2(nominal_total),
            projected_real: round2(real_total),
            real_change_pct,
            holdings,
        })
    }
}

fn sector_allocation(holdings: &[ScoredHolding], total_value: Decimal) -> Vec<SectorAllocation> {
    let mut by_sector: Vec<(String, Decimal)> = Vec::new();
    for holding in holdings {
        let sector = holding
            .sector
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        match by_sector.iter_mut().find(|(name, _)| *name == sector) {
            Some((_, value)) => *value += holding.value,
            None => by_sector.push((sector, holding.value)),
        }
    }
    by_sector.sort_by(|a, b| b.1.cmp(&a.1));

    by_sector
        .into_iter()
        .map(|(sector, value)| SectorAllocation {
            sector,
            value,
            weight_pct: round2(value / total_value * dec!(100)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hedge_db::{
        CompanyInput, CompanyStore, HoldingInput, ScoreStore, SurvivalScoreInput,
    };

    async fn setup() -> (HedgeDb, PortfolioStore, PortfolioAnalyzer) {
        let db = HedgeDb::new("sqlite::memory:").await.unwrap();
        (
            db.clone(),
            PortfolioStore::new(db.clone()),
            PortfolioAnalyzer::new(db),
        )
    }

    async fn seed_company(db: &HedgeDb, ticker: &str, sector: &str) -> String {
        CompanyStore::new(db.clone())
            .upsert(CompanyInput {
                ticker: ticker.to_string(),
                name: ticker.to_string(),
                sector: Some(sector.to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_score(db: &HedgeDb, company_id: &str, total: f64, hyper: f64) {
        let date: NaiveDate = "2026-07-01".parse().unwrap();
        ScoreStore::new(db.clone())
            .upsert(SurvivalScoreInput {
                company_id: company_id.to_string(),
                score_date: date,
                total_score: total,
                confidence: 0.9,
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
                scenario_hyper: hyper,
                scoring_version: "1.0.0".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let (_, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Empty", None).await.unwrap();

        let analysis = analyzer.analyze(&portfolio).await.unwrap();

        assert!(analysis.overall_score.is_none());
        assert_eq!(analysis.total_value, Decimal::ZERO);
        assert!(analysis.holdings.is_empty());
        assert!(analysis.sector_allocation.is_empty());
    }

    #[tokio::test]
    async fn test_identical_holdings_match_single_company_score() {
        let (db, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        // Two companies with identical scores and equal values: the
        // value-weighted portfolio score equals the per-company score.
        for ticker in ["AAA", "BBB"] {
            let id = seed_company(&db, ticker, "Materials").await;
            seed_score(&db, &id, 72.5, 80.0).await;
            portfolios
                .upsert_holding(
                    &portfolio.id,
                    HoldingInput {
                        company_id: id,
                        shares: 10.0,
                        current_value: Some(10_000.0),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let analysis = analyzer.analyze(&portfolio).await.unwrap();
        assert_eq!(analysis.overall_score, Some(dec!(72.50)));
        assert_eq!(analysis.tier, Some(Tier::Resilient));
        assert_eq!(analysis.total_value, dec!(20000));

        let scenarios = analysis.scenario_scores.unwrap();
        assert_eq!(scenarios.hyper, dec!(80.00));

        // Cached columns were refreshed on the portfolio row.
        let cached = portfolios.get(&portfolio.id).await.unwrap().unwrap();
        assert_eq!(cached.survival_score, Some(72.5));
        assert_eq!(cached.total_value, Some(20_000.0));
    }

    #[tokio::test]
    async fn test_sector_allocation_ordered_by_value() {
        let (db, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        for (ticker, sector, value) in [
            ("NEM", "Materials", 5_000.0),
            ("XOM", "Energy", 15_000.0),
            ("FCX", "Materials", 10_000.0),
        ] {
            let id = seed_company(&db, ticker, sector).await;
            seed_score(&db, &id, 60.0, 60.0).await;
            portfolios
                .upsert_holding(
                    &portfolio.id,
                    HoldingInput {
                        company_id: id,
                        shares: 1.0,
                        current_value: Some(value),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let analysis = analyzer.analyze(&portfolio).await.unwrap();
        let sectors = analysis.sector_allocation;
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].sector, "Energy");
        assert_eq!(sectors[0].value, dec!(15000));
        assert_eq!(sectors[0].weight_pct, dec!(50.00));
        assert_eq!(sectors[1].sector, "Materials");
        assert_eq!(sectors[1].value, dec!(15000));
    }

    #[tokio::test]
    async fn test_unscored_holding_defaults_to_50() {
        let (db, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        let id = seed_company(&db, "ZZZ", "Tech").await;
        portfolios
            .upsert_holding(
                &portfolio.id,
                HoldingInput {
                    company_id: id,
                    shares: 1.0,
                    current_value: Some(1_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let analysis = analyzer.analyze(&portfolio).await.unwrap();
        assert_eq!(analysis.overall_score, Some(dec!(50.00)));
    }

    #[tokio::test]
    async fn test_gradual_projection_math() {
        let (db, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        let id = seed_company(&db, "NEM", "Materials").await;
        // scenario_gradual = total = 50
        seed_score(&db, &id, 50.0, 50.0).await;
        portfolios
            .upsert_holding(
                &portfolio.id,
                HoldingInput {
                    company_id: id,
                    shares: 1.0,
                    current_value: Some(10_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let projection = analyzer
            .project_scenario(&portfolio, Scenario::Gradual, None)
            .await
            .unwrap();

        // nominal growth = 1 + 0.06 * 0.5 * 4 = 1.12
        assert_eq!(projection.projected_nominal, dec!(11200.00));
        // real = 11200 / 1.06^4 = 11200 / 1.26247696
        let real = projection.projected_real.to_f64().unwrap();
        assert!((real - 8871.45).abs() < 0.5, "got {real}");
        assert!(projection.real_change_pct < Decimal::ZERO);
        assert_eq!(projection.holdings.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_params_override_scenario() {
        let (db, portfolios, analyzer) = setup().await;
        let portfolio = portfolios.create("user-1", "Main", None).await.unwrap();

        let id = seed_company(&db, "NEM", "Materials").await;
        seed_score(&db, &id, 100.0, 100.0).await;
        portfolios
            .upsert_holding(
                &portfolio.id,
                HoldingInput {
                    company_id: id,
                    shares: 1.0,
                    current_value: Some(1_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let projection = analyzer
            .project_scenario(
                &portfolio,
                Scenario::Gradual,
                Some(ScenarioOverrides {
                    inflation_rate_pct: Some(dec!(0)),
                    timeline_months: Some(12),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        // Zero inflation: nominal and real are both unchanged.
        assert_eq!(projection.projected_nominal, dec!(1000.00));
        assert_eq!(projection.projected_real, dec!(1000.00));
        assert_eq!(projection.real_change_pct, Decimal::ZERO);
    }
}
