use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::factors::FactorScorer;
use crate::round2;
use crate::scenarios::ScenarioScores;
use crate::types::{CompanyData, Factor, FactorScores, Tier};
use crate::weights::WeightVector;

/// Complete scoring result for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_score: Decimal,
    pub tier: Tier,
    pub confidence: Decimal,
    pub factors: FactorScores,
    pub scenario_scores: ScenarioScores,
}

/// Orchestrates factor scoring, weighting, and scenario modeling.
///
/// Deterministic: identical `CompanyData` always produces an identical
/// result. All arithmetic is done in `Decimal`.
pub struct ScoringEngine {
    weights: WeightVector,
    factor_scorer: FactorScorer,
}

impl ScoringEngine {
    pub const VERSION: &'static str = "1.0.0";

    pub fn new() -> Self {
        Self {
            weights: WeightVector::current(),
            factor_scorer: FactorScorer::new(),
        }
    }

    pub fn score(&self, data: &CompanyData) -> ScoreResult {
        let factors = self.factor_scorer.score_all(data);
        let total_score = self.weighted_score(&factors);
        let tier = Tier::from_score(total_score);
        let confidence = self.confidence(data);
        let scenario_scores = ScenarioScores::compute(&factors);

        ScoreResult {
            total_score,
            tier,
            confidence,
            factors,
            scenario_scores,
        }
    }

    fn weighted_score(&self, factors: &FactorScores) -> Decimal {
        let total: Decimal = Factor::ALL
            .iter()
            .map(|f| factors.get(*f) * self.weights.get(*f))
            .sum();
        round2(total)
    }

    /// Confidence grows with data completeness: 0.3 base, up to 1.0 when all
    /// ten kernel inputs are present.
    fn confidence(&self, data: &CompanyData) -> Decimal {
        let data_points = [
            data.total_assets.is_some(),
            data.tangible_assets.is_some(),
            data.total_revenue.is_some(),
            data.foreign_revenue_pct.is_some(),
            data.gross_margin.is_some(),
            data.gross_margin_5yr_std.is_some(),
            data.total_debt.is_some(),
            data.fixed_rate_debt_pct.is_some(),
            data.avg_debt_maturity_years.is_some(),
            data.commodity_revenue_pct.is_some(),
        ];

        let available = data_points.iter().filter(|present| **present).count();
        let confidence = dec!(0.3)
            + Decimal::from(available) / Decimal::from(data_points.len()) * dec!(0.7);

        round2(confidence.clamp(dec!(0.3), dec!(1.0)))
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}
