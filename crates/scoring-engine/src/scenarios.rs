use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::round2;
use crate::types::{Factor, FactorScores};
use crate::weights::WeightVector;

/// A named dollar-devaluation regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Current,
    Gradual,
    Rapid,
    Hyper,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Current,
        Scenario::Gradual,
        Scenario::Rapid,
        Scenario::Hyper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Current => "current",
            Scenario::Gradual => "gradual",
            Scenario::Rapid => "rapid",
            Scenario::Hyper => "hyper",
        }
    }

    pub fn parse(value: &str) -> Option<Scenario> {
        match value.to_ascii_lowercase().as_str() {
            "current" => Some(Scenario::Current),
            "gradual" => Some(Scenario::Gradual),
            "rapid" => Some(Scenario::Rapid),
            "hyper" => Some(Scenario::Hyper),
            _ => None,
        }
    }

    /// Projection parameters for the scenario. `Current` is the no-shock
    /// baseline and has no devaluation parameters.
    pub fn params(&self) -> Option<ScenarioParams> {
        match self {
            Scenario::Current => None,
            Scenario::Gradual => Some(ScenarioParams {
                name: "Gradual Decline",
                description: "15-20% decline over 3-5 years",
                dollar_decline_pct: dec!(17.5),
                timeline_months: 48,
                inflation_rate_pct: dec!(6),
            }),
            Scenario::Rapid => Some(ScenarioParams {
                name: "Rapid Decline",
                description: "30-40% decline in 12-18 months",
                dollar_decline_pct: dec!(35),
                timeline_months: 15,
                inflation_rate_pct: dec!(12),
            }),
            Scenario::Hyper => Some(ScenarioParams {
                name: "Hyperinflation",
                description: "50%+ collapse, hyperinflation event",
                dollar_decline_pct: dec!(55),
                timeline_months: 6,
                inflation_rate_pct: dec!(50),
            }),
        }
    }
}

/// Devaluation parameters used by portfolio projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioParams {
    pub name: &'static str,
    pub description: &'static str,
    pub dollar_decline_pct: Decimal,
    pub timeline_months: u32,
    pub inflation_rate_pct: Decimal,
}

impl ScenarioParams {
    pub fn timeline_years(&self) -> Decimal {
        Decimal::from(self.timeline_months) / dec!(12)
    }
}

/// Weighted score for a single scenario, rounded to two decimals.
pub fn scenario_score(factors: &FactorScores, scenario: Scenario) -> Decimal {
    let weights = WeightVector::for_scenario(scenario);
    let total: Decimal = Factor::ALL
        .iter()
        .map(|f| factors.get(*f) * weights.get(*f))
        .sum();
    round2(total)
}

/// Per-scenario weighted scores for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScores {
    pub current: Decimal,
    pub gradual: Decimal,
    pub rapid: Decimal,
    pub hyper: Decimal,
}

impl ScenarioScores {
    pub fn compute(factors: &FactorScores) -> ScenarioScores {
        ScenarioScores {
            current: scenario_score(factors, Scenario::Current),
            gradual: scenario_score(factors, Scenario::Gradual),
            rapid: scenario_score(factors, Scenario::Rapid),
            hyper: scenario_score(factors, Scenario::Hyper),
        }
    }

    pub fn get(&self, scenario: Scenario) -> Decimal {
        match scenario {
            Scenario::Current => self.current,
            Scenario::Gradual => self.gradual,
            Scenario::Rapid => self.rapid,
            Scenario::Hyper => self.hyper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(score: Decimal) -> FactorScores {
        FactorScores {
            hard_assets: score,
            precious_metals: score,
            commodities: score,
            foreign_revenue: score,
            pricing_power: score,
            debt_structure: score,
            essential_services: score,
        }
    }

    #[test]
    fn uniform_factors_give_uniform_scenario_scores() {
        // With weights summing to 1.0, uniform factor scores pass through.
        let scores = ScenarioScores::compute(&flat(dec!(60)));
        for scenario in Scenario::ALL {
            assert_eq!(scores.get(scenario), dec!(60.00));
        }
    }

    #[test]
    fn weighted_aggregation_is_linear() {
        let half = flat(dec!(30));
        let full = flat(dec!(60));
        for scenario in Scenario::ALL {
            assert_eq!(
                scenario_score(&half, scenario) * dec!(2),
                scenario_score(&full, scenario)
            );
        }
    }

    #[test]
    fn scenario_score_matches_manual_weighting() {
        let factors = FactorScores {
            hard_assets: dec!(90),
            precious_metals: dec!(100),
            commodities: dec!(70),
            foreign_revenue: dec!(40),
            pricing_power: dec!(55),
            debt_structure: dec!(62),
            essential_services: dec!(30),
        };
        let weights = WeightVector::for_scenario(Scenario::Hyper);
        let expected: Decimal = Factor::ALL
            .iter()
            .map(|f| factors.get(*f) * weights.get(*f))
            .sum();
        let got = scenario_score(&factors, Scenario::Hyper);
        assert!((got - expected).abs() < dec!(0.01));
    }

    #[test]
    fn params_exist_for_devaluation_scenarios() {
        assert!(Scenario::Current.params().is_none());
        let hyper = Scenario::Hyper.params().unwrap();
        assert_eq!(hyper.timeline_months, 6);
        assert_eq!(hyper.inflation_rate_pct, dec!(50));
        assert_eq!(Scenario::Rapid.params().unwrap().timeline_years(), dec!(1.25));
    }
}
