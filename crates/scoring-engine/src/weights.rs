use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ScoringError;
use crate::scenarios::Scenario;
use crate::types::Factor;

/// Factor weights for one scenario. Must sum to 1.0 within 0.001.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    pub hard_assets: Decimal,
    pub precious_metals: Decimal,
    pub commodities: Decimal,
    pub foreign_revenue: Decimal,
    pub pricing_power: Decimal,
    pub debt_structure: Decimal,
    pub essential_services: Decimal,
}

impl WeightVector {
    /// The baseline weights used for the headline total score.
    pub fn current() -> WeightVector {
        WeightVector {
            hard_assets: dec!(0.25),
            precious_metals: dec!(0.15),
            commodities: dec!(0.15),
            foreign_revenue: dec!(0.15),
            pricing_power: dec!(0.15),
            debt_structure: dec!(0.10),
            essential_services: dec!(0.05),
        }
    }

    pub fn for_scenario(scenario: Scenario) -> WeightVector {
        match scenario {
            Scenario::Current | Scenario::Gradual => WeightVector::current(),
            Scenario::Rapid => WeightVector {
                hard_assets: dec!(0.30),
                precious_metals: dec!(0.25),
                commodities: dec!(0.20),
                foreign_revenue: dec!(0.10),
                pricing_power: dec!(0.10),
                debt_structure: dec!(0.05),
                essential_services: dec!(0.00),
            },
            Scenario::Hyper => WeightVector {
                hard_assets: dec!(0.35),
                precious_metals: dec!(0.35),
                commodities: dec!(0.20),
                foreign_revenue: dec!(0.05),
                pricing_power: dec!(0.05),
                debt_structure: dec!(0.00),
                essential_services: dec!(0.00),
            },
        }
    }

    pub fn get(&self, factor: Factor) -> Decimal {
        match factor {
            Factor::HardAssets => self.hard_assets,
            Factor::PreciousMetals => self.precious_metals,
            Factor::Commodities => self.commodities,
            Factor::ForeignRevenue => self.foreign_revenue,
            Factor::PricingPower => self.pricing_power,
            Factor::DebtStructure => self.debt_structure,
            Factor::EssentialServices => self.essential_services,
        }
    }

    pub fn sum(&self) -> Decimal {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }

    fn validate(&self, scenario: &'static str) -> Result<(), ScoringError> {
        let sum = self.sum();
        if (sum - dec!(1.0)).abs() < dec!(0.001) {
            Ok(())
        } else {
            Err(ScoringError::InvalidWeights { scenario, sum })
        }
    }

    /// Validate every named vector. Called once at startup; failure means
    /// the binary refuses to run.
    pub fn validate_all() -> Result<(), ScoringError> {
        for scenario in Scenario::ALL {
            WeightVector::for_scenario(scenario).validate(scenario.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_vectors_sum_to_one() {
        WeightVector::validate_all().unwrap();
    }

    #[test]
    fn hyper_shifts_weight_to_hard_assets_and_metals() {
        let current = WeightVector::current();
        let hyper = WeightVector::for_scenario(Scenario::Hyper);
        assert!(hyper.hard_assets > current.hard_assets);
        assert!(hyper.precious_metals > current.precious_metals);
        assert_eq!(hyper.debt_structure, Decimal::ZERO);
        assert_eq!(hyper.essential_services, Decimal::ZERO);
    }

    #[test]
    fn bad_vector_fails_validation() {
        let mut w = WeightVector::current();
        w.hard_assets = dec!(0.50);
        assert!(w.validate("current").is_err());
    }
}
