use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Everything the scoring kernel needs to know about one company.
///
/// This is the projection of a company joined with its most recent
/// fundamental snapshot. All financial fields are optional; every factor
/// scorer maps missing inputs to a documented neutral value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyData {
    pub ticker: String,
    pub sector: Option<String>,
    pub industry: Option<String>,

    // Balance sheet
    pub total_assets: Option<i64>,
    pub tangible_assets: Option<i64>,
    pub intangible_assets: Option<i64>,

    // Revenue breakdown
    pub total_revenue: Option<i64>,
    pub foreign_revenue: Option<i64>,
    pub foreign_revenue_pct: Option<Decimal>,
    pub commodity_revenue: Option<i64>,
    pub commodity_revenue_pct: Option<Decimal>,
    pub precious_metals_revenue: Option<i64>,
    pub precious_metals_revenue_pct: Option<Decimal>,

    // Debt structure
    pub total_debt: Option<i64>,
    pub fixed_rate_debt_pct: Option<Decimal>,
    pub avg_debt_maturity_years: Option<Decimal>,

    // Profitability
    pub gross_margin: Option<Decimal>,
    pub gross_margin_5yr_std: Option<Decimal>,

    // Mining specific
    pub proven_reserves_oz: Option<i64>,
}

/// The seven scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    HardAssets,
    PreciousMetals,
    Commodities,
    ForeignRevenue,
    PricingPower,
    DebtStructure,
    EssentialServices,
}

impl Factor {
    pub const ALL: [Factor; 7] = [
        Factor::HardAssets,
        Factor::PreciousMetals,
        Factor::Commodities,
        Factor::ForeignRevenue,
        Factor::PricingPower,
        Factor::DebtStructure,
        Factor::EssentialServices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::HardAssets => "hard_assets",
            Factor::PreciousMetals => "precious_metals",
            Factor::Commodities => "commodities",
            Factor::ForeignRevenue => "foreign_revenue",
            Factor::PricingPower => "pricing_power",
            Factor::DebtStructure => "debt_structure",
            Factor::EssentialServices => "essential_services",
        }
    }
}

/// Scores for all seven factors, each in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub hard_assets: Decimal,
    pub precious_metals: Decimal,
    pub commodities: Decimal,
    pub foreign_revenue: Decimal,
    pub pricing_power: Decimal,
    pub debt_structure: Decimal,
    pub essential_services: Decimal,
}

impl FactorScores {
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
}

/// Ordinal classification of a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Fortress,
    Resilient,
    Moderate,
    Vulnerable,
    Exposed,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Fortress,
        Tier::Resilient,
        Tier::Moderate,
        Tier::Vulnerable,
        Tier::Exposed,
    ];

    pub fn from_score(score: Decimal) -> Tier {
        if score >= dec!(80) {
            Tier::Fortress
        } else if score >= dec!(65) {
            Tier::Resilient
        } else if score >= dec!(50) {
            Tier::Moderate
        } else if score >= dec!(35) {
            Tier::Vulnerable
        } else {
            Tier::Exposed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fortress => "FORTRESS",
            Tier::Resilient => "RESILIENT",
            Tier::Moderate => "MODERATE",
            Tier::Vulnerable => "VULNERABLE",
            Tier::Exposed => "EXPOSED",
        }
    }

    /// Inclusive lower and exclusive upper bound of the tier's score range.
    /// The upper bound of FORTRESS is inclusive (100).
    pub fn bounds(&self) -> (Decimal, Decimal) {
        match self {
            Tier::Fortress => (dec!(80), dec!(100)),
            Tier::Resilient => (dec!(65), dec!(80)),
            Tier::Moderate => (dec!(50), dec!(65)),
            Tier::Vulnerable => (dec!(35), dec!(50)),
            Tier::Exposed => (dec!(0), dec!(35)),
        }
    }

    pub fn parse(value: &str) -> Option<Tier> {
        match value.to_ascii_uppercase().as_str() {
            "FORTRESS" => Some(Tier::Fortress),
            "RESILIENT" => Some(Tier::Resilient),
            "MODERATE" => Some(Tier::Moderate),
            "VULNERABLE" => Some(Tier::Vulnerable),
            "EXPOSED" => Some(Tier::Exposed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(Tier::from_score(dec!(100)), Tier::Fortress);
        assert_eq!(Tier::from_score(dec!(80)), Tier::Fortress);
        assert_eq!(Tier::from_score(dec!(79.99)), Tier::Resilient);
        assert_eq!(Tier::from_score(dec!(65)), Tier::Resilient);
        assert_eq!(Tier::from_score(dec!(64.99)), Tier::Moderate);
        assert_eq!(Tier::from_score(dec!(50)), Tier::Moderate);
        assert_eq!(Tier::from_score(dec!(49.99)), Tier::Vulnerable);
        assert_eq!(Tier::from_score(dec!(35)), Tier::Vulnerable);
        assert_eq!(Tier::from_score(dec!(34.99)), Tier::Exposed);
        assert_eq!(Tier::from_score(dec!(0)), Tier::Exposed);
    }

    #[test]
    fn tier_labels_match_parse() {
        for tier in Tier::ALL {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
    }
}
