use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{CompanyData, FactorScores};

/// Industries counted as direct precious-metals miners.
const PRECIOUS_METALS_MINERS: [&str; 3] = ["Gold Mining", "Silver Mining", "Precious Metals"];

/// Royalty/streaming companies get a flat score rather than the reserve boost.
const PRECIOUS_METALS_ROYALTIES: &str = "Precious Metals Royalties";

/// Base score for essential/defensive industries. Unlisted industries get 40.
fn essential_services_base(industry: &str) -> Decimal {
    match industry {
        "Electric Utilities" => dec!(95),
        "Water Utilities" => dec!(95),
        "Gas Utilities" => dec!(90),
        "Healthcare Facilities" => dec!(90),
        "Pharmaceuticals" => dec!(85),
        "Food Products" => dec!(85),
        "Food Retail" => dec!(80),
        "Household Products" => dec!(75),
        "Waste Management" => dec!(75),
        "Telecom" => dec!(70),
        "Defense" => dec!(70),
        "Insurance" => dec!(40),
        "Banks" => dec!(35),
        "Asset Management" => dec!(30),
        "Software" => dec!(25),
        "Consumer Discretionary" => dec!(20),
        _ => dec!(40),
    }
}

/// Base score for commodity-producing industries. Unlisted industries get 30.
fn commodity_sector_base(industry: &str) -> Decimal {
    match industry {
        "Oil & Gas E&P" => dec!(85),
        "Oil & Gas Integrated" => dec!(80),
        "Copper Mining" => dec!(85),
        "Diversified Mining" => dec!(75),
        "Agricultural Products" => dec!(70),
        "Steel" => dec!(65),
        "Chemicals" => dec!(55),
        _ => dec!(30),
    }
}

/// Computes the seven factor scores for one company. Pure and stateless;
/// every factor has a defined value when its inputs are missing.
pub struct FactorScorer;

impl FactorScorer {
    pub fn new() -> Self {
        Self
    }

    /// Hard-asset backing from the tangible/total asset ratio, with boosts
    /// for real estate and mining. Neutral 50 when total assets are unknown.
    pub fn score_hard_assets(&self, data: &CompanyData) -> Decimal {
        let total = match data.total_assets {
            Some(t) if t != 0 => t,
            _ => return dec!(50),
        };

        let tangible = data.tangible_assets.unwrap_or(0);
        let tangible_ratio = Decimal::from(tangible) / Decimal::from(total);
        let base = tangible_ratio * dec!(80);

        let industry = data.industry.as_deref().unwrap_or("");
        let real_estate_boost = if industry == "REITs" || industry == "Real Estate" {
            dec!(10)
        } else {
            Decimal::ZERO
        };
        let mining_boost = if industry.contains("Mining") {
            dec!(10)
        } else {
            Decimal::ZERO
        };

        (base + real_estate_boost + mining_boost).min(dec!(100))
    }

    /// Direct miners score 80 plus a reserve boost; royalty/streaming
    /// companies get a flat 85; everyone else scales with PM revenue share.
    pub fn score_precious_metals(&self, data: &CompanyData) -> Decimal {
        let industry = data.industry.as_deref().unwrap_or("");

        if industry == PRECIOUS_METALS_ROYALTIES {
            return dec!(85);
        }

        if PRECIOUS_METALS_MINERS.contains(&industry) {
            let base = dec!(80);
            if let Some(reserves) = data.proven_reserves_oz {
                let reserve_factor =
                    (Decimal::from(reserves) / dec!(10000000)).min(Decimal::ONE) * dec!(20);
                return (base + reserve_factor).min(dec!(100));
            }
            return base;
        }

        let pm_pct = data.precious_metals_revenue_pct.unwrap_or(Decimal::ZERO);
        (pm_pct * dec!(2)).min(dec!(100))
    }

    /// Sector base adjusted by actual commodity revenue share (+/- 15 points).
    pub fn score_commodities(&self, data: &CompanyData) -> Decimal {
        let base = commodity_sector_base(data.industry.as_deref().unwrap_or(""));

        let commodity_pct = data.commodity_revenue_pct.unwrap_or(Decimal::ZERO);
        let revenue_adjustment = (commodity_pct - dec!(50)) * dec!(0.3);

        (base + revenue_adjustment).clamp(Decimal::ZERO, dec!(100))
    }

    /// Piecewise-linear in the foreign revenue share; high international
    /// exposure hedges against the dollar.
    pub fn score_foreign_revenue(&self, data: &CompanyData) -> Decimal {
        let foreign_pct = data.foreign_revenue_pct.unwrap_or(Decimal::ZERO);

        if foreign_pct >= dec!(70) {
            dec!(95)
        } else if foreign_pct >= dec!(50) {
            dec!(70) + (foreign_pct - dec!(50)) * dec!(1.25)
        } else {
            foreign_pct * dec!(1.4)
        }
    }

    /// High margin plus low margin variance. Each component caps at 50.
    pub fn score_pricing_power(&self, data: &CompanyData) -> Decimal {
        let margin = data.gross_margin.unwrap_or(Decimal::ZERO);
        let stability = data.gross_margin_5yr_std.unwrap_or(dec!(10));

        let margin_score = (margin * dec!(1.2)).min(dec!(50));
        let stability_score = (dec!(50) - stability * dec!(5)).max(Decimal::ZERO);

        margin_score + stability_score
    }

    /// Fixed-rate debt inflates away, long maturities defer refinancing,
    /// low leverage limits the damage either way.
    pub fn score_debt_structure(&self, data: &CompanyData) -> Decimal {
        let fixed_pct = data.fixed_rate_debt_pct.unwrap_or(dec!(50));
        let fixed_score = fixed_pct * dec!(0.5);

        let maturity = data.avg_debt_maturity_years.unwrap_or(dec!(5));
        let maturity_score = (maturity * dec!(5)).min(dec!(30));

        let leverage_score = match (data.total_assets, data.total_debt) {
            (Some(assets), Some(debt)) if assets != 0 => {
                let debt_ratio = Decimal::from(debt) / Decimal::from(assets);
                (dec!(20) - debt_ratio * dec!(40)).max(Decimal::ZERO)
            }
            _ => dec!(10),
        };

        fixed_score + maturity_score + leverage_score
    }

    /// Industry lookup; essential/defensive sectors score higher.
    pub fn score_essential_services(&self, data: &CompanyData) -> Decimal {
        essential_services_base(data.industry.as_deref().unwrap_or(""))
    }

    pub fn score_all(&self, data: &CompanyData) -> FactorScores {
        FactorScores {
            hard_assets: self.score_hard_assets(data),
            precious_metals: self.score_precious_metals(data),
            commodities: self.score_commodities(data),
            foreign_revenue: self.score_foreign_revenue(data),
            pricing_power: self.score_pricing_power(data),
            debt_structure: self.score_debt_structure(data),
            essential_services: self.score_essential_services(data),
        }
    }
}

impl Default for FactorScorer {
    fn default() -> Self {
        Self::new()
    }
}
