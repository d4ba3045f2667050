pub mod engine;
pub mod error;
pub mod factors;
pub mod scenarios;
pub mod types;
pub mod weights;

pub use engine::{ScoreResult, ScoringEngine};
pub use error::ScoringError;
pub use factors::FactorScorer;
pub use scenarios::{Scenario, ScenarioParams, ScenarioScores};
pub use types::{CompanyData, Factor, FactorScores, Tier};
pub use weights::WeightVector;

use rust_decimal::{Decimal, RoundingStrategy};

/// Half-up rounding to two decimals, used everywhere a score leaves the kernel.
pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
