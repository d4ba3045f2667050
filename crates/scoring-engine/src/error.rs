use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Invalid weights for scenario {scenario}: sum is {sum}, expected 1.0")]
    InvalidWeights { scenario: &'static str, sum: rust_decimal::Decimal },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
