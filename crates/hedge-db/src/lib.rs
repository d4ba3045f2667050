pub mod alerts;
pub mod companies;
pub mod db;
pub mod fundamentals;
pub mod macro_data;
pub mod models;
pub mod portfolios;
pub mod runs;
pub mod scores;

pub use alerts::AlertStore;
pub use companies::CompanyStore;
pub use db::HedgeDb;
pub use fundamentals::FundamentalStore;
pub use macro_data::MacroStore;
pub use models::*;
pub use portfolios::PortfolioStore;
pub use runs::RunStore;
pub use scores::ScoreStore;
