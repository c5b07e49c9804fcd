//! Domain types for CarryLab

pub mod ids;
pub mod market;
pub mod portfolio;

pub use ids::{ConfigHash, DatasetHash};
pub use market::{CouponEvent, MarketDay};
pub use portfolio::{Holdings, PortfolioState};
