//! Data models

pub mod activity;
pub mod booster;
pub mod entitlement;
pub mod league;
pub mod ledger;
pub mod progression;
pub mod queue;
pub mod streak;

pub use activity::*;
pub use booster::*;
pub use entitlement::*;
pub use league::*;
pub use ledger::*;
pub use progression::*;
pub use queue::*;
pub use streak::*;
