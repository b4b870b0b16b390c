pub mod cli;
pub mod config;
pub mod core;
pub mod geocode;
pub mod insights;
pub mod ledger;
pub mod lifecycle;
pub mod sync;
