pub mod calculator;
pub mod filter;
pub mod history;
pub mod metrics;
pub mod priority;
pub mod rank;
