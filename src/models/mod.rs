pub mod disharmony;
pub mod history;
pub mod metrics;
pub mod report;
pub mod timestamp;
