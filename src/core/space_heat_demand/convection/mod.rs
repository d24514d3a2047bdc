pub mod correlations;
pub mod exterior;
pub mod interior;
