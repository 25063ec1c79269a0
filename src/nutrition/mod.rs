//! Portion scaling, daily aggregation and streak tracking.
//!
//! Nothing in here performs I/O; the store and recognition adapters call in.

pub mod aggregator;
pub mod energy;
pub mod error;
pub mod normalizer;
pub mod scaler;
pub mod streak;
pub mod types;

pub use error::NutritionError;
