pub mod benchmarks;
pub mod error;
pub mod numeric;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "monte_carlo")]
pub mod orchestrator;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
