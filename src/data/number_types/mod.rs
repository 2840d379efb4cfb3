//! # Number types
//!
//! The engine is parameterized over a real scalar. Comparisons in the engine are made through
//! tolerance-aware predicates rather than through a total order, which is what allows plain IEEE
//! doubles, an extended-precision float and an exact rational type to share one implementation.
pub mod tolerances;
pub mod traits;

pub use tolerances::Tolerances;
pub use traits::Real;
