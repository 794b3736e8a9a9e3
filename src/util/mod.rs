//! Utility types and functions for gemtrace.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and direction helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
