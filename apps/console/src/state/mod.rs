//! # Shared State
//!
//! State shared between components. Form state itself is owned by each
//! form; only the boundary's reporting channel is shared.

pub mod boundary;

pub use boundary::BoundaryState;
