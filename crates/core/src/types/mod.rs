//! Core types for the Pazar marketplace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod actor;
pub mod id;
pub mod price;
pub mod status;

pub use actor::Actor;
pub use id::*;
pub use price::Price;
pub use status::*;
