//! Pazar Core - Shared types and marketplace rules.
//!
//! This crate is shared by:
//! - `storefront` - HTTP API and the transactional order engine
//! - `cli` - Command-line tools for migrations, seeding and stock levels
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Every decision that can be made from values alone (stock
//! arithmetic, lock ordering, the order status table, card evaluation) lives
//! here so the storefront's storage backends share one implementation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, statuses and the acting user
//! - [`stock`] - Reservation arithmetic and deterministic lock ordering
//! - [`lifecycle`] - Order status transition table
//! - [`payment`] - Mock card evaluation
//! - [`error`] - Business error taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod lifecycle;
pub mod payment;
pub mod stock;
pub mod types;

pub use error::{Entity, MarketError};
pub use types::*;
