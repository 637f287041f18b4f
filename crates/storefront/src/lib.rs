//! Pazar storefront library.
//!
//! The marketplace engine (stock ledger, cart, order engine, order state
//! machine, reconciliation and the mock payment gate) plus the JSON API that
//! exposes it. Packaged as a library so the CLI and integration tests can
//! drive the same code as the server binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
