//! Bramble storefront library.
//!
//! The binary in `main.rs` wires these modules to `PostgreSQL`, the remote
//! catalog and the payment provider. Tests build the same router over the
//! in-memory stores in [`services::memory`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
