//! Sakan - property-rental platform identity core
//!
//! Issues and rotates session credentials, enforces per-role access,
//! validates national identity numbers against the government verification
//! authority, and throttles per-client request rates.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod national_id;
pub mod rate_limit;
pub mod server;
pub mod verification;
