//! reviewd — automated pull-request review pipeline (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod acquire;
pub mod apply;
pub mod baseline;
pub mod config;
pub mod constants;
pub mod deliver;
pub mod env;
pub mod filter;
pub mod fingerprint;
pub mod models;
pub mod providers;
pub mod run;
pub mod schema;
pub mod signals;
