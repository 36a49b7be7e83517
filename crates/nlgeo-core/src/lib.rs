//! nlgeo Core - Domain models, error taxonomy, and configuration
//!
//! This crate contains the request tree, gazetteer place models, resolution
//! output types and the layered configuration shared by every nlgeo crate.

pub mod config;
pub mod error;
pub mod models;

pub use error::{NlgeoError, Result};
