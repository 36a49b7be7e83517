//! nlgeo Gazetteer - place lookup ports, adapters and ranked search
//!
//! This crate defines the gazetteer storage port, an in-memory and a
//! PostgreSQL adapter, and the tiered name search on top of them.

pub mod loader;
pub mod memory;
pub mod ports;
pub mod postgres;
pub mod ranking;
pub mod search;

pub use loader::PlaceLoader;
pub use memory::MemoryGazetteer;
pub use ports::{CandidateQuery, GazetteerStore};
pub use postgres::{PostgresConfig, PostgresGazetteer};
pub use ranking::{rank_candidates, SearchQuery};
pub use search::GazetteerSearch;
