//! nlgeo Resolve - entity resolution and request tree evaluation
//!
//! This crate turns named entities into gazetteer places and evaluates
//! spatial request trees over them with the geometry algebra.

pub mod context;
pub mod evaluator;
pub mod resolver;

pub use context::{split_qualified, ResolutionContext};
pub use evaluator::SpatialTreeEvaluator;
pub use resolver::{EntityResolver, Resolution};
