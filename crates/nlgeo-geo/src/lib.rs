//! nlgeo Geo - Geometry conversions, validation and polygon algebra
//!
//! This crate bridges the canonical geometry model to the `geo` crate and
//! implements the spatial operators of a request tree: buffer, set algebra,
//! between, directional half-planes, subportions and borders.

pub mod algebra;
pub mod models;
pub mod normalize;
pub mod projection;
pub mod spatial;
pub mod validation;

pub use algebra::GeometryAlgebra;
