#![doc = include_str!("../../README.md")]
//! Crate-specific API surface for `geocolumn-diesel`.

pub mod expression_methods;
pub mod functions;
pub mod predicate;
pub mod prelude;
pub mod types;

pub use expression_methods::GeometryExpressionMethods;
pub use predicate::{SpatialFilter, SpatialMeasure};
pub use types::Geometry;
