#![doc = include_str!("../../README.md")]
//! Crate-specific API surface for `geocolumn-core`.

pub mod capability;
pub mod codec;
pub mod column;
pub mod error;
pub mod ewkb;
pub mod function_catalog;
pub mod functions;
pub mod geometry;
pub mod predicate;

pub use capability::SpatialFeatures;
pub use codec::{SridMode, WktCodec};
pub use column::{AttributeValue, SpatialColumn};
pub use error::{GeoColumnError, Result};
pub use geometry::{GeometrySubtype, GeometryValue, Srid};
pub use predicate::{ColumnRef, NumericExpr, Operand, Predicate, PredicateBuilder, SpatialExpr};
