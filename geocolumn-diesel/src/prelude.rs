//! Convenience re-exports for geocolumn-diesel.
//!
//! ```rust,ignore
//! use geocolumn_diesel::prelude::*;
//! ```

pub use crate::expression_methods::GeometryExpressionMethods;
pub use crate::functions::*;
pub use crate::predicate::{SpatialFilter, SpatialMeasure};
pub use crate::types::Geometry;
