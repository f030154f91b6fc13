//! Extension trait for method-style spatial operations on geometry expressions.
//!
//! Import [`GeometryExpressionMethods`] (or `use geocolumn_diesel::prelude::*`)
//! to call spatial functions as methods on any `Nullable<Geometry>` expression:
//!
//! ```rust,ignore
//! use geocolumn_diesel::prelude::*;
//!
//! spatial_test::table
//!     .filter(spatial_test::path.st_length().gt(1.0))
//!     .select((spatial_test::id, spatial_test::path.st_astext()))
//!     .load(&mut conn)?;
//! ```

use diesel::expression::{AsExpression, Expression};
use diesel::sql_types::Nullable;

use crate::functions;
use crate::types::Geometry;

/// Method-style access to spatial SQL functions for `Nullable<Geometry>` expressions.
///
/// For non-nullable `Geometry` columns, call `.nullable()` first.
pub trait GeometryExpressionMethods: Expression<SqlType = Nullable<Geometry>> + Sized {
    /// Serialize this geometry to WKT text.
    fn st_astext(self) -> functions::st_astext<Self> {
        functions::st_astext(self)
    }

    /// Serialize this geometry to EWKT text (`SRID=n;WKT`).
    fn st_asewkt(self) -> functions::st_asewkt<Self> {
        functions::st_asewkt(self)
    }

    fn st_srid(self) -> functions::st_srid<Self> {
        functions::st_srid(self)
    }

    fn st_geometrytype(self) -> functions::st_geometrytype<Self> {
        functions::st_geometrytype(self)
    }

    fn st_x(self) -> functions::st_x<Self> {
        functions::st_x(self)
    }

    fn st_y(self) -> functions::st_y<Self> {
        functions::st_y(self)
    }

    /// Planar length of this geometry.
    fn st_length(self) -> functions::st_length<Self> {
        functions::st_length(self)
    }

    /// Minimum planar distance to another geometry.
    fn st_distance<T>(self, other: T) -> functions::st_distance<Self, T>
    where
        T: AsExpression<Nullable<Geometry>>,
    {
        functions::st_distance(self, other)
    }

    fn st_equals<T>(self, other: T) -> functions::st_equals<Self, T>
    where
        T: AsExpression<Nullable<Geometry>>,
    {
        functions::st_equals(self, other)
    }
}

impl<E> GeometryExpressionMethods for E where E: Expression<SqlType = Nullable<Geometry>> + Sized {}
