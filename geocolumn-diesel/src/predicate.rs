//! Diesel expressions for predicates built with
//! [`geocolumn_core::predicate::PredicateBuilder`].
//!
//! The core builder validates operands (capability gate, SRID agreement,
//! operand order) and produces a backend-neutral expression tree. The types
//! here render that tree as SQL so it can be used in `.filter()` and
//! `.select()`:
//!
//! ```rust,ignore
//! use geocolumn_core::{PredicateBuilder, SpatialColumn};
//! use geocolumn_diesel::predicate::SpatialFilter;
//!
//! let latlon = SpatialColumn::from_definition("latlon", "point", 3785)?;
//! let near = PredicateBuilder::new()
//!     .st_distance(latlon.qualified("spatial_test"), "POINT(2 3)")?
//!     .lt(2.0);
//!
//! let ids: Vec<i32> = spatial_test::table
//!     .filter(SpatialFilter::new(near))
//!     .select(spatial_test::id)
//!     .load(&mut conn)?;
//! ```
//!
//! Geometry literals in equality position are bound as EWKB parameters.
//! Inside a function call they are rebuilt in SQL with
//! `ST_GeomFromText(?, srid)`, so both backends see a geometry with the
//! resolved SRID.

use diesel::backend::Backend;
use diesel::expression::{
    is_aggregate, AppearsOnTable, Expression, SelectableExpression, ValidGrouping,
};
use diesel::query_builder::{AstPass, QueryFragment, QueryId};
use diesel::result::QueryResult;
use diesel::serialize::ToSql;
use diesel::sql_types::{Bool, Double, HasSqlType, Nullable, Text};
use geocolumn_core::predicate::{NumericExpr, Predicate, SpatialExpr};
use geocolumn_core::GeometryValue;

use crate::types::Geometry;

/// A boolean spatial predicate usable in `.filter()`.
///
/// Evaluates to NULL when a geometry operand is NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFilter {
    predicate: Predicate,
}

impl SpatialFilter {
    pub fn new(predicate: Predicate) -> Self {
        tracing::trace!(expr = ?predicate.expr(), "spatial filter");
        Self { predicate }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl From<Predicate> for SpatialFilter {
    fn from(predicate: Predicate) -> Self {
        Self::new(predicate)
    }
}

/// A numeric spatial expression (`ST_Distance`, `ST_Length`) usable in
/// `.select()` or `.order()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialMeasure {
    expr: NumericExpr,
}

impl SpatialMeasure {
    pub fn new(expr: NumericExpr) -> Self {
        tracing::trace!(expr = ?expr.expr(), "spatial measure");
        Self { expr }
    }

    pub fn expr(&self) -> &NumericExpr {
        &self.expr
    }
}

impl From<NumericExpr> for SpatialMeasure {
    fn from(expr: NumericExpr) -> Self {
        Self::new(expr)
    }
}

fn walk_expr<'b, DB>(expr: &'b SpatialExpr, out: &mut AstPass<'_, 'b, DB>) -> QueryResult<()>
where
    DB: Backend + HasSqlType<Geometry> + HasSqlType<Text> + HasSqlType<Double>,
    GeometryValue: ToSql<Geometry, DB>,
    String: ToSql<Text, DB>,
    f64: ToSql<Double, DB>,
{
    match expr {
        SpatialExpr::Column(column) => {
            if let Some(table) = column.table() {
                out.push_identifier(table)?;
                out.push_sql(".");
            }
            out.push_identifier(column.column())?;
        }
        SpatialExpr::Geometry(value) => out.push_bind_param::<Geometry, GeometryValue>(value)?,
        SpatialExpr::GeometryText { wkt, srid } => {
            out.push_sql("ST_GeomFromText(");
            out.push_bind_param::<Text, String>(wkt)?;
            // Integer literal: the SRID is part of the statement shape.
            out.push_sql(&format!(", {})", srid.get()));
        }
        SpatialExpr::Scalar(value) => out.push_bind_param::<Double, f64>(value)?,
        SpatialExpr::Function { function, args } => {
            out.push_sql(function.sql_name());
            out.push_sql("(");
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                walk_expr(arg, out)?;
            }
            out.push_sql(")");
        }
        SpatialExpr::Compare { op, lhs, rhs } => {
            walk_expr(lhs, out)?;
            out.push_sql(" ");
            out.push_sql(op.sql());
            out.push_sql(" ");
            walk_expr(rhs, out)?;
        }
    }
    Ok(())
}

macro_rules! impl_spatial_expression {
    ($ty:ident, $sql_type:ty, |$this:ident| $root:expr) => {
        impl Expression for $ty {
            type SqlType = $sql_type;
        }

        impl<DB> QueryFragment<DB> for $ty
        where
            DB: Backend + HasSqlType<Geometry> + HasSqlType<Text> + HasSqlType<Double>,
            GeometryValue: ToSql<Geometry, DB>,
            String: ToSql<Text, DB>,
            f64: ToSql<Double, DB>,
        {
            fn walk_ast<'b>(&'b self, mut out: AstPass<'_, 'b, DB>) -> QueryResult<()> {
                let $this = self;
                walk_expr($root, &mut out)
            }
        }

        // Bound values vary per instance.
        impl QueryId for $ty {
            type QueryId = ();
            const HAS_STATIC_QUERY_ID: bool = false;
        }

        impl<GB> ValidGrouping<GB> for $ty {
            type IsAggregate = is_aggregate::Never;
        }

        // Column names are resolved by the database, not checked against `QS`.
        impl<QS: ?Sized> AppearsOnTable<QS> for $ty {}

        impl<QS: ?Sized> SelectableExpression<QS> for $ty {}
    };
}

impl_spatial_expression!(SpatialFilter, Nullable<Bool>, |this| this.predicate.expr());
impl_spatial_expression!(SpatialMeasure, Nullable<Double>, |this| this.expr.expr());
