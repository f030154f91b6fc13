//! Diesel SQL function definitions for the spatial operations.
//!
//! These are the typed counterparts of the dynamic [`crate::predicate`]
//! builders. They render the same SQL but skip the capability gate and the
//! SRID check, which then happen in the database.
//!
//! # Example
//!
//! ```rust,ignore
//! use geocolumn_diesel::functions::*;
//! use diesel::prelude::*;
//!
//! let near: Vec<i32> = spatial_test::table
//!     .filter(st_distance(spatial_test::latlon, st_geomfromtext_srid("POINT(2 3)", 3785)).lt(2.0))
//!     .select(spatial_test::id)
//!     .load(&mut conn)?;
//! ```

use crate::types::Geometry;
use diesel::sql_types::{Bool, Double, Integer, Nullable, Text};

// ── I/O ───────────────────────────────────────────────────────────────────────

diesel::define_sql_function! {
    /// Parse WKT (or `SRID=n;` EWKT) text into a geometry.
    fn st_geomfromtext(wkt: Text) -> Nullable<Geometry>;
}

diesel::define_sql_function! {
    /// Parse WKT text with an explicit SRID into a geometry.
    #[sql_name = "ST_GeomFromText"]
    fn st_geomfromtext_srid(wkt: Text, srid: Integer) -> Nullable<Geometry>;
}

diesel::define_sql_function! {
    /// Serialize a geometry to WKT text.
    fn st_astext(geom: Nullable<Geometry>) -> Nullable<Text>;
}

diesel::define_sql_function! {
    /// Serialize a geometry to EWKT text (`SRID=n;WKT`).
    fn st_asewkt(geom: Nullable<Geometry>) -> Nullable<Text>;
}

// ── Accessors ─────────────────────────────────────────────────────────────────

diesel::define_sql_function! {
    /// Return the SRID of a geometry, `0` when unspecified.
    fn st_srid(geom: Nullable<Geometry>) -> Nullable<Integer>;
}

diesel::define_sql_function! {
    /// Return the OGC geometry type name (e.g. `ST_Point`, `ST_LineString`).
    fn st_geometrytype(geom: Nullable<Geometry>) -> Nullable<Text>;
}

diesel::define_sql_function! {
    /// Return the X coordinate of a Point geometry.
    fn st_x(geom: Nullable<Geometry>) -> Nullable<Double>;
}

diesel::define_sql_function! {
    /// Return the Y coordinate of a Point geometry.
    fn st_y(geom: Nullable<Geometry>) -> Nullable<Double>;
}

// ── Measurement ───────────────────────────────────────────────────────────────

diesel::define_sql_function! {
    /// Return the planar length of a linear geometry.
    fn st_length(geom: Nullable<Geometry>) -> Nullable<Double>;
}

diesel::define_sql_function! {
    /// Return the minimum planar distance between two geometries.
    fn st_distance(a: Nullable<Geometry>, b: Nullable<Geometry>) -> Nullable<Double>;
}

// ── Predicates ────────────────────────────────────────────────────────────────

diesel::define_sql_function! {
    /// Return whether two geometries are equal.
    fn st_equals(a: Nullable<Geometry>, b: Nullable<Geometry>) -> Nullable<Bool>;
}
