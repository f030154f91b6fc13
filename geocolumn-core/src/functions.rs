//! PostGIS-compatible scalar functions over EWKB blobs.
//!
//! These back the SQL functions registered by the SQLite extension, so that
//! the predicates rendered by the Diesel layer (`ST_Distance`, `ST_Length`,
//! `ST_GeomFromText`, ...) evaluate the same way against SQLite as they do
//! against PostGIS. All measurements are planar.

use geo::algorithm::line_measures::metric_spaces::Euclidean;
use geo::algorithm::line_measures::{Distance, Length};
use geo::{Geometry, Point};

use crate::codec::WktCodec;
use crate::error::{GeoColumnError, Result};
use crate::ewkb::{parse_ewkb_header, read_geometry, write_ewkb};
use crate::geometry::{ensure_matching_srid, GeometrySubtype, GeometryValue, Srid};

// ── I/O ───────────────────────────────────────────────────────────────────────

/// ST_GeomFromText — parse WKT (or EWKT) into an EWKB blob.
///
/// An `SRID=n;` prefix in the text wins over `srid`.
///
/// # Example
///
/// ```
/// use geocolumn_core::functions::{geom_from_text, st_srid};
///
/// let blob = geom_from_text("POINT(1 2)", Some(3785)).unwrap();
/// assert_eq!(st_srid(&blob).unwrap(), 3785);
/// ```
pub fn geom_from_text(wkt: &str, srid: Option<u32>) -> Result<Vec<u8>> {
    let srid = srid.map_or(Srid::UNSPECIFIED, Srid::new);
    let value = WktCodec::default().decode(wkt, GeometrySubtype::Geometry, srid)?;
    write_ewkb(&value)
}

/// ST_AsText — WKT without SRID.
///
/// # Example
///
/// ```
/// use geocolumn_core::functions::{as_text, geom_from_text};
///
/// let blob = geom_from_text("POINT(1 2)", Some(3785)).unwrap();
/// let wkt = as_text(&blob).unwrap();
/// assert!(wkt.starts_with("POINT"));
/// assert!(!wkt.contains("SRID"));
/// ```
pub fn as_text(blob: &[u8]) -> Result<String> {
    WktCodec::side_channel().encode(&read_geometry(blob)?)
}

/// ST_AsEWKT — `SRID=n;WKT`, or plain WKT when the SRID is unspecified.
pub fn as_ewkt(blob: &[u8]) -> Result<String> {
    WktCodec::prefixed().encode(&read_geometry(blob)?)
}

// ── Accessors ─────────────────────────────────────────────────────────────────

/// ST_SRID — `0` when the blob carries no SRID.
pub fn st_srid(blob: &[u8]) -> Result<u32> {
    Ok(read_geometry(blob)?.srid().get())
}

/// ST_GeometryType — OGC name such as `ST_Point`.
///
/// # Example
///
/// ```
/// use geocolumn_core::functions::{geom_from_text, st_geometry_type};
///
/// let blob = geom_from_text("LINESTRING(1 2,3 2)", None).unwrap();
/// assert_eq!(st_geometry_type(&blob).unwrap(), "ST_LineString");
/// ```
pub fn st_geometry_type(blob: &[u8]) -> Result<&'static str> {
    let header = parse_ewkb_header(blob)?;
    GeometrySubtype::from_wkb_code(header.geom_type)
        .filter(|subtype| !subtype.is_generic())
        .map(GeometrySubtype::type_name)
        .ok_or(GeoColumnError::InvalidEwkb("unknown geometry type code"))
}

fn as_point(blob: &[u8], function: &str) -> Result<Point<f64>> {
    match read_geometry(blob)?.into_parts().0 {
        Geometry::Point(p) => Ok(p),
        other => Err(GeoColumnError::InvalidInput(format!(
            "{function} expects a POINT, got {}",
            GeometrySubtype::of(&other)
        ))),
    }
}

/// ST_X — X coordinate of a Point.
pub fn st_x(blob: &[u8]) -> Result<f64> {
    Ok(as_point(blob, "ST_X")?.x())
}

/// ST_Y — Y coordinate of a Point.
pub fn st_y(blob: &[u8]) -> Result<f64> {
    Ok(as_point(blob, "ST_Y")?.y())
}

// ── Measurement ───────────────────────────────────────────────────────────────

fn read_pair(a: &[u8], b: &[u8]) -> Result<(GeometryValue, GeometryValue)> {
    let a = read_geometry(a)?;
    let b = read_geometry(b)?;
    ensure_matching_srid(a.srid(), b.srid())?;
    Ok((a, b))
}

/// ST_Distance — minimum planar distance. Mixed SRIDs are an error.
///
/// # Example
///
/// ```
/// use geocolumn_core::functions::{geom_from_text, st_distance};
///
/// let a = geom_from_text("POINT(1 2)", Some(3785)).unwrap();
/// let b = geom_from_text("POINT(2 3)", Some(3785)).unwrap();
/// assert!((st_distance(&a, &b).unwrap() - 2f64.sqrt()).abs() < 1e-12);
///
/// let c = geom_from_text("POINT(2 3)", Some(4326)).unwrap();
/// assert!(st_distance(&a, &c).is_err());
/// ```
pub fn st_distance(a: &[u8], b: &[u8]) -> Result<f64> {
    let (a, b) = read_pair(a, b)?;
    Ok(Euclidean.distance(a.geometry(), b.geometry()))
}

fn linear_length(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::LineString(ls) => Euclidean.length(ls),
        Geometry::MultiLineString(mls) => mls.0.iter().map(|ls| Euclidean.length(ls)).sum(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(linear_length).sum(),
        _ => 0.0,
    }
}

/// ST_Length — planar length of the linear parts; `0` for points and
/// polygons.
///
/// # Example
///
/// ```
/// use geocolumn_core::functions::{geom_from_text, st_length};
///
/// let line = geom_from_text("LINESTRING(1 2,3 2)", Some(3785)).unwrap();
/// assert_eq!(st_length(&line).unwrap(), 2.0);
/// ```
pub fn st_length(blob: &[u8]) -> Result<f64> {
    Ok(linear_length(read_geometry(blob)?.geometry()))
}

// ── Predicates ────────────────────────────────────────────────────────────────

/// ST_Equals — exact coordinate equality. Mixed SRIDs are an error.
pub fn st_equals(a: &[u8], b: &[u8]) -> Result<bool> {
    let (a, b) = read_pair(a, b)?;
    Ok(a.equals(&b))
}
