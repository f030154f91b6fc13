//! Immutable geometry values tagged with a spatial reference identifier.
//!
//! A [`GeometryValue`] is a validated `geo::Geometry<f64>` plus an [`Srid`].
//! Construction is the only place validation happens; once built, a value
//! cannot be mutated, so every value that reaches a column or a predicate is
//! known to be well formed.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Geometry, GeometryCollection, LineString, Point, Polygon};

use crate::error::{GeoColumnError, Result};
use crate::ewkb::{
    WKB_GEOMETRYCOLLECTION, WKB_LINESTRING, WKB_MULTILINESTRING, WKB_MULTIPOINT,
    WKB_MULTIPOLYGON, WKB_POINT, WKB_POLYGON,
};

// ── SRID ──────────────────────────────────────────────────────────────────────

/// Spatial reference identifier. `0` means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Srid(u32);

impl Srid {
    pub const UNSPECIFIED: Srid = Srid(0);

    pub const fn new(value: u32) -> Self {
        Srid(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_unspecified(self) -> bool {
        self.0 == 0
    }

    /// Convert the optional SRID stored in an EWKB header.
    pub fn from_ewkb(raw: Option<i32>) -> Result<Self> {
        match raw {
            None => Ok(Srid::UNSPECIFIED),
            Some(value) => u32::try_from(value)
                .map(Srid)
                .map_err(|_| GeoColumnError::InvalidEwkb("negative SRID")),
        }
    }

    /// SRID to embed in an EWKB header; unspecified SRIDs are omitted.
    pub fn to_ewkb(self) -> Result<Option<i32>> {
        if self.is_unspecified() {
            return Ok(None);
        }
        i32::try_from(self.0)
            .map(Some)
            .map_err(|_| GeoColumnError::InvalidEwkb("SRID exceeds i32 range"))
    }
}

impl From<u32> for Srid {
    fn from(value: u32) -> Self {
        Srid(value)
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enforce equal SRIDs for operations over two geometries.
///
/// Unlike PostGIS' lenient handling of unknown SRIDs, an unspecified SRID
/// never matches a concrete one.
///
/// # Example
///
/// ```
/// use geocolumn_core::geometry::{ensure_matching_srid, Srid};
///
/// assert!(ensure_matching_srid(Srid::new(3785), Srid::new(3785)).is_ok());
/// assert!(ensure_matching_srid(Srid::UNSPECIFIED, Srid::new(3785)).is_err());
/// ```
pub fn ensure_matching_srid(left: Srid, right: Srid) -> Result<Srid> {
    if left != right {
        return Err(GeoColumnError::SpatialOperand(format!(
            "operation on mixed SRID geometries ({left} != {right})"
        )));
    }
    Ok(left)
}

// ── Subtypes ──────────────────────────────────────────────────────────────────

/// Geometry subtype constraint, as declared on a column or found in a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometrySubtype {
    /// Unconstrained supertype; accepts every concrete subtype.
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometrySubtype {
    pub const CONCRETE: [GeometrySubtype; 7] = [
        GeometrySubtype::Point,
        GeometrySubtype::LineString,
        GeometrySubtype::Polygon,
        GeometrySubtype::MultiPoint,
        GeometrySubtype::MultiLineString,
        GeometrySubtype::MultiPolygon,
        GeometrySubtype::GeometryCollection,
    ];

    /// Upper-case WKT keyword.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Geometry => "GEOMETRY",
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// OGC type name as returned by `ST_GeometryType`.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Geometry => "ST_Geometry",
            Self::Point => "ST_Point",
            Self::LineString => "ST_LineString",
            Self::Polygon => "ST_Polygon",
            Self::MultiPoint => "ST_MultiPoint",
            Self::MultiLineString => "ST_MultiLineString",
            Self::MultiPolygon => "ST_MultiPolygon",
            Self::GeometryCollection => "ST_GeometryCollection",
        }
    }

    /// ISO WKB type code; `0` for the generic supertype.
    pub const fn wkb_code(self) -> u32 {
        match self {
            Self::Geometry => 0,
            Self::Point => WKB_POINT,
            Self::LineString => WKB_LINESTRING,
            Self::Polygon => WKB_POLYGON,
            Self::MultiPoint => WKB_MULTIPOINT,
            Self::MultiLineString => WKB_MULTILINESTRING,
            Self::MultiPolygon => WKB_MULTIPOLYGON,
            Self::GeometryCollection => WKB_GEOMETRYCOLLECTION,
        }
    }

    pub const fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Geometry),
            WKB_POINT => Some(Self::Point),
            WKB_LINESTRING => Some(Self::LineString),
            WKB_POLYGON => Some(Self::Polygon),
            WKB_MULTIPOINT => Some(Self::MultiPoint),
            WKB_MULTILINESTRING => Some(Self::MultiLineString),
            WKB_MULTIPOLYGON => Some(Self::MultiPolygon),
            WKB_GEOMETRYCOLLECTION => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    /// Subtype of a `geo` geometry. `Line`, `Rect` and `Triangle` report the
    /// subtype they are normalized to.
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => Self::Point,
            Geometry::Line(_) | Geometry::LineString(_) => Self::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Self::Polygon,
            Geometry::MultiPoint(_) => Self::MultiPoint,
            Geometry::MultiLineString(_) => Self::MultiLineString,
            Geometry::MultiPolygon(_) => Self::MultiPolygon,
            Geometry::GeometryCollection(_) => Self::GeometryCollection,
        }
    }

    pub const fn is_generic(self) -> bool {
        matches!(self, Self::Geometry)
    }

    /// Whether a value of subtype `other` satisfies this constraint.
    pub fn accepts(self, other: GeometrySubtype) -> bool {
        self.is_generic() || self == other
    }

    /// Subtypes with a meaningful length.
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::LineString | Self::MultiLineString)
    }
}

impl fmt::Display for GeometrySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for GeometrySubtype {
    type Err = GeoColumnError;

    /// Parse schema-style names: `point`, `line_string`, `ST_LineString`,
    /// `MULTIPOLYGON`, `geometry`, ...
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        let bare = normalized.strip_prefix("st").unwrap_or(&normalized);
        match bare {
            "geometry" => Ok(Self::Geometry),
            "point" => Ok(Self::Point),
            "linestring" => Ok(Self::LineString),
            "polygon" => Ok(Self::Polygon),
            "multipoint" => Ok(Self::MultiPoint),
            "multilinestring" => Ok(Self::MultiLineString),
            "multipolygon" => Ok(Self::MultiPolygon),
            "geometrycollection" => Ok(Self::GeometryCollection),
            _ => Err(GeoColumnError::InvalidInput(format!(
                "unknown geometry subtype `{s}`"
            ))),
        }
    }
}

// ── Values ────────────────────────────────────────────────────────────────────

/// A validated geometry and its SRID.
///
/// Equality is structural and includes the SRID, so `POINT(1 2)` with SRID 0
/// is not equal to `POINT(1 2)` with SRID 3785.
///
/// # Example
///
/// ```
/// use geocolumn_core::{GeometryValue, GeometrySubtype, Srid};
///
/// let p = GeometryValue::point(1.0, 2.0, Srid::new(3785)).unwrap();
/// assert_eq!(p.subtype(), GeometrySubtype::Point);
/// assert_eq!(p.srid(), Srid::new(3785));
///
/// assert!(GeometryValue::line_string([(1.0, 2.0)], Srid::UNSPECIFIED).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryValue {
    geometry: Geometry<f64>,
    srid: Srid,
}

impl GeometryValue {
    /// Validate any `geo` geometry.
    ///
    /// `Line` becomes a two-point `LineString`; `Rect` and `Triangle` become
    /// a `Polygon`.
    pub fn new(geometry: impl Into<Geometry<f64>>, srid: Srid) -> Result<Self> {
        let geometry = normalize(geometry.into());
        validate(&geometry)?;
        Ok(Self { geometry, srid })
    }

    pub fn point(x: f64, y: f64, srid: Srid) -> Result<Self> {
        Self::new(Point::new(x, y), srid)
    }

    /// A LineString of at least two positions.
    pub fn line_string<C>(coords: impl IntoIterator<Item = C>, srid: Srid) -> Result<Self>
    where
        C: Into<Coord<f64>>,
    {
        let line: LineString<f64> = coords.into_iter().collect();
        Self::new(line, srid)
    }

    /// A Polygon from explicit rings. Every ring must already be closed.
    pub fn polygon<C>(
        exterior: impl IntoIterator<Item = C>,
        interiors: impl IntoIterator<Item = Vec<C>>,
        srid: Srid,
    ) -> Result<Self>
    where
        C: Into<Coord<f64>>,
    {
        let exterior: LineString<f64> = exterior.into_iter().collect();
        validate_ring(&exterior)?;
        let mut holes = Vec::new();
        for ring in interiors {
            let ring: LineString<f64> = ring.into_iter().collect();
            validate_ring(&ring)?;
            holes.push(ring);
        }
        Self::new(Polygon::new(exterior, holes), srid)
    }

    /// A GeometryCollection; every member must share `srid`.
    pub fn collection(members: impl IntoIterator<Item = GeometryValue>, srid: Srid) -> Result<Self> {
        let mut geometries = Vec::new();
        for member in members {
            if member.srid != srid {
                return Err(GeoColumnError::GeometryConstruction(format!(
                    "collection member has SRID {} but the collection has SRID {srid}",
                    member.srid
                )));
            }
            geometries.push(member.geometry);
        }
        Ok(Self {
            geometry: Geometry::GeometryCollection(GeometryCollection(geometries)),
            srid,
        })
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    pub fn subtype(&self) -> GeometrySubtype {
        GeometrySubtype::of(&self.geometry)
    }

    pub fn into_parts(self) -> (Geometry<f64>, Srid) {
        (self.geometry, self.srid)
    }

    /// Structural and SRID equality.
    pub fn equals(&self, other: &GeometryValue) -> bool {
        self == other
    }
}

fn normalize(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::Line(line) => Geometry::LineString(LineString::from(vec![line.start, line.end])),
        Geometry::Rect(rect) => Geometry::Polygon(rect.to_polygon()),
        Geometry::Triangle(triangle) => Geometry::Polygon(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => Geometry::GeometryCollection(
            GeometryCollection(collection.0.into_iter().map(normalize).collect()),
        ),
        other => other,
    }
}

fn ensure_finite(coord: &Coord<f64>) -> Result<()> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(())
    } else {
        Err(GeoColumnError::GeometryConstruction(
            "coordinates must be finite".to_string(),
        ))
    }
}

fn validate_line(line: &LineString<f64>) -> Result<()> {
    if line.0.len() < 2 {
        return Err(GeoColumnError::GeometryConstruction(format!(
            "LineString needs at least 2 positions, got {}",
            line.0.len()
        )));
    }
    line.0.iter().try_for_each(ensure_finite)
}

fn validate_ring(ring: &LineString<f64>) -> Result<()> {
    if ring.0.len() < 4 {
        return Err(GeoColumnError::GeometryConstruction(format!(
            "polygon ring needs at least 4 positions, got {}",
            ring.0.len()
        )));
    }
    if !ring.is_closed() {
        return Err(GeoColumnError::GeometryConstruction(
            "polygon ring is not closed".to_string(),
        ));
    }
    ring.0.iter().try_for_each(ensure_finite)
}

fn validate_polygon(polygon: &Polygon<f64>) -> Result<()> {
    validate_ring(polygon.exterior())?;
    polygon.interiors().iter().try_for_each(validate_ring)
}

fn validate(geometry: &Geometry<f64>) -> Result<()> {
    match geometry {
        Geometry::Point(p) => ensure_finite(&p.0),
        Geometry::LineString(ls) => validate_line(ls),
        Geometry::Polygon(poly) => validate_polygon(poly),
        Geometry::MultiPoint(mp) => mp.0.iter().try_for_each(|p| ensure_finite(&p.0)),
        Geometry::MultiLineString(mls) => mls.0.iter().try_for_each(validate_line),
        Geometry::MultiPolygon(mp) => mp.0.iter().try_for_each(validate_polygon),
        Geometry::GeometryCollection(gc) => gc.0.iter().try_for_each(validate),
        Geometry::Line(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Err(
            GeoColumnError::GeometryConstruction("geometry was not normalized".to_string()),
        ),
    }
}
