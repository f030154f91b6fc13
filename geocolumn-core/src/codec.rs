//! WKT / WKB codec for [`GeometryValue`]s.
//!
//! The SRID either travels beside the text (as a separate SQL argument,
//! [`SridMode::SideChannel`]) or inside it as an EWKT `SRID=n;` prefix
//! ([`SridMode::Prefixed`]). Decoding always accepts an optional prefix; the
//! mode only decides what `encode` emits.

use geo::Geometry;
use geozero::wkb::Ewkb;
use geozero::{GeomProcessor, GeozeroGeometry, ToGeo, ToWkt};

use crate::error::{GeoColumnError, Result};
use crate::ewkb::{ensure_xy_only, parse_ewkb_header, write_ewkb, write_wkb};
use crate::geometry::{GeometrySubtype, GeometryValue, Srid};

/// How the SRID is carried alongside encoded geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SridMode {
    /// SRID is passed separately, e.g. `ST_GeomFromText(wkt, srid)`.
    #[default]
    SideChannel,
    /// SRID is embedded: `SRID=n;WKT` for text, the EWKB SRID flag for binary.
    Prefixed,
}

/// Split an optional EWKT `SRID=n;` prefix from WKT text.
///
/// # Example
///
/// ```
/// use geocolumn_core::codec::split_srid_prefix;
/// use geocolumn_core::Srid;
///
/// let (srid, wkt) = split_srid_prefix("SRID=3785;POINT(1 2)").unwrap();
/// assert_eq!(srid, Some(Srid::new(3785)));
/// assert_eq!(wkt, "POINT(1 2)");
///
/// assert_eq!(split_srid_prefix("POINT(1 2)").unwrap(), (None, "POINT(1 2)"));
/// ```
pub fn split_srid_prefix(text: &str) -> Result<(Option<Srid>, &str)> {
    let text = text.trim();
    let has_prefix = text
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("SRID="));
    if !has_prefix {
        return Ok((None, text));
    }
    let Some((prefix, wkt)) = text.split_once(';') else {
        return Err(GeoColumnError::GeometryParse(
            "SRID prefix is not terminated by `;`".to_string(),
        ));
    };
    let srid = prefix[5..].trim().parse::<u32>().map_err(|_| {
        GeoColumnError::GeometryParse(format!("invalid SRID prefix `{prefix}`"))
    })?;
    Ok((Some(Srid::new(srid)), wkt.trim()))
}

/// Encoder/decoder between [`GeometryValue`] and WKT / WKB.
///
/// # Example
///
/// ```
/// use geocolumn_core::codec::WktCodec;
/// use geocolumn_core::{GeometrySubtype, GeometryValue, Srid};
///
/// let codec = WktCodec::default();
/// let p = GeometryValue::point(1.0, 2.0, Srid::new(3785)).unwrap();
/// let wkt = codec.encode(&p).unwrap();
/// assert!(wkt.starts_with("POINT"));
///
/// let back = codec.decode(&wkt, GeometrySubtype::Point, Srid::new(3785)).unwrap();
/// assert_eq!(back, p);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WktCodec {
    mode: SridMode,
}

impl WktCodec {
    pub const fn new(mode: SridMode) -> Self {
        Self { mode }
    }

    pub const fn side_channel() -> Self {
        Self::new(SridMode::SideChannel)
    }

    pub const fn prefixed() -> Self {
        Self::new(SridMode::Prefixed)
    }

    pub const fn mode(&self) -> SridMode {
        self.mode
    }

    /// Render a value as WKT, with an `SRID=n;` prefix in prefixed mode when
    /// the SRID is specified.
    pub fn encode(&self, value: &GeometryValue) -> Result<String> {
        let wkt = value.geometry().to_wkt()?;
        tracing::trace!(srid = %value.srid(), mode = ?self.mode, %wkt, "encoded geometry");
        match self.mode {
            SridMode::Prefixed if !value.srid().is_unspecified() => {
                Ok(format!("SRID={};{wkt}", value.srid()))
            }
            _ => Ok(wkt),
        }
    }

    /// Parse WKT into a value.
    ///
    /// `srid` is the side-channel SRID; an `SRID=n;` prefix in `text` takes
    /// precedence over it. A concrete `expected` subtype must match the
    /// text's geometry keyword.
    pub fn decode(&self, text: &str, expected: GeometrySubtype, srid: Srid) -> Result<GeometryValue> {
        let (prefix, wkt) = split_srid_prefix(text)?;
        let geometry: Geometry<f64> = geozero::wkt::Wkt(wkt.as_bytes())
            .to_geo()
            .map_err(|e| GeoColumnError::GeometryParse(format!("`{wkt}`: {e}")))?;
        ensure_closed_rings(wkt)?;
        tracing::trace!(%wkt, expected = %expected, "decoded geometry");
        finish_decode(geometry, expected, prefix.unwrap_or(srid))
    }

    /// Render a value as WKB. Prefixed mode writes EWKB with the SRID flag;
    /// side-channel mode writes plain ISO WKB.
    pub fn encode_wkb(&self, value: &GeometryValue) -> Result<Vec<u8>> {
        match self.mode {
            SridMode::Prefixed => write_ewkb(value),
            SridMode::SideChannel => write_wkb(value.geometry()),
        }
    }

    /// Parse WKB or EWKB. An embedded EWKB SRID takes precedence over `srid`.
    pub fn decode_wkb(&self, bytes: &[u8], expected: GeometrySubtype, srid: Srid) -> Result<GeometryValue> {
        let header = parse_ewkb_header(bytes)
            .map_err(|e| GeoColumnError::GeometryParse(e.to_string()))?;
        ensure_xy_only(header.has_z, header.has_m)?;
        let embedded = Srid::from_ewkb(header.srid)
            .map_err(|e| GeoColumnError::GeometryParse(e.to_string()))?;
        let geometry: Geometry<f64> = Ewkb(bytes)
            .to_geo()
            .map_err(|e| GeoColumnError::GeometryParse(e.to_string()))?;
        let srid = if header.srid.is_some() { embedded } else { srid };
        finish_decode(geometry, expected, srid)
    }
}

/// Tracks the first and last position of every polygon ring in the raw
/// coordinate stream; `geo` would otherwise close open rings on conversion.
#[derive(Debug, Default)]
struct RingClosure {
    polygon_depth: usize,
    in_ring: bool,
    first: Option<(f64, f64)>,
    last: Option<(f64, f64)>,
    open_rings: usize,
}

impl GeomProcessor for RingClosure {
    fn xy(&mut self, x: f64, y: f64, _idx: usize) -> geozero::error::Result<()> {
        if self.in_ring {
            self.first.get_or_insert((x, y));
            self.last = Some((x, y));
        }
        Ok(())
    }

    fn polygon_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> geozero::error::Result<()> {
        self.polygon_depth += 1;
        Ok(())
    }

    fn polygon_end(&mut self, _tagged: bool, _idx: usize) -> geozero::error::Result<()> {
        self.polygon_depth = self.polygon_depth.saturating_sub(1);
        Ok(())
    }

    fn linestring_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> geozero::error::Result<()> {
        if self.polygon_depth > 0 {
            self.in_ring = true;
            self.first = None;
            self.last = None;
        }
        Ok(())
    }

    fn linestring_end(&mut self, _tagged: bool, _idx: usize) -> geozero::error::Result<()> {
        if self.in_ring {
            if self.first != self.last {
                self.open_rings += 1;
            }
            self.in_ring = false;
        }
        Ok(())
    }
}

fn ensure_closed_rings(wkt: &str) -> Result<()> {
    let mut rings = RingClosure::default();
    geozero::wkt::Wkt(wkt.as_bytes())
        .process_geom(&mut rings)
        .map_err(|e| GeoColumnError::GeometryParse(format!("`{wkt}`: {e}")))?;
    if rings.open_rings > 0 {
        return Err(GeoColumnError::GeometryParse(format!(
            "`{wkt}`: polygon ring is not closed"
        )));
    }
    Ok(())
}

fn finish_decode(geometry: Geometry<f64>, expected: GeometrySubtype, srid: Srid) -> Result<GeometryValue> {
    let found = GeometrySubtype::of(&geometry);
    if !expected.accepts(found) {
        return Err(GeoColumnError::GeometryParse(format!(
            "expected {expected}, found {found}"
        )));
    }
    GeometryValue::new(geometry, srid).map_err(|e| match e {
        GeoColumnError::GeometryConstruction(reason) => GeoColumnError::GeometryParse(reason),
        other => other,
    })
}
