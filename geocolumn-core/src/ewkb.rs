//! EWKB (Extended Well-Known Binary) reader and writer.
//!
//! This is the storage representation of a spatial column: a BLOB in SQLite,
//! the binary form of `geometry` in PostGIS.
//!
//! Wire format:
//!   [0x01|0x00]   — byte order marker (little-endian or big-endian)
//!   [u32]         — geometry type with flags (in the declared byte order)
//!                   Bit 29 (0x20000000): SRID present
//!                   Bit 31 (0x80000000): Z dimension
//!                   Bit 30 (0x40000000): M dimension
//!                   Bits 0–28: geometry type (1=Point, 2=LineString, …)
//!   [i32]         — SRID (only when SRID flag set, in declared byte order)
//!   …             — ISO WKB geometry payload

use geo::Geometry;
use geozero::wkb::Ewkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};

use crate::error::{GeoColumnError, Result};
use crate::geometry::{GeometryValue, Srid};

// ── EWKB flag constants ───────────────────────────────────────────────────────
pub const EWKB_SRID_FLAG: u32 = 0x20000000;
pub const EWKB_Z_FLAG: u32 = 0x80000000;
pub const EWKB_M_FLAG: u32 = 0x40000000;

// ── Geometry type codes (ISO WKB) ─────────────────────────────────────────────
pub const WKB_POINT: u32 = 1;
pub const WKB_LINESTRING: u32 = 2;
pub const WKB_POLYGON: u32 = 3;
pub const WKB_MULTIPOINT: u32 = 4;
pub const WKB_MULTILINESTRING: u32 = 5;
pub const WKB_MULTIPOLYGON: u32 = 6;
pub const WKB_GEOMETRYCOLLECTION: u32 = 7;

fn dimensions_label(has_z: bool, has_m: bool) -> &'static str {
    match (has_z, has_m) {
        (true, true) => "ZM",
        (true, false) => "Z",
        (false, true) => "M",
        (false, false) => "XY",
    }
}

/// Reject Z/M coordinate layouts; only XY values are modelled.
pub fn ensure_xy_only(has_z: bool, has_m: bool) -> Result<()> {
    if has_z || has_m {
        return Err(GeoColumnError::UnsupportedDimensions {
            dimensions: dimensions_label(has_z, has_m),
        });
    }
    Ok(())
}

/// Parsed EWKB header metadata.
#[derive(Debug, Clone)]
pub struct EwkbHeader {
    /// Base geometry type code (1=Point, 2=LineString, ..., 7=GeometryCollection).
    pub geom_type: u32,
    /// SRID embedded in the EWKB, if the SRID flag is set.
    pub srid: Option<i32>,
    pub has_z: bool,
    pub has_m: bool,
}

/// Peek at the EWKB header without parsing the geometry payload.
///
/// # Example
///
/// ```
/// use geocolumn_core::ewkb::{parse_ewkb_header, write_ewkb, WKB_POINT};
/// use geocolumn_core::{GeometryValue, Srid};
///
/// let value = GeometryValue::point(1.0, 2.0, Srid::new(4326)).unwrap();
/// let hdr = parse_ewkb_header(&write_ewkb(&value).unwrap()).unwrap();
/// assert_eq!(hdr.geom_type, WKB_POINT);
/// assert_eq!(hdr.srid, Some(4326));
/// ```
pub fn parse_ewkb_header(blob: &[u8]) -> Result<EwkbHeader> {
    if blob.len() < 5 {
        return Err(GeoColumnError::InvalidEwkb("blob too short"));
    }

    let little_endian = match blob[0] {
        0x01 => true,
        0x00 => false,
        _ => return Err(GeoColumnError::InvalidEwkb("invalid byte order marker")),
    };

    let word = [blob[1], blob[2], blob[3], blob[4]];
    let raw_type = if little_endian {
        u32::from_le_bytes(word)
    } else {
        u32::from_be_bytes(word)
    };
    let has_srid = (raw_type & EWKB_SRID_FLAG) != 0;
    let has_z = (raw_type & EWKB_Z_FLAG) != 0;
    let has_m = (raw_type & EWKB_M_FLAG) != 0;
    let geom_type = raw_type & 0x1FFFFFFF;

    let srid = if has_srid {
        if blob.len() < 9 {
            return Err(GeoColumnError::InvalidEwkb(
                "SRID flag set but blob too short",
            ));
        }
        let word = [blob[5], blob[6], blob[7], blob[8]];
        Some(if little_endian {
            i32::from_le_bytes(word)
        } else {
            i32::from_be_bytes(word)
        })
    } else {
        None
    };

    Ok(EwkbHeader {
        geom_type,
        srid,
        has_z,
        has_m,
    })
}

/// Parse an EWKB (or ISO WKB) blob into a `geo` geometry and its raw SRID.
pub fn parse_ewkb(blob: &[u8]) -> Result<(Geometry<f64>, Option<i32>)> {
    let header = parse_ewkb_header(blob)?;
    ensure_xy_only(header.has_z, header.has_m)?;
    let geom = Ewkb(blob).to_geo()?;
    Ok((geom, header.srid))
}

/// Parse an EWKB blob into a validated [`GeometryValue`].
///
/// A blob without the SRID flag yields [`Srid::UNSPECIFIED`].
pub fn read_geometry(blob: &[u8]) -> Result<GeometryValue> {
    let (geom, srid) = parse_ewkb(blob)?;
    GeometryValue::new(geom, Srid::from_ewkb(srid)?)
}

fn patch_wkb_with_srid(iso_wkb: &[u8], srid_val: i32) -> Result<Vec<u8>> {
    if iso_wkb.len() < 5 {
        return Err(GeoColumnError::InvalidEwkb("WKB output too short"));
    }
    let little_endian = match iso_wkb[0] {
        0x01 => true,
        0x00 => false,
        _ => return Err(GeoColumnError::InvalidEwkb("invalid byte order marker")),
    };
    let word = [iso_wkb[1], iso_wkb[2], iso_wkb[3], iso_wkb[4]];
    let raw_type = if little_endian {
        u32::from_le_bytes(word)
    } else {
        u32::from_be_bytes(word)
    };
    let ewkb_type = raw_type | EWKB_SRID_FLAG;

    // ISO WKB: [byte_order(1)][type_u32(4)][payload…]
    // EWKB:    [byte_order(1)][type_u32_with_flag(4)][srid_i32(4)][payload…]
    let mut out = Vec::with_capacity(iso_wkb.len() + 4);
    out.push(iso_wkb[0]);
    if little_endian {
        out.extend_from_slice(&ewkb_type.to_le_bytes());
        out.extend_from_slice(&srid_val.to_le_bytes());
    } else {
        out.extend_from_slice(&ewkb_type.to_be_bytes());
        out.extend_from_slice(&srid_val.to_be_bytes());
    }
    out.extend_from_slice(&iso_wkb[5..]);
    Ok(out)
}

/// Serialise a geometry to ISO WKB (no SRID).
pub fn write_wkb(geom: &Geometry<f64>) -> Result<Vec<u8>> {
    geom.to_wkb(CoordDimensions::xy())
        .map_err(GeoColumnError::Geozero)
}

/// Serialise a value to EWKB; the SRID flag is set only for a specified SRID.
///
/// # Example
///
/// ```
/// use geocolumn_core::ewkb::{read_geometry, write_ewkb};
/// use geocolumn_core::{GeometryValue, Srid};
///
/// let value = GeometryValue::point(1.0, 2.0, Srid::new(3785)).unwrap();
/// let blob = write_ewkb(&value).unwrap();
/// assert_eq!(read_geometry(&blob).unwrap(), value);
/// ```
pub fn write_ewkb(value: &GeometryValue) -> Result<Vec<u8>> {
    let iso_wkb = write_wkb(value.geometry())?;
    match value.srid().to_ewkb()? {
        Some(srid_val) => patch_wkb_with_srid(&iso_wkb, srid_val),
        None => Ok(iso_wkb),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometrySubtype;

    fn point(srid: u32) -> GeometryValue {
        GeometryValue::point(1.0, 2.0, Srid::new(srid)).unwrap()
    }

    #[test]
    fn header_blob_too_short() {
        assert!(parse_ewkb_header(&[0x01, 0x02]).is_err());
        assert!(parse_ewkb_header(&[]).is_err());
    }

    #[test]
    fn header_invalid_byte_order_marker() {
        assert!(parse_ewkb_header(&[0x02, 0x01, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn header_srid_flag_but_truncated() {
        let mut blob = vec![0x01];
        blob.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_le_bytes());
        assert!(parse_ewkb_header(&blob).is_err());
    }

    #[test]
    fn header_big_endian_point_with_srid() {
        let mut blob = vec![0x00];
        blob.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_be_bytes());
        blob.extend_from_slice(&3785i32.to_be_bytes());
        blob.extend_from_slice(&1.0f64.to_be_bytes());
        blob.extend_from_slice(&2.0f64.to_be_bytes());

        let hdr = parse_ewkb_header(&blob).unwrap();
        assert_eq!(hdr.geom_type, WKB_POINT);
        assert_eq!(hdr.srid, Some(3785));

        let value = read_geometry(&blob).unwrap();
        assert_eq!(value, point(3785));
    }

    #[test]
    fn write_without_srid_is_iso_wkb() {
        let blob = write_ewkb(&point(0)).unwrap();
        assert_eq!(parse_ewkb_header(&blob).unwrap().srid, None);
        // byte order(1) + type(4) + x(8) + y(8)
        assert_eq!(blob.len(), 21);
    }

    #[test]
    fn write_with_srid_sets_flag() {
        let blob = write_ewkb(&point(3785)).unwrap();
        assert_eq!(parse_ewkb_header(&blob).unwrap().srid, Some(3785));
        // byte order(1) + type(4) + srid(4) + x(8) + y(8)
        assert_eq!(blob.len(), 25);
    }

    #[test]
    fn read_geometry_preserves_subtype_and_srid() {
        let line =
            GeometryValue::line_string([(1.0, 2.0), (3.0, 2.0)], Srid::new(3785)).unwrap();
        let restored = read_geometry(&write_ewkb(&line).unwrap()).unwrap();
        assert_eq!(restored.subtype(), GeometrySubtype::LineString);
        assert_eq!(restored, line);
    }

    #[test]
    fn read_geometry_rejects_negative_srid() {
        let mut blob = vec![0x01];
        blob.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_le_bytes());
        blob.extend_from_slice(&(-5i32).to_le_bytes());
        blob.extend_from_slice(&1.0f64.to_le_bytes());
        blob.extend_from_slice(&2.0f64.to_le_bytes());
        assert!(read_geometry(&blob).is_err());
    }

    #[test]
    fn parse_with_zm_point_is_rejected() {
        let mut blob = vec![0x01];
        blob.extend_from_slice(&(WKB_POINT | EWKB_Z_FLAG | EWKB_M_FLAG).to_le_bytes());
        for v in [1.0f64, 2.0, 3.0, 4.0] {
            blob.extend_from_slice(&v.to_le_bytes());
        }
        let err = parse_ewkb(&blob).expect_err("Z/M payloads must not be flattened to XY");
        assert!(format!("{err}").contains("unsupported coordinate dimensions"));
    }

    #[test]
    fn parse_truncated_payload_errors() {
        let mut blob = vec![0x01];
        blob.extend_from_slice(&WKB_LINESTRING.to_le_bytes());
        blob.extend_from_slice(&1u32.to_le_bytes());
        assert!(parse_ewkb(&blob).is_err());
    }

    #[test]
    fn patch_wkb_with_srid_big_endian() {
        let mut iso = vec![0x00];
        iso.extend_from_slice(&WKB_POINT.to_be_bytes());
        iso.extend_from_slice(&1.0f64.to_be_bytes());
        iso.extend_from_slice(&2.0f64.to_be_bytes());

        let ewkb = patch_wkb_with_srid(&iso, 4326).unwrap();
        assert_eq!(ewkb[0], 0x00);
        let hdr = parse_ewkb_header(&ewkb).unwrap();
        assert_eq!(hdr.srid, Some(4326));
        assert_eq!(read_geometry(&ewkb).unwrap().srid(), Srid::new(4326));
    }

    #[test]
    fn patch_wkb_with_srid_rejects_short_input() {
        assert!(patch_wkb_with_srid(&[0x01], 4326).is_err());
    }
}
