//! Spatial column descriptors: subtype and SRID constraints applied when a
//! value is assigned to, or loaded from, a geometry column.

use crate::codec::WktCodec;
use crate::error::{GeoColumnError, Result};
use crate::ewkb::write_ewkb;
use crate::geometry::{GeometrySubtype, GeometryValue, Srid};
use crate::predicate::ColumnRef;

/// Anything an application may try to assign to a spatial column.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Geometry(GeometryValue),
    /// WKT, optionally `SRID=n;`-prefixed.
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Geometry(_) => "geometry",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Binary(_) => "binary",
        }
    }
}

impl From<GeometryValue> for AttributeValue {
    fn from(value: GeometryValue) -> Self {
        Self::Geometry(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A geometry column declared as `(name, subtype, SRID)`.
///
/// Columns are always nullable.
///
/// # Example
///
/// ```
/// use geocolumn_core::column::SpatialColumn;
/// use geocolumn_core::{GeometryValue, Srid};
///
/// let latlon = SpatialColumn::from_definition("latlon", "point", 3785).unwrap();
///
/// let value = latlon.cast("POINT(1 2)").unwrap().unwrap();
/// assert_eq!(value, GeometryValue::point(1.0, 2.0, Srid::new(3785)).unwrap());
///
/// assert_eq!(latlon.cast(None::<GeometryValue>).unwrap(), None);
/// assert!(latlon.cast(42).is_err());
/// assert!(latlon.cast("LINESTRING(1 2,3 2)").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialColumn {
    name: String,
    subtype: GeometrySubtype,
    srid: Srid,
    codec: WktCodec,
}

impl SpatialColumn {
    pub fn new(name: impl Into<String>, subtype: GeometrySubtype, srid: Srid) -> Self {
        Self {
            name: name.into(),
            subtype,
            srid,
            codec: WktCodec::default(),
        }
    }

    /// Build from a schema tuple, e.g. `("path", "line_string", 3785)`.
    pub fn from_definition(name: impl Into<String>, subtype: &str, srid: u32) -> Result<Self> {
        Ok(Self::new(name, subtype.parse()?, Srid::new(srid)))
    }

    pub fn with_codec(mut self, codec: WktCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subtype(&self) -> GeometrySubtype {
        self.subtype
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    pub fn codec(&self) -> WktCodec {
        self.codec
    }

    /// Coerce an assigned value. `Null` stays `None`; geometry values and
    /// WKT text must satisfy the column's subtype and SRID.
    pub fn cast(&self, input: impl Into<AttributeValue>) -> Result<Option<GeometryValue>> {
        match input.into() {
            AttributeValue::Null => Ok(None),
            AttributeValue::Geometry(value) => self.check(value).map(Some),
            AttributeValue::Text(text) => {
                let value = self.codec.decode(&text, self.subtype, self.srid)?;
                self.check(value).map(Some)
            }
            other => Err(self.cast_error(format!("{} values are not geometries", other.kind()))),
        }
    }

    /// Validate a value against the column's subtype and SRID.
    pub fn check(&self, value: GeometryValue) -> Result<GeometryValue> {
        if !self.subtype.accepts(value.subtype()) {
            return Err(self.cast_error(format!(
                "expected {}, got {}",
                self.subtype,
                value.subtype()
            )));
        }
        if value.srid() != self.srid {
            return Err(self.cast_error(format!(
                "expected SRID {}, got SRID {}",
                self.srid,
                value.srid()
            )));
        }
        Ok(value)
    }

    /// Materialize a stored EWKB value. A blob without an SRID takes the
    /// column's SRID.
    pub fn load(&self, raw: Option<&[u8]>) -> Result<Option<GeometryValue>> {
        let Some(bytes) = raw else {
            return Ok(None);
        };
        let value = self.codec.decode_wkb(bytes, self.subtype, self.srid)?;
        self.check(value).map(Some)
    }

    /// Materialize a value the database returned as WKT.
    pub fn load_text(&self, raw: Option<&str>) -> Result<Option<GeometryValue>> {
        let Some(text) = raw else {
            return Ok(None);
        };
        let value = self.codec.decode(text, self.subtype, self.srid)?;
        self.check(value).map(Some)
    }

    /// Storage encoding (EWKB) of a value about to be written.
    pub fn dump(&self, value: Option<&GeometryValue>) -> Result<Option<Vec<u8>>> {
        value.map(write_ewkb).transpose()
    }

    /// Predicate operand for this column.
    pub fn reference(&self) -> ColumnRef {
        ColumnRef::new(self.name.clone(), self.subtype, self.srid)
    }

    /// Table-qualified predicate operand for this column.
    pub fn qualified(&self, table: impl Into<String>) -> ColumnRef {
        self.reference().with_table(table)
    }

    fn cast_error(&self, reason: String) -> GeoColumnError {
        tracing::debug!(column = %self.name, %reason, "rejected spatial column value");
        GeoColumnError::TypeCast {
            column: self.name.clone(),
            reason,
        }
    }
}
