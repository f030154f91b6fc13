//! Diesel SQL type definitions and `FromSql` / `ToSql` implementations.
//!
//! `Geometry` maps to `Binary` (BLOB) in SQLite and to PostGIS's native
//! `geometry` type in PostgreSQL. Both sides carry EWKB, so the SRID of a
//! value survives the trip through either backend.

// ── SQL types ─────────────────────────────────────────────────────────────────

/// Diesel SQL type for a geometry column (stored as EWKB BLOB).
///
/// ```rust,ignore
/// table! {
///     spatial_test (id) {
///         id     -> Integer,
///         latlon -> Nullable<geocolumn_diesel::Geometry>,
///     }
/// }
/// ```
#[derive(diesel::sql_types::SqlType, diesel::query_builder::QueryId, Debug, Clone, Copy)]
#[diesel(sqlite_type(name = "Binary"))]
#[diesel(postgres_type(name = "geometry"))]
pub struct Geometry;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
fn decode_blob(blob: &[u8]) -> Result<geocolumn_core::GeometryValue, BoxedError> {
    geocolumn_core::ewkb::read_geometry(blob).map_err(|e| Box::new(e) as BoxedError)
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
fn encode_value(value: &geocolumn_core::GeometryValue) -> Result<Vec<u8>, BoxedError> {
    geocolumn_core::ewkb::write_ewkb(value).map_err(|e| Box::new(e) as BoxedError)
}

// ── SQLite FromSql / ToSql ────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
mod sqlite_impls {
    use super::*;
    use diesel::deserialize::{self, FromSql};
    use diesel::serialize::{self, IsNull, Output, ToSql};
    use diesel::sql_types::Binary;
    use diesel::sqlite::Sqlite;
    use geocolumn_core::GeometryValue;
    // SQLite Output does NOT implement std::io::Write.
    // Binary values are passed via `out.set_value(value)`.

    impl FromSql<Geometry, Sqlite> for Vec<u8> {
        fn from_sql(
            bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
        ) -> deserialize::Result<Self> {
            <Vec<u8> as FromSql<Binary, Sqlite>>::from_sql(bytes)
        }
    }

    impl ToSql<Geometry, Sqlite> for Vec<u8> {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
            out.set_value(self.as_slice());
            Ok(IsNull::No)
        }
    }

    impl ToSql<Geometry, Sqlite> for [u8] {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
            out.set_value(self);
            Ok(IsNull::No)
        }
    }

    impl FromSql<Geometry, Sqlite> for GeometryValue {
        fn from_sql(
            bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
        ) -> deserialize::Result<Self> {
            let blob = <Vec<u8> as FromSql<Binary, Sqlite>>::from_sql(bytes)?;
            super::decode_blob(&blob)
        }
    }

    impl ToSql<Geometry, Sqlite> for GeometryValue {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
            out.set_value(super::encode_value(self)?);
            Ok(IsNull::No)
        }
    }
}

// ── PostgreSQL FromSql / ToSql ────────────────────────────────────────────────

#[cfg(feature = "postgres")]
mod postgres_impls {
    use super::*;
    use diesel::deserialize::{self, FromSql};
    use diesel::pg::Pg;
    use diesel::serialize::{self, IsNull, Output, ToSql};
    use geocolumn_core::GeometryValue;
    use std::io::Write as IoWrite;

    impl FromSql<Geometry, Pg> for Vec<u8> {
        fn from_sql(
            bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
        ) -> deserialize::Result<Self> {
            Ok(bytes.as_bytes().to_vec())
        }
    }

    impl ToSql<Geometry, Pg> for Vec<u8> {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
            IoWrite::write_all(out, self)?;
            Ok(IsNull::No)
        }
    }

    impl ToSql<Geometry, Pg> for [u8] {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
            IoWrite::write_all(out, self)?;
            Ok(IsNull::No)
        }
    }

    impl FromSql<Geometry, Pg> for GeometryValue {
        fn from_sql(
            bytes: <Pg as diesel::backend::Backend>::RawValue<'_>,
        ) -> deserialize::Result<Self> {
            super::decode_blob(bytes.as_bytes())
        }
    }

    impl ToSql<Geometry, Pg> for GeometryValue {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
            IoWrite::write_all(out, &super::encode_value(self)?)?;
            Ok(IsNull::No)
        }
    }
}
