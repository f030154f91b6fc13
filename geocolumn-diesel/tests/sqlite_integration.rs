#![cfg(feature = "sqlite")]
//! Native SQLite integration tests for geocolumn-diesel.
//!
//! Uses `sqlite3_auto_extension` to register the geocolumn functions on every
//! `SqliteConnection::establish()` call, then runs builder predicates and
//! typed functions through Diesel against a real SQLite database.

use std::sync::Once;

use diesel::prelude::*;
use diesel::sql_query;
use geocolumn_core::capability::SpatialFeatures;
use geocolumn_core::column::SpatialColumn;
use geocolumn_core::predicate::PredicateBuilder;
use geocolumn_core::{GeometryValue, Srid};
use geocolumn_diesel::prelude::*;

diesel::table! {
    spatial_test (id) {
        id -> Integer,
        latlon -> Nullable<geocolumn_diesel::Geometry>,
        path -> Nullable<geocolumn_diesel::Geometry>,
    }
}

// ── Auto-extension registration ──────────────────────────────────────────────

static INIT: Once = Once::new();

/// Entry point called by SQLite for each new connection.
unsafe extern "C" fn geocolumn_init(
    db: *mut libsqlite3_sys::sqlite3,
    _pz_err_msg: *mut *mut std::ffi::c_char,
    _p_api: *const libsqlite3_sys::sqlite3_api_routines,
) -> std::ffi::c_int {
    geocolumn_sqlite::register_functions(db)
}

fn conn() -> SqliteConnection {
    INIT.call_once(|| unsafe {
        libsqlite3_sys::sqlite3_auto_extension(Some(geocolumn_init));
    });
    let mut c = SqliteConnection::establish(":memory:").unwrap();
    sql_query("CREATE TABLE spatial_test (id INTEGER PRIMARY KEY, latlon BLOB, path BLOB)")
        .execute(&mut c)
        .unwrap();
    c
}

// ── Schema ───────────────────────────────────────────────────────────────────

const SRID: Srid = Srid::new(3785);

fn latlon() -> SpatialColumn {
    SpatialColumn::from_definition("latlon", "point", 3785).unwrap()
}

fn path() -> SpatialColumn {
    SpatialColumn::from_definition("path", "line_string", 3785).unwrap()
}

fn builder() -> PredicateBuilder {
    PredicateBuilder::with_features(SpatialFeatures::all())
}

/// Inserts row 1 with `POINT(1 2)` and `LINESTRING(1 2,3 2)`, cast through
/// the column descriptors.
fn seed(c: &mut SqliteConnection) {
    let point = latlon().cast("POINT(1 2)").unwrap();
    let line = path().cast("LINESTRING(1 2,3 2)").unwrap();
    diesel::insert_into(spatial_test::table)
        .values((
            spatial_test::id.eq(1),
            spatial_test::latlon.eq(point),
            spatial_test::path.eq(line),
        ))
        .execute(c)
        .unwrap();
}

fn matching_ids(c: &mut SqliteConnection, filter: SpatialFilter) -> Vec<i32> {
    spatial_test::table
        .filter(filter)
        .select(spatial_test::id)
        .order(spatial_test::id)
        .load(c)
        .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn assigned_point_round_trips() {
    let mut c = conn();
    seed(&mut c);

    let reloaded: Option<GeometryValue> = spatial_test::table
        .find(1)
        .select(spatial_test::latlon)
        .first(&mut c)
        .unwrap();
    assert_eq!(reloaded, Some(GeometryValue::point(1.0, 2.0, SRID).unwrap()));

    // The raw column value goes through the descriptor's read path too.
    let raw: Option<Vec<u8>> = spatial_test::table
        .find(1)
        .select(spatial_test::latlon)
        .first(&mut c)
        .unwrap();
    assert_eq!(latlon().load(raw.as_deref()).unwrap(), reloaded);
}

#[test]
fn exact_match_filters_rows() {
    let mut c = conn();
    seed(&mut c);
    let column = latlon().qualified("spatial_test");

    let miss = GeometryValue::point(2.0, 2.0, SRID).unwrap();
    assert!(matching_ids(&mut c, builder().equals(column.clone(), &miss).unwrap().into()).is_empty());

    let hit = GeometryValue::point(1.0, 2.0, SRID).unwrap();
    assert_eq!(
        matching_ids(&mut c, builder().equals(column.clone(), &hit).unwrap().into()),
        vec![1]
    );
    assert_eq!(
        matching_ids(&mut c, builder().equals(&hit, column).unwrap().into()),
        vec![1]
    );
}

#[test]
fn equality_against_wkt_literal() {
    let mut c = conn();
    seed(&mut c);
    let column = latlon().qualified("spatial_test");

    let hit = builder().equals(column.clone(), "POINT(1 2)").unwrap();
    assert_eq!(matching_ids(&mut c, hit.into()), vec![1]);

    let prefixed = builder().equals(column, "SRID=3785;POINT(2 2)").unwrap();
    assert!(matching_ids(&mut c, prefixed.into()).is_empty());
}

#[test]
fn distance_threshold() {
    let mut c = conn();
    seed(&mut c);
    let column = latlon().qualified("spatial_test");

    let near = builder().st_distance(column.clone(), "POINT(2 3)").unwrap().lt(2.0);
    assert_eq!(matching_ids(&mut c, near.into()), vec![1]);

    let far = builder().st_distance(column.clone(), "POINT(2 3)").unwrap().gt(2.0);
    assert!(matching_ids(&mut c, far.into()).is_empty());

    let swapped = builder().st_distance("POINT(2 3)", column).unwrap().lt(2.0);
    assert_eq!(matching_ids(&mut c, swapped.into()), vec![1]);
}

#[test]
fn distance_is_selectable() {
    let mut c = conn();
    seed(&mut c);

    let measure = builder()
        .st_distance(latlon().qualified("spatial_test"), "POINT(2 3)")
        .unwrap();
    let distance: Option<f64> = spatial_test::table
        .select(SpatialMeasure::new(measure))
        .first(&mut c)
        .unwrap();
    assert!((distance.unwrap() - 2f64.sqrt()).abs() < 1e-12);
}

#[test]
fn length_threshold() {
    let mut c = conn();
    seed(&mut c);
    let column = path().qualified("spatial_test");

    let exact = builder().st_length(column.clone()).unwrap().eq(2.0);
    assert_eq!(matching_ids(&mut c, exact.into()), vec![1]);

    let long = builder().st_length(column).unwrap().gt(3.0);
    assert!(matching_ids(&mut c, long.into()).is_empty());
}

#[test]
fn null_is_preserved() {
    let mut c = conn();
    let nothing = latlon().cast(None::<GeometryValue>).unwrap();
    diesel::insert_into(spatial_test::table)
        .values((spatial_test::id.eq(2), spatial_test::latlon.eq(nothing)))
        .execute(&mut c)
        .unwrap();

    let reloaded: Option<GeometryValue> = spatial_test::table
        .find(2)
        .select(spatial_test::latlon)
        .first(&mut c)
        .unwrap();
    assert_eq!(reloaded, None);

    let hit = builder()
        .equals(latlon().qualified("spatial_test"), "POINT(1 2)")
        .unwrap();
    assert!(matching_ids(&mut c, hit.into()).is_empty());
}

// ── Typed functions ──────────────────────────────────────────────────────────

#[test]
fn typed_accessors() {
    let mut c = conn();
    seed(&mut c);

    let (wkt, ewkt, srid, kind): (Option<String>, Option<String>, Option<i32>, Option<String>) =
        spatial_test::table
            .find(1)
            .select((
                spatial_test::latlon.st_astext(),
                spatial_test::latlon.st_asewkt(),
                spatial_test::latlon.st_srid(),
                spatial_test::path.st_geometrytype(),
            ))
            .first(&mut c)
            .unwrap();
    assert!(wkt.unwrap().starts_with("POINT"));
    assert!(ewkt.unwrap().starts_with("SRID=3785;POINT"));
    assert_eq!(srid, Some(3785));
    assert_eq!(kind.as_deref(), Some("ST_LineString"));

    let (x, y): (Option<f64>, Option<f64>) = spatial_test::table
        .find(1)
        .select((spatial_test::latlon.st_x(), spatial_test::latlon.st_y()))
        .first(&mut c)
        .unwrap();
    assert_eq!((x, y), (Some(1.0), Some(2.0)));
}

#[test]
fn typed_distance_rejects_mixed_srid() {
    let mut c = conn();
    seed(&mut c);

    let result: QueryResult<Option<f64>> = spatial_test::table
        .select(spatial_test::latlon.st_distance(st_geomfromtext_srid("POINT(2 3)", 4326)))
        .first(&mut c);
    assert!(result.is_err());
}

#[test]
fn typed_equality() {
    let mut c = conn();
    seed(&mut c);

    let equal: Option<bool> = spatial_test::table
        .select(spatial_test::latlon.st_equals(st_geomfromtext("SRID=3785;POINT(1 2)")))
        .first(&mut c)
        .unwrap();
    assert_eq!(equal, Some(true));
}
