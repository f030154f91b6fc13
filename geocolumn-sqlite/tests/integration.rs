//! Integration tests for the geocolumn SQLite functions, driven through raw FFI.

use libsqlite3_sys::*;
use std::ffi::{CStr, CString};

struct TestDb(*mut sqlite3);

impl TestDb {
    fn open() -> Self {
        let mut db = std::ptr::null_mut();
        let path = CString::new(":memory:").unwrap();
        unsafe {
            assert_eq!(SQLITE_OK, sqlite3_open(path.as_ptr(), &mut db));
            assert_eq!(SQLITE_OK, geocolumn_sqlite::register_functions(db));
        }
        TestDb(db)
    }

    fn prepare(&self, sql: &str) -> Result<*mut sqlite3_stmt, String> {
        let sql_c = CString::new(sql).unwrap();
        let mut stmt = std::ptr::null_mut();
        unsafe {
            let rc =
                sqlite3_prepare_v2(self.0, sql_c.as_ptr(), -1, &mut stmt, std::ptr::null_mut());
            if rc != SQLITE_OK {
                return Err(self.errmsg());
            }
        }
        Ok(stmt)
    }

    fn errmsg(&self) -> String {
        unsafe { CStr::from_ptr(sqlite3_errmsg(self.0)).to_string_lossy().into_owned() }
    }

    fn try_query_row<T>(
        &self,
        sql: &str,
        extract: impl Fn(*mut sqlite3_stmt) -> T,
    ) -> Result<T, String> {
        let stmt = self.prepare(sql)?;
        unsafe {
            if sqlite3_step(stmt) != SQLITE_ROW {
                sqlite3_finalize(stmt);
                return Err(self.errmsg());
            }
            let val = extract(stmt);
            sqlite3_finalize(stmt);
            Ok(val)
        }
    }

    fn query_text(&self, sql: &str) -> String {
        self.try_query_row(sql, |stmt| unsafe {
            let ptr = sqlite3_column_text(stmt, 0);
            CStr::from_ptr(ptr as _).to_string_lossy().into_owned()
        })
        .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    fn query_f64(&self, sql: &str) -> f64 {
        self.try_query_row(sql, |stmt| unsafe { sqlite3_column_double(stmt, 0) })
            .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    fn query_i64(&self, sql: &str) -> i64 {
        self.try_query_row(sql, |stmt| unsafe { sqlite3_column_int64(stmt, 0) })
            .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    fn query_is_null(&self, sql: &str) -> bool {
        self.try_query_row(sql, |stmt| unsafe { sqlite3_column_type(stmt, 0) == SQLITE_NULL })
            .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    fn query_error(&self, sql: &str) -> String {
        match self.try_query_row(sql, |_| ()) {
            Ok(()) => panic!("expected {sql} to fail"),
            Err(e) => e,
        }
    }

    fn query_all_i64(&self, sql: &str) -> Vec<i64> {
        let stmt = self.prepare(sql).unwrap_or_else(|e| panic!("{sql}: {e}"));
        let mut vals = Vec::new();
        unsafe {
            while sqlite3_step(stmt) == SQLITE_ROW {
                vals.push(sqlite3_column_int64(stmt, 0));
            }
            sqlite3_finalize(stmt);
        }
        vals
    }

    fn exec(&self, sql: &str) {
        let sql_c = CString::new(sql).unwrap();
        unsafe {
            let rc = sqlite3_exec(
                self.0,
                sql_c.as_ptr(),
                None,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            );
            assert_eq!(SQLITE_OK, rc, "exec failed for {sql}: {}", self.errmsg());
        }
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        unsafe {
            sqlite3_close(self.0);
        }
    }
}

// ── I/O ───────────────────────────────────────────────────────────────────────

#[test]
fn wkt_round_trip() {
    let db = TestDb::open();
    let wkt = db.query_text("SELECT ST_AsText(ST_GeomFromText('POLYGON((0 0,1 0,1 1,0 1,0 0))'))");
    assert!(wkt.starts_with("POLYGON"), "got: {wkt}");
}

#[test]
fn ewkt_carries_srid() {
    let db = TestDb::open();
    let ewkt = db.query_text("SELECT ST_AsEWKT(ST_GeomFromText('POINT(1 2)', 3785))");
    assert!(ewkt.starts_with("SRID=3785;POINT"), "got: {ewkt}");
}

#[test]
fn srid_defaults_to_unspecified() {
    let db = TestDb::open();
    assert_eq!(db.query_i64("SELECT ST_SRID(ST_GeomFromText('POINT(1 2)'))"), 0);
    assert_eq!(db.query_i64("SELECT ST_SRID(ST_GeomFromText('POINT(1 2)', 3785))"), 3785);
}

#[test]
fn malformed_wkt_is_an_error() {
    let db = TestDb::open();
    let err = db.query_error("SELECT ST_GeomFromText('POINT(1')");
    assert!(err.starts_with("ST_GeomFromText:"), "got: {err}");
}

#[test]
fn null_in_null_out() {
    let db = TestDb::open();
    assert!(db.query_is_null("SELECT ST_GeomFromText(NULL)"));
    assert!(db.query_is_null("SELECT ST_GeomFromText('POINT(1 2)', NULL)"));
    assert!(db.query_is_null("SELECT ST_AsText(NULL)"));
    assert!(db.query_is_null("SELECT ST_Length(NULL)"));
    assert!(db.query_is_null("SELECT ST_Distance(NULL, ST_GeomFromText('POINT(1 2)'))"));
}

// ── Accessors ─────────────────────────────────────────────────────────────────

#[test]
fn point_accessors() {
    let db = TestDb::open();
    assert_eq!(db.query_f64("SELECT ST_X(ST_GeomFromText('POINT(1 2)'))"), 1.0);
    assert_eq!(db.query_f64("SELECT ST_Y(ST_GeomFromText('POINT(1 2)'))"), 2.0);
    assert_eq!(
        db.query_text("SELECT ST_GeometryType(ST_GeomFromText('LINESTRING(1 2,3 2)'))"),
        "ST_LineString"
    );
}

// ── Measurement ───────────────────────────────────────────────────────────────

#[test]
fn distance_between_points() {
    let db = TestDb::open();
    let d = db.query_f64(
        "SELECT ST_Distance(ST_GeomFromText('POINT(1 2)', 3785), ST_GeomFromText('POINT(2 3)', 3785))",
    );
    assert!((d - 2f64.sqrt()).abs() < 1e-12);
}

#[test]
fn distance_rejects_mixed_srid() {
    let db = TestDb::open();
    let err = db.query_error(
        "SELECT ST_Distance(ST_GeomFromText('POINT(1 2)', 3785), ST_GeomFromText('POINT(2 3)', 4326))",
    );
    assert!(err.contains("mixed SRID"), "got: {err}");
}

#[test]
fn length_of_line_and_point() {
    let db = TestDb::open();
    assert_eq!(
        db.query_f64("SELECT ST_Length(ST_GeomFromText('LINESTRING(1 2,3 2)', 3785))"),
        2.0
    );
    assert_eq!(db.query_f64("SELECT ST_Length(ST_GeomFromText('POINT(1 2)'))"), 0.0);
}

// ── Stored columns ────────────────────────────────────────────────────────────

#[test]
fn filters_on_stored_blobs() {
    let db = TestDb::open();
    db.exec("CREATE TABLE spatial_test (id INTEGER PRIMARY KEY, latlon BLOB, path BLOB)");
    db.exec(
        "INSERT INTO spatial_test (id, latlon, path) VALUES \
         (1, ST_GeomFromText('POINT(1 2)', 3785), ST_GeomFromText('LINESTRING(1 2,3 2)', 3785)), \
         (2, ST_GeomFromText('POINT(10 10)', 3785), NULL)",
    );

    let near = db.query_all_i64(
        "SELECT id FROM spatial_test \
         WHERE ST_Distance(latlon, ST_GeomFromText('POINT(2 3)', 3785)) < 2 ORDER BY id",
    );
    assert_eq!(near, vec![1]);

    let exact = db.query_all_i64(
        "SELECT id FROM spatial_test WHERE ST_Equals(latlon, ST_GeomFromText('POINT(1 2)', 3785))",
    );
    assert_eq!(exact, vec![1]);

    let long = db.query_all_i64("SELECT id FROM spatial_test WHERE ST_Length(path) = 2");
    assert_eq!(long, vec![1]);
    assert!(db.query_all_i64("SELECT id FROM spatial_test WHERE ST_Length(path) > 3").is_empty());
}

#[test]
fn blob_written_by_sql_decodes_in_core() {
    let db = TestDb::open();
    let hex = db.query_text("SELECT hex(ST_GeomFromText('POINT(1 2)', 3785))");
    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect();
    let value = geocolumn_core::ewkb::read_geometry(&bytes).unwrap();
    assert_eq!(
        value,
        geocolumn_core::GeometryValue::point(1.0, 2.0, geocolumn_core::Srid::new(3785)).unwrap()
    );
}
