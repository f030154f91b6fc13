//! SQLite extension registration via raw FFI.
//!
//! Registers the geocolumn SQL functions on a raw `*mut sqlite3` handle and
//! exports the `sqlite3_geocolumn_init` C entry point so SQLite can load
//! this library as a loadable extension.

use std::ffi::CString;
use std::os::raw::c_int;

use libsqlite3_sys::*;

use geocolumn_core::function_catalog::SQLITE_DETERMINISTIC_FUNCTIONS;
use geocolumn_core::functions::{
    as_ewkt, as_text, geom_from_text, st_distance, st_equals, st_geometry_type, st_length,
    st_srid, st_x, st_y,
};

// ── Constants ────────────────────────────────────────────────────────────────

const DET: c_int = SQLITE_UTF8 | SQLITE_DETERMINISTIC | SQLITE_INNOCUOUS;

const ERROR_MSG_TOO_LARGE: &str = "internal error: error message too large";
const PANIC_IN_CALLBACK_MSG: &str = "panic in SQLite callback";

fn sqlite_transient() -> sqlite3_destructor_type {
    // SQLITE_TRANSIENT is the sentinel destructor value -1.
    unsafe { std::mem::transmute(-1_isize) }
}

// ── Argument extraction ──────────────────────────────────────────────────────

unsafe fn get_blob<'a>(argv: *mut *mut sqlite3_value, i: usize) -> Option<&'a [u8]> {
    let v = *argv.add(i);
    if sqlite3_value_type(v) == SQLITE_NULL {
        return None;
    }
    let ptr = sqlite3_value_blob(v) as *const u8;
    let len = sqlite3_value_bytes(v) as usize;
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(ptr, len))
}

enum SqlArg<T> {
    Null,
    Value(T),
    Invalid,
}

unsafe fn get_text<'a>(argv: *mut *mut sqlite3_value, i: usize) -> SqlArg<&'a str> {
    let v = *argv.add(i);
    if sqlite3_value_type(v) == SQLITE_NULL {
        return SqlArg::Null;
    }
    let ptr = sqlite3_value_text(v);
    let len = sqlite3_value_bytes(v) as usize;
    if ptr.is_null() {
        return SqlArg::Invalid;
    }
    match std::str::from_utf8(std::slice::from_raw_parts(ptr as _, len)) {
        Ok(s) => SqlArg::Value(s),
        Err(_) => SqlArg::Invalid,
    }
}

unsafe fn get_srid(argv: *mut *mut sqlite3_value, i: usize) -> SqlArg<u32> {
    let v = *argv.add(i);
    match sqlite3_value_type(v) {
        SQLITE_NULL => SqlArg::Null,
        SQLITE_INTEGER => match u32::try_from(sqlite3_value_int64(v)) {
            Ok(srid) => SqlArg::Value(srid),
            Err(_) => SqlArg::Invalid,
        },
        _ => SqlArg::Invalid,
    }
}

// ── Result setting ───────────────────────────────────────────────────────────

fn checked_c_int_len(len: usize) -> Option<c_int> {
    c_int::try_from(len).ok()
}

unsafe fn set_error(ctx: *mut sqlite3_context, msg: &str) {
    match checked_c_int_len(msg.len()) {
        Some(len) => sqlite3_result_error(ctx, msg.as_ptr().cast(), len),
        None => sqlite3_result_error(
            ctx,
            ERROR_MSG_TOO_LARGE.as_ptr().cast(),
            ERROR_MSG_TOO_LARGE.len() as c_int,
        ),
    }
}

unsafe fn set_blob(ctx: *mut sqlite3_context, data: Vec<u8>) {
    let Some(len) = checked_c_int_len(data.len()) else {
        set_error(ctx, "internal error: BLOB result too large");
        return;
    };
    sqlite3_result_blob(ctx, data.as_ptr().cast(), len, sqlite_transient());
}

unsafe fn set_text(ctx: *mut sqlite3_context, s: impl AsRef<str>) {
    let s = s.as_ref();
    let Some(len) = checked_c_int_len(s.len()) else {
        set_error(ctx, "internal error: text result too large");
        return;
    };
    sqlite3_result_text(ctx, s.as_ptr().cast(), len, sqlite_transient());
}

unsafe fn set_f64(ctx: *mut sqlite3_context, v: f64) {
    sqlite3_result_double(ctx, v);
}

unsafe fn set_srid(ctx: *mut sqlite3_context, v: u32) {
    sqlite3_result_int64(ctx, i64::from(v));
}

unsafe fn set_bool(ctx: *mut sqlite3_context, v: bool) {
    sqlite3_result_int(ctx, c_int::from(v));
}

unsafe fn set_null(ctx: *mut sqlite3_context) {
    sqlite3_result_null(ctx);
}

unsafe fn xfunc_guard<F>(ctx: *mut sqlite3_context, label: &str, f: F)
where
    F: FnOnce(),
{
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    if result.is_err() {
        set_error(ctx, &format!("{label}: {PANIC_IN_CALLBACK_MSG}"));
    }
}

// ── Callback macros ──────────────────────────────────────────────────────────
//
// NULL inputs produce NULL output; core errors become sqlite3_result_error
// messages prefixed by the SQL function name.

/// 1 blob → Result<T>.
macro_rules! xfunc_blob {
    ($name:ident, $label:expr, $func:expr, $set:expr) => {
        unsafe extern "C" fn $name(
            ctx: *mut sqlite3_context,
            _n: c_int,
            argv: *mut *mut sqlite3_value,
        ) {
            xfunc_guard(ctx, $label, || {
                let Some(b) = get_blob(argv, 0) else {
                    set_null(ctx);
                    return;
                };
                match $func(b) {
                    Ok(v) => $set(ctx, v),
                    Err(e) => set_error(ctx, &format!(concat!($label, ": {}"), e)),
                }
            });
        }
    };
}

/// 2 blobs → Result<T>.
macro_rules! xfunc_blob2 {
    ($name:ident, $label:expr, $func:expr, $set:expr) => {
        unsafe extern "C" fn $name(
            ctx: *mut sqlite3_context,
            _n: c_int,
            argv: *mut *mut sqlite3_value,
        ) {
            xfunc_guard(ctx, $label, || {
                let (Some(a), Some(b)) = (get_blob(argv, 0), get_blob(argv, 1)) else {
                    set_null(ctx);
                    return;
                };
                match $func(a, b) {
                    Ok(v) => $set(ctx, v),
                    Err(e) => set_error(ctx, &format!(concat!($label, ": {}"), e)),
                }
            });
        }
    };
}

// ── I/O callbacks ────────────────────────────────────────────────────────────

unsafe fn geom_from_text_call(
    ctx: *mut sqlite3_context,
    argv: *mut *mut sqlite3_value,
    with_srid: bool,
) {
    const LABEL: &str = "ST_GeomFromText";
    let wkt = match get_text(argv, 0) {
        SqlArg::Value(wkt) => wkt,
        SqlArg::Null => return set_null(ctx),
        SqlArg::Invalid => return set_error(ctx, "ST_GeomFromText: wkt must be valid UTF-8 text"),
    };
    let srid = if with_srid {
        match get_srid(argv, 1) {
            SqlArg::Value(srid) => Some(srid),
            SqlArg::Null => return set_null(ctx),
            SqlArg::Invalid => {
                return set_error(ctx, "ST_GeomFromText: srid must be a non-negative integer")
            }
        }
    } else {
        None
    };
    match geom_from_text(wkt, srid) {
        Ok(blob) => set_blob(ctx, blob),
        Err(e) => set_error(ctx, &format!("{LABEL}: {e}")),
    }
}

unsafe extern "C" fn st_geomfromtext_1_xfunc(
    ctx: *mut sqlite3_context,
    _n: c_int,
    argv: *mut *mut sqlite3_value,
) {
    xfunc_guard(ctx, "ST_GeomFromText", || geom_from_text_call(ctx, argv, false));
}

unsafe extern "C" fn st_geomfromtext_2_xfunc(
    ctx: *mut sqlite3_context,
    _n: c_int,
    argv: *mut *mut sqlite3_value,
) {
    xfunc_guard(ctx, "ST_GeomFromText", || geom_from_text_call(ctx, argv, true));
}

xfunc_blob!(st_astext_xfunc, "ST_AsText", as_text, set_text);
xfunc_blob!(st_asewkt_xfunc, "ST_AsEWKT", as_ewkt, set_text);

// ── Accessor callbacks ───────────────────────────────────────────────────────

xfunc_blob!(st_srid_xfunc, "ST_SRID", st_srid, set_srid);
xfunc_blob!(st_geometrytype_xfunc, "ST_GeometryType", st_geometry_type, set_text);
xfunc_blob!(st_x_xfunc, "ST_X", st_x, set_f64);
xfunc_blob!(st_y_xfunc, "ST_Y", st_y, set_f64);

// ── Measurement and predicate callbacks ──────────────────────────────────────

xfunc_blob2!(st_distance_xfunc, "ST_Distance", st_distance, set_f64);
xfunc_blob!(st_length_xfunc, "ST_Length", st_length, set_f64);
xfunc_blob2!(st_equals_xfunc, "ST_Equals", st_equals, set_bool);

// ── Registration ─────────────────────────────────────────────────────────────

type XFunc = unsafe extern "C" fn(*mut sqlite3_context, c_int, *mut *mut sqlite3_value);

const CALLBACKS: &[(&str, c_int, XFunc)] = &[
    ("ST_GeomFromText", 1, st_geomfromtext_1_xfunc),
    ("ST_GeomFromText", 2, st_geomfromtext_2_xfunc),
    ("ST_AsText", 1, st_astext_xfunc),
    ("ST_AsEWKT", 1, st_asewkt_xfunc),
    ("ST_SRID", 1, st_srid_xfunc),
    ("ST_GeometryType", 1, st_geometrytype_xfunc),
    ("ST_X", 1, st_x_xfunc),
    ("ST_Y", 1, st_y_xfunc),
    ("ST_Distance", 2, st_distance_xfunc),
    ("ST_Length", 1, st_length_xfunc),
    ("ST_Equals", 2, st_equals_xfunc),
];

unsafe fn reg(db: *mut sqlite3, name: &str, n_arg: c_int, flags: c_int, xfunc: XFunc) -> c_int {
    let Ok(c_name) = CString::new(name) else {
        return SQLITE_ERROR;
    };
    sqlite3_create_function_v2(
        db,
        c_name.as_ptr(),
        n_arg,
        flags,
        std::ptr::null_mut(),
        Some(xfunc),
        None,
        None,
        None,
    )
}

/// Register every geocolumn SQL function on an open SQLite database.
///
/// Returns `SQLITE_OK` (0) on success, or the first error code on failure.
///
/// # Safety
/// `db` must be a valid, open SQLite database handle for the lifetime of the call.
pub unsafe fn register_functions(db: *mut sqlite3) -> c_int {
    if CALLBACKS.len() != SQLITE_DETERMINISTIC_FUNCTIONS.len() {
        return SQLITE_ERROR;
    }

    for spec in SQLITE_DETERMINISTIC_FUNCTIONS {
        let Some((_, _, xfunc)) = CALLBACKS
            .iter()
            .find(|(name, n_arg, _)| *name == spec.name && *n_arg == spec.n_arg)
        else {
            return SQLITE_ERROR;
        };

        let rc = reg(db, spec.name, spec.n_arg, DET, *xfunc);
        if rc != SQLITE_OK {
            return rc;
        }
    }

    SQLITE_OK
}

// ── C entry point for loadable extension ─────────────────────────────────────

/// Entry point called by SQLite when loading this library as an extension
/// (`.load libgeocolumn_sqlite sqlite3_geocolumn_init`).
///
/// # Safety
/// Called by SQLite with a valid database handle.
#[no_mangle]
pub unsafe extern "C" fn sqlite3_geocolumn_init(
    db: *mut sqlite3,
    _pz_err_msg: *mut *mut std::ffi::c_char,
    _p_api: *mut sqlite3_api_routines,
) -> c_int {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| register_functions(db))) {
        Ok(rc) => rc,
        Err(_) => SQLITE_ERROR,
    }
}

/// Entry point name derived by SQLite's default loader rules from the
/// library file name `libgeocolumn_sqlite`.
///
/// # Safety
/// Called by SQLite with a valid database handle.
#[no_mangle]
pub unsafe extern "C" fn sqlite3_geocolumnsqlite_init(
    db: *mut sqlite3,
    pz_err_msg: *mut *mut std::ffi::c_char,
    p_api: *mut sqlite3_api_routines,
) -> c_int {
    sqlite3_geocolumn_init(db, pz_err_msg, p_api)
}
