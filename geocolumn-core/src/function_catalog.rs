//! SQL functions exposed by engine adapters, with their arities.

/// SQLite function declaration metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteFunctionSpec {
    pub name: &'static str,
    pub n_arg: i32,
}

const fn spec(name: &'static str, n_arg: i32) -> SqliteFunctionSpec {
    SqliteFunctionSpec { name, n_arg }
}

/// Every function is deterministic and safe to call from any SQL context.
pub const SQLITE_DETERMINISTIC_FUNCTIONS: &[SqliteFunctionSpec] = &[
    // I/O
    spec("ST_GeomFromText", 1),
    spec("ST_GeomFromText", 2),
    spec("ST_AsText", 1),
    spec("ST_AsEWKT", 1),
    // Accessors
    spec("ST_SRID", 1),
    spec("ST_GeometryType", 1),
    spec("ST_X", 1),
    spec("ST_Y", 1),
    // Measurement
    spec("ST_Distance", 2),
    spec("ST_Length", 1),
    // Predicates
    spec("ST_Equals", 2),
];
