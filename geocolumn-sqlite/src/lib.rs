#![doc = include_str!("../../README.md")]
//! Crate-specific API surface for `geocolumn-sqlite`.

mod ffi;
pub use ffi::{register_functions, sqlite3_geocolumn_init};
