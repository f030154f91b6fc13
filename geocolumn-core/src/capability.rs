//! Process-wide capability flag gating named-function predicates.
//!
//! The flag starts out unknown and is resolved exactly once, either by an
//! explicit [`configure_named_functions`] call made before first use or by
//! probing the `GEOCOLUMN_NAMED_FUNCTIONS` environment variable. Once
//! resolved it never changes for the lifetime of the process.

use std::sync::OnceLock;

use crate::predicate::SpatialOperation;

/// Environment variable consulted when no value was configured explicitly.
pub const NAMED_FUNCTIONS_ENV: &str = "GEOCOLUMN_NAMED_FUNCTIONS";

/// A boolean computed at most once.
///
/// Readers observe either "unknown" or the fully computed value. When several
/// threads race on first access only one result is ever stored.
#[derive(Debug)]
pub struct CapabilityFlag {
    cell: OnceLock<bool>,
}

impl CapabilityFlag {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// The memoized value, or `None` while still unknown.
    pub fn get(&self) -> Option<bool> {
        self.cell.get().copied()
    }

    /// Return the memoized value, running `probe` if it is still unknown.
    pub fn get_or_probe(&self, probe: impl FnOnce() -> bool) -> bool {
        *self.cell.get_or_init(probe)
    }

    /// Fix the value before first use. Returns the already-resolved value
    /// as `Err` if the flag was computed earlier.
    pub fn configure(&self, value: bool) -> Result<(), bool> {
        self.cell.set(value).map_err(|_| self.get().unwrap_or(value))
    }
}

impl Default for CapabilityFlag {
    fn default() -> Self {
        Self::new()
    }
}

static NAMED_FUNCTIONS: CapabilityFlag = CapabilityFlag::new();

fn parse_flag(raw: Option<&str>) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "no"),
        None => true,
    }
}

/// Read the capability from the environment. Unset means supported.
pub fn probe_named_functions() -> bool {
    let raw = std::env::var(NAMED_FUNCTIONS_ENV).ok();
    let supported = parse_flag(raw.as_deref());
    tracing::debug!(
        source = "environment",
        value = raw.as_deref().unwrap_or("<unset>"),
        supported,
        "resolved named-function capability"
    );
    supported
}

/// Whether named-function predicates (`st_distance`, `st_length`) are
/// available in this process.
pub fn named_functions_supported() -> bool {
    NAMED_FUNCTIONS.get_or_probe(probe_named_functions)
}

/// Inject the capability instead of probing. Must run before the first
/// [`named_functions_supported`] call; afterwards the resolved value is
/// returned as `Err`.
pub fn configure_named_functions(supported: bool) -> Result<(), bool> {
    let outcome = NAMED_FUNCTIONS.configure(supported);
    match outcome {
        Ok(()) => tracing::debug!(source = "configured", supported, "resolved named-function capability"),
        Err(current) => tracing::debug!(
            requested = supported,
            current,
            "named-function capability already resolved"
        ),
    }
    outcome
}

/// Typed feature set held by a predicate builder.
///
/// # Example
///
/// ```
/// use geocolumn_core::capability::SpatialFeatures;
/// use geocolumn_core::predicate::SpatialOperation;
///
/// let features = SpatialFeatures::equality_only();
/// assert!(features.supports(SpatialOperation::Equals));
/// assert!(!features.supports(SpatialOperation::Distance));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialFeatures {
    named_functions: bool,
}

impl SpatialFeatures {
    pub const fn new(named_functions: bool) -> Self {
        Self { named_functions }
    }

    /// Snapshot of the process-wide flag.
    pub fn detect() -> Self {
        Self::new(named_functions_supported())
    }

    pub const fn all() -> Self {
        Self::new(true)
    }

    pub const fn equality_only() -> Self {
        Self::new(false)
    }

    pub const fn named_functions(&self) -> bool {
        self.named_functions
    }

    pub fn supports(&self, operation: SpatialOperation) -> bool {
        !operation.requires_named_functions() || self.named_functions
    }
}

impl Default for SpatialFeatures {
    fn default() -> Self {
        Self::detect()
    }
}
