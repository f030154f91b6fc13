//! The process-wide capability flag, configured before first use.
//!
//! Kept in its own test binary so nothing else in the process resolves the
//! flag first.

use geocolumn_core::capability::{
    configure_named_functions, named_functions_supported, SpatialFeatures,
};
use geocolumn_core::predicate::{PredicateBuilder, SpatialOperation};
use geocolumn_core::{GeometrySubtype, SpatialColumn, Srid};

#[test]
fn configured_flag_gates_default_builder() {
    assert_eq!(configure_named_functions(false), Ok(()));
    assert!(!named_functions_supported());
    assert_eq!(SpatialFeatures::detect(), SpatialFeatures::equality_only());

    let builder = PredicateBuilder::new();
    assert!(builder.supports(SpatialOperation::Equals));
    assert!(!builder.supports(SpatialOperation::Distance));
    assert!(!builder.supports(SpatialOperation::Length));

    let latlon = SpatialColumn::new("latlon", GeometrySubtype::Point, Srid::new(3785));
    assert!(builder.equals(latlon.reference(), "POINT(1 2)").is_ok());
    let err = builder
        .st_distance(latlon.reference(), "POINT(2 3)")
        .unwrap_err();
    assert!(err.is_unsupported());

    // Resolved once: later configuration reports the stored value.
    assert_eq!(configure_named_functions(true), Err(false));
    assert!(!named_functions_supported());
    assert!(!PredicateBuilder::default().supports(SpatialOperation::Distance));
}
