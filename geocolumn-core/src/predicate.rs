//! Spatial predicate expression trees and the builder that produces them.
//!
//! The builder never emits SQL. It resolves operands (column references,
//! geometry values, WKT text), enforces SRID agreement and capability gating,
//! and returns a [`SpatialExpr`] tree that a query compiler renders for its
//! dialect (see the `geocolumn-diesel` crate).
//!
//! Operand resolution rules:
//!
//! - a WKT text operand without an explicit SRID takes the SRID of the other
//!   operand (a column's declared SRID or a geometry value's SRID);
//! - two operands with different SRIDs are rejected with
//!   [`GeoColumnError::SpatialOperand`], including `0` against non-zero;
//! - `equals` and `st_distance` are commutative: a literal passed first and a
//!   column passed second are swapped so the column is on the left. Two
//!   columns keep the caller's order.

use std::fmt;
use std::str::FromStr;

use crate::capability::SpatialFeatures;
use crate::codec::WktCodec;
use crate::error::{GeoColumnError, Result};
use crate::geometry::{ensure_matching_srid, GeometrySubtype, GeometryValue, Srid};

/// Named spatial operations understood by [`PredicateBuilder::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialOperation {
    /// Exact geometric equality; boolean.
    Equals,
    /// Planar distance between two geometries; numeric.
    Distance,
    /// Planar length of one linear geometry; numeric.
    Length,
}

impl SpatialOperation {
    pub const ALL: [SpatialOperation; 3] = [Self::Equals, Self::Distance, Self::Length];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Distance => "st_distance",
            Self::Length => "st_length",
        }
    }

    pub const fn arity(self) -> usize {
        match self {
            Self::Equals | Self::Distance => 2,
            Self::Length => 1,
        }
    }

    /// Operations compiled to named SQL functions, gated by the capability flag.
    pub const fn requires_named_functions(self) -> bool {
        !matches!(self, Self::Equals)
    }

    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Equals | Self::Distance)
    }
}

impl fmt::Display for SpatialOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpatialOperation {
    type Err = GeoColumnError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == lower)
            .ok_or_else(|| GeoColumnError::InvalidInput(format!("unknown spatial operation `{s}`")))
    }
}

/// SQL functions a predicate tree may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialFunction {
    Distance,
    Length,
}

impl SpatialFunction {
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Distance => "ST_Distance",
            Self::Length => "ST_Length",
        }
    }
}

/// Comparison operators between a numeric expression and a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// A spatial column as seen by the predicate builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    table: Option<String>,
    column: String,
    subtype: GeometrySubtype,
    srid: Srid,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>, subtype: GeometrySubtype, srid: Srid) -> Self {
        Self {
            table: None,
            column: column.into(),
            subtype,
            srid,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn subtype(&self) -> GeometrySubtype {
        self.subtype
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }
}

/// Predicate builder input.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(ColumnRef),
    Geometry(GeometryValue),
    /// Raw WKT (optionally `SRID=n;`-prefixed). `srid: None` defers to the
    /// other operand's SRID.
    Text { wkt: String, srid: Option<Srid> },
}

impl Operand {
    pub fn text(wkt: impl Into<String>) -> Self {
        Self::Text {
            wkt: wkt.into(),
            srid: None,
        }
    }

    pub fn text_with_srid(wkt: impl Into<String>, srid: Srid) -> Self {
        Self::Text {
            wkt: wkt.into(),
            srid: Some(srid),
        }
    }

    /// SRID a text operand on the other side inherits.
    fn anchor_srid(&self) -> Option<Srid> {
        match self {
            Self::Column(c) => Some(c.srid),
            Self::Geometry(g) => Some(g.srid()),
            Self::Text { srid, .. } => *srid,
        }
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl From<&ColumnRef> for Operand {
    fn from(column: &ColumnRef) -> Self {
        Self::Column(column.clone())
    }
}

impl From<GeometryValue> for Operand {
    fn from(value: GeometryValue) -> Self {
        Self::Geometry(value)
    }
}

impl From<&GeometryValue> for Operand {
    fn from(value: &GeometryValue) -> Self {
        Self::Geometry(value.clone())
    }
}

impl From<&str> for Operand {
    fn from(wkt: &str) -> Self {
        Self::text(wkt)
    }
}

impl From<String> for Operand {
    fn from(wkt: String) -> Self {
        Self::text(wkt)
    }
}

/// Predicate expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialExpr {
    Column(ColumnRef),
    /// A geometry bound as a parameter in its storage encoding.
    Geometry(GeometryValue),
    /// A geometry built in SQL: `ST_GeomFromText(wkt, srid)`.
    GeometryText { wkt: String, srid: Srid },
    Scalar(f64),
    Function {
        function: SpatialFunction,
        args: Vec<SpatialExpr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<SpatialExpr>,
        rhs: Box<SpatialExpr>,
    },
}

/// A boolean spatial expression, ready for a filter clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(SpatialExpr);

impl Predicate {
    pub fn expr(&self) -> &SpatialExpr {
        &self.0
    }

    pub fn into_expr(self) -> SpatialExpr {
        self.0
    }
}

/// A numeric spatial expression; compare it against a scalar to obtain a
/// [`Predicate`], or select it directly.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericExpr(SpatialExpr);

impl NumericExpr {
    pub fn expr(&self) -> &SpatialExpr {
        &self.0
    }

    pub fn into_expr(self) -> SpatialExpr {
        self.0
    }

    pub fn compare(self, op: CompareOp, value: f64) -> Predicate {
        Predicate(SpatialExpr::Compare {
            op,
            lhs: Box::new(self.0),
            rhs: Box::new(SpatialExpr::Scalar(value)),
        })
    }

    pub fn lt(self, value: f64) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: f64) -> Predicate {
        self.compare(CompareOp::LtEq, value)
    }

    pub fn gt(self, value: f64) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: f64) -> Predicate {
        self.compare(CompareOp::GtEq, value)
    }

    pub fn eq(self, value: f64) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: f64) -> Predicate {
        self.compare(CompareOp::NotEq, value)
    }
}

/// Result of [`PredicateBuilder::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialTerm {
    Boolean(Predicate),
    Numeric(NumericExpr),
}

impl SpatialTerm {
    pub fn into_predicate(self) -> Option<Predicate> {
        match self {
            Self::Boolean(p) => Some(p),
            Self::Numeric(_) => None,
        }
    }

    pub fn into_numeric(self) -> Option<NumericExpr> {
        match self {
            Self::Numeric(n) => Some(n),
            Self::Boolean(_) => None,
        }
    }
}

enum Resolved {
    Column(ColumnRef),
    Literal(GeometryValue),
}

impl Resolved {
    fn srid(&self) -> Srid {
        match self {
            Self::Column(c) => c.srid,
            Self::Literal(g) => g.srid(),
        }
    }

    fn subtype(&self) -> GeometrySubtype {
        match self {
            Self::Column(c) => c.subtype,
            Self::Literal(g) => g.subtype(),
        }
    }
}

/// Builds spatial predicates from operation names and operands.
///
/// # Example
///
/// ```
/// use geocolumn_core::capability::SpatialFeatures;
/// use geocolumn_core::column::SpatialColumn;
/// use geocolumn_core::predicate::PredicateBuilder;
/// use geocolumn_core::{GeometrySubtype, Srid};
///
/// let latlon = SpatialColumn::new("latlon", GeometrySubtype::Point, Srid::new(3785));
/// let builder = PredicateBuilder::with_features(SpatialFeatures::all());
///
/// let near = builder.st_distance(latlon.reference(), "POINT(2 3)").unwrap().lt(2.0);
/// let swapped = builder.st_distance("POINT(2 3)", latlon.reference()).unwrap().lt(2.0);
/// assert_eq!(near, swapped);
///
/// let gated = PredicateBuilder::with_features(SpatialFeatures::equality_only());
/// assert!(gated.st_distance(latlon.reference(), "POINT(2 3)").unwrap_err().is_unsupported());
/// assert!(gated.equals(latlon.reference(), "POINT(1 2)").is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicateBuilder {
    features: SpatialFeatures,
    codec: WktCodec,
}

impl PredicateBuilder {
    /// A builder using the process-wide capability flag.
    pub fn new() -> Self {
        Self::with_features(SpatialFeatures::detect())
    }

    pub fn with_features(features: SpatialFeatures) -> Self {
        Self {
            features,
            codec: WktCodec::default(),
        }
    }

    /// Codec used to parse text operands and render literal WKT.
    pub fn with_codec(mut self, codec: WktCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn features(&self) -> SpatialFeatures {
        self.features
    }

    /// Whether `operation` can be built; check this instead of catching
    /// [`GeoColumnError::UnsupportedOperation`].
    pub fn supports(&self, operation: SpatialOperation) -> bool {
        self.features.supports(operation)
    }

    /// Exact geometric equality. Always available.
    pub fn equals(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<Predicate> {
        let (lhs, rhs) = self.resolve_pair(SpatialOperation::Equals, lhs.into(), rhs.into())?;
        let expr = SpatialExpr::Compare {
            op: CompareOp::Eq,
            lhs: Box::new(bound(lhs)),
            rhs: Box::new(bound(rhs)),
        };
        tracing::trace!(?expr, "built equals predicate");
        Ok(Predicate(expr))
    }

    /// `ST_Distance(lhs, rhs)`.
    pub fn st_distance(&self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Result<NumericExpr> {
        self.ensure_supported(SpatialOperation::Distance)?;
        let (lhs, rhs) = self.resolve_pair(SpatialOperation::Distance, lhs.into(), rhs.into())?;
        let expr = SpatialExpr::Function {
            function: SpatialFunction::Distance,
            args: vec![self.in_function(lhs)?, self.in_function(rhs)?],
        };
        tracing::trace!(?expr, "built st_distance expression");
        Ok(NumericExpr(expr))
    }

    /// `ST_Length(operand)`; the operand must be linear or an unconstrained
    /// geometry column.
    pub fn st_length(&self, operand: impl Into<Operand>) -> Result<NumericExpr> {
        self.ensure_supported(SpatialOperation::Length)?;
        let operand = self.resolve(operand.into(), None)?;
        let subtype = operand.subtype();
        if !(subtype.is_generic() || subtype.is_linear()) {
            return Err(GeoColumnError::SpatialOperand(format!(
                "st_length requires a linear geometry, got {subtype}"
            )));
        }
        let expr = SpatialExpr::Function {
            function: SpatialFunction::Length,
            args: vec![self.in_function(operand)?],
        };
        tracing::trace!(?expr, "built st_length expression");
        Ok(NumericExpr(expr))
    }

    /// Build `operation` from a list of operands.
    pub fn apply(
        &self,
        operation: SpatialOperation,
        operands: impl IntoIterator<Item = Operand>,
    ) -> Result<SpatialTerm> {
        self.ensure_supported(operation)?;
        let operands: Vec<Operand> = operands.into_iter().collect();
        if operands.len() != operation.arity() {
            return Err(GeoColumnError::SpatialOperand(format!(
                "{operation} expects {} operand(s), got {}",
                operation.arity(),
                operands.len()
            )));
        }
        let mut operands = operands.into_iter();
        let mut next = || operands.next().ok_or_else(|| {
            GeoColumnError::SpatialOperand(format!("{operation}: missing operand"))
        });
        match operation {
            SpatialOperation::Equals => Ok(SpatialTerm::Boolean(self.equals(next()?, next()?)?)),
            SpatialOperation::Distance => Ok(SpatialTerm::Numeric(self.st_distance(next()?, next()?)?)),
            SpatialOperation::Length => Ok(SpatialTerm::Numeric(self.st_length(next()?)?)),
        }
    }

    fn ensure_supported(&self, operation: SpatialOperation) -> Result<()> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(GeoColumnError::UnsupportedOperation(operation.name()))
        }
    }

    fn resolve(&self, operand: Operand, default_srid: Option<Srid>) -> Result<Resolved> {
        match operand {
            Operand::Column(column) => Ok(Resolved::Column(column)),
            Operand::Geometry(value) => Ok(Resolved::Literal(value)),
            Operand::Text { wkt, srid } => {
                let srid = srid.or(default_srid).unwrap_or(Srid::UNSPECIFIED);
                self.codec
                    .decode(&wkt, GeometrySubtype::Geometry, srid)
                    .map(Resolved::Literal)
            }
        }
    }

    fn resolve_pair(
        &self,
        operation: SpatialOperation,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<(Resolved, Resolved)> {
        let lhs_anchor = lhs.anchor_srid();
        let rhs_anchor = rhs.anchor_srid();
        let lhs = self.resolve(lhs, rhs_anchor)?;
        let rhs = self.resolve(rhs, lhs_anchor)?;
        if let Err(err) = ensure_matching_srid(lhs.srid(), rhs.srid()) {
            tracing::debug!(%operation, left = %lhs.srid(), right = %rhs.srid(), "rejected spatial operands");
            return Err(err);
        }
        match (lhs, rhs) {
            (lhs @ Resolved::Literal(_), rhs @ Resolved::Column(_)) if operation.is_commutative() => {
                Ok((rhs, lhs))
            }
            pair => Ok(pair),
        }
    }

    fn in_function(&self, operand: Resolved) -> Result<SpatialExpr> {
        match operand {
            Resolved::Column(column) => Ok(SpatialExpr::Column(column)),
            Resolved::Literal(value) => Ok(SpatialExpr::GeometryText {
                wkt: self.codec.encode(&value)?,
                srid: value.srid(),
            }),
        }
    }
}

impl Default for PredicateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn bound(operand: Resolved) -> SpatialExpr {
    match operand {
        Resolved::Column(column) => SpatialExpr::Column(column),
        Resolved::Literal(value) => SpatialExpr::Geometry(value),
    }
}
