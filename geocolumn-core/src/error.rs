use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoColumnError {
    #[error("invalid geometry: {0}")]
    GeometryConstruction(String),

    #[error("cannot parse geometry: {0}")]
    GeometryParse(String),

    #[error("cannot cast value for column `{column}`: {reason}")]
    TypeCast { column: String, reason: String },

    #[error("invalid spatial operand: {0}")]
    SpatialOperand(String),

    #[error("unsupported spatial operation: {0} requires named-function support")]
    UnsupportedOperation(&'static str),

    #[error("invalid EWKB: {0}")]
    InvalidEwkb(&'static str),

    #[error("unsupported coordinate dimensions: {dimensions}")]
    UnsupportedDimensions { dimensions: &'static str },

    #[error("geozero error: {0}")]
    Geozero(#[from] geozero::error::GeozeroError),

    #[error("{0}")]
    InvalidInput(String),
}

impl GeoColumnError {
    /// True for operations rejected because named spatial functions are unavailable.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }
}

pub type Result<T> = std::result::Result<T, GeoColumnError>;
