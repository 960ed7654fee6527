use std::fmt;

use panel_store::StoreError;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, weights, missing source, etc.).
    ConfigValidation(String),
    /// Two panel providers share a code. Fatal at directory load.
    DuplicateCode(String),
    /// A panel provider row violates the directory contract.
    InvalidProvider { code: String, reason: String },
    /// Two batch rows share a source id.
    DuplicateSourceId(String),
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// Coordinate parse error in a locations file.
    CoordinateParse { address: String, value: String },
    /// Repository failure while loading or saving.
    Store(String),
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::DuplicateCode(code) => {
                write!(f, "panel directory: duplicate provider code '{code}'")
            }
            Self::InvalidProvider { code, reason } => {
                write!(f, "panel directory: provider '{code}': {reason}")
            }
            Self::DuplicateSourceId(id) => write!(f, "batch: duplicate source id '{id}'"),
            Self::MissingColumn { source, column } => {
                write!(f, "{source}: missing column '{column}'")
            }
            Self::CoordinateParse { address, value } => {
                write!(f, "locations: address '{address}': cannot parse coordinate '{value}'")
            }
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<StoreError> for ReconError {
    fn from(e: StoreError) -> Self {
        Self::Store(e.to_string())
    }
}

/// The distance collaborator could not place one of the two providers.
///
/// Never fatal: the affected alternative is dropped and the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeUnavailable {
    pub address: String,
}

impl fmt::Display for GeocodeUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no location available for address '{}'", self.address)
    }
}

impl std::error::Error for GeocodeUnavailable {}
