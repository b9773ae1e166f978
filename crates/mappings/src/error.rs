//! Error type for mapping spec parsing

/// A mapping spec string did not follow `symbol=v,v+symbol=v`
///
/// Clause indices are zero-based positions in the `+`-separated list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecFormatError {
    #[error("Mapping spec is empty")]
    Empty,

    #[error("Clause {index} is empty")]
    EmptyClause { index: usize },

    #[error("Clause {index} ({clause:?}) is missing the '=' separator")]
    MissingSeparator { index: usize, clause: String },

    #[error("Clause {index} has an empty symbol")]
    EmptySymbol { index: usize },

    #[error("Clause {index} lists no protocol versions")]
    NoVersions { index: usize },

    #[error("Invalid protocol version {token:?} in clause {index}")]
    InvalidVersion { index: usize, token: String },
}
