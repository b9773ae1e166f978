//! Error type for host runtime operations

/// Failure reported by the host runtime
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Type already defined: {0}")]
    DuplicateType(String),

    #[error("Field not found: {owner}.{field}")]
    NoSuchField { owner: String, field: String },

    #[error("Field {owner}.{field} is immutable")]
    ImmutableField { owner: String, field: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Instance member {owner}.{member} needs a receiver")]
    MissingReceiver { owner: String, member: String },

    #[error("Receiver of type {found} is not a {expected}")]
    WrongReceiver { expected: String, found: String },

    #[error("Expected {expected} argument(s), found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Host facility unavailable: {0}")]
    FacilityUnavailable(&'static str),

    #[error("Encapsulation denied: {0}")]
    EncapsulationDenied(String),

    #[error("Cannot instantiate abstract type {0}")]
    AbstractType(String),

    #[error("Storage offset {offset} out of range")]
    InvalidOffset { offset: usize },

    #[error("Invocation failed: {0}")]
    Invocation(String),
}
