//! Error types for reflective access

use std::fmt;

use tinyproto_mappings::{ProtocolVersion, SpecFormatError};
use tinyproto_runtime::RuntimeError;

/// Why one escalation tier did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    pub tier: &'static str,
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

/// Per-tier diagnostics joined for display
pub(crate) struct Attempts<'a>(pub &'a [TierFailure]);

impl fmt::Display for Attempts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no tiers enabled");
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Malformed mapping spec: {0}")]
    SpecFormat(#[from] SpecFormatError),

    #[error("No symbol of {entity} is valid at protocol version {version}")]
    VersionUnresolved {
        entity: String,
        version: ProtocolVersion,
    },

    #[error("Member not found: {owner}.{member}")]
    MemberNotFound { owner: String, member: String },

    #[error("Could not construct {type_name} ({})", Attempts(.attempts))]
    ConstructionDenied {
        type_name: String,
        attempts: Vec<TierFailure>,
    },

    #[error("Could not write {owner}.{field} ({})", Attempts(.attempts))]
    MutationDenied {
        owner: String,
        field: String,
        attempts: Vec<TierFailure>,
    },

    #[error("Source of type {found} is neither {packet} nor {buffer}")]
    UnsupportedSource {
        packet: String,
        buffer: String,
        found: String,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Per-tier diagnostics of a denied construction or mutation
    pub fn attempts(&self) -> &[TierFailure] {
        match self {
            Self::ConstructionDenied { attempts, .. } | Self::MutationDenied { attempts, .. } => {
                attempts
            }
            _ => &[],
        }
    }
}
