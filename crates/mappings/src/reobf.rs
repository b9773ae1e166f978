//! Mapping strings with protocol bounds
//!
//! A wrapper type or field may not exist at every protocol version. Besides
//! the mapping string, generated code records the inclusive range of
//! versions the entity exists in at all; outside of it the entity is skipped
//! rather than resolved.

use super::ProtocolVersion;

/// A mapping string plus the versions the mapped entity exists in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reobfuscation {
    /// Compact mapping string, `symbol=v,v+symbol=v`
    pub mapping: &'static str,
    /// Lowest supported version, inclusive
    pub min: Option<ProtocolVersion>,
    /// Highest supported version, inclusive
    pub max: Option<ProtocolVersion>,
}

impl Reobfuscation {
    /// An unbounded mapping
    pub const fn new(mapping: &'static str) -> Self {
        Self {
            mapping,
            min: None,
            max: None,
        }
    }

    pub const fn with_min(mut self, min: ProtocolVersion) -> Self {
        self.min = Some(min);
        self
    }

    pub const fn with_max(mut self, max: ProtocolVersion) -> Self {
        self.max = Some(max);
        self
    }

    /// Whether the entity exists at `version`
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.min.map_or(true, |min| version >= min) && self.max.map_or(true, |max| version <= max)
    }
}
