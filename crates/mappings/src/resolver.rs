//! Mapping resolution front end
//!
//! [`MappingResolver`] turns `(entity, spec)` pairs into cached tables and
//! answers version queries against them. The cache is injected, so tests and
//! independent subsystems can each own one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cache::MappingCache;
use super::error::SpecFormatError;
use super::spec::{parse_spec, SymbolStyle};
use super::table::VersionRangeTable;
use super::ProtocolVersion;

/// What an entity's symbols name
///
/// The kind selects the [`SymbolStyle`] applied while parsing, and
/// partitions the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Fields and methods
    Member,
    /// Runtime types
    Type,
}

/// Symbol style per entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolStyles {
    pub member: SymbolStyle,
    #[serde(rename = "type")]
    pub ty: SymbolStyle,
}

impl Default for SymbolStyles {
    fn default() -> Self {
        Self {
            member: SymbolStyle::Verbatim,
            ty: SymbolStyle::PathToDot,
        }
    }
}

impl SymbolStyles {
    pub fn get(&self, kind: EntityKind) -> SymbolStyle {
        match kind {
            EntityKind::Member => self.member,
            EntityKind::Type => self.ty,
        }
    }
}

/// Parses, caches and queries mapping specs
#[derive(Debug, Clone)]
pub struct MappingResolver {
    cache: Arc<MappingCache>,
    styles: SymbolStyles,
}

impl MappingResolver {
    /// Create a resolver over `cache` with the default symbol styles
    pub fn new(cache: Arc<MappingCache>) -> Self {
        Self {
            cache,
            styles: SymbolStyles::default(),
        }
    }

    /// Replace the symbol styles
    ///
    /// Resolvers sharing a cache must agree on styles, since cached tables
    /// are not re-normalized.
    pub fn with_styles(mut self, styles: SymbolStyles) -> Self {
        self.styles = styles;
        self
    }

    /// The backing cache
    pub fn cache(&self) -> &Arc<MappingCache> {
        &self.cache
    }

    pub fn styles(&self) -> SymbolStyles {
        self.styles
    }

    /// Table for a member-level entity
    pub fn unwrap(
        &self,
        entity: &str,
        spec: &str,
    ) -> Result<Arc<VersionRangeTable>, SpecFormatError> {
        self.unwrap_as(EntityKind::Member, entity, spec)
    }

    /// Table for `entity` of `kind`, parsing `spec` on first use
    ///
    /// A spec that fails to parse is reported on every call and never
    /// cached.
    pub fn unwrap_as(
        &self,
        kind: EntityKind,
        entity: &str,
        spec: &str,
    ) -> Result<Arc<VersionRangeTable>, SpecFormatError> {
        self.cache.get_or_try_insert_with(kind, entity, spec, || {
            let table = parse_spec(spec, self.styles.get(kind)).inspect_err(|e| {
                debug!("Rejected mapping spec for {:?} {}: {}", kind, entity, e);
            })?;

            for (version, symbols) in table.overlaps() {
                warn!(
                    "Mapping for {:?} {} lists version {} under {:?}, using {}",
                    kind, entity, version, symbols, symbols[0]
                );
            }

            Ok(table)
        })
    }

    /// Symbol valid at `version` in `table`
    pub fn resolve(table: &VersionRangeTable, version: ProtocolVersion) -> Option<&str> {
        table.resolve(version)
    }

    /// Unwrap and resolve a member-level mapping in one step
    pub fn find(
        &self,
        entity: &str,
        spec: &str,
        version: ProtocolVersion,
    ) -> Result<Option<String>, SpecFormatError> {
        self.find_as(EntityKind::Member, entity, spec, version)
    }

    /// Unwrap and resolve a mapping of `kind` in one step
    pub fn find_as(
        &self,
        kind: EntityKind,
        entity: &str,
        spec: &str,
        version: ProtocolVersion,
    ) -> Result<Option<String>, SpecFormatError> {
        let table = self.unwrap_as(kind, entity, spec)?;
        Ok(table.resolve(version).map(str::to_string))
    }
}
