//! Process-lifetime cache of parsed version tables
//!
//! Layout: entity kind → entity key → spec string → table. Entries are
//! created on first resolution and never evicted; the number of entries is
//! bounded by the number of wrapper types in the program.
//!
//! Publishing is first-writer-wins. Two threads resolving the same pair for
//! the first time may both parse the mapping string; one of the resulting (equal)
//! tables is published and both callers receive it.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use super::resolver::EntityKind;
use super::table::VersionRangeTable;

type SpecMap = DashMap<String, Arc<VersionRangeTable>>;
type EntityMap = DashMap<String, Arc<SpecMap>>;

/// Cache of version tables, shared between resolvers by `Arc`
#[derive(Debug, Default)]
pub struct MappingCache {
    members: EntityMap,
    types: EntityMap,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entities(&self, kind: EntityKind) -> &EntityMap {
        match kind {
            EntityKind::Member => &self.members,
            EntityKind::Type => &self.types,
        }
    }

    /// Look up an already published table
    pub fn get(&self, kind: EntityKind, entity: &str, spec: &str) -> Option<Arc<VersionRangeTable>> {
        let specs = self.entities(kind).get(entity)?.value().clone();
        let table = specs.get(spec)?.value().clone();
        trace!("Mapping cache hit for {:?} {}", kind, entity);
        Some(table)
    }

    /// Publish a table unless one is already present
    ///
    /// Returns the table that ended up in the cache, which is `table` only if
    /// this call won the race.
    pub fn publish(
        &self,
        kind: EntityKind,
        entity: &str,
        spec: &str,
        table: VersionRangeTable,
    ) -> Arc<VersionRangeTable> {
        // Clone the inner map out so the outer shard lock is not held while
        // inserting into it
        let specs = self
            .entities(kind)
            .entry(entity.to_string())
            .or_default()
            .value()
            .clone();

        let published = specs
            .entry(spec.to_string())
            .or_insert_with(|| {
                debug!(
                    "Published mapping table for {:?} {} ({} symbols)",
                    kind,
                    entity,
                    table.len()
                );
                Arc::new(table)
            })
            .value()
            .clone();
        published
    }

    /// Return the cached table or build, publish and return a new one
    ///
    /// `build` runs outside of any lock. If it fails nothing is cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        kind: EntityKind,
        entity: &str,
        spec: &str,
        build: impl FnOnce() -> Result<VersionRangeTable, E>,
    ) -> Result<Arc<VersionRangeTable>, E> {
        if let Some(table) = self.get(kind, entity, spec) {
            return Ok(table);
        }
        let table = build()?;
        Ok(self.publish(kind, entity, spec, table))
    }

    /// Whether a table is published for the pair
    pub fn contains(&self, kind: EntityKind, entity: &str, spec: &str) -> bool {
        self.entities(kind)
            .get(entity)
            .is_some_and(|specs| specs.contains_key(spec))
    }

    /// Number of entities with at least one entry of `kind`
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entities(kind).len()
    }

    /// Total number of published tables
    pub fn len(&self) -> usize {
        [&self.members, &self.types]
            .iter()
            .map(|entities| {
                entities
                    .iter()
                    .map(|specs| specs.value().len())
                    .sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
