//! Immutable symbol → protocol version table

use std::collections::HashMap;

use super::ProtocolVersion;

/// One symbol and the sorted protocol versions it is valid for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRange {
    symbol: String,
    /// Sorted, deduplicated, never empty
    versions: Vec<ProtocolVersion>,
}

impl SymbolRange {
    /// The symbol name
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Versions this symbol is valid for, ascending
    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// Lowest version this symbol is valid for
    pub fn start(&self) -> ProtocolVersion {
        self.versions[0]
    }

    /// Highest version this symbol is valid for
    pub fn end(&self) -> ProtocolVersion {
        self.versions[self.versions.len() - 1]
    }

    /// Whether the symbol is valid at `version`
    pub fn contains(&self, version: ProtocolVersion) -> bool {
        self.versions.binary_search(&version).is_ok()
    }
}

/// Symbol → valid protocol versions for one (entity, spec) pair
///
/// Built once by [`parse_spec`](crate::parse_spec) and never mutated
/// afterwards, so a shared `Arc<VersionRangeTable>` can be read from any
/// number of threads.
///
/// Ranges are kept in ascending order of their start version. When a
/// malformed spec lets two symbols claim the same version, the symbol whose
/// range starts first wins; equal starts fall back to clause order. The
/// per-version index is precomputed with that policy so resolution never
/// depends on hash iteration order.
#[derive(Debug, Clone)]
pub struct VersionRangeTable {
    ranges: Vec<SymbolRange>,
    by_version: HashMap<ProtocolVersion, usize>,
}

impl VersionRangeTable {
    /// Build from parsed clauses in spec order
    ///
    /// Every clause must carry at least one version.
    pub(crate) fn from_clauses(clauses: Vec<(String, Vec<ProtocolVersion>)>) -> Self {
        let mut ranges: Vec<SymbolRange> = clauses
            .into_iter()
            .map(|(symbol, mut versions)| {
                versions.sort_unstable();
                versions.dedup();
                SymbolRange { symbol, versions }
            })
            .collect();

        // Stable: equal starts keep clause order
        ranges.sort_by_key(SymbolRange::start);

        let mut by_version = HashMap::new();
        for (index, range) in ranges.iter().enumerate() {
            for version in &range.versions {
                by_version.entry(*version).or_insert(index);
            }
        }

        Self { ranges, by_version }
    }

    /// The symbol valid at `version`, if any
    ///
    /// Absence is a normal outcome: the entity may simply not exist at that
    /// version.
    pub fn resolve(&self, version: ProtocolVersion) -> Option<&str> {
        self.by_version
            .get(&version)
            .map(|index| self.ranges[*index].symbol.as_str())
    }

    /// Versions listed for `symbol`
    pub fn versions_of(&self, symbol: &str) -> Option<&[ProtocolVersion]> {
        self.ranges
            .iter()
            .find(|range| range.symbol == symbol)
            .map(SymbolRange::versions)
    }

    /// Ranges in tie-break order (ascending start version)
    pub fn iter(&self) -> impl Iterator<Item = &SymbolRange> {
        self.ranges.iter()
    }

    /// Symbols in tie-break order
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(SymbolRange::symbol)
    }

    /// Number of distinct symbols
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Versions claimed by more than one symbol, with every claimant
    ///
    /// Claimants are listed in tie-break order, so the first one is the
    /// symbol [`resolve`](Self::resolve) returns. Sorted by version.
    pub fn overlaps(&self) -> Vec<(ProtocolVersion, Vec<&str>)> {
        let mut claims: HashMap<ProtocolVersion, Vec<&str>> = HashMap::new();
        for range in &self.ranges {
            for version in &range.versions {
                claims.entry(*version).or_default().push(&range.symbol);
            }
        }

        let mut overlaps: Vec<_> = claims
            .into_iter()
            .filter(|(_, symbols)| symbols.len() > 1)
            .collect();
        overlaps.sort_unstable_by_key(|(version, _)| *version);
        overlaps
    }
}

impl PartialEq for VersionRangeTable {
    fn eq(&self, other: &Self) -> bool {
        // The index is derived from the ranges
        self.ranges == other.ranges
    }
}

impl Eq for VersionRangeTable {}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(clauses: &[(&str, &[ProtocolVersion])]) -> VersionRangeTable {
        VersionRangeTable::from_clauses(
            clauses
                .iter()
                .map(|(symbol, versions)| (symbol.to_string(), versions.to_vec()))
                .collect(),
        )
    }

    #[test]
    fn test_resolve_deterministic() {
        let t = table(&[("old", &[1, 2, 3]), ("new", &[4, 5])]);
        for _ in 0..16 {
            assert_eq!(t.resolve(3), Some("old"));
            assert_eq!(t.resolve(4), Some("new"));
            assert_eq!(t.resolve(0), None);
        }
    }

    #[test]
    fn test_versions_sorted_and_deduplicated() {
        let t = table(&[("a", &[5, 1, 5, 3])]);
        assert_eq!(t.versions_of("a"), Some(&[1, 3, 5][..]));
        let range = t.iter().next().unwrap();
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 5);
        assert!(range.contains(3));
        assert!(!range.contains(2));
    }

    #[test]
    fn test_ranges_ordered_by_start() {
        let t = table(&[("late", &[10, 11]), ("early", &[1, 2])]);
        assert_eq!(t.symbols().collect::<Vec<_>>(), vec!["early", "late"]);
    }

    #[test]
    fn test_overlap_lowest_start_wins() {
        // "b" is listed first but "a" starts earlier
        let t = table(&[("b", &[3, 4]), ("a", &[1, 3])]);
        assert_eq!(t.resolve(3), Some("a"));
        assert_eq!(t.resolve(4), Some("b"));
        assert_eq!(t.overlaps(), vec![(3, vec!["a", "b"])]);
    }

    #[test]
    fn test_overlap_equal_start_keeps_clause_order() {
        let t = table(&[("first", &[7, 8]), ("second", &[7])]);
        assert_eq!(t.resolve(7), Some("first"));
    }

    #[test]
    fn test_equality_ignores_clause_order_of_disjoint_ranges() {
        let a = table(&[("x", &[1]), ("y", &[2])]);
        let b = table(&[("y", &[2]), ("x", &[1])]);
        assert_eq!(a, b);
        assert_ne!(a, table(&[("x", &[1])]));
    }

    #[test]
    fn test_no_overlaps() {
        let t = table(&[("x", &[1, 2]), ("y", &[3])]);
        assert!(t.overlaps().is_empty());
        assert_eq!(t.len(), 2);
        assert!(!t.is_empty());
    }
}
