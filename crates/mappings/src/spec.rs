//! Mapping spec grammar
//!
//! ```text
//! spec    := clause ("+" clause)*
//! clause  := symbol "=" version ("," version)*
//! version := non-negative integer literal
//! ```
//!
//! Parsing is strict: a malformed clause rejects the whole spec instead of
//! producing a partial table.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::error::SpecFormatError;
use super::table::VersionRangeTable;
use super::ProtocolVersion;

const CLAUSE_SEPARATOR: char = '+';
const SYMBOL_SEPARATOR: char = '=';
const VERSION_SEPARATOR: char = ',';

/// How symbols are rewritten before they enter a table
///
/// Type mappings are extracted in internal path form (`net/minecraft/Foo`)
/// while runtime type names are dotted, so type-level entities normalize
/// path separators. Member names are taken as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolStyle {
    /// Keep the symbol exactly as written
    #[default]
    Verbatim,
    /// Replace every `/` with `.`
    PathToDot,
}

impl SymbolStyle {
    /// Apply this style to a raw symbol
    pub fn normalize(self, symbol: &str) -> Cow<'_, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(symbol),
            Self::PathToDot if symbol.contains('/') => Cow::Owned(symbol.replace('/', ".")),
            Self::PathToDot => Cow::Borrowed(symbol),
        }
    }
}

/// Parse a mapping spec into a table
///
/// A symbol that appears in several clauses accumulates the versions of all
/// of them. Duplicate versions under one symbol collapse.
pub fn parse_spec(spec: &str, style: SymbolStyle) -> Result<VersionRangeTable, SpecFormatError> {
    if spec.is_empty() {
        return Err(SpecFormatError::Empty);
    }

    // Clause order is kept so the table can break start-version ties by it
    let mut clauses: Vec<(String, Vec<ProtocolVersion>)> = Vec::new();

    for (index, clause) in spec.split(CLAUSE_SEPARATOR).enumerate() {
        if clause.is_empty() {
            return Err(SpecFormatError::EmptyClause { index });
        }

        let (symbol, versions) =
            clause
                .split_once(SYMBOL_SEPARATOR)
                .ok_or_else(|| SpecFormatError::MissingSeparator {
                    index,
                    clause: clause.to_string(),
                })?;

        if symbol.is_empty() {
            return Err(SpecFormatError::EmptySymbol { index });
        }
        if versions.is_empty() {
            return Err(SpecFormatError::NoVersions { index });
        }

        let parsed = versions
            .split(VERSION_SEPARATOR)
            .map(|token| parse_version(index, token))
            .collect::<Result<Vec<_>, _>>()?;

        let symbol = style.normalize(symbol);
        match clauses
            .iter()
            .position(|(existing, _)| existing.as_str() == symbol.as_ref())
        {
            Some(pos) => clauses[pos].1.extend(parsed),
            None => clauses.push((symbol.into_owned(), parsed)),
        }
    }

    Ok(VersionRangeTable::from_clauses(clauses))
}

fn parse_version(index: usize, token: &str) -> Result<ProtocolVersion, SpecFormatError> {
    // `u32::from_str` accepts a leading '+', which the grammar does not
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SpecFormatError::InvalidVersion {
            index,
            token: token.to_string(),
        });
    }
    token
        .parse::<ProtocolVersion>()
        .map_err(|_| SpecFormatError::InvalidVersion {
            index,
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_clause() {
        let table = parse_spec("field_1234=47,107,340", SymbolStyle::Verbatim).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.versions_of("field_1234"), Some(&[47, 107, 340][..]));
    }

    #[test]
    fn test_parse_multiple_clauses() {
        let table = parse_spec("old=1,2,3+new=4,5", SymbolStyle::Verbatim).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(2), Some("old"));
        assert_eq!(table.resolve(5), Some("new"));
        assert_eq!(table.resolve(9), None);
    }

    #[test]
    fn test_repeated_symbol_accumulates() {
        let table = parse_spec("a=1,2+b=3+a=4,2", SymbolStyle::Verbatim).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.versions_of("a"), Some(&[1, 2, 4][..]));
        assert_eq!(table.resolve(4), Some("a"));
    }

    #[test]
    fn test_path_to_dot_normalization() {
        let table = parse_spec(
            "net/minecraft/network/PacketBuffer=340+net/minecraft/network/FriendlyByteBuf=754",
            SymbolStyle::PathToDot,
        )
        .unwrap();
        assert_eq!(table.resolve(340), Some("net.minecraft.network.PacketBuffer"));
        assert_eq!(table.resolve(754), Some("net.minecraft.network.FriendlyByteBuf"));
    }

    #[test]
    fn test_verbatim_keeps_slashes() {
        let table = parse_spec("a/b=1", SymbolStyle::Verbatim).unwrap();
        assert_eq!(table.resolve(1), Some("a/b"));
    }

    #[test]
    fn test_normalization_merges_equivalent_symbols() {
        let table = parse_spec("a/b=1+a.b=2", SymbolStyle::PathToDot).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.versions_of("a.b"), Some(&[1, 2][..]));
    }

    #[test]
    fn test_non_integer_version() {
        let err = parse_spec("foo=1,x,3", SymbolStyle::Verbatim).unwrap_err();
        assert_eq!(
            err,
            SpecFormatError::InvalidVersion {
                index: 0,
                token: "x".to_string()
            }
        );
    }

    #[test]
    fn test_negative_and_signed_versions_rejected() {
        assert!(matches!(
            parse_spec("foo=-1", SymbolStyle::Verbatim),
            Err(SpecFormatError::InvalidVersion { .. })
        ));
        assert!(matches!(
            parse_spec("foo=+1", SymbolStyle::Verbatim),
            Err(SpecFormatError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_version_overflow_rejected() {
        assert!(matches!(
            parse_spec("foo=99999999999", SymbolStyle::Verbatim),
            Err(SpecFormatError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_spec("a=1+b", SymbolStyle::Verbatim).unwrap_err();
        assert_eq!(
            err,
            SpecFormatError::MissingSeparator {
                index: 1,
                clause: "b".to_string()
            }
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(
            parse_spec("", SymbolStyle::Verbatim).unwrap_err(),
            SpecFormatError::Empty
        );
        assert_eq!(
            parse_spec("a=1++b=2", SymbolStyle::Verbatim).unwrap_err(),
            SpecFormatError::EmptyClause { index: 1 }
        );
        assert_eq!(
            parse_spec("=1", SymbolStyle::Verbatim).unwrap_err(),
            SpecFormatError::EmptySymbol { index: 0 }
        );
        assert_eq!(
            parse_spec("a=", SymbolStyle::Verbatim).unwrap_err(),
            SpecFormatError::NoVersions { index: 0 }
        );
        assert!(matches!(
            parse_spec("a=1,,2", SymbolStyle::Verbatim),
            Err(SpecFormatError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_second_equals_is_not_a_version() {
        assert!(matches!(
            parse_spec("a=1=2", SymbolStyle::Verbatim),
            Err(SpecFormatError::InvalidVersion { .. })
        ));
    }
}
