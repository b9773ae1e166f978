//! tinyproto mappings - which symbol was valid at which protocol version
//!
//! Generated wrapper code carries compact mapping strings such as
//! `a=47,107+chatMessage=340,754` that list, for every symbol a member or
//! type had over the protocol's history, the protocol versions under which
//! that symbol is correct. This crate parses those strings into immutable
//! [`VersionRangeTable`]s, caches them per entity, and answers
//! "which symbol is valid at version V".
//!
//! # Architecture
//!
//! ```text
//! spec string ──► MappingResolver::unwrap ──► MappingCache (kind → entity → spec)
//!                        │                          │
//!                        ▼                          ▼
//!                  parse_spec (once)        Arc<VersionRangeTable>
//!                                                   │
//!                              VersionRangeTable::resolve(version) ──► symbol
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tinyproto_mappings::{MappingCache, MappingResolver};
//!
//! let resolver = MappingResolver::new(Arc::new(MappingCache::new()));
//! let table = resolver.unwrap("ChatPacket", "old=1,2,3+new=4,5").unwrap();
//!
//! assert_eq!(table.resolve(2), Some("old"));
//! assert_eq!(table.resolve(5), Some("new"));
//! assert_eq!(table.resolve(9), None);
//! ```

pub mod cache;
pub mod error;
pub mod reobf;
pub mod resolver;
pub mod spec;
pub mod table;

pub use cache::MappingCache;
pub use error::SpecFormatError;
pub use reobf::Reobfuscation;
pub use resolver::{EntityKind, MappingResolver, SymbolStyles};
pub use spec::{parse_spec, SymbolStyle};
pub use table::{SymbolRange, VersionRangeTable};

/// A protocol version number
pub type ProtocolVersion = u32;
