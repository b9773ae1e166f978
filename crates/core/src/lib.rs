//! tinyproto core - version-aware access to raw protocol objects
//!
//! This crate ties the mapping tables of [`mappings`] to the reflective
//! object model of [`runtime`]:
//! - [`Reflector`] resolves version-correct symbols and locates, reads,
//!   writes, invokes and constructs raw members through them
//! - [`reflect::Accessor`] escalates final-field writes and construction
//!   through the facilities the [`runtime::Host`] offers
//! - [`Packet`] converts `#[derive(Reobfuscate)]` wrappers to and from raw
//!   packets and buffers
//!
//! # Re-exports
//!
//! - [`mappings`] - mapping strings, tables and the resolver
//! - [`runtime`] - types, instances and host facilities

// Allow the crate to refer to itself as `tinyproto_core` for proc macro compatibility
extern crate self as tinyproto_core;

pub use tinyproto_mappings as mappings;
pub use tinyproto_runtime as runtime;

pub mod config;
pub mod error;
pub mod logging;
pub mod packet;
pub mod reflect;
pub mod reflector;

pub use config::{ConfigError, ConfigResult, CoreConfig, TierSettings};
pub use error::{Error, Result, TierFailure};
pub use logging::init_logging;
pub use packet::{FieldMapping, Packet, Reobfuscated, StreamMappings};
pub use reflect::{Accessor, MemberHandle, MemberLocator};
pub use reflector::Reflector;

// Re-export macros
pub use tinyproto_macros::Reobfuscate;
