//! Privileged host facilities
//!
//! Which facilities exist depends on the runtime generation. Older runtimes
//! expose member metadata directly, newer ones only behind a privileged
//! lookup that requires relaxing encapsulation first, and hardened ones
//! offer nothing beyond raw memory access. A [`HostProfile`] selects the
//! generation and optionally overrides its capability set.

use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::RuntimeError;
use super::handle::FieldRef;
use super::object::Instance;
use super::types::{Modifiers, TypeFlags, TypeInfo};
use super::value::Value;

bitflags! {
    /// Facilities a host runtime offers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Capabilities: u32 {
        /// Field modifier metadata is directly writable
        const LEGACY_MODIFIERS = 1 << 0;
        /// Runtime internals can be opened to this library
        const MODULE_OPENING = 1 << 1;
        /// A privileged lookup can obtain metadata write handles
        const PRIVILEGED_LOOKUP = 1 << 2;
        /// Instances can be allocated without running any constructor
        const SERIALIZATION_CONSTRUCTOR = 1 << 3;
        /// Offset-based raw memory access
        const RAW_MEMORY = 1 << 4;
    }
}

/// Host runtime generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Modifier metadata is writable without ceremony
    Legacy,
    /// Metadata is reachable only through a privileged lookup once
    /// internals are opened
    #[default]
    Modular,
    /// Only raw memory access remains
    Hardened,
}

impl Generation {
    /// Facilities this generation offers by default
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::Legacy => {
                Capabilities::LEGACY_MODIFIERS
                    | Capabilities::SERIALIZATION_CONSTRUCTOR
                    | Capabilities::RAW_MEMORY
            }
            Self::Modular => {
                Capabilities::MODULE_OPENING
                    | Capabilities::PRIVILEGED_LOOKUP
                    | Capabilities::SERIALIZATION_CONSTRUCTOR
                    | Capabilities::RAW_MEMORY
            }
            Self::Hardened => Capabilities::RAW_MEMORY,
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostProfile {
    pub generation: Generation,
    /// Replaces the generation's capability set when present
    pub capabilities: Option<Capabilities>,
}

impl HostProfile {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            capabilities: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Capabilities the host actually offers
    pub fn effective(&self) -> Capabilities {
        self.capabilities
            .unwrap_or_else(|| self.generation.capabilities())
    }
}

/// How a [`MetadataWriter`] was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataAccess {
    /// Direct metadata write
    Legacy,
    /// Privileged lookup handle
    Handle,
}

/// Write access to field modifier metadata
///
/// Modifier metadata is shared: a change is visible through every handle to
/// the field.
#[derive(Debug, Clone, Copy)]
pub struct MetadataWriter {
    access: MetadataAccess,
}

impl MetadataWriter {
    pub fn access(&self) -> MetadataAccess {
        self.access
    }

    pub fn set_modifiers(&self, field: &FieldRef, modifiers: Modifiers) {
        debug!(
            "Rewriting modifiers of {}.{} to {:?} ({:?})",
            field.declaring_type().name(),
            field.name(),
            modifiers,
            self.access
        );
        field.info().set_modifiers(modifiers);
    }

    /// Remove `modifiers` from the field, returning the previous set
    pub fn strip(&self, field: &FieldRef, modifiers: Modifiers) -> Modifiers {
        let previous = field.modifiers();
        self.set_modifiers(field, previous - modifiers);
        previous
    }
}

/// Storage a raw write targets
#[derive(Debug, Clone, Copy)]
pub enum RawBase<'a> {
    Object(&'a Instance),
    Static(&'a TypeInfo),
}

/// Offset-based memory access
///
/// Writes through this facility skip every mutability and type check; only
/// the offset is bounds-checked. Callers validate values beforehand.
#[derive(Debug)]
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// Offset of an instance field, `None` for static fields
    pub fn object_field_offset(&self, field: &FieldRef) -> Option<usize> {
        (!field.is_static()).then(|| field.slot())
    }

    /// Storage base of a static field, `None` for instance fields
    pub fn static_field_base<'a>(&self, field: &'a FieldRef) -> Option<RawBase<'a>> {
        field
            .is_static()
            .then(|| RawBase::Static(field.declaring_type().as_ref()))
    }

    /// Offset of a static field within its base, `None` for instance fields
    pub fn static_field_offset(&self, field: &FieldRef) -> Option<usize> {
        field.is_static().then(|| field.slot())
    }

    pub fn put_value(&self, base: RawBase<'_>, offset: usize, value: Value) -> Result<(), RuntimeError> {
        match base {
            RawBase::Object(instance) => instance.write_slot(offset, value),
            RawBase::Static(ty) => ty.write_static(offset, value),
        }
    }

    pub fn get_value(&self, base: RawBase<'_>, offset: usize) -> Result<Value, RuntimeError> {
        match base {
            RawBase::Object(instance) => instance.read_slot(offset),
            RawBase::Static(ty) => ty.read_static(offset),
        }
    }

    /// Zero-initialized instance, no constructor runs
    pub fn allocate_instance(&self, ty: &Arc<TypeInfo>) -> Result<Instance, RuntimeError> {
        allocate_zeroed(ty)
    }
}

fn allocate_zeroed(ty: &Arc<TypeInfo>) -> Result<Instance, RuntimeError> {
    if ty.flags().contains(TypeFlags::ABSTRACT) {
        return Err(RuntimeError::AbstractType(ty.name().to_string()));
    }
    Ok(Instance::zeroed(Arc::clone(ty)))
}

/// Entry point to the facilities of one host runtime
#[derive(Debug)]
pub struct Host {
    profile: HostProfile,
    capabilities: Capabilities,
    internals: OnceLock<Result<(), RuntimeError>>,
    raw: OnceLock<Option<RawMemory>>,
}

impl Host {
    pub fn new(profile: HostProfile) -> Self {
        let capabilities = profile.effective();
        debug!(
            "Host {:?} with capabilities {:?}",
            profile.generation, capabilities
        );
        Self {
            profile,
            capabilities,
            internals: OnceLock::new(),
            raw: OnceLock::new(),
        }
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    fn require(&self, capability: Capabilities, name: &'static str) -> Result<(), RuntimeError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(RuntimeError::FacilityUnavailable(name))
        }
    }

    /// Directly writable modifier metadata
    pub fn legacy_metadata(&self) -> Result<MetadataWriter, RuntimeError> {
        self.require(Capabilities::LEGACY_MODIFIERS, "legacy modifier metadata")?;
        Ok(MetadataWriter {
            access: MetadataAccess::Legacy,
        })
    }

    /// Open runtime internals to this library
    ///
    /// Attempted once; later calls return the first outcome.
    pub fn open_internals(&self) -> Result<(), RuntimeError> {
        self.internals
            .get_or_init(|| {
                if self.has(Capabilities::MODULE_OPENING) {
                    debug!("Opened runtime internals");
                    Ok(())
                } else {
                    warn!("Runtime internals are sealed");
                    Err(RuntimeError::EncapsulationDenied(
                        "runtime internals cannot be opened".to_string(),
                    ))
                }
            })
            .clone()
    }

    /// Metadata write handle from the privileged lookup
    ///
    /// Requires internals to be open.
    pub fn metadata_handle(&self) -> Result<MetadataWriter, RuntimeError> {
        self.require(Capabilities::PRIVILEGED_LOOKUP, "privileged lookup")?;
        self.open_internals()?;
        Ok(MetadataWriter {
            access: MetadataAccess::Handle,
        })
    }

    /// Raw memory facility, acquired on first use
    pub fn raw_memory(&self) -> Option<&RawMemory> {
        self.raw
            .get_or_init(|| {
                let available = self.has(Capabilities::RAW_MEMORY);
                debug!("Raw memory facility available: {}", available);
                available.then_some(RawMemory { _private: () })
            })
            .as_ref()
    }

    /// Zero-initialized instance through the serialization path
    pub fn allocate_without_constructor(&self, ty: &Arc<TypeInfo>) -> Result<Instance, RuntimeError> {
        self.require(
            Capabilities::SERIALIZATION_CONSTRUCTOR,
            "serialization constructor",
        )?;
        allocate_zeroed(ty)
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new(HostProfile::default())
    }
}
