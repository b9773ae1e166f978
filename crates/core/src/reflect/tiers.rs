//! Escalation tiers
//!
//! Each tier is one strategy for constructing an instance or writing a
//! field. The [`Accessor`](super::Accessor) owns an ordered list of them and
//! stops at the first success.

use std::sync::Arc;

use tinyproto_runtime::{
    ConstructorRef, FieldRef, Host, Instance, MetadataWriter, Modifiers, RawBase, RuntimeError,
    TypeInfo, Value,
};
use tracing::trace;

/// Outcome of a tier that did not succeed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TierError {
    /// The facility this tier relies on does not exist here
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The facility exists but refused the operation
    #[error("denied: {0}")]
    Denied(String),

    /// A failure no later tier can fix; ends the ladder
    #[error(transparent)]
    Fatal(RuntimeError),
}

/// One strategy for writing a field
pub trait WriteTier: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Write `value`, already validated against the field's type and
    /// receiver
    fn write(&self, field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError>;
}

/// One strategy for creating an instance without arguments
pub trait ConstructTier: Send + Sync {
    fn name(&self) -> &'static str;

    fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance, TierError>;
}

/// Classify a direct write failure: immutability escalates, anything else
/// is fatal
fn direct_write(field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError> {
    match field.set(target, value.clone()) {
        Ok(()) => Ok(()),
        Err(e @ RuntimeError::ImmutableField { .. }) => Err(TierError::Denied(e.to_string())),
        Err(e) => Err(TierError::Fatal(e)),
    }
}

fn strip_and_write(
    writer: MetadataWriter,
    field: &FieldRef,
    target: Option<&Instance>,
    value: &Value,
) -> Result<(), TierError> {
    if !field.modifiers().contains(Modifiers::FINAL) {
        return direct_write(field, target, value);
    }

    let previous = writer.strip(field, Modifiers::FINAL);
    let result = direct_write(field, target, value);
    if result.is_err() {
        // Stripping did not help; leave the metadata as it was
        writer.set_modifiers(field, previous);
        trace!("Restored modifiers of {} after a failed write", field.name());
    }
    result
}

/// Write through the normal member-write path
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectWrite;

impl WriteTier for DirectWrite {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn write(&self, field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError> {
        direct_write(field, target, value)
    }
}

/// Clear `FINAL` through directly writable metadata, then write directly
#[derive(Debug, Clone)]
pub struct LegacyMetadataStrip {
    host: Arc<Host>,
}

impl LegacyMetadataStrip {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

impl WriteTier for LegacyMetadataStrip {
    fn name(&self) -> &'static str {
        "legacy-metadata"
    }

    fn write(&self, field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError> {
        let writer = self
            .host
            .legacy_metadata()
            .map_err(|e| TierError::Unavailable(e.to_string()))?;
        strip_and_write(writer, field, target, value)
    }
}

/// Clear `FINAL` through a privileged metadata handle, then write directly
///
/// Obtaining the handle opens the runtime's internals on first use.
#[derive(Debug, Clone)]
pub struct HandleMetadataStrip {
    host: Arc<Host>,
}

impl HandleMetadataStrip {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

impl WriteTier for HandleMetadataStrip {
    fn name(&self) -> &'static str {
        "metadata-handle"
    }

    fn write(&self, field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError> {
        let writer = self.host.metadata_handle().map_err(|e| match e {
            RuntimeError::EncapsulationDenied(reason) => TierError::Denied(reason),
            other => TierError::Unavailable(other.to_string()),
        })?;
        strip_and_write(writer, field, target, value)
    }
}

/// Write the raw value at the field's storage offset
#[derive(Debug, Clone)]
pub struct RawOffsetWrite {
    host: Arc<Host>,
}

impl RawOffsetWrite {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

impl WriteTier for RawOffsetWrite {
    fn name(&self) -> &'static str {
        "raw-offset"
    }

    fn write(&self, field: &FieldRef, target: Option<&Instance>, value: &Value) -> Result<(), TierError> {
        let raw = self
            .host
            .raw_memory()
            .ok_or_else(|| TierError::Unavailable("raw memory facility".to_string()))?;

        let located = match target {
            _ if field.is_static() => raw
                .static_field_base(field)
                .zip(raw.static_field_offset(field)),
            Some(instance) => raw
                .object_field_offset(field)
                .map(|offset| (RawBase::Object(instance), offset)),
            None => {
                return Err(TierError::Fatal(RuntimeError::MissingReceiver {
                    owner: field.declaring_type().name().to_string(),
                    member: field.name().to_string(),
                }))
            }
        };
        let (base, offset) = located.ok_or_else(|| {
            TierError::Unavailable(format!("no storage offset for {}", field.name()))
        })?;

        trace!("Raw write of {} at offset {}", field.name(), offset);
        raw.put_value(base, offset, value.clone())
            .map_err(TierError::Fatal)
    }
}

/// Public zero-argument constructor of the exact type
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicConstructor;

impl ConstructTier for PublicConstructor {
    fn name(&self) -> &'static str {
        "constructor"
    }

    fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance, TierError> {
        let ctor = ty
            .constructor_index(&[])
            .and_then(|index| ConstructorRef::new(Arc::clone(ty), index))
            .ok_or_else(|| TierError::Unavailable("no zero-argument constructor".to_string()))?;
        if !ctor.is_public() {
            return Err(TierError::Unavailable(
                "zero-argument constructor is not public".to_string(),
            ));
        }
        ctor.new_instance(&[])
            .map_err(|e| TierError::Denied(e.to_string()))
    }
}

/// Zero-initialized allocation through the serialization path
#[derive(Debug, Clone)]
pub struct SerializationAllocation {
    host: Arc<Host>,
}

impl SerializationAllocation {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

impl ConstructTier for SerializationAllocation {
    fn name(&self) -> &'static str {
        "serialization-allocation"
    }

    fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance, TierError> {
        self.host
            .allocate_without_constructor(ty)
            .map_err(|e| match e {
                e @ RuntimeError::FacilityUnavailable(_) => TierError::Unavailable(e.to_string()),
                other => TierError::Denied(other.to_string()),
            })
    }
}

/// Zero-initialized allocation through raw memory
#[derive(Debug, Clone)]
pub struct RawAllocation {
    host: Arc<Host>,
}

impl RawAllocation {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host }
    }
}

impl ConstructTier for RawAllocation {
    fn name(&self) -> &'static str {
        "raw-allocation"
    }

    fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance, TierError> {
        let raw = self
            .host
            .raw_memory()
            .ok_or_else(|| TierError::Unavailable("raw memory facility".to_string()))?;
        raw.allocate_instance(ty)
            .map_err(|e| TierError::Denied(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tinyproto_runtime::{Capabilities, Generation, HostProfile, TypeFlags, TypeRef};

    use super::*;

    fn host(generation: Generation) -> Arc<Host> {
        Arc::new(Host::new(HostProfile::new(generation)))
    }

    fn packet() -> Arc<TypeInfo> {
        TypeInfo::builder("Packet")
            .field("id", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
            .field("name", TypeRef::Str, Modifiers::PUBLIC)
            .static_field("COUNT", TypeRef::Int, Modifiers::STATIC | Modifiers::FINAL, 0)
            .constructor(&[], Modifiers::PUBLIC, |_, _| Ok(()))
            .build()
    }

    #[test]
    fn test_direct_write_classification() {
        let ty = packet();
        let instance = PublicConstructor.construct(&ty).unwrap();
        let id = FieldRef::new(ty.clone(), 0).unwrap();
        let name = FieldRef::new(ty.clone(), 1).unwrap();

        assert!(DirectWrite.write(&name, Some(&instance), &Value::from("a")).is_ok());
        assert!(matches!(
            DirectWrite.write(&id, Some(&instance), &Value::Int(1)),
            Err(TierError::Denied(_))
        ));
        assert!(matches!(
            DirectWrite.write(&name, None, &Value::from("a")),
            Err(TierError::Fatal(RuntimeError::MissingReceiver { .. }))
        ));
    }

    #[test]
    fn test_legacy_strip() {
        let ty = packet();
        let instance = PublicConstructor.construct(&ty).unwrap();
        let id = FieldRef::new(ty, 0).unwrap();

        let modular = LegacyMetadataStrip::new(host(Generation::Modular));
        assert!(matches!(
            modular.write(&id, Some(&instance), &Value::Int(3)),
            Err(TierError::Unavailable(_))
        ));

        let legacy = LegacyMetadataStrip::new(host(Generation::Legacy));
        legacy.write(&id, Some(&instance), &Value::Int(3)).unwrap();
        assert_eq!(id.get(Some(&instance)).unwrap(), Value::Int(3));
        assert!(!id.modifiers().contains(Modifiers::FINAL));
    }

    #[test]
    fn test_handle_strip() {
        let ty = packet();
        let id = FieldRef::new(ty.clone(), 0).unwrap();
        let instance = PublicConstructor.construct(&ty).unwrap();

        let hardened = HandleMetadataStrip::new(host(Generation::Hardened));
        assert!(matches!(
            hardened.write(&id, Some(&instance), &Value::Int(1)),
            Err(TierError::Unavailable(_))
        ));

        let sealed = Arc::new(Host::new(
            HostProfile::default().with_capabilities(Capabilities::PRIVILEGED_LOOKUP),
        ));
        assert!(matches!(
            HandleMetadataStrip::new(sealed).write(&id, Some(&instance), &Value::Int(1)),
            Err(TierError::Denied(_))
        ));

        let modular = HandleMetadataStrip::new(host(Generation::Modular));
        modular.write(&id, Some(&instance), &Value::Int(2)).unwrap();
        assert_eq!(id.get(Some(&instance)).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_strip_cannot_beat_trusted_finals() {
        let ty = TypeInfo::builder("Record")
            .flags(TypeFlags::TRUSTED_FINALS)
            .field("v", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
            .build();
        let v = FieldRef::new(ty.clone(), 0).unwrap();
        let instance = RawAllocation::new(host(Generation::Hardened))
            .construct(&ty)
            .unwrap();

        let legacy = LegacyMetadataStrip::new(host(Generation::Legacy));
        assert!(matches!(
            legacy.write(&v, Some(&instance), &Value::Int(1)),
            Err(TierError::Denied(_))
        ));
        // The failed strip leaves the metadata untouched
        assert!(v.modifiers().contains(Modifiers::FINAL));

        let handle = HandleMetadataStrip::new(host(Generation::Modular));
        assert!(matches!(
            handle.write(&v, Some(&instance), &Value::Int(1)),
            Err(TierError::Denied(_))
        ));
        assert_eq!(v.modifiers(), Modifiers::PRIVATE | Modifiers::FINAL);

        let raw = RawOffsetWrite::new(host(Generation::Hardened));
        raw.write(&v, Some(&instance), &Value::Int(1)).unwrap();
        assert_eq!(v.get(Some(&instance)).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_raw_offset_static_and_unavailable() {
        let ty = packet();
        let count = FieldRef::new(ty, 2).unwrap();

        let raw = RawOffsetWrite::new(host(Generation::Hardened));
        raw.write(&count, None, &Value::Int(9)).unwrap();
        assert_eq!(count.get(None).unwrap(), Value::Int(9));

        let none = Arc::new(Host::new(
            HostProfile::default().with_capabilities(Capabilities::empty()),
        ));
        assert!(matches!(
            RawOffsetWrite::new(none).write(&count, None, &Value::Int(1)),
            Err(TierError::Unavailable(_))
        ));
    }

    #[test]
    fn test_constructor_tier() {
        let private = TypeInfo::builder("Private")
            .constructor(&[], Modifiers::PRIVATE, |_, _| Ok(()))
            .build();
        assert!(matches!(
            PublicConstructor.construct(&private),
            Err(TierError::Unavailable(_))
        ));

        let throwing = TypeInfo::builder("Throwing")
            .constructor(&[], Modifiers::PUBLIC, |_, _| {
                Err(RuntimeError::Invocation("boom".into()))
            })
            .build();
        assert!(matches!(
            PublicConstructor.construct(&throwing),
            Err(TierError::Denied(_))
        ));
    }

    #[test]
    fn test_allocation_tiers() {
        let ty = packet();
        let serialization = SerializationAllocation::new(host(Generation::Hardened));
        assert!(matches!(
            serialization.construct(&ty),
            Err(TierError::Unavailable(_))
        ));

        let abstract_ty = TypeInfo::builder("Shape").flags(TypeFlags::ABSTRACT).build();
        let serialization = SerializationAllocation::new(host(Generation::Modular));
        assert!(matches!(
            serialization.construct(&abstract_ty),
            Err(TierError::Denied(_))
        ));

        let instance = RawAllocation::new(host(Generation::Hardened))
            .construct(&ty)
            .unwrap();
        assert!(Arc::ptr_eq(instance.type_info(), &ty));
    }
}
