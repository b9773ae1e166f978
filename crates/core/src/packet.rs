//! Packet wrappers
//!
//! A wrapper is a plain Rust struct mirroring one raw packet type across
//! protocol versions. It declares, usually through
//! `#[derive(Reobfuscate)]`, the mapping of the raw type and of each
//! mapped field; [`Packet`] is then implemented for it on top of the
//! [`Reflector`].
//!
//! ```
//! use std::sync::Arc;
//! use tinyproto_core::runtime::{Modifiers, TypeInfo, TypeRef, TypeRegistry};
//! use tinyproto_core::{CoreConfig, Packet, Reflector, Reobfuscate};
//!
//! #[derive(Debug, Default, Reobfuscate)]
//! #[reobf(mapping = "net/minecraft/ChatPacket=340,754")]
//! struct ChatPacket {
//!     #[reobf(mapping = "a=340+message=754")]
//!     message: String,
//! }
//!
//! let registry = Arc::new(TypeRegistry::new());
//! registry
//!     .define(
//!         TypeInfo::builder("net.minecraft.ChatPacket")
//!             .field("message", TypeRef::Str, Modifiers::PRIVATE | Modifiers::FINAL),
//!     )
//!     .unwrap();
//! let reflector = Reflector::new(registry, &CoreConfig::default());
//!
//! let packet = ChatPacket { message: "hi".to_string() };
//! let raw = packet.to_raw(&reflector, 754).unwrap();
//!
//! let mut copy = ChatPacket::default();
//! copy.from_raw(&reflector, &raw, 754).unwrap();
//! assert_eq!(copy.message, "hi");
//! ```

use std::sync::Arc;

use tinyproto_mappings::{EntityKind, ProtocolVersion, Reobfuscation};
use tinyproto_runtime::{Instance, TypeInfo, TypeRef, Value};
use tracing::trace;

use crate::error::{Error, Result};
use crate::reflector::Reflector;

/// Mapping of one wrapper field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name on the wrapper
    pub name: &'static str,
    pub reobf: Reobfuscation,
    /// Raw type of the field's value, for fields holding raw objects
    pub external_type: Option<&'static str>,
}

/// Mappings for buffer based (de)serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMappings {
    /// Type mapping of the buffer
    pub buffer: &'static str,
    /// Method mapping of the raw packet's read method
    pub read: Option<&'static str>,
    /// Method mapping of the raw packet's write method
    pub write: Option<&'static str>,
}

/// Mapping metadata and field access of a wrapper struct
///
/// Normally derived with `#[derive(Reobfuscate)]`.
pub trait Reobfuscated {
    /// Entity key all of the wrapper's mappings are cached under
    const ENTITY: &'static str;

    /// Mapping of the raw packet type
    fn type_mapping() -> Reobfuscation;

    fn field_mappings() -> &'static [FieldMapping];

    fn stream_mappings() -> Option<StreamMappings> {
        None
    }

    /// Current value of the wrapper field `name`
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Store `value` in the wrapper field `name`
    fn apply_field_value(&mut self, name: &str, value: Value) -> Result<()>;
}

/// Conversion between a wrapper and raw packets or buffers
pub trait Packet {
    /// Populate this wrapper from a raw packet
    fn from_raw(&mut self, reflector: &Reflector, raw: &Instance, version: ProtocolVersion) -> Result<()>;

    /// Create a raw packet populated from this wrapper
    fn to_raw(&self, reflector: &Reflector, version: ProtocolVersion) -> Result<Instance>;

    /// Populate this wrapper from a buffer, through an intermediate raw
    /// packet
    fn read(&mut self, reflector: &Reflector, buf: &Instance, version: ProtocolVersion) -> Result<()>;

    /// Write this wrapper into a buffer, through an intermediate raw packet
    fn write(&self, reflector: &Reflector, buf: &Instance, version: ProtocolVersion) -> Result<()>;

    /// A new wrapper from either a raw packet or a buffer
    fn decode(reflector: &Reflector, source: &Instance, version: ProtocolVersion) -> Result<Self>
    where
        Self: Sized + Default;
}

fn raw_type<T: Reobfuscated>(reflector: &Reflector, version: ProtocolVersion) -> Result<Arc<TypeInfo>> {
    let mapping = T::type_mapping();
    if !mapping.supports(version) {
        return Err(Error::VersionUnresolved {
            entity: T::ENTITY.to_string(),
            version,
        });
    }
    let name = reflector.require_symbol(EntityKind::Type, T::ENTITY, mapping.mapping, version)?;
    reflector.require_type(&name)
}

/// Parameter type of the raw read/write methods
fn buffer_param<T: Reobfuscated>(
    reflector: &Reflector,
    buf: &Instance,
    version: ProtocolVersion,
) -> Result<TypeRef> {
    match T::stream_mappings() {
        Some(streams) => {
            let name =
                reflector.require_symbol(EntityKind::Type, T::ENTITY, streams.buffer, version)?;
            Ok(TypeRef::object(name))
        }
        None => Ok(TypeRef::object(buf.type_name())),
    }
}

/// Fields that exist at `version`, with their resolved symbols
fn mapped_fields<T: Reobfuscated>(
    reflector: &Reflector,
    version: ProtocolVersion,
) -> impl Iterator<Item = Result<(&'static FieldMapping, String)>> + '_ {
    T::field_mappings()
        .iter()
        .filter(move |mapping| {
            let supported = mapping.reobf.supports(version);
            if !supported {
                trace!("Skipping {}.{} at {}", T::ENTITY, mapping.name, version);
            }
            supported
        })
        .map(move |mapping| {
            reflector
                .require_symbol(EntityKind::Member, T::ENTITY, mapping.reobf.mapping, version)
                .map(|symbol| (mapping, symbol))
        })
}

fn invoke_stream_method(
    reflector: &Reflector,
    raw: &Instance,
    symbol: &str,
    param: TypeRef,
    buf: &Instance,
) -> Result<()> {
    let method = reflector.require_method(raw.type_info(), symbol, &[param])?;
    reflector.invoke(&method, Some(raw), &[Value::from(buf.clone())])?;
    Ok(())
}

impl<T: Reobfuscated> Packet for T {
    fn from_raw(&mut self, reflector: &Reflector, raw: &Instance, version: ProtocolVersion) -> Result<()> {
        for entry in mapped_fields::<T>(reflector, version) {
            let (mapping, symbol) = entry?;
            let field = reflector.require_field(raw.type_info(), &symbol)?;
            let value = reflector.get(&field, Some(raw))?;
            self.apply_field_value(mapping.name, value)?;
        }
        Ok(())
    }

    fn to_raw(&self, reflector: &Reflector, version: ProtocolVersion) -> Result<Instance> {
        let ty = raw_type::<T>(reflector, version)?;
        let raw = reflector.construct(&ty)?;

        for entry in mapped_fields::<T>(reflector, version) {
            let (mapping, symbol) = entry?;
            let field = reflector.require_field(&ty, &symbol)?;
            let value = self
                .field_value(mapping.name)
                .ok_or_else(|| Error::MemberNotFound {
                    owner: T::ENTITY.to_string(),
                    member: mapping.name.to_string(),
                })?;
            reflector.set(&field, Some(&raw), value)?;
        }
        Ok(raw)
    }

    fn read(&mut self, reflector: &Reflector, buf: &Instance, version: ProtocolVersion) -> Result<()> {
        let read_symbol = match T::stream_mappings().and_then(|streams| streams.read) {
            Some(spec) => reflector.resolve(T::ENTITY, spec, version)?,
            None => None,
        };

        let raw = match read_symbol {
            Some(symbol) => {
                let raw = self.to_raw(reflector, version)?;
                let param = buffer_param::<T>(reflector, buf, version)?;
                invoke_stream_method(reflector, &raw, &symbol, param, buf)?;
                raw
            }
            None => {
                let ty = raw_type::<T>(reflector, version)?;
                reflector.construct_with(&ty, &[Value::from(buf.clone())])?
            }
        };
        self.from_raw(reflector, &raw, version)
    }

    fn write(&self, reflector: &Reflector, buf: &Instance, version: ProtocolVersion) -> Result<()> {
        let spec = T::stream_mappings()
            .and_then(|streams| streams.write)
            .ok_or_else(|| Error::MemberNotFound {
                owner: T::ENTITY.to_string(),
                member: "write".to_string(),
            })?;

        let raw = self.to_raw(reflector, version)?;
        let symbol = reflector.require_symbol(EntityKind::Member, T::ENTITY, spec, version)?;
        let param = buffer_param::<T>(reflector, buf, version)?;
        invoke_stream_method(reflector, &raw, &symbol, param, buf)
    }

    fn decode(reflector: &Reflector, source: &Instance, version: ProtocolVersion) -> Result<Self>
    where
        Self: Sized + Default,
    {
        let ty = raw_type::<T>(reflector, version)?;
        let mut packet = Self::default();
        if source.is_instance_of(&ty) {
            packet.from_raw(reflector, source, version)?;
            return Ok(packet);
        }

        let buffer = match T::stream_mappings() {
            Some(streams) => reflector.resolve_type(T::ENTITY, streams.buffer, version)?,
            None => None,
        };
        match buffer {
            Some(name) if source.type_info().is_subtype_of_name(&name) => {
                packet.read(reflector, source, version)?;
                Ok(packet)
            }
            buffer => Err(Error::UnsupportedSource {
                packet: ty.name().to_string(),
                buffer: buffer.unwrap_or_else(|| "<no buffer mapping>".to_string()),
                found: source.type_name().to_string(),
            }),
        }
    }
}
