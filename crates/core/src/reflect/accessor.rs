//! Get, set, construct and invoke with tiered escalation

use std::fmt;
use std::sync::Arc;

use tinyproto_runtime::{ConstructorRef, FieldRef, Host, Instance, MethodRef, TypeInfo, Value};
use tracing::{debug, warn};

use super::tiers::{
    ConstructTier, DirectWrite, HandleMetadataStrip, LegacyMetadataStrip, PublicConstructor,
    RawAllocation, RawOffsetWrite, SerializationAllocation, TierError, WriteTier,
};
use crate::config::TierSettings;
use crate::error::{Error, Result, TierFailure};

/// Performs member access, escalating through its tiers when denied
pub struct Accessor {
    host: Arc<Host>,
    construct_tiers: Vec<Box<dyn ConstructTier>>,
    write_tiers: Vec<Box<dyn WriteTier>>,
}

impl Accessor {
    /// Standard ladders over `host`, minus the tiers `settings` disable
    ///
    /// Write: direct, legacy metadata strip, metadata handle strip, raw
    /// offset. Construct: public constructor, serialization allocation, raw
    /// allocation.
    pub fn new(host: Arc<Host>, settings: &TierSettings) -> Self {
        let mut construct_tiers: Vec<Box<dyn ConstructTier>> = vec![Box::new(PublicConstructor)];
        if settings.zero_init_allocation {
            construct_tiers.push(Box::new(SerializationAllocation::new(Arc::clone(&host))));
            if settings.raw_memory {
                construct_tiers.push(Box::new(RawAllocation::new(Arc::clone(&host))));
            }
        }

        let mut write_tiers: Vec<Box<dyn WriteTier>> = vec![Box::new(DirectWrite)];
        if settings.legacy_metadata {
            write_tiers.push(Box::new(LegacyMetadataStrip::new(Arc::clone(&host))));
        }
        if settings.metadata_handle {
            write_tiers.push(Box::new(HandleMetadataStrip::new(Arc::clone(&host))));
        }
        if settings.raw_memory {
            write_tiers.push(Box::new(RawOffsetWrite::new(Arc::clone(&host))));
        }

        Self::with_tiers(host, construct_tiers, write_tiers)
    }

    /// Accessor with explicit ladders, tried in the given order
    pub fn with_tiers(
        host: Arc<Host>,
        construct_tiers: Vec<Box<dyn ConstructTier>>,
        write_tiers: Vec<Box<dyn WriteTier>>,
    ) -> Self {
        Self {
            host,
            construct_tiers,
            write_tiers,
        }
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn write_tiers(&self) -> Vec<&'static str> {
        self.write_tiers.iter().map(|tier| tier.name()).collect()
    }

    pub fn construct_tiers(&self) -> Vec<&'static str> {
        self.construct_tiers.iter().map(|tier| tier.name()).collect()
    }

    /// Instance of exactly `ty`, created without arguments
    pub fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance> {
        let mut attempts = Vec::new();

        for tier in &self.construct_tiers {
            match tier.construct(ty) {
                Ok(instance) => {
                    if !attempts.is_empty() {
                        debug!("Constructed {} via {}", ty.name(), tier.name());
                    }
                    return Ok(instance);
                }
                Err(TierError::Fatal(e)) => return Err(e.into()),
                Err(e) => {
                    debug!("Construct tier {} failed for {}: {}", tier.name(), ty.name(), e);
                    attempts.push(TierFailure {
                        tier: tier.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!("Every construct tier failed for {}", ty.name());
        Err(Error::ConstructionDenied {
            type_name: ty.name().to_string(),
            attempts,
        })
    }

    /// Run a specific constructor with `args`; never falls back to
    /// allocation
    pub fn construct_with(&self, ctor: &ConstructorRef, args: &[Value]) -> Result<Instance> {
        ctor.new_instance(args)
            .map_err(|e| Error::ConstructionDenied {
                type_name: ctor.declaring_type().name().to_string(),
                attempts: vec![TierFailure {
                    tier: "constructor",
                    reason: e.to_string(),
                }],
            })
    }

    /// Read a field; `target` is ignored for static fields
    pub fn get(&self, field: &FieldRef, target: Option<&Instance>) -> Result<Value> {
        Ok(field.get(target)?)
    }

    /// Write a field, escalating while writes are denied
    ///
    /// The value and receiver are validated once up front; a wrong value is
    /// an error no tier can work around.
    pub fn set(&self, field: &FieldRef, target: Option<&Instance>, value: Value) -> Result<()> {
        field.check_write(target, &value)?;
        let mut attempts = Vec::new();

        for tier in &self.write_tiers {
            match tier.write(field, target, &value) {
                Ok(()) => {
                    if !attempts.is_empty() {
                        debug!(
                            "Wrote {}.{} via {}",
                            field.declaring_type().name(),
                            field.name(),
                            tier.name()
                        );
                    }
                    return Ok(());
                }
                Err(TierError::Fatal(e)) => return Err(e.into()),
                Err(e) => {
                    debug!(
                        "Write tier {} failed for {}.{}: {}",
                        tier.name(),
                        field.declaring_type().name(),
                        field.name(),
                        e
                    );
                    attempts.push(TierFailure {
                        tier: tier.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!(
            "Every write tier failed for {}.{}",
            field.declaring_type().name(),
            field.name()
        );
        Err(Error::MutationDenied {
            owner: field.declaring_type().name().to_string(),
            field: field.name().to_string(),
            attempts,
        })
    }

    /// Call a method; failures of the body are returned, not swallowed
    pub fn invoke(&self, method: &MethodRef, target: Option<&Instance>, args: &[Value]) -> Result<Value> {
        Ok(method.invoke(target, args)?)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("capabilities", &self.host.capabilities())
            .field("construct_tiers", &self.construct_tiers())
            .field("write_tiers", &self.write_tiers())
            .finish()
    }
}
