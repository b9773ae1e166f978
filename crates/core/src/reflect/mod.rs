//! Reflective member access
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ MemberLocator                                              │
//! │   (type, name[, params]) ──► walk type, then ancestors     │
//! │   (root excluded) ──► MemberHandle, cached in DashMap      │
//! └──────────────────────────────┬─────────────────────────────┘
//!                                │
//!                                ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │ Accessor                                                   │
//! │   construct: public no-arg ctor ─► serialization alloc     │
//! │              ─► raw alloc ─► ConstructionDenied            │
//! │   set:       direct ─► legacy metadata strip               │
//! │              ─► metadata handle strip ─► raw offset write  │
//! │              ─► MutationDenied                             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tier reports a typed outcome. A failure that says nothing about
//! protection (wrong receiver, value of the wrong type) stops the ladder at
//! once; only denial or unavailability escalates.

pub mod accessor;
pub mod locator;
pub mod tiers;

use std::sync::Arc;

use tinyproto_runtime::{ConstructorRef, FieldRef, MethodRef, TypeInfo};

pub use accessor::Accessor;
pub use locator::MemberLocator;
pub use tiers::{
    ConstructTier, DirectWrite, HandleMetadataStrip, LegacyMetadataStrip, PublicConstructor,
    RawAllocation, RawOffsetWrite, SerializationAllocation, TierError, WriteTier,
};

/// A located member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberHandle {
    Field(FieldRef),
    Method(MethodRef),
    Constructor(ConstructorRef),
}

impl MemberHandle {
    /// The type declaring the member
    pub fn declaring_type(&self) -> &Arc<TypeInfo> {
        match self {
            Self::Field(field) => field.declaring_type(),
            Self::Method(method) => method.declaring_type(),
            Self::Constructor(ctor) => ctor.declaring_type(),
        }
    }

    pub fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodRef> {
        match self {
            Self::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_constructor(&self) -> Option<&ConstructorRef> {
        match self {
            Self::Constructor(ctor) => Some(ctor),
            _ => None,
        }
    }
}

impl From<FieldRef> for MemberHandle {
    fn from(field: FieldRef) -> Self {
        Self::Field(field)
    }
}

impl From<MethodRef> for MemberHandle {
    fn from(method: MethodRef) -> Self {
        Self::Method(method)
    }
}

impl From<ConstructorRef> for MemberHandle {
    fn from(ctor: ConstructorRef) -> Self {
        Self::Constructor(ctor)
    }
}
