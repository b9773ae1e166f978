//! tinyproto runtime - the host object model
//!
//! Raw objects live in a reflective runtime that this crate models
//! explicitly: named types with single inheritance, declared fields,
//! constructors and methods, instances with slot-based storage, and a
//! [`Host`] exposing the privileged facilities that different runtime
//! generations offer (member metadata mutation, encapsulation relaxation,
//! raw memory access, allocation without construction).
//!
//! # Layout
//!
//! ```text
//! TypeRegistry ── name ──► Arc<TypeInfo> ─── super ──► ... ──► Object (root)
//!                              │
//!                              ├─ fields        ──► FieldRef   (get / set)
//!                              ├─ constructors  ──► ConstructorRef (new_instance)
//!                              └─ methods       ──► MethodRef  (invoke)
//!
//! Instance ── slots[0..layout.len()]   TypeInfo ── statics[..]
//! ```
//!
//! Instance field slots are assigned root first, so a field keeps its slot
//! in every subtype. Static fields live in their declaring type.

pub mod error;
pub mod handle;
pub mod host;
pub mod object;
pub mod registry;
pub mod types;
pub mod value;

pub use error::RuntimeError;
pub use handle::{ConstructorRef, FieldRef, MethodRef};
pub use host::{
    Capabilities, Generation, Host, HostProfile, MetadataAccess, MetadataWriter, RawBase,
    RawMemory,
};
pub use object::{Initializer, Instance};
pub use registry::{TypeRegistry, ROOT_TYPE};
pub use types::{Modifiers, TypeBuilder, TypeFlags, TypeInfo};
pub use value::{TypeRef, Value};
