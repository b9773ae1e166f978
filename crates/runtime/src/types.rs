//! Runtime type descriptions

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;

use super::error::RuntimeError;
use super::object::{Initializer, Instance};
use super::value::{TypeRef, Value};

bitflags! {
    /// Member modifiers
    ///
    /// A field's current modifiers are runtime metadata that privileged
    /// facilities may rewrite; the declared modifiers never change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
    }
}

bitflags! {
    /// Type-level flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        /// Cannot be instantiated
        const ABSTRACT = 1 << 0;
        /// Declared-final fields reject direct writes even after their
        /// modifiers are rewritten (record-like types)
        const TRUSTED_FINALS = 1 << 1;
    }
}

/// Constructor body, run against a zero-initialized instance
pub type ConstructorBody =
    Arc<dyn Fn(&mut Initializer<'_>, &[Value]) -> Result<(), RuntimeError> + Send + Sync>;

/// Method body; the receiver is `None` for static methods
pub type MethodBody =
    Arc<dyn Fn(Option<&Instance>, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// A declared field
pub struct FieldInfo {
    name: String,
    ty: TypeRef,
    declared: Modifiers,
    modifiers: AtomicU32,
    /// Instance slot, or static slot when `STATIC`
    slot: usize,
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// Current modifiers
    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits_retain(self.modifiers.load(Ordering::Acquire))
    }

    /// Modifiers as declared
    pub fn declared_modifiers(&self) -> Modifiers {
        self.declared
    }

    pub fn is_static(&self) -> bool {
        self.declared.contains(Modifiers::STATIC)
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn set_modifiers(&self, modifiers: Modifiers) {
        self.modifiers.store(modifiers.bits(), Ordering::Release);
    }
}

/// A declared constructor
pub struct ConstructorInfo {
    params: Vec<TypeRef>,
    modifiers: Modifiers,
    body: ConstructorBody,
}

impl ConstructorInfo {
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub(crate) fn body(&self) -> &ConstructorBody {
        &self.body
    }
}

/// A declared method
pub struct MethodInfo {
    name: String,
    params: Vec<TypeRef>,
    returns: Option<TypeRef>,
    modifiers: Modifiers,
    body: MethodBody,
}

impl MethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Return type, `None` for methods returning nothing
    pub fn returns(&self) -> Option<&TypeRef> {
        self.returns.as_ref()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub(crate) fn body(&self) -> &MethodBody {
        &self.body
    }
}

/// A runtime type
pub struct TypeInfo {
    name: String,
    super_type: Option<Arc<TypeInfo>>,
    /// Set only on the registry's universal base type
    root: bool,
    flags: TypeFlags,
    fields: Vec<FieldInfo>,
    constructors: Vec<ConstructorInfo>,
    methods: Vec<MethodInfo>,
    /// Declared types of every instance slot, inherited slots first
    layout: Vec<TypeRef>,
    statics: RwLock<Vec<Value>>,
}

impl TypeInfo {
    /// Start describing a type named `name`
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_type(&self) -> Option<&Arc<TypeInfo>> {
        self.super_type.as_ref()
    }

    /// Whether this is a registry's universal base type
    ///
    /// Other types without a super type are ordinary types.
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// This type followed by each ancestor, most derived first
    pub fn ancestors(&self) -> impl Iterator<Item = &TypeInfo> {
        std::iter::successors(Some(self), |ty| ty.super_type.as_deref())
    }

    /// Whether `self` is `other` or inherits from it
    pub fn is_subtype_of(&self, other: &TypeInfo) -> bool {
        self.is_subtype_of_name(&other.name)
    }

    pub fn is_subtype_of_name(&self, name: &str) -> bool {
        self.ancestors().any(|ty| ty.name == name)
    }

    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn declared_constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn declared_methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// Index of the field named `name` declared directly on this type
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Index of the method declared directly on this type with exactly
    /// these parameter types
    pub fn method_index(&self, name: &str, params: &[TypeRef]) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.name == name && m.params == params)
    }

    /// Index of the constructor declared directly on this type with exactly
    /// these parameter types
    pub fn constructor_index(&self, params: &[TypeRef]) -> Option<usize> {
        self.constructors.iter().position(|c| c.params == params)
    }

    /// Number of instance slots, inherited ones included
    pub fn instance_slot_count(&self) -> usize {
        self.layout.len()
    }

    pub(crate) fn layout(&self) -> &[TypeRef] {
        &self.layout
    }

    pub(crate) fn read_static(&self, slot: usize) -> Result<Value, RuntimeError> {
        self.statics
            .read()
            .get(slot)
            .cloned()
            .ok_or(RuntimeError::InvalidOffset { offset: slot })
    }

    pub(crate) fn write_static(&self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        let mut statics = self.statics.write();
        let target = statics
            .get_mut(slot)
            .ok_or(RuntimeError::InvalidOffset { offset: slot })?;
        *target = value;
        Ok(())
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("super_type", &self.super_type.as_ref().map(|s| s.name()))
            .field("flags", &self.flags)
            .field("fields", &self.fields.len())
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

struct FieldSpec {
    name: String,
    ty: TypeRef,
    modifiers: Modifiers,
    initial: Value,
}

/// Builder for [`TypeInfo`]
///
/// ```
/// use tinyproto_runtime::{Modifiers, TypeInfo, TypeRef};
///
/// let packet = TypeInfo::builder("net.minecraft.network.ChatPacket")
///     .field("message", TypeRef::Str, Modifiers::PRIVATE | Modifiers::FINAL)
///     .constructor(&[TypeRef::Str], Modifiers::PUBLIC, |init, args| {
///         init.set("message", args[0].clone())
///     })
///     .build();
///
/// assert_eq!(packet.instance_slot_count(), 1);
/// ```
pub struct TypeBuilder {
    name: String,
    super_type: Option<Arc<TypeInfo>>,
    flags: TypeFlags,
    fields: Vec<FieldSpec>,
    constructors: Vec<ConstructorInfo>,
    methods: Vec<MethodInfo>,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_type: None,
            flags: TypeFlags::empty(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn has_super_type(&self) -> bool {
        self.super_type.is_some()
    }

    pub fn extends(mut self, parent: &Arc<TypeInfo>) -> Self {
        self.super_type = Some(Arc::clone(parent));
        self
    }

    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Declare an instance field
    pub fn field(mut self, name: impl Into<String>, ty: TypeRef, modifiers: Modifiers) -> Self {
        let initial = ty.zero_value();
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            modifiers: modifiers - Modifiers::STATIC,
            initial,
        });
        self
    }

    /// Declare a static field holding `initial`
    pub fn static_field(
        mut self,
        name: impl Into<String>,
        ty: TypeRef,
        modifiers: Modifiers,
        initial: impl Into<Value>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            ty,
            modifiers: modifiers | Modifiers::STATIC,
            initial: initial.into(),
        });
        self
    }

    /// Declare a constructor taking `params`
    pub fn constructor<F>(mut self, params: &[TypeRef], modifiers: Modifiers, body: F) -> Self
    where
        F: Fn(&mut Initializer<'_>, &[Value]) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorInfo {
            params: params.to_vec(),
            modifiers,
            body: Arc::new(body),
        });
        self
    }

    /// Declare a method
    pub fn method<F>(
        mut self,
        name: impl Into<String>,
        params: &[TypeRef],
        returns: Option<TypeRef>,
        modifiers: Modifiers,
        body: F,
    ) -> Self
    where
        F: Fn(Option<&Instance>, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.methods.push(MethodInfo {
            name: name.into(),
            params: params.to_vec(),
            returns,
            modifiers,
            body: Arc::new(body),
        });
        self
    }

    /// Finish the type, assigning storage slots
    pub fn build(self) -> Arc<TypeInfo> {
        self.finish(false)
    }

    /// Finish the universal base type of a registry
    pub(crate) fn build_root(self) -> Arc<TypeInfo> {
        self.finish(true)
    }

    fn finish(self, root: bool) -> Arc<TypeInfo> {
        let mut layout = self
            .super_type
            .as_ref()
            .map(|parent| parent.layout.clone())
            .unwrap_or_default();
        let mut statics = Vec::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for spec in self.fields {
            let slot = if spec.modifiers.contains(Modifiers::STATIC) {
                statics.push(spec.initial);
                statics.len() - 1
            } else {
                layout.push(spec.ty.clone());
                layout.len() - 1
            };
            fields.push(FieldInfo {
                name: spec.name,
                ty: spec.ty,
                declared: spec.modifiers,
                modifiers: AtomicU32::new(spec.modifiers.bits()),
                slot,
            });
        }

        Arc::new(TypeInfo {
            name: self.name,
            super_type: self.super_type,
            root,
            flags: self.flags,
            fields,
            constructors: self.constructors,
            methods: self.methods,
            layout,
            statics: RwLock::new(statics),
        })
    }
}
