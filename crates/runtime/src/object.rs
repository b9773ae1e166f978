//! Runtime object instances

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::RuntimeError;
use super::types::TypeInfo;
use super::value::Value;

struct ObjectData {
    ty: Arc<TypeInfo>,
    slots: RwLock<Vec<Value>>,
}

/// A live object owned by the host runtime
///
/// Cloning is cheap and yields another reference to the same object.
#[derive(Clone)]
pub struct Instance(Arc<ObjectData>);

impl Instance {
    /// Allocate an instance with every slot at its zero value, without
    /// running any constructor body
    pub(crate) fn zeroed(ty: Arc<TypeInfo>) -> Self {
        let slots = ty.layout().iter().map(|slot| slot.zero_value()).collect();
        Self(Arc::new(ObjectData {
            ty,
            slots: RwLock::new(slots),
        }))
    }

    /// Exact runtime type of the instance
    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.0.ty
    }

    pub fn type_name(&self) -> &str {
        self.0.ty.name()
    }

    /// Whether the instance's type is `ty` or a subtype of it
    pub fn is_instance_of(&self, ty: &TypeInfo) -> bool {
        self.0.ty.is_subtype_of(ty)
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn read_slot(&self, slot: usize) -> Result<Value, RuntimeError> {
        self.0
            .slots
            .read()
            .get(slot)
            .cloned()
            .ok_or(RuntimeError::InvalidOffset { offset: slot })
    }

    pub(crate) fn write_slot(&self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        let mut slots = self.0.slots.write();
        let target = slots
            .get_mut(slot)
            .ok_or(RuntimeError::InvalidOffset { offset: slot })?;
        *target = value;
        Ok(())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.type_name(), Arc::as_ptr(&self.0))
    }
}

/// Constructor-body view of the instance under construction
///
/// Unlike a direct field write, the initializer may assign final fields,
/// as constructors do.
pub struct Initializer<'a> {
    instance: &'a Instance,
}

impl<'a> Initializer<'a> {
    pub(crate) fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// The instance being constructed
    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Assign an instance field declared on the instance's type or any of
    /// its ancestors
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), RuntimeError> {
        let value = value.into();
        let ty = self.instance.type_info();
        let info = ty
            .ancestors()
            .find_map(|t| t.declared_fields().iter().find(|f| f.name() == field && !f.is_static()))
            .ok_or_else(|| RuntimeError::NoSuchField {
                owner: ty.name().to_string(),
                field: field.to_string(),
            })?;

        value.check_assignable(info.type_ref())?;
        self.instance.write_slot(info.slot(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modifiers;
    use crate::value::TypeRef;

    #[test]
    fn test_zeroed_instance_layout() {
        let base = TypeInfo::builder("Base")
            .field("id", TypeRef::Int, Modifiers::PRIVATE)
            .build();
        let leaf = TypeInfo::builder("Leaf")
            .extends(&base)
            .field("name", TypeRef::Str, Modifiers::PRIVATE)
            .build();

        let instance = Instance::zeroed(leaf);
        assert_eq!(instance.read_slot(0).unwrap(), Value::Int(0));
        assert_eq!(instance.read_slot(1).unwrap(), Value::Null);
        assert!(instance.read_slot(2).is_err());
        assert!(instance.is_instance_of(&base));
    }

    #[test]
    fn test_initializer_sets_inherited_final() {
        let base = TypeInfo::builder("Base")
            .field("id", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
            .build();
        let leaf = TypeInfo::builder("Leaf").extends(&base).build();

        let instance = Instance::zeroed(leaf);
        let mut init = Initializer::new(&instance);
        init.set("id", 42).unwrap();
        assert_eq!(instance.read_slot(0).unwrap(), Value::Int(42));

        assert!(matches!(
            init.set("id", "wrong"),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            init.set("missing", 1),
            Err(RuntimeError::NoSuchField { .. })
        ));
    }

    #[test]
    fn test_identity() {
        let ty = TypeInfo::builder("T").build();
        let a = Instance::zeroed(ty.clone());
        let b = a.clone();
        let c = Instance::zeroed(ty);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
