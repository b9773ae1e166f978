//! Handles to declared members
//!
//! A handle pairs the declaring type with the member's index in it. Handles
//! are cheap to clone and stay valid for as long as the type exists, so
//! callers resolve them once and reuse them for every access.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::error::RuntimeError;
use super::object::{Initializer, Instance};
use super::types::{ConstructorInfo, FieldInfo, MethodInfo, Modifiers, TypeFlags, TypeInfo};
use super::value::{TypeRef, Value};

fn check_arguments(params: &[TypeRef], args: &[Value]) -> Result<(), RuntimeError> {
    if params.len() != args.len() {
        return Err(RuntimeError::ArityMismatch {
            expected: params.len(),
            found: args.len(),
        });
    }
    params
        .iter()
        .zip(args)
        .try_for_each(|(param, arg)| arg.check_assignable(param))
}

fn check_receiver<'a>(
    owner: &TypeInfo,
    member: &str,
    target: Option<&'a Instance>,
) -> Result<&'a Instance, RuntimeError> {
    let instance = target.ok_or_else(|| RuntimeError::MissingReceiver {
        owner: owner.name().to_string(),
        member: member.to_string(),
    })?;
    if !instance.is_instance_of(owner) {
        return Err(RuntimeError::WrongReceiver {
            expected: owner.name().to_string(),
            found: instance.type_name().to_string(),
        });
    }
    Ok(instance)
}

/// Handle to a declared field
#[derive(Clone)]
pub struct FieldRef {
    owner: Arc<TypeInfo>,
    index: usize,
}

impl FieldRef {
    /// Handle to the `index`-th field declared on `owner`
    pub fn new(owner: Arc<TypeInfo>, index: usize) -> Option<Self> {
        (index < owner.declared_fields().len()).then_some(Self { owner, index })
    }

    pub(crate) fn info(&self) -> &FieldInfo {
        &self.owner.declared_fields()[self.index]
    }

    /// The type that declares the field
    pub fn declaring_type(&self) -> &Arc<TypeInfo> {
        &self.owner
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    pub fn type_ref(&self) -> &TypeRef {
        self.info().type_ref()
    }

    /// Current modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.info().modifiers()
    }

    pub fn declared_modifiers(&self) -> Modifiers {
        self.info().declared_modifiers()
    }

    pub fn is_static(&self) -> bool {
        self.info().is_static()
    }

    /// Whether direct writes are currently rejected
    pub fn is_immutable(&self) -> bool {
        self.modifiers().contains(Modifiers::FINAL) || self.is_trusted_final()
    }

    fn is_trusted_final(&self) -> bool {
        self.owner.flags().contains(TypeFlags::TRUSTED_FINALS)
            && self.declared_modifiers().contains(Modifiers::FINAL)
    }

    /// Read the field
    ///
    /// `target` is ignored for static fields.
    pub fn get(&self, target: Option<&Instance>) -> Result<Value, RuntimeError> {
        let info = self.info();
        if info.is_static() {
            self.owner.read_static(info.slot())
        } else {
            check_receiver(&self.owner, info.name(), target)?.read_slot(info.slot())
        }
    }

    /// Validate receiver and value type for a write, ignoring mutability
    pub fn check_write(&self, target: Option<&Instance>, value: &Value) -> Result<(), RuntimeError> {
        let info = self.info();
        if !info.is_static() {
            check_receiver(&self.owner, info.name(), target)?;
        }
        value.check_assignable(info.type_ref())
    }

    /// Direct write through the normal member-write path
    ///
    /// Rejected with [`RuntimeError::ImmutableField`] while the field is
    /// final, and always for declared-final fields of types with
    /// [`TypeFlags::TRUSTED_FINALS`].
    pub fn set(&self, target: Option<&Instance>, value: Value) -> Result<(), RuntimeError> {
        self.check_write(target, &value)?;
        if self.is_immutable() {
            return Err(RuntimeError::ImmutableField {
                owner: self.owner.name().to_string(),
                field: self.name().to_string(),
            });
        }
        self.store(target, value)
    }

    /// Store without mutability checks; the write must already be validated
    pub(crate) fn store(&self, target: Option<&Instance>, value: Value) -> Result<(), RuntimeError> {
        let info = self.info();
        trace!("Storing {}.{}", self.owner.name(), info.name());
        if info.is_static() {
            self.owner.write_static(info.slot(), value)
        } else {
            check_receiver(&self.owner, info.name(), target)?.write_slot(info.slot(), value)
        }
    }

    pub(crate) fn slot(&self) -> usize {
        self.info().slot()
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}

impl Eq for FieldRef {}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRef({}.{}: {})", self.owner.name(), self.name(), self.type_ref())
    }
}

/// Handle to a declared method
#[derive(Clone)]
pub struct MethodRef {
    owner: Arc<TypeInfo>,
    index: usize,
}

impl MethodRef {
    pub fn new(owner: Arc<TypeInfo>, index: usize) -> Option<Self> {
        (index < owner.declared_methods().len()).then_some(Self { owner, index })
    }

    fn info(&self) -> &MethodInfo {
        &self.owner.declared_methods()[self.index]
    }

    pub fn declaring_type(&self) -> &Arc<TypeInfo> {
        &self.owner
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    pub fn params(&self) -> &[TypeRef] {
        self.info().params()
    }

    pub fn returns(&self) -> Option<&TypeRef> {
        self.info().returns()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.info().modifiers()
    }

    /// Call the method
    ///
    /// `target` is ignored for static methods. Errors raised by the body are
    /// returned as-is.
    pub fn invoke(&self, target: Option<&Instance>, args: &[Value]) -> Result<Value, RuntimeError> {
        let info = self.info();
        let receiver = if info.is_static() {
            None
        } else {
            Some(check_receiver(&self.owner, info.name(), target)?)
        };
        check_arguments(info.params(), args)?;
        (info.body())(receiver, args)
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}

impl Eq for MethodRef {}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({}.{}(", self.owner.name(), self.name())?;
        for (i, param) in self.params().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str("))")
    }
}

/// Handle to a declared constructor
#[derive(Clone)]
pub struct ConstructorRef {
    owner: Arc<TypeInfo>,
    index: usize,
}

impl ConstructorRef {
    pub fn new(owner: Arc<TypeInfo>, index: usize) -> Option<Self> {
        (index < owner.declared_constructors().len()).then_some(Self { owner, index })
    }

    fn info(&self) -> &ConstructorInfo {
        &self.owner.declared_constructors()[self.index]
    }

    /// The type this constructor instantiates
    pub fn declaring_type(&self) -> &Arc<TypeInfo> {
        &self.owner
    }

    pub fn params(&self) -> &[TypeRef] {
        self.info().params()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.info().modifiers()
    }

    pub fn is_public(&self) -> bool {
        self.modifiers().contains(Modifiers::PUBLIC)
    }

    /// Allocate an instance of the declaring type and run the body on it
    pub fn new_instance(&self, args: &[Value]) -> Result<Instance, RuntimeError> {
        if self.owner.flags().contains(TypeFlags::ABSTRACT) {
            return Err(RuntimeError::AbstractType(self.owner.name().to_string()));
        }
        let info = self.info();
        check_arguments(info.params(), args)?;

        let instance = Instance::zeroed(Arc::clone(&self.owner));
        (info.body())(&mut Initializer::new(&instance), args)?;
        Ok(instance)
    }
}

impl PartialEq for ConstructorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner) && self.index == other.index
    }
}

impl Eq for ConstructorRef {}

impl fmt::Debug for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructorRef({}/{})", self.owner.name(), self.params().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Arc<TypeInfo> {
        TypeInfo::builder("Point")
            .field("x", TypeRef::Int, Modifiers::PRIVATE)
            .field("id", TypeRef::Long, Modifiers::PRIVATE | Modifiers::FINAL)
            .static_field("ORIGIN", TypeRef::Str, Modifiers::PUBLIC | Modifiers::FINAL, "0,0")
            .constructor(&[TypeRef::Int], Modifiers::PUBLIC, |init, args| {
                init.set("x", args[0].clone())?;
                init.set("id", 7i64)
            })
            .method("getX", &[], Some(TypeRef::Int), Modifiers::PUBLIC, |this, _| {
                let this = this.ok_or(RuntimeError::Invocation("no receiver".into()))?;
                FieldRef::new(Arc::clone(this.type_info()), 0)
                    .ok_or(RuntimeError::Invocation("no field".into()))?
                    .get(Some(this))
            })
            .build()
    }

    #[test]
    fn test_construct_and_read() {
        let ty = point();
        let ctor = ConstructorRef::new(ty.clone(), 0).unwrap();
        let p = ctor.new_instance(&[Value::Int(3)]).unwrap();

        let x = FieldRef::new(ty.clone(), 0).unwrap();
        let id = FieldRef::new(ty.clone(), 1).unwrap();
        assert_eq!(x.get(Some(&p)).unwrap(), Value::Int(3));
        assert_eq!(id.get(Some(&p)).unwrap(), Value::Long(7));

        let get_x = MethodRef::new(ty, 0).unwrap();
        assert_eq!(get_x.invoke(Some(&p), &[]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_direct_write_rejects_final() {
        let ty = point();
        let p = ConstructorRef::new(ty.clone(), 0)
            .unwrap()
            .new_instance(&[Value::Int(1)])
            .unwrap();

        let x = FieldRef::new(ty.clone(), 0).unwrap();
        x.set(Some(&p), Value::Int(9)).unwrap();
        assert_eq!(x.get(Some(&p)).unwrap(), Value::Int(9));

        let id = FieldRef::new(ty.clone(), 1).unwrap();
        assert!(matches!(
            id.set(Some(&p), Value::Long(1)),
            Err(RuntimeError::ImmutableField { .. })
        ));

        let origin = FieldRef::new(ty, 2).unwrap();
        assert_eq!(origin.get(None).unwrap(), Value::from("0,0"));
        assert!(origin.set(None, Value::from("1,1")).is_err());
    }

    #[test]
    fn test_receiver_and_type_checks() {
        let ty = point();
        let other = TypeInfo::builder("Other").build();
        let stranger = Instance::zeroed(other);
        let x = FieldRef::new(ty.clone(), 0).unwrap();

        assert!(matches!(x.get(None), Err(RuntimeError::MissingReceiver { .. })));
        assert!(matches!(
            x.get(Some(&stranger)),
            Err(RuntimeError::WrongReceiver { .. })
        ));

        let p = Instance::zeroed(ty);
        assert!(matches!(
            x.set(Some(&p), Value::from("nope")),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_argument_checks() {
        let ty = point();
        let ctor = ConstructorRef::new(ty, 0).unwrap();
        assert!(matches!(
            ctor.new_instance(&[]),
            Err(RuntimeError::ArityMismatch { expected: 1, found: 0 })
        ));
        assert!(matches!(
            ctor.new_instance(&[Value::Bool(true)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_abstract_type_not_constructible() {
        let ty = TypeInfo::builder("Shape")
            .flags(TypeFlags::ABSTRACT)
            .constructor(&[], Modifiers::PUBLIC, |_, _| Ok(()))
            .build();
        let ctor = ConstructorRef::new(ty, 0).unwrap();
        assert!(matches!(ctor.new_instance(&[]), Err(RuntimeError::AbstractType(_))));
    }

    #[test]
    fn test_trusted_finals() {
        let ty = TypeInfo::builder("Record")
            .flags(TypeFlags::TRUSTED_FINALS)
            .field("v", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
            .build();
        let v = FieldRef::new(ty, 0).unwrap();
        v.info().set_modifiers(Modifiers::PRIVATE);
        assert!(v.is_immutable());
    }

    #[test]
    fn test_handles_out_of_range() {
        let ty = point();
        assert!(FieldRef::new(ty.clone(), 99).is_none());
        assert!(MethodRef::new(ty.clone(), 1).is_none());
        assert!(ConstructorRef::new(ty, 1).is_none());
    }
}
