//! Runtime values and declared types

use std::fmt;
use std::sync::Arc;

use super::error::RuntimeError;
use super::object::Instance;

/// Declared type of a field, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Bool,
    Int,
    Long,
    Double,
    Str,
    /// Reference to a runtime type by name
    Object(Arc<str>),
}

impl TypeRef {
    /// Reference to the runtime type `name`
    pub fn object(name: impl Into<Arc<str>>) -> Self {
        Self::Object(name.into())
    }

    /// The value a zero-initialized slot of this type holds
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Double => Value::Double(0.0),
            Self::Str | Self::Object(_) => Value::Null,
        }
    }

    /// Whether null is a valid value of this type
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Str | Self::Object(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Double => f.write_str("double"),
            Self::Str => f.write_str("string"),
            Self::Object(name) => f.write_str(name),
        }
    }
}

/// A value stored in a slot or passed as an argument
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Arc<str>),
    Object(Instance),
}

impl Value {
    /// Runtime type of the value; null has none
    pub fn type_ref(&self) -> Option<TypeRef> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(TypeRef::Bool),
            Self::Int(_) => Some(TypeRef::Int),
            Self::Long(_) => Some(TypeRef::Long),
            Self::Double(_) => Some(TypeRef::Double),
            Self::Str(_) => Some(TypeRef::Str),
            Self::Object(instance) => Some(TypeRef::object(instance.type_name())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Whether this value may be stored in a slot declared as `ty`
    pub fn is_assignable_to(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (Self::Null, ty) => ty.is_reference(),
            (Self::Bool(_), TypeRef::Bool)
            | (Self::Int(_), TypeRef::Int)
            | (Self::Long(_), TypeRef::Long)
            | (Self::Double(_), TypeRef::Double)
            | (Self::Str(_), TypeRef::Str) => true,
            (Self::Object(instance), TypeRef::Object(name)) => {
                instance.type_info().is_subtype_of_name(name)
            }
            _ => false,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        self.type_ref()
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    pub(crate) fn check_assignable(&self, ty: &TypeRef) -> Result<(), RuntimeError> {
        if self.is_assignable_to(ty) {
            Ok(())
        } else {
            Err(RuntimeError::TypeMismatch {
                expected: ty.to_string(),
                found: self.describe(),
            })
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            // Identity, not structure
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// `From<$ty>` and `TryFrom<Value>` for a primitive carried by one variant
macro_rules! primitive_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = RuntimeError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(RuntimeError::TypeMismatch {
                            expected: $name.to_string(),
                            found: other.describe(),
                        }),
                    }
                }
            }
        )*
    };
}

primitive_conversions! {
    bool => Bool, "bool";
    i32 => Int, "int";
    i64 => Long, "long";
    f64 => Double, "double";
}

impl TryFrom<Value> for String {
    type Error = RuntimeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Str(inner) => Ok(inner.to_string()),
            other => Err(RuntimeError::TypeMismatch {
                expected: "string".to_string(),
                found: other.describe(),
            }),
        }
    }
}

impl TryFrom<Value> for Instance {
    type Error = RuntimeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(instance) => Ok(instance),
            other => Err(RuntimeError::TypeMismatch {
                expected: "object".to_string(),
                found: other.describe(),
            }),
        }
    }
}

impl TryFrom<Value> for Option<Instance> {
    type Error = RuntimeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            other => Instance::try_from(other).map(Some),
        }
    }
}

impl TryFrom<Value> for Option<String> {
    type Error = RuntimeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            other => String::try_from(other).map(Some),
        }
    }
}
