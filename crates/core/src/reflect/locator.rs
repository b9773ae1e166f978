//! Member lookup across type ancestry

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use tinyproto_runtime::{ConstructorRef, FieldRef, MethodRef, TypeInfo, TypeRef};
use tracing::{debug, trace};

use super::MemberHandle;
use crate::error::{Error, Result};

/// Queried type, compared by identity
///
/// Holding the `Arc` keeps the address from being reused while cached.
#[derive(Clone)]
struct TypeKey(Arc<TypeInfo>);

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.0.name(), Arc::as_ptr(&self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MemberKey {
    Field {
        owner: TypeKey,
        name: String,
    },
    Method {
        owner: TypeKey,
        name: String,
        params: Vec<TypeRef>,
    },
    Constructor {
        owner: TypeKey,
        params: Vec<TypeRef>,
    },
}

/// `name(p1, p2)` for diagnostics
pub(crate) fn signature(name: &str, params: &[TypeRef]) -> String {
    let params: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("{}({})", name, params.join(", "))
}

/// The type itself, then each ancestor, stopping before the registry root
fn lineage(ty: &Arc<TypeInfo>) -> impl Iterator<Item = Arc<TypeInfo>> {
    std::iter::successors(Some(Arc::clone(ty)), |t| t.super_type().cloned())
        .take_while(|t| !t.is_root())
}

/// Finds declared members by walking a type's ancestry
///
/// The most-derived declaring type wins. Successful lookups are cached by
/// (queried type identity, member name[, parameter types]); misses are not.
#[derive(Debug, Default)]
pub struct MemberLocator {
    cache: DashMap<MemberKey, MemberHandle>,
}

impl MemberLocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, key: &MemberKey) -> Option<MemberHandle> {
        let handle = self.cache.get(key)?.value().clone();
        trace!("Member cache hit for {:?}", key);
        Some(handle)
    }

    fn locate(
        &self,
        ty: &Arc<TypeInfo>,
        key: MemberKey,
        find: impl Fn(&Arc<TypeInfo>) -> Option<MemberHandle>,
    ) -> Option<MemberHandle> {
        if let Some(handle) = self.cached(&key) {
            return Some(handle);
        }

        let handle = lineage(ty).find_map(|t| find(&t))?;
        debug!(
            "Located {:?} on {} (declared by {})",
            key,
            ty.name(),
            handle.declaring_type().name()
        );
        self.cache.insert(key, handle.clone());
        Some(handle)
    }

    /// Field `name` declared on `ty` or its nearest ancestor declaring one
    pub fn find_field(&self, ty: &Arc<TypeInfo>, name: &str) -> Option<FieldRef> {
        let key = MemberKey::Field {
            owner: TypeKey(Arc::clone(ty)),
            name: name.to_string(),
        };
        let handle = self.locate(ty, key, |t| {
            t.field_index(name)
                .and_then(|index| FieldRef::new(Arc::clone(t), index))
                .map(MemberHandle::Field)
        })?;
        match handle {
            MemberHandle::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Method `name` with exactly `params`
    pub fn find_method(&self, ty: &Arc<TypeInfo>, name: &str, params: &[TypeRef]) -> Option<MethodRef> {
        let key = MemberKey::Method {
            owner: TypeKey(Arc::clone(ty)),
            name: name.to_string(),
            params: params.to_vec(),
        };
        let handle = self.locate(ty, key, |t| {
            t.method_index(name, params)
                .and_then(|index| MethodRef::new(Arc::clone(t), index))
                .map(MemberHandle::Method)
        })?;
        match handle {
            MemberHandle::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Constructor with exactly `params`, on `ty` first, then its ancestors
    pub fn find_constructor(&self, ty: &Arc<TypeInfo>, params: &[TypeRef]) -> Option<ConstructorRef> {
        let key = MemberKey::Constructor {
            owner: TypeKey(Arc::clone(ty)),
            params: params.to_vec(),
        };
        let handle = self.locate(ty, key, |t| {
            t.constructor_index(params)
                .and_then(|index| ConstructorRef::new(Arc::clone(t), index))
                .map(MemberHandle::Constructor)
        })?;
        match handle {
            MemberHandle::Constructor(ctor) => Some(ctor),
            _ => None,
        }
    }

    pub fn require_field(&self, ty: &Arc<TypeInfo>, name: &str) -> Result<FieldRef> {
        self.find_field(ty, name).ok_or_else(|| Error::MemberNotFound {
            owner: ty.name().to_string(),
            member: name.to_string(),
        })
    }

    pub fn require_method(
        &self,
        ty: &Arc<TypeInfo>,
        name: &str,
        params: &[TypeRef],
    ) -> Result<MethodRef> {
        self.find_method(ty, name, params)
            .ok_or_else(|| Error::MemberNotFound {
                owner: ty.name().to_string(),
                member: signature(name, params),
            })
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tinyproto_runtime::{Modifiers, TypeRegistry, Value};

    use super::*;

    fn hierarchy(registry: &TypeRegistry) -> (Arc<TypeInfo>, Arc<TypeInfo>, Arc<TypeInfo>) {
        let grandparent = registry
            .define(
                TypeInfo::builder("Grandparent")
                    .field("x", TypeRef::Int, Modifiers::PRIVATE)
                    .field("shadowed", TypeRef::Int, Modifiers::PRIVATE)
                    .method("describe", &[], Some(TypeRef::Str), Modifiers::PUBLIC, |_, _| {
                        Ok(Value::from("grandparent"))
                    }),
            )
            .unwrap();
        let parent = registry
            .define(
                TypeInfo::builder("Parent")
                    .extends(&grandparent)
                    .field("shadowed", TypeRef::Long, Modifiers::PRIVATE)
                    .constructor(&[TypeRef::Str], Modifiers::PUBLIC, |_, _| Ok(())),
            )
            .unwrap();
        let leaf = registry
            .define(TypeInfo::builder("Leaf").extends(&parent))
            .unwrap();
        (grandparent, parent, leaf)
    }

    #[test]
    fn test_field_declared_on_grandparent() {
        let registry = TypeRegistry::new();
        let (grandparent, _, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        let x = locator.find_field(&leaf, "x").unwrap();
        assert!(Arc::ptr_eq(x.declaring_type(), &grandparent));
        assert_eq!(x.name(), "x");
    }

    #[test]
    fn test_most_derived_wins() {
        let registry = TypeRegistry::new();
        let (_, parent, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        let shadowed = locator.find_field(&leaf, "shadowed").unwrap();
        assert!(Arc::ptr_eq(shadowed.declaring_type(), &parent));
        assert_eq!(shadowed.type_ref(), &TypeRef::Long);
    }

    #[test]
    fn test_methods_and_constructors() {
        let registry = TypeRegistry::new();
        let (grandparent, parent, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        let describe = locator.find_method(&leaf, "describe", &[]).unwrap();
        assert!(Arc::ptr_eq(describe.declaring_type(), &grandparent));
        assert!(locator.find_method(&leaf, "describe", &[TypeRef::Int]).is_none());

        let ctor = locator.find_constructor(&leaf, &[TypeRef::Str]).unwrap();
        assert!(Arc::ptr_eq(ctor.declaring_type(), &parent));
    }

    #[test]
    fn test_root_is_excluded() {
        let registry = TypeRegistry::new();
        let (_, _, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        // The root's no-arg constructor is never found through a subtype
        assert!(locator.find_constructor(&leaf, &[]).is_none());
        assert!(locator.find_constructor(registry.root(), &[]).is_none());
    }

    #[test]
    fn test_absence_and_require() {
        let registry = TypeRegistry::new();
        let (_, _, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        assert!(locator.find_field(&leaf, "missing").is_none());
        assert!(locator.is_empty());

        let err = locator.require_method(&leaf, "run", &[TypeRef::Int]).unwrap_err();
        assert_eq!(
            err,
            Error::MemberNotFound {
                owner: "Leaf".to_string(),
                member: "run(int)".to_string()
            }
        );
    }

    #[test]
    fn test_positive_lookups_cached() {
        let registry = TypeRegistry::new();
        let (_, _, leaf) = hierarchy(&registry);
        let locator = MemberLocator::new();

        let first = locator.find_field(&leaf, "x").unwrap();
        assert_eq!(locator.len(), 1);
        let second = locator.find_field(&leaf, "x").unwrap();
        assert_eq!(first, second);
        assert_eq!(locator.len(), 1);
    }

    #[test]
    fn test_registered_parentless_type_searched() {
        let registry = TypeRegistry::new();
        let standalone = TypeInfo::builder("net.minecraft.Standalone")
            .field("x", TypeRef::Int, Modifiers::PRIVATE)
            .method("run", &[], None, Modifiers::PUBLIC, |_, _| Ok(Value::Null))
            .constructor(&[TypeRef::Int], Modifiers::PUBLIC, |_, _| Ok(()))
            .build();
        registry.register(Arc::clone(&standalone)).unwrap();
        let ty = registry.require("net.minecraft.Standalone").unwrap();
        let locator = MemberLocator::new();

        let x = locator.find_field(&ty, "x").unwrap();
        assert!(Arc::ptr_eq(x.declaring_type(), &standalone));
        assert!(locator.find_method(&ty, "run", &[]).is_some());
        assert!(locator.find_constructor(&ty, &[TypeRef::Int]).is_some());
    }

    #[test]
    fn test_same_named_subtypes_keep_own_members() {
        let registry = TypeRegistry::new();
        let (_, parent, _) = hierarchy(&registry);
        let locator = MemberLocator::new();

        // Two unrelated builds named alike, one shadowing the parent's field
        let plain = TypeInfo::builder("Twin").extends(&parent).build();
        let shadowing = TypeInfo::builder("Twin")
            .extends(&parent)
            .field("shadowed", TypeRef::Bool, Modifiers::PRIVATE)
            .build();

        let inherited = locator.find_field(&plain, "shadowed").unwrap();
        assert!(Arc::ptr_eq(inherited.declaring_type(), &parent));

        let own = locator.find_field(&shadowing, "shadowed").unwrap();
        assert!(Arc::ptr_eq(own.declaring_type(), &shadowing));
        assert_eq!(own.type_ref(), &TypeRef::Bool);
        assert_eq!(locator.len(), 2);
    }

    #[test]
    fn test_cache_does_not_cross_registries() {
        let locator = MemberLocator::new();

        let a = TypeRegistry::new();
        let (_, _, leaf_a) = hierarchy(&a);
        let field_a = locator.find_field(&leaf_a, "x").unwrap();

        let b = TypeRegistry::new();
        let (grandparent_b, _, leaf_b) = hierarchy(&b);
        let field_b = locator.find_field(&leaf_b, "x").unwrap();

        assert_ne!(field_a, field_b);
        assert!(Arc::ptr_eq(field_b.declaring_type(), &grandparent_b));
    }
}
