//! Named type registry

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::error::RuntimeError;
use super::types::{Modifiers, TypeBuilder, TypeInfo};

/// Name of the universal base type
pub const ROOT_TYPE: &str = "Object";

/// All types known to a host runtime, by fully-qualified name
pub struct TypeRegistry {
    types: DashMap<String, Arc<TypeInfo>>,
    root: Arc<TypeInfo>,
}

impl TypeRegistry {
    /// Registry holding only the root type
    pub fn new() -> Self {
        let root = TypeInfo::builder(ROOT_TYPE)
            .constructor(&[], Modifiers::PUBLIC, |_, _| Ok(()))
            .build_root();
        let types = DashMap::new();
        types.insert(ROOT_TYPE.to_string(), Arc::clone(&root));
        Self { types, root }
    }

    pub fn root(&self) -> &Arc<TypeInfo> {
        &self.root
    }

    /// Build and register a type
    ///
    /// Types without an explicit super type extend the root.
    pub fn define(&self, builder: TypeBuilder) -> Result<Arc<TypeInfo>, RuntimeError> {
        let builder = if builder.has_super_type() {
            builder
        } else {
            builder.extends(&self.root)
        };

        match self.types.entry(builder.name().to_string()) {
            Entry::Occupied(entry) => Err(RuntimeError::DuplicateType(entry.key().clone())),
            Entry::Vacant(entry) => {
                let ty = builder.build();
                debug!("Defined type {}", ty.name());
                entry.insert(Arc::clone(&ty));
                Ok(ty)
            }
        }
    }

    /// Register an already built type
    ///
    /// A type built without a super type stays parentless; it is not
    /// treated as the root.
    pub fn register(&self, ty: Arc<TypeInfo>) -> Result<(), RuntimeError> {
        match self.types.entry(ty.name().to_string()) {
            Entry::Occupied(entry) => Err(RuntimeError::DuplicateType(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(ty);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn require(&self, name: &str) -> Result<Arc<TypeInfo>, RuntimeError> {
        self.lookup(name)
            .ok_or_else(|| RuntimeError::TypeNotFound(name.to_string()))
    }

    /// Number of registered types, root included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeRef;

    #[test]
    fn test_define_extends_root() {
        let registry = TypeRegistry::new();
        let ty = registry
            .define(TypeInfo::builder("a.B").field("x", TypeRef::Int, Modifiers::PUBLIC))
            .unwrap();

        assert_eq!(ty.super_type().unwrap().name(), ROOT_TYPE);
        assert!(registry.root().is_root());
        assert_eq!(registry.len(), 2);
        assert!(Arc::ptr_eq(&registry.require("a.B").unwrap(), &ty));
    }

    #[test]
    fn test_duplicate_and_missing() {
        let registry = TypeRegistry::new();
        registry.define(TypeInfo::builder("T")).unwrap();
        assert_eq!(
            registry.define(TypeInfo::builder("T")).unwrap_err(),
            RuntimeError::DuplicateType("T".to_string())
        );
        assert!(registry.register(TypeInfo::builder(ROOT_TYPE).build()).is_err());
        assert_eq!(
            registry.require("U").unwrap_err(),
            RuntimeError::TypeNotFound("U".to_string())
        );
        assert!(registry.lookup("U").is_none());
    }

    #[test]
    fn test_registered_parentless_type_is_not_root() {
        let registry = TypeRegistry::new();
        let standalone = TypeInfo::builder("net.minecraft.Standalone")
            .field("x", TypeRef::Int, Modifiers::PRIVATE)
            .build();
        registry.register(Arc::clone(&standalone)).unwrap();

        let found = registry.require("net.minecraft.Standalone").unwrap();
        assert!(found.super_type().is_none());
        assert!(!found.is_root());
        assert!(registry.root().is_root());
    }

    #[test]
    fn test_explicit_parent_kept() {
        let registry = TypeRegistry::new();
        let base = registry.define(TypeInfo::builder("Base")).unwrap();
        let leaf = registry
            .define(TypeInfo::builder("Leaf").extends(&base))
            .unwrap();
        let names: Vec<_> = leaf.ancestors().map(TypeInfo::name).collect();
        assert_eq!(names, vec!["Leaf", "Base", ROOT_TYPE]);
    }
}
