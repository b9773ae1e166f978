//! The facade generated wrapper code talks to

use std::fmt;
use std::sync::Arc;

use tinyproto_mappings::{EntityKind, MappingCache, MappingResolver, ProtocolVersion};
use tinyproto_runtime::{
    FieldRef, Host, Instance, MethodRef, TypeInfo, TypeRef, TypeRegistry, Value,
};

use crate::config::CoreConfig;
use crate::error::{Error, Result, TierFailure};
use crate::reflect::locator::signature;
use crate::reflect::{Accessor, MemberLocator};

/// Mapping resolution, member lookup and tiered access over one host
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tinyproto_core::runtime::{Modifiers, TypeInfo, TypeRef, TypeRegistry, Value};
/// use tinyproto_core::{CoreConfig, Reflector};
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry
///     .define(
///         TypeInfo::builder("net.minecraft.Packet")
///             .field("a", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
///             .constructor(&[], Modifiers::PUBLIC, |_, _| Ok(())),
///     )
///     .unwrap();
///
/// let reflector = Reflector::new(registry, &CoreConfig::default());
/// let ty = reflector.require_type("net.minecraft.Packet").unwrap();
/// let packet = reflector.construct(&ty).unwrap();
///
/// let symbol = reflector.resolve("Packet", "a=5,6+b=7", 6).unwrap().unwrap();
/// let field = reflector.require_field(&ty, &symbol).unwrap();
/// reflector.set(&field, Some(&packet), Value::Int(3)).unwrap();
/// assert_eq!(reflector.get(&field, Some(&packet)).unwrap(), Value::Int(3));
/// ```
pub struct Reflector {
    registry: Arc<TypeRegistry>,
    resolver: MappingResolver,
    locator: MemberLocator,
    accessor: Accessor,
}

impl Reflector {
    /// Reflector with its own mapping cache and the host described by
    /// `config`
    pub fn new(registry: Arc<TypeRegistry>, config: &CoreConfig) -> Self {
        let host = Arc::new(Host::new(config.host));
        let resolver =
            MappingResolver::new(Arc::new(MappingCache::new())).with_styles(config.symbols);
        Self::with_parts(registry, resolver, Accessor::new(host, &config.tiers))
    }

    pub fn with_parts(
        registry: Arc<TypeRegistry>,
        resolver: MappingResolver,
        accessor: Accessor,
    ) -> Self {
        Self {
            registry,
            resolver,
            locator: MemberLocator::new(),
            accessor,
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &MappingResolver {
        &self.resolver
    }

    pub fn locator(&self) -> &MemberLocator {
        &self.locator
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn host(&self) -> &Arc<Host> {
        self.accessor.host()
    }

    /// Member symbol of `entity` valid at `version`
    pub fn resolve(
        &self,
        entity: &str,
        spec: &str,
        version: ProtocolVersion,
    ) -> Result<Option<String>> {
        Ok(self.resolver.find(entity, spec, version)?)
    }

    /// Type name of `entity` valid at `version`
    pub fn resolve_type(
        &self,
        entity: &str,
        spec: &str,
        version: ProtocolVersion,
    ) -> Result<Option<String>> {
        Ok(self
            .resolver
            .find_as(EntityKind::Type, entity, spec, version)?)
    }

    /// Like [`resolve`](Self::resolve) for either kind, treating absence as
    /// [`Error::VersionUnresolved`]
    pub fn require_symbol(
        &self,
        kind: EntityKind,
        entity: &str,
        spec: &str,
        version: ProtocolVersion,
    ) -> Result<String> {
        self.resolver
            .find_as(kind, entity, spec, version)?
            .ok_or_else(|| Error::VersionUnresolved {
                entity: entity.to_string(),
                version,
            })
    }

    pub fn lookup_type(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.registry.lookup(name)
    }

    pub fn require_type(&self, name: &str) -> Result<Arc<TypeInfo>> {
        Ok(self.registry.require(name)?)
    }

    pub fn locate_field(&self, ty: &Arc<TypeInfo>, name: &str) -> Option<FieldRef> {
        self.locator.find_field(ty, name)
    }

    pub fn locate_method(
        &self,
        ty: &Arc<TypeInfo>,
        name: &str,
        params: &[TypeRef],
    ) -> Option<MethodRef> {
        self.locator.find_method(ty, name, params)
    }

    pub fn require_field(&self, ty: &Arc<TypeInfo>, name: &str) -> Result<FieldRef> {
        self.locator.require_field(ty, name)
    }

    pub fn require_method(
        &self,
        ty: &Arc<TypeInfo>,
        name: &str,
        params: &[TypeRef],
    ) -> Result<MethodRef> {
        self.locator.require_method(ty, name, params)
    }

    /// Instance of exactly `ty`, escalating past missing or failing
    /// constructors
    pub fn construct(&self, ty: &Arc<TypeInfo>) -> Result<Instance> {
        self.accessor.construct(ty)
    }

    /// Instance built by the constructor whose parameters are exactly the
    /// runtime types of `args`
    ///
    /// The constructor is looked up on `ty`, then on its ancestors; the
    /// instance has the type declaring the constructor found. A null
    /// argument has no runtime type and matches nothing.
    pub fn construct_with(&self, ty: &Arc<TypeInfo>, args: &[Value]) -> Result<Instance> {
        let denied = |reason: String| Error::ConstructionDenied {
            type_name: ty.name().to_string(),
            attempts: vec![TierFailure {
                tier: "constructor",
                reason,
            }],
        };

        let params = args
            .iter()
            .map(Value::type_ref)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| denied("null argument has no runtime type".to_string()))?;
        let ctor = self
            .locator
            .find_constructor(ty, &params)
            .ok_or_else(|| denied(format!("no constructor {}", signature(ty.name(), &params))))?;

        self.accessor.construct_with(&ctor, args)
    }

    pub fn get(&self, field: &FieldRef, target: Option<&Instance>) -> Result<Value> {
        self.accessor.get(field, target)
    }

    /// Read the field `name` located on the target's own type
    pub fn get_named(&self, target: &Instance, name: &str) -> Result<Value> {
        let field = self.require_field(target.type_info(), name)?;
        self.accessor.get(&field, Some(target))
    }

    pub fn set(&self, field: &FieldRef, target: Option<&Instance>, value: Value) -> Result<()> {
        self.accessor.set(field, target, value)
    }

    pub fn invoke(
        &self,
        method: &MethodRef,
        target: Option<&Instance>,
        args: &[Value],
    ) -> Result<Value> {
        self.accessor.invoke(method, target, args)
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("types", &self.registry.len())
            .field("mappings", &self.resolver.cache().len())
            .field("members", &self.locator.len())
            .field("accessor", &self.accessor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tinyproto_mappings::SpecFormatError;
    use tinyproto_runtime::{Modifiers, RuntimeError};

    use super::*;

    fn reflector() -> Reflector {
        let registry = Arc::new(TypeRegistry::new());
        let base = registry
            .define(
                TypeInfo::builder("net.minecraft.network.Base")
                    .field("x", TypeRef::Int, Modifiers::PRIVATE | Modifiers::FINAL)
                    .constructor(&[TypeRef::Str], Modifiers::PUBLIC, |init, args| {
                        let len = match &args[0] {
                            Value::Str(s) => s.len() as i32,
                            _ => 0,
                        };
                        init.set("x", len)
                    }),
            )
            .unwrap();
        let middle = registry
            .define(TypeInfo::builder("net.minecraft.network.Middle").extends(&base))
            .unwrap();
        registry
            .define(
                TypeInfo::builder("net.minecraft.network.Leaf")
                    .extends(&middle)
                    .field("name", TypeRef::Str, Modifiers::PUBLIC)
                    .constructor(&[], Modifiers::PUBLIC, |init, _| init.set("name", "leaf")),
            )
            .unwrap();
        Reflector::new(registry, &CoreConfig::default())
    }

    #[test]
    fn test_resolve_round_trip() {
        let reflector = reflector();
        let spec = "old=1,2,3+new=4,5";
        assert_eq!(reflector.resolve("E", spec, 2).unwrap().as_deref(), Some("old"));
        assert_eq!(reflector.resolve("E", spec, 5).unwrap().as_deref(), Some("new"));
        assert_eq!(reflector.resolve("E", spec, 9).unwrap(), None);

        assert_eq!(
            reflector.require_symbol(EntityKind::Member, "E", spec, 9),
            Err(Error::VersionUnresolved {
                entity: "E".to_string(),
                version: 9
            })
        );
    }

    #[test]
    fn test_resolve_type_normalizes_paths() {
        let reflector = reflector();
        let name = reflector
            .resolve_type("Leaf", "net/minecraft/network/Leaf=754", 754)
            .unwrap()
            .unwrap();
        assert_eq!(name, "net.minecraft.network.Leaf");
        assert!(reflector.lookup_type(&name).is_some());
    }

    #[test]
    fn test_malformed_spec_not_cached() {
        let reflector = reflector();
        let err = reflector.resolve("E", "foo=1,x,3", 1).unwrap_err();
        assert!(matches!(
            err,
            Error::SpecFormat(SpecFormatError::InvalidVersion { .. })
        ));
        assert!(reflector.resolver().cache().is_empty());
    }

    #[test]
    fn test_locate_on_grandparent() {
        let reflector = reflector();
        let leaf = reflector.require_type("net.minecraft.network.Leaf").unwrap();
        let x = reflector.locate_field(&leaf, "x").unwrap();
        assert_eq!(x.declaring_type().name(), "net.minecraft.network.Base");
        assert!(reflector.locate_field(&leaf, "y").is_none());
        assert!(matches!(
            reflector.require_type("missing"),
            Err(Error::Runtime(RuntimeError::TypeNotFound(_)))
        ));
    }

    #[test]
    fn test_construct_and_get_named() {
        let reflector = reflector();
        let leaf = reflector.require_type("net.minecraft.network.Leaf").unwrap();
        let instance = reflector.construct(&leaf).unwrap();
        assert_eq!(
            reflector.get_named(&instance, "name").unwrap(),
            Value::from("leaf")
        );
        assert_eq!(reflector.get_named(&instance, "x").unwrap(), Value::Int(0));
        assert!(matches!(
            reflector.get_named(&instance, "nope"),
            Err(Error::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_construct_with_walks_ancestry() {
        let reflector = reflector();
        let leaf = reflector.require_type("net.minecraft.network.Leaf").unwrap();

        let instance = reflector
            .construct_with(&leaf, &[Value::from("four")])
            .unwrap();
        assert_eq!(instance.type_name(), "net.minecraft.network.Base");
        assert_eq!(reflector.get_named(&instance, "x").unwrap(), Value::Int(4));
    }

    #[test]
    fn test_construct_with_rejects_mismatch() {
        let reflector = reflector();
        let leaf = reflector.require_type("net.minecraft.network.Leaf").unwrap();

        let err = reflector
            .construct_with(&leaf, &[Value::Int(1)])
            .unwrap_err();
        assert!(matches!(err, Error::ConstructionDenied { .. }));

        let err = reflector.construct_with(&leaf, &[Value::Null]).unwrap_err();
        assert_eq!(
            err.attempts()[0].reason,
            "null argument has no runtime type"
        );
    }

    #[test]
    fn test_set_final_through_facade() {
        let reflector = reflector();
        let leaf = reflector.require_type("net.minecraft.network.Leaf").unwrap();
        let instance = reflector.construct(&leaf).unwrap();
        let x = reflector.require_field(&leaf, "x").unwrap();

        reflector.set(&x, Some(&instance), Value::Int(12)).unwrap();
        assert_eq!(reflector.get(&x, Some(&instance)).unwrap(), Value::Int(12));
    }
}
