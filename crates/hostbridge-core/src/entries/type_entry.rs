//! Class and interface entries.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::descriptor::well_known;
use crate::error::RuntimeError;
use crate::runtime::{ConstructorHook, NativeInit, NativeInstance, ObjectRef, invoke};
use crate::{MethodSignature, Modifiers, NativeValue, TypeHash};

use super::{FieldEntry, MethodEntry};

/// A host class or interface.
///
/// Supertypes are held strongly, so a loaded type keeps its whole ancestry
/// alive for as long as it is referenced.
pub struct TypeEntry {
    /// Unqualified name (last path segment).
    name: String,
    /// Fully qualified name, e.g. `game/Entity`.
    qualified_name: String,
    /// Type hash for identity.
    type_hash: TypeHash,
    modifiers: Modifiers,

    // === Inheritance ===
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,

    // === Members ===
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,

    // === Lifecycle ===
    /// Produces the native state of new instances.
    initializer: Option<NativeInit>,
    /// Replaces default instantiation (generated types).
    constructor: Option<ConstructorHook>,
}

impl TypeEntry {
    /// Create a public class entry.
    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name.into(), Modifiers::PUBLIC)
    }

    /// Create a public interface entry.
    pub fn interface(qualified_name: impl Into<String>) -> Self {
        Self::new(
            qualified_name.into(),
            Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT,
        )
    }

    fn new(qualified_name: String, modifiers: Modifiers) -> Self {
        let name = simple_name(&qualified_name).to_string();
        let type_hash = TypeHash::from_name(&qualified_name);
        Self {
            name,
            qualified_name,
            type_hash,
            modifiers,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            constructor: None,
        }
    }

    // === Builder Methods ===

    /// Replace the modifiers. The interface bit is preserved.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        let interface = self.modifiers & Modifiers::INTERFACE;
        self.modifiers = modifiers | interface;
        self
    }

    /// Set the superclass.
    pub fn with_superclass(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface.
    pub fn with_interface(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: MethodEntry) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the native state initializer inherited by subclasses.
    pub fn with_initializer(mut self, initializer: NativeInit) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// Set the constructor hook.
    pub fn with_constructor(mut self, constructor: ConstructorHook) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Mark as final.
    pub fn as_final(mut self) -> Self {
        self.modifiers |= Modifiers::FINAL;
        self
    }

    /// Mark as abstract.
    pub fn as_abstract(mut self) -> Self {
        self.modifiers |= Modifiers::ABSTRACT;
        self
    }

    /// Narrow visibility to package-private (no visibility bits).
    pub fn as_non_public(mut self) -> Self {
        self.modifiers
            .remove(Modifiers::PUBLIC | Modifiers::PROTECTED | Modifiers::PRIVATE);
        self
    }

    /// Finish building and share the entry.
    pub fn into_ref(self) -> TypeRef {
        TypeRef(Arc::new(self))
    }

    // === Query Methods ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn superclass(&self) -> Option<&TypeRef> {
        self.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers.is_interface()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract()
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.is_final()
    }

    pub fn is_public(&self) -> bool {
        self.modifiers.is_public()
    }

    pub fn is_synthetic(&self) -> bool {
        self.modifiers.is_synthetic()
    }

    /// The constructor hook, if this type replaces default instantiation.
    pub fn constructor(&self) -> Option<&ConstructorHook> {
        self.constructor.as_ref()
    }

    /// This type followed by its superclasses, most derived first.
    pub fn class_chain(&self) -> impl Iterator<Item = &TypeEntry> {
        std::iter::successors(Some(self), |ty| ty.superclass.as_deref())
    }

    /// Whether an instance of this type may be used where `qualified_name`
    /// is expected.
    pub fn is_subtype_of(&self, qualified_name: &str) -> bool {
        if qualified_name == well_known::OBJECT || self.qualified_name == qualified_name {
            return true;
        }
        self.superclass
            .as_ref()
            .is_some_and(|s| s.is_subtype_of(qualified_name))
            || self
                .interfaces
                .iter()
                .any(|i| i.is_subtype_of(qualified_name))
    }

    /// Find a method declared directly by this type.
    pub fn find_declared(&self, signature: &MethodSignature) -> Option<&MethodEntry> {
        self.methods
            .iter()
            .find(|m| m.signature.matches_exactly(signature))
    }

    /// Find the implementation a virtual call to `signature` reaches.
    ///
    /// The class chain is searched most derived first. When no class
    /// declares the method, interface default methods are searched, and an
    /// abstract interface declaration is returned only if no default exists.
    pub fn resolve_virtual(
        &self,
        signature: &MethodSignature,
    ) -> Option<(&TypeEntry, &MethodEntry)> {
        for ty in self.class_chain() {
            if let Some(method) = ty.find_declared(signature).filter(|m| !m.is_static()) {
                return Some((ty, method));
            }
        }

        let mut fallback = None;
        for ty in self.class_chain() {
            for interface in &ty.interfaces {
                match interface.resolve_interface_method(signature) {
                    Some(found) if !found.1.is_abstract() => return Some(found),
                    Some(found) => {
                        fallback.get_or_insert(found);
                    }
                    None => {}
                }
            }
        }
        fallback
    }

    fn resolve_interface_method(
        &self,
        signature: &MethodSignature,
    ) -> Option<(&TypeEntry, &MethodEntry)> {
        if let Some(method) = self.find_declared(signature).filter(|m| !m.is_static()) {
            return Some((self, method));
        }
        let mut fallback = None;
        for parent in &self.interfaces {
            match parent.resolve_interface_method(signature) {
                Some(found) if !found.1.is_abstract() => return Some(found),
                Some(found) => {
                    fallback.get_or_insert(found);
                }
                None => {}
            }
        }
        fallback
    }

    /// Find a static method declared by this type.
    pub fn find_static(&self, signature: &MethodSignature) -> Option<&MethodEntry> {
        self.find_declared(signature).filter(|m| m.is_static())
    }

    /// Create the native state for a new instance from the nearest
    /// initializer in the class chain.
    pub fn initial_state(&self) -> Option<Box<dyn Any + Send + Sync>> {
        self.class_chain()
            .find_map(|ty| ty.initializer.as_ref())
            .map(NativeInit::create)
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("qualified_name", &self.qualified_name)
            .field("modifiers", &self.modifiers)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|s| s.qualified_name()),
            )
            .field(
                "interfaces",
                &self
                    .interfaces
                    .iter()
                    .map(|i| i.qualified_name())
                    .collect::<Vec<_>>(),
            )
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit('/')
        .next()
        .unwrap_or(qualified_name)
}

/// Shared handle to a loaded type entry.
///
/// Equality is identity: two handles are equal when they name the same
/// loaded entry.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeEntry>);

impl TypeRef {
    /// A weak handle that does not keep the type loaded.
    pub fn downgrade(&self) -> WeakTypeRef {
        WeakTypeRef(Arc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &TypeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of strong handles to this type.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Create a new instance of this type.
    ///
    /// Abstract classes and interfaces refuse instantiation. Types with a
    /// constructor hook delegate to it; plain native types take no
    /// arguments and get their state from the nearest initializer.
    pub fn instantiate(&self, args: &[NativeValue]) -> Result<ObjectRef, RuntimeError> {
        if self.is_interface() || self.is_abstract() {
            return Err(RuntimeError::AbstractInstantiation {
                type_name: self.qualified_name.clone(),
            });
        }
        if let Some(hook) = &self.constructor {
            return hook.construct(self, args);
        }
        if !args.is_empty() {
            return Err(RuntimeError::ArgumentCount {
                method: format!("{}.<init>", self.qualified_name),
                expected: 0,
                actual: args.len(),
            });
        }
        Ok(ObjectRef::new(NativeInstance::new(
            self.clone(),
            self.initial_state(),
        )))
    }

    /// Invoke a static method by name and method descriptor.
    pub fn invoke_static(
        &self,
        name: &str,
        descriptor: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue, RuntimeError> {
        let signature = MethodSignature::parse(name, descriptor)?;
        let method = self
            .find_static(&signature)
            .ok_or_else(|| RuntimeError::NoSuchMethod {
                type_name: self.qualified_name.clone(),
                method: signature.to_string(),
            })?;
        invoke::check_arguments(&signature, args)?;
        invoke::execute(self, method, None, args)
    }
}

impl Deref for TypeRef {
    type Target = TypeEntry;

    fn deref(&self) -> &TypeEntry {
        &self.0
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.qualified_name)
    }
}

/// Weak handle to a type entry.
#[derive(Clone, Default)]
pub struct WeakTypeRef(Weak<TypeEntry>);

impl WeakTypeRef {
    /// An empty handle that never upgrades.
    pub fn new() -> Self {
        Self(Weak::new())
    }

    pub fn upgrade(&self) -> Option<TypeRef> {
        self.0.upgrade().map(TypeRef)
    }

    /// Whether the type is still loaded.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "WeakTypeRef({})", ty.qualified_name()),
            None => write!(f, "WeakTypeRef(<unloaded>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NativeFn;
    use crate::{MethodBody, NativeType};

    fn sig(name: &str, desc: &str) -> MethodSignature {
        MethodSignature::parse(name, desc).unwrap()
    }

    fn object() -> TypeRef {
        TypeEntry::class(well_known::OBJECT)
            .with_method(MethodEntry::native(
                sig("hashCode", "()I"),
                NativeFn::new(|_| Ok(NativeValue::Int(0))),
            ))
            .into_ref()
    }

    #[test]
    fn names_split_on_last_segment() {
        let ty = TypeEntry::class("game/world/Entity");
        assert_eq!(ty.name(), "Entity");
        assert_eq!(ty.qualified_name(), "game/world/Entity");
        assert_eq!(ty.type_hash(), TypeHash::from_name("game/world/Entity"));
    }

    #[test]
    fn subtype_relation_follows_ancestry() {
        let runnable = TypeEntry::interface("host/Runnable").into_ref();
        let task = TypeEntry::class("game/Task")
            .with_superclass(object())
            .with_interface(runnable.clone())
            .into_ref();
        assert!(task.is_subtype_of("host/Runnable"));
        assert!(task.is_subtype_of(well_known::OBJECT));
        assert!(!runnable.is_subtype_of("game/Task"));
    }

    #[test]
    fn virtual_resolution_prefers_most_derived() {
        let base = object();
        let derived = TypeEntry::class("game/Derived")
            .with_superclass(base.clone())
            .with_method(MethodEntry::native(
                sig("hashCode", "()I"),
                NativeFn::new(|_| Ok(NativeValue::Int(7))),
            ))
            .into_ref();

        let (owner, _) = derived.resolve_virtual(&sig("hashCode", "()I")).unwrap();
        assert_eq!(owner.qualified_name(), "game/Derived");

        let (owner, _) = base.resolve_virtual(&sig("hashCode", "()I")).unwrap();
        assert_eq!(owner.qualified_name(), well_known::OBJECT);
    }

    #[test]
    fn interface_default_beats_abstract_declaration() {
        let named = TypeEntry::interface("game/Named")
            .with_method(MethodEntry::abstract_method(sig(
                "name",
                "()Lhost/String;",
            )))
            .into_ref();
        let defaulted = TypeEntry::interface("game/DefaultNamed")
            .with_interface(named.clone())
            .with_method(MethodEntry::native(
                sig("name", "()Lhost/String;"),
                NativeFn::new(|_| Ok(NativeValue::from("anon"))),
            ))
            .into_ref();
        let ty = TypeEntry::class("game/Thing")
            .with_interface(named)
            .with_interface(defaulted)
            .into_ref();

        let (owner, method) = ty.resolve_virtual(&sig("name", "()Lhost/String;")).unwrap();
        assert_eq!(owner.qualified_name(), "game/DefaultNamed");
        assert!(matches!(method.body, MethodBody::Native(_)));
    }

    #[test]
    fn abstract_types_refuse_instantiation() {
        let ty = TypeEntry::class("game/Shape").as_abstract().into_ref();
        assert!(matches!(
            ty.instantiate(&[]),
            Err(RuntimeError::AbstractInstantiation { .. })
        ));
        let iface = TypeEntry::interface("game/Drawable").into_ref();
        assert!(iface.instantiate(&[]).is_err());
    }

    #[test]
    fn instantiate_uses_nearest_initializer() {
        let base = TypeEntry::class("game/Counter")
            .with_initializer(NativeInit::new(|| 41i64))
            .into_ref();
        let derived = TypeEntry::class("game/LoudCounter")
            .with_superclass(base)
            .into_ref();
        let obj = derived.instantiate(&[]).unwrap();
        assert_eq!(obj.state::<i64>(), Some(&41));
        assert!(derived.instantiate(&[NativeValue::Int(1)]).is_err());
    }

    #[test]
    fn static_invocation() {
        let ty = TypeEntry::class("game/Math")
            .with_method(MethodEntry::static_native(
                sig("twice", "(I)I"),
                NativeFn::new(|ctx| {
                    let v = ctx.arg_i32(0)?;
                    Ok(NativeValue::Int(v * 2))
                }),
            ))
            .into_ref();
        let result = ty.invoke_static("twice", "(I)I", &[NativeValue::Int(21)]);
        assert_eq!(result.unwrap(), NativeValue::Int(42));
        assert!(matches!(
            ty.invoke_static("thrice", "(I)I", &[NativeValue::Int(1)]),
            Err(RuntimeError::NoSuchMethod { .. })
        ));
    }

    #[test]
    fn weak_handles_expire() {
        let ty = TypeEntry::class("game/Temp").into_ref();
        let weak = ty.downgrade();
        assert!(weak.is_alive());
        drop(ty);
        assert!(weak.upgrade().is_none());
        assert!(!WeakTypeRef::new().is_alive());
    }

    #[test]
    fn fields_are_recorded() {
        let ty = TypeEntry::class("game/Point")
            .with_field(FieldEntry::new("x", NativeType::INT, Modifiers::PRIVATE))
            .into_ref();
        assert_eq!(ty.fields()[0].name, "x");
    }
}
