//! HostRegistry - the table of loaded host types.
//!
//! This module provides [`HostRegistry`], the process-visible storage for
//! every host type by qualified name.
//!
//! # Storage Model
//!
//! - **Host types** are registered strongly and stay loaded for the life of
//!   the registry.
//! - **Generated types** are registered weakly. The registry only answers
//!   "is this name taken?" for them; once nothing else references a
//!   generated type, its entry is dead and the name is free again.
//!
//! # Thread Safety
//!
//! The table sits behind a `parking_lot::RwLock`, so a registry can be shared
//! between the thread generating types and threads instantiating them.
//!
//! # Example
//!
//! ```
//! use hostbridge_registry::HostRegistry;
//! use hostbridge_core::TypeEntry;
//!
//! let registry = HostRegistry::new();
//! let runnable = TypeEntry::interface("host/Runnable").into_ref();
//! registry.register(runnable).unwrap();
//!
//! assert!(registry.contains("host/Runnable"));
//! assert!(registry.lookup("host/Object").is_some());
//! ```

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use hostbridge_core::{
    MethodEntry, MethodSignature, NativeFn, NativeType, NativeValue, RegistrationError, TypeEntry,
    TypeHash, TypeRef, WeakTypeRef, well_known,
};

enum Registered {
    Host(TypeRef),
    Generated(WeakTypeRef),
}

impl Registered {
    fn get(&self) -> Option<TypeRef> {
        match self {
            Registered::Host(ty) => Some(ty.clone()),
            Registered::Generated(weak) => weak.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Registered::Host(_) => true,
            Registered::Generated(weak) => weak.is_alive(),
        }
    }
}

#[derive(Default)]
struct Tables {
    /// Types by qualified name (primary storage).
    types: FxHashMap<String, Registered>,
    /// Reverse index: hash -> qualified name.
    by_hash: FxHashMap<TypeHash, String>,
}

impl Tables {
    /// Remove entries of unloaded generated types.
    fn purge_dead(&mut self) -> usize {
        let before = self.types.len();
        let by_hash = &mut self.by_hash;
        self.types.retain(|name, entry| {
            let alive = entry.is_alive();
            if !alive {
                by_hash.remove(&TypeHash::from_name(name));
            }
            alive
        });
        before - self.types.len()
    }
}

/// Table of loaded host types keyed by qualified name.
pub struct HostRegistry {
    tables: RwLock<Tables>,
    object: TypeRef,
    string: TypeRef,
}

impl HostRegistry {
    /// Create a registry holding the built-in root types.
    pub fn new() -> Self {
        let object = object_type();
        let string = TypeEntry::class(well_known::STRING)
            .with_superclass(object.clone())
            .as_final()
            .into_ref();

        let mut tables = Tables::default();
        for ty in [&object, &string] {
            tables
                .by_hash
                .insert(ty.type_hash(), ty.qualified_name().to_string());
            tables
                .types
                .insert(ty.qualified_name().to_string(), Registered::Host(ty.clone()));
        }

        Self {
            tables: RwLock::new(tables),
            object,
            string,
        }
    }

    /// The root class `host/Object`.
    pub fn object_type(&self) -> TypeRef {
        self.object.clone()
    }

    /// The final class `host/String`.
    pub fn string_type(&self) -> TypeRef {
        self.string.clone()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a host type. It stays loaded for the life of the registry.
    pub fn register(&self, ty: TypeRef) -> Result<(), RegistrationError> {
        validate(&ty)?;
        let mut tables = self.tables.write();
        check_free(&tables, ty.qualified_name())?;
        tables
            .by_hash
            .insert(ty.type_hash(), ty.qualified_name().to_string());
        tables
            .types
            .insert(ty.qualified_name().to_string(), Registered::Host(ty));
        Ok(())
    }

    /// Register a generated type without keeping it loaded.
    ///
    /// Fails if a live type of the same name exists. Entries of generated
    /// types that have since unloaded are dropped first, so the table only
    /// grows with the number of live types.
    pub fn register_generated(&self, ty: &TypeRef) -> Result<(), RegistrationError> {
        validate(ty)?;
        let mut tables = self.tables.write();
        let purged = tables.purge_dead();
        if purged > 0 {
            tracing::trace!(count = purged, "dropped unloaded entries");
        }
        check_free(&tables, ty.qualified_name())?;
        tables
            .by_hash
            .insert(ty.type_hash(), ty.qualified_name().to_string());
        tables.types.insert(
            ty.qualified_name().to_string(),
            Registered::Generated(ty.downgrade()),
        );
        tracing::debug!(name = ty.qualified_name(), "registered generated type");
        Ok(())
    }

    /// Remove a type by name. Returns whether a live type was removed.
    pub fn unregister(&self, qualified_name: &str) -> bool {
        let mut tables = self.tables.write();
        match tables.types.remove(qualified_name) {
            Some(entry) => {
                tables
                    .by_hash
                    .remove(&TypeHash::from_name(qualified_name));
                entry.is_alive()
            }
            None => false,
        }
    }

    /// Drop entries of generated types that are no longer loaded.
    ///
    /// Returns the number of entries removed.
    pub fn purge_unloaded(&self) -> usize {
        let purged = self.tables.write().purge_dead();
        if purged > 0 {
            tracing::debug!(count = purged, "purged unloaded types");
        }
        purged
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Get a loaded type by qualified name.
    pub fn lookup(&self, qualified_name: &str) -> Option<TypeRef> {
        self.tables.read().types.get(qualified_name)?.get()
    }

    /// Get a loaded type by qualified name or fail.
    pub fn resolve(&self, qualified_name: &str) -> Result<TypeRef, RegistrationError> {
        self.lookup(qualified_name)
            .ok_or_else(|| RegistrationError::TypeNotFound(qualified_name.to_string()))
    }

    /// Get a loaded type by its hash.
    pub fn lookup_hash(&self, hash: TypeHash) -> Option<TypeRef> {
        let tables = self.tables.read();
        let name = tables.by_hash.get(&hash)?;
        tables.types.get(name)?.get()
    }

    /// Whether a live type with this name is loaded.
    pub fn contains(&self, qualified_name: &str) -> bool {
        self.tables
            .read()
            .types
            .get(qualified_name)
            .is_some_and(Registered::is_alive)
    }

    /// Resolve a type descriptor's reference name, if it is one.
    pub fn resolve_type(&self, ty: &NativeType) -> Option<TypeRef> {
        ty.reference_name().and_then(|name| self.lookup(name))
    }

    /// Whether values of type `from` may be used where `to` is expected.
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to || to == well_known::OBJECT {
            return true;
        }
        self.lookup(from).is_some_and(|ty| ty.is_subtype_of(to))
    }

    /// Number of live types.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .types
            .values()
            .filter(|entry| entry.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all live types, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .types
            .iter()
            .filter(|(_, entry)| entry.is_alive())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRegistry")
            .field("types", &self.names())
            .finish()
    }
}

fn check_free(tables: &Tables, qualified_name: &str) -> Result<(), RegistrationError> {
    match tables.types.get(qualified_name) {
        Some(entry) if entry.is_alive() => Err(RegistrationError::DuplicateType(
            qualified_name.to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate(ty: &TypeRef) -> Result<(), RegistrationError> {
    if ty.qualified_name().is_empty() {
        return Err(RegistrationError::InvalidType {
            name: String::new(),
            reason: "empty name".to_string(),
        });
    }
    if let Some(superclass) = ty.superclass() {
        if ty.is_interface() {
            return Err(RegistrationError::InvalidType {
                name: ty.qualified_name().to_string(),
                reason: "interfaces cannot have a superclass".to_string(),
            });
        }
        if superclass.is_interface() {
            return Err(RegistrationError::InvalidType {
                name: ty.qualified_name().to_string(),
                reason: format!("superclass {} is an interface", superclass.qualified_name()),
            });
        }
    }
    if let Some(bad) = ty.interfaces().iter().find(|i| !i.is_interface()) {
        return Err(RegistrationError::InvalidType {
            name: ty.qualified_name().to_string(),
            reason: format!("{} is not an interface", bad.qualified_name()),
        });
    }
    Ok(())
}

/// `host/Object` with identity-based `hashCode`, `equals` and `toString`.
fn object_type() -> TypeRef {
    let object = || NativeType::object();

    TypeEntry::class(well_known::OBJECT)
        .with_method(MethodEntry::native(
            MethodSignature::new("hashCode", Vec::new(), NativeType::INT),
            NativeFn::new(|ctx| Ok(NativeValue::Int(ctx.this()?.identity_hash()))),
        ))
        .with_method(MethodEntry::native(
            MethodSignature::new("equals", vec![object()], NativeType::BOOL),
            NativeFn::new(|ctx| {
                let this = ctx.this()?;
                let same = ctx.arg(0)?.as_object().is_some_and(|other| other == this);
                Ok(NativeValue::Bool(same))
            }),
        ))
        .with_method(MethodEntry::native(
            MethodSignature::new("toString", Vec::new(), NativeType::string()),
            NativeFn::new(|ctx| {
                let this = ctx.this()?;
                Ok(NativeValue::string(format!(
                    "{}@{:x}",
                    this.class().qualified_name(),
                    this.identity_hash()
                )))
            }),
        ))
        .into_ref()
}
