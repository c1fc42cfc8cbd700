//! Override resolution.
//!
//! Walks the ancestor closure of the requested base type and interfaces,
//! collects every method a generated type may legally override, and binds
//! each one to a script callable from the instance facet.
//!
//! ## Algorithm
//!
//! 1. Visit types in a fixed order: the base type, its superclass chain
//!    (most derived first), the requested interfaces in request order, then
//!    the interfaces inherited by the base chain. Each interface is followed
//!    by its super-interfaces; every type is visited once.
//! 2. Within a type, visit methods in declaration order. The first method
//!    seen with a given signature hash owns that signature; later ones are
//!    the same member seen again and are skipped.
//! 3. Final, private and static methods own their signature but are never
//!    candidates, so a final implementation hides an abstract declaration
//!    further up.
//! 4. Bind each candidate: a typed callable with exactly the candidate's
//!    signature wins; otherwise an untyped callable with the candidate's
//!    name binds it.
//! 5. If any unbound candidate is abstract, the generated type is abstract.

use rustc_hash::FxHashSet;

use hostbridge_core::{MemberId, MethodSignature, Modifiers, TypeHash, TypeRef};

use crate::collector::FacetMembers;

/// A method eligible for a script override.
#[derive(Debug, Clone)]
pub struct OverridableMember {
    /// The type that declares the method.
    pub declaring_type: TypeRef,
    pub signature: MethodSignature,
    pub modifiers: Modifiers,
}

impl OverridableMember {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Whether the declaring type leaves the method unimplemented.
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }
}

/// A candidate bound to a script callable.
#[derive(Debug, Clone)]
pub struct BoundOverride {
    pub member: OverridableMember,
    /// Id of the bound callable in the instance facet.
    pub member_id: MemberId,
    /// Raw key of the bound callable.
    pub key: String,
}

/// Result of resolving one generation request.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Every candidate, in traversal order.
    pub candidates: Vec<OverridableMember>,
    /// Candidates that found a callable.
    pub bound: Vec<BoundOverride>,
    /// Abstract candidates nothing binds.
    pub unbound_abstract: Vec<OverridableMember>,
    /// Typed callables whose signature matched no candidate.
    pub unmatched: Vec<String>,
}

impl Resolution {
    /// Whether the generated type must be abstract.
    pub fn is_abstract(&self) -> bool {
        !self.unbound_abstract.is_empty()
    }

    /// The override bound to `signature`, if any.
    pub fn binding(&self, signature: &MethodSignature) -> Option<&BoundOverride> {
        self.bound
            .iter()
            .find(|b| b.member.signature.matches_exactly(signature))
    }
}

/// Resolves overrides for a generation request.
pub struct OverrideResolver;

impl OverrideResolver {
    /// Collect candidates and bind them to `instance` callables.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(base: &TypeRef, interfaces: &[TypeRef], instance: &FacetMembers) -> Resolution {
        let candidates = Self::candidates(base, interfaces);
        let mut resolution = Resolution {
            candidates,
            ..Resolution::default()
        };

        let mut used: FxHashSet<MemberId> = FxHashSet::default();
        for candidate in &resolution.candidates {
            match Self::bind(candidate, instance) {
                Some((member_id, key)) => {
                    used.insert(member_id);
                    resolution.bound.push(BoundOverride {
                        member: candidate.clone(),
                        member_id,
                        key,
                    });
                }
                None if candidate.is_abstract() => {
                    resolution.unbound_abstract.push(candidate.clone());
                }
                None => {}
            }
        }

        for method in instance.methods() {
            if method.is_typed() && !used.contains(&method.id) {
                tracing::debug!(key = %method.key, "typed member overrides nothing");
                resolution.unmatched.push(method.key.clone());
            }
        }

        tracing::debug!(
            candidates = resolution.candidates.len(),
            bound = resolution.bound.len(),
            unbound_abstract = resolution.unbound_abstract.len(),
            "resolved overrides"
        );
        resolution
    }

    /// Every overridable member of `base` and `interfaces`, deduplicated by
    /// signature.
    pub fn candidates(base: &TypeRef, interfaces: &[TypeRef]) -> Vec<OverridableMember> {
        let mut order: Vec<TypeRef> = Vec::new();
        let mut visited: FxHashSet<TypeHash> = FxHashSet::default();

        let mut chain = Some(base.clone());
        while let Some(ty) = chain {
            if visited.insert(ty.type_hash()) {
                order.push(ty.clone());
            }
            chain = ty.superclass().cloned();
        }
        for interface in interfaces {
            push_interface(interface, &mut order, &mut visited);
        }
        let mut chain = Some(base.clone());
        while let Some(ty) = chain {
            for interface in ty.interfaces() {
                push_interface(interface, &mut order, &mut visited);
            }
            chain = ty.superclass().cloned();
        }

        let mut seen: FxHashSet<TypeHash> = FxHashSet::default();
        let mut candidates = Vec::new();
        for ty in &order {
            for method in ty.methods() {
                if !seen.insert(method.signature.signature_hash()) {
                    continue;
                }
                if !method.modifiers.is_overridable() {
                    continue;
                }
                let mut modifiers = method.modifiers;
                if method.is_abstract() {
                    modifiers |= Modifiers::ABSTRACT;
                }
                candidates.push(OverridableMember {
                    declaring_type: ty.clone(),
                    signature: method.signature.clone(),
                    modifiers,
                });
            }
        }
        candidates
    }

    fn bind(candidate: &OverridableMember, instance: &FacetMembers) -> Option<(MemberId, String)> {
        let overloads = instance.overloads(candidate.name());
        let methods = overloads.iter().filter_map(|id| instance.method(*id));

        let mut untyped = None;
        for method in methods {
            match &method.member.signature {
                Some(sig) if sig.matches_exactly(&candidate.signature) => {
                    return Some((method.id, method.key.clone()));
                }
                None if untyped.is_none() => untyped = Some((method.id, method.key.clone())),
                _ => {}
            }
        }
        untyped
    }
}

fn push_interface(interface: &TypeRef, order: &mut Vec<TypeRef>, visited: &mut FxHashSet<TypeHash>) {
    if !visited.insert(interface.type_hash()) {
        return;
    }
    order.push(interface.clone());
    for parent in interface.interfaces() {
        push_interface(parent, order, visited);
    }
}
