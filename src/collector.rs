//! Member collection.
//!
//! Scans the own entries of an implementation object, splits them into data
//! properties and callables, and hands every callable a dense [`MemberId`]
//! from its facet's id space.
//!
//! # Validation
//!
//! Collection fails fast. Nothing is silently shadowed:
//!
//! - the same raw key twice is a duplicate
//! - a name used as both a property and a callable is a duplicate
//! - two callables with the same name and the same resolved parameter list
//!   (two untyped ones included) are ambiguous; return types do not
//!   disambiguate, so `foo(I)I` next to `foo(I)J` is rejected
//! - `constructor` is reserved: in the instance facet it must be a callable
//!   and receives [`MemberId::CONSTRUCTOR`]; in the static facet it is
//!   rejected

use rustc_hash::{FxHashMap, FxHashSet};

use hostbridge_core::{
    Facet, GenerationError, ImplementationObject, MemberId, MemberIdAllocator, ScriptFn,
    ScriptValue,
};

use crate::signature::{MemberKey, parse_member_key};

/// Reserved member name for the script constructor.
pub const CONSTRUCTOR_NAME: &str = "constructor";

/// A callable picked up from an implementation object.
#[derive(Debug, Clone)]
pub struct CollectedMethod {
    /// The key exactly as written, e.g. `foo(I)I`.
    pub key: String,
    /// Parsed name and optional signature.
    pub member: MemberKey,
    pub id: MemberId,
    pub function: ScriptFn,
}

impl CollectedMethod {
    pub fn name(&self) -> &str {
        &self.member.name
    }

    pub fn is_typed(&self) -> bool {
        self.member.is_typed()
    }
}

/// Everything collected from one facet.
#[derive(Debug, Clone)]
pub struct FacetMembers {
    facet: Facet,
    properties: Vec<(String, ScriptValue)>,
    methods: Vec<CollectedMethod>,
    constructor: Option<CollectedMethod>,
    /// Raw key -> id.
    by_key: FxHashMap<String, MemberId>,
    /// Name -> overload ids in registration order.
    by_name: FxHashMap<String, Vec<MemberId>>,
}

impl FacetMembers {
    /// An empty facet, used when no implementation object is given.
    pub fn empty(facet: Facet) -> Self {
        Self {
            facet,
            properties: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            by_key: FxHashMap::default(),
            by_name: FxHashMap::default(),
        }
    }

    pub fn facet(&self) -> Facet {
        self.facet
    }

    /// Data properties in insertion order.
    pub fn properties(&self) -> &[(String, ScriptValue)] {
        &self.properties
    }

    /// Callables in id order, excluding the constructor.
    pub fn methods(&self) -> &[CollectedMethod] {
        &self.methods
    }

    /// The script constructor, if the instance facet supplied one.
    pub fn constructor(&self) -> Option<&CollectedMethod> {
        self.constructor.as_ref()
    }

    /// Look up a callable by id.
    pub fn method(&self, id: MemberId) -> Option<&CollectedMethod> {
        if id.is_constructor() {
            return self.constructor.as_ref();
        }
        // Ids are dense in each facet, so the position is the distance from
        // the facet's first id.
        let index = match self.facet {
            Facet::Instance => id.value() - MemberId::FIRST_INSTANCE.value(),
            Facet::Static => MemberId::FIRST_STATIC.value() - id.value(),
        };
        let method = self.methods.get(usize::try_from(index).ok()?)?;
        (method.id == id).then_some(method)
    }

    /// The id assigned to a raw key.
    pub fn id_of_key(&self, key: &str) -> Option<MemberId> {
        self.by_key.get(key).copied()
    }

    /// Ids of every callable named `name`, in registration order.
    pub fn overloads(&self, name: &str) -> &[MemberId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The lowest and highest ids handed out, if any.
    pub fn id_range(&self) -> Option<(MemberId, MemberId)> {
        let first = self.methods.first()?.id;
        let last = self.methods.last()?.id;
        Some((first.min(last), first.max(last)))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.properties.is_empty() && self.constructor.is_none()
    }
}

/// Output of [`MemberCollector::collect`].
#[derive(Debug, Clone)]
pub struct CollectedMembers {
    pub instance: FacetMembers,
    pub statics: FacetMembers,
}

/// Scans implementation objects.
pub struct MemberCollector;

impl MemberCollector {
    /// Collect both facets. An absent facet collects as empty.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn collect(
        instance: Option<&ImplementationObject>,
        statics: Option<&ImplementationObject>,
    ) -> Result<CollectedMembers, GenerationError> {
        Ok(CollectedMembers {
            instance: Self::collect_facet(Facet::Instance, instance)?,
            statics: Self::collect_facet(Facet::Static, statics)?,
        })
    }

    /// Collect one facet.
    pub fn collect_facet(
        facet: Facet,
        object: Option<&ImplementationObject>,
    ) -> Result<FacetMembers, GenerationError> {
        let mut members = FacetMembers::empty(facet);
        let Some(object) = object else {
            return Ok(members);
        };

        let mut ids = facet.allocator();
        let mut property_names: FxHashSet<String> = FxHashSet::default();

        for (key, value) in object.entries() {
            if members.by_key.contains_key(&key) || property_names.contains(&key) {
                return Err(GenerationError::DuplicateMember { facet, name: key });
            }

            match value {
                ScriptValue::Function(function) => {
                    let member = parse_member_key(&key)?;
                    if member.name == CONSTRUCTOR_NAME {
                        Self::add_constructor(&mut members, key, member, function)?;
                        continue;
                    }
                    if property_names.contains(&member.name) {
                        return Err(GenerationError::DuplicateMember {
                            facet,
                            name: member.name,
                        });
                    }
                    check_ambiguity(&members, &member)?;
                    Self::add_method(&mut members, &mut ids, key, member, function);
                }
                value => {
                    if key == CONSTRUCTOR_NAME || key.starts_with("constructor(") {
                        return Err(GenerationError::ReservedMember {
                            facet,
                            name: key,
                        });
                    }
                    if members.by_name.contains_key(&key) {
                        return Err(GenerationError::DuplicateMember { facet, name: key });
                    }
                    property_names.insert(key.clone());
                    members.properties.push((key, value));
                }
            }
        }

        tracing::debug!(
            %facet,
            methods = members.methods.len(),
            properties = members.properties.len(),
            "collected facet members"
        );
        Ok(members)
    }

    fn add_constructor(
        members: &mut FacetMembers,
        key: String,
        member: MemberKey,
        function: ScriptFn,
    ) -> Result<(), GenerationError> {
        if members.facet == Facet::Static {
            return Err(GenerationError::ReservedMember {
                facet: Facet::Static,
                name: key,
            });
        }
        if members.constructor.is_some() {
            return Err(GenerationError::DuplicateMember {
                facet: members.facet,
                name: CONSTRUCTOR_NAME.to_string(),
            });
        }
        members.by_key.insert(key.clone(), MemberId::CONSTRUCTOR);
        members.constructor = Some(CollectedMethod {
            key,
            member,
            id: MemberId::CONSTRUCTOR,
            function,
        });
        Ok(())
    }

    fn add_method(
        members: &mut FacetMembers,
        ids: &mut MemberIdAllocator,
        key: String,
        member: MemberKey,
        function: ScriptFn,
    ) {
        let id = ids.allocate();
        members.by_key.insert(key.clone(), id);
        members
            .by_name
            .entry(member.name.clone())
            .or_default()
            .push(id);
        members.methods.push(CollectedMethod {
            key,
            member,
            id,
            function,
        });
    }
}

/// Reject a callable whose name and parameter list are already taken.
fn check_ambiguity(members: &FacetMembers, member: &MemberKey) -> Result<(), GenerationError> {
    for id in members.overloads(&member.name) {
        let Some(existing) = members.method(*id) else {
            continue;
        };
        let clash = match (&existing.member.signature, &member.signature) {
            (None, None) => true,
            (Some(a), Some(b)) => a.signature_hash() == b.signature_hash(),
            _ => false,
        };
        if clash {
            return Err(GenerationError::AmbiguousBinding {
                facet: members.facet,
                name: member.name.clone(),
                signature: member.to_string(),
            });
        }
    }
    Ok(())
}
