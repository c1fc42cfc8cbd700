//! Wrapper type synthesis.
//!
//! The wrapper is the script-facing half of a generated pair. Its
//! descriptor owns everything the engine needs to dispatch without
//! reflection:
//!
//! - a [`DispatchTable`] mapping every id in `[min_static_id, max_instance_id]`
//!   to a handler slot
//! - two [`NameSwitch`]es resolving member names to ids once, up front
//! - the bound callables of both facets
//! - the prototype (instance data) and the read-only static properties

use std::fmt;

use hostbridge_core::{
    Facet, MemberId, MethodSignature, ScriptFn, ScriptValue, TypeHash, accepts,
};

use crate::collector::{CONSTRUCTOR_NAME, CollectedMembers, CollectedMethod};

/// A script callable bound to a dispatch id.
#[derive(Debug, Clone)]
pub struct BoundCallable {
    /// Raw member key, e.g. `foo(I)I`.
    pub key: String,
    pub name: String,
    pub signature: Option<MethodSignature>,
    pub id: MemberId,
    pub function: ScriptFn,
}

impl BoundCallable {
    fn from_collected(method: &CollectedMethod) -> Self {
        Self {
            key: method.key.clone(),
            name: method.member.name.clone(),
            signature: method.member.signature.clone(),
            id: method.id,
            function: method.function.clone(),
        }
    }

    /// Declared parameter count, if typed.
    pub fn arity(&self) -> Option<usize> {
        self.signature.as_ref().map(MethodSignature::arity)
    }

    /// Whether script arguments fit this callable's parameters.
    ///
    /// Untyped callables accept anything.
    pub fn accepts(&self, args: &[ScriptValue]) -> bool {
        match &self.signature {
            None => true,
            Some(sig) => {
                sig.params.len() == args.len()
                    && sig.params.iter().zip(args).all(|(ty, arg)| accepts(arg, ty))
            }
        }
    }
}

// ============================================================================
// Dispatch table
// ============================================================================

/// Handler for one dispatch id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSlot {
    /// Id 0 and ids outside the table: "no such member".
    Default,
    /// Id 1.
    Constructor,
    /// Index into the instance callables.
    Instance(usize),
    /// Index into the static callables.
    Static(usize),
}

/// Dense jump table over a contiguous id range.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    min_id: i32,
    slots: Box<[DispatchSlot]>,
}

impl DispatchTable {
    /// Table for `statics` static and `instances` instance members.
    ///
    /// Always covers the default and constructor ids.
    pub fn new(statics: usize, instances: usize) -> Self {
        let mut slots = Vec::with_capacity(statics + instances + 2);
        for index in (0..statics).rev() {
            slots.push(DispatchSlot::Static(index));
        }
        slots.push(DispatchSlot::Default);
        slots.push(DispatchSlot::Constructor);
        for index in 0..instances {
            slots.push(DispatchSlot::Instance(index));
        }
        Self {
            min_id: -(statics as i32),
            slots: slots.into_boxed_slice(),
        }
    }

    /// The handler for `id`. Ids outside the table map to the default slot.
    #[inline]
    pub fn lookup(&self, id: MemberId) -> DispatchSlot {
        let offset = i64::from(id.value()) - i64::from(self.min_id);
        usize::try_from(offset)
            .ok()
            .and_then(|i| self.slots.get(i).copied())
            .unwrap_or(DispatchSlot::Default)
    }

    pub fn min_id(&self) -> MemberId {
        MemberId(self.min_id)
    }

    pub fn max_id(&self) -> MemberId {
        MemberId(self.min_id + self.slots.len() as i32 - 1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every (id, slot) pair in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberId, DispatchSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (MemberId(self.min_id + i as i32), *slot))
    }
}

// ============================================================================
// Name switch
// ============================================================================

#[derive(Debug, Clone)]
struct NameCase {
    hash: TypeHash,
    name: Box<str>,
    id: MemberId,
}

/// Name to id lookup.
///
/// Cases are sorted by name hash, then by the name itself; a lookup
/// binary-searches the hash and compares strings within the run of equal
/// hashes. Insertion order never decides a match.
#[derive(Debug, Clone, Default)]
pub struct NameSwitch {
    cases: Box<[NameCase]>,
}

impl NameSwitch {
    /// Build from (name, id) pairs. The first id given for a name wins.
    pub fn build<'a>(cases: impl IntoIterator<Item = (&'a str, MemberId)>) -> Self {
        let mut out: Vec<NameCase> = Vec::new();
        for (name, id) in cases {
            if out.iter().any(|c| &*c.name == name) {
                continue;
            }
            out.push(NameCase {
                hash: TypeHash::from_ident(name),
                name: name.into(),
                id,
            });
        }
        out.sort_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.name.cmp(&b.name)));
        Self {
            cases: out.into_boxed_slice(),
        }
    }

    /// The id for `name`, or [`MemberId::DEFAULT`].
    pub fn find(&self, name: &str) -> MemberId {
        let hash = TypeHash::from_ident(name);
        let start = self.cases.partition_point(|c| c.hash < hash);
        self.cases[start..]
            .iter()
            .take_while(|c| c.hash == hash)
            .find(|c| &*c.name == name)
            .map_or(MemberId::DEFAULT, |c| c.id)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Known names in switch order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| &*c.name)
    }
}

// ============================================================================
// Wrapper descriptor
// ============================================================================

/// A generated wrapper type, ready to be loaded.
#[derive(Debug, Clone)]
pub struct WrapperDescriptor {
    pub name: String,
    /// Instance callables; index is `id - 2`.
    pub instance: Vec<BoundCallable>,
    /// Static callables; index is `-1 - id`.
    pub statics: Vec<BoundCallable>,
    pub constructor: Option<BoundCallable>,
    pub dispatch: DispatchTable,
    pub instance_names: NameSwitch,
    pub static_names: NameSwitch,
    /// Instance data copied into every new wrapper.
    pub prototype: Vec<(String, ScriptValue)>,
    /// Read-only static data.
    pub static_properties: Vec<(String, ScriptValue)>,
}

impl WrapperDescriptor {
    /// The callable behind an instance or static id.
    pub fn callable(&self, id: MemberId) -> Option<&BoundCallable> {
        match self.dispatch.lookup(id) {
            DispatchSlot::Instance(i) => self.instance.get(i),
            DispatchSlot::Static(i) => self.statics.get(i),
            DispatchSlot::Constructor => self.constructor.as_ref(),
            DispatchSlot::Default => None,
        }
    }

    fn facet_callables(&self, facet: Facet) -> &[BoundCallable] {
        match facet {
            Facet::Instance => &self.instance,
            Facet::Static => &self.statics,
        }
    }

    /// Resolve a member name or raw key within one facet.
    pub fn find_member_id(&self, facet: Facet, name: &str) -> MemberId {
        match facet {
            Facet::Instance => self.instance_names.find(name),
            Facet::Static => self.static_names.find(name),
        }
    }

    /// Every callable named `name` in `facet`, in registration order.
    pub fn overloads<'a>(
        &'a self,
        facet: Facet,
        name: &'a str,
    ) -> impl Iterator<Item = &'a BoundCallable> + 'a {
        self.facet_callables(facet)
            .iter()
            .filter(move |c| c.name == name)
    }

    /// The first overload of `name` that accepts `args`.
    pub fn select_overload<'a>(
        &'a self,
        facet: Facet,
        name: &'a str,
        args: &[ScriptValue],
    ) -> Option<&'a BoundCallable> {
        self.overloads(facet, name).find(|c| c.accepts(args))
    }

    /// The raw key behind an id.
    pub fn member_name(&self, id: MemberId) -> Option<&str> {
        if id.is_constructor() {
            return Some(
                self.constructor
                    .as_ref()
                    .map_or(CONSTRUCTOR_NAME, |c| c.key.as_str()),
            );
        }
        self.callable(id).map(|c| c.key.as_str())
    }

    /// A static property by name.
    pub fn static_property(&self, name: &str) -> Option<&ScriptValue> {
        self.static_properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for WrapperDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "wrapper {} {{", self.name)?;
        writeln!(
            f,
            "    dispatch [{}, {}]:",
            self.dispatch.min_id().value(),
            self.dispatch.max_id().value()
        )?;
        for (id, slot) in self.dispatch.iter() {
            let target = match slot {
                DispatchSlot::Default => "default".to_string(),
                DispatchSlot::Constructor => match &self.constructor {
                    Some(c) => format!("constructor {}", c.key),
                    None => "constructor (default)".to_string(),
                },
                DispatchSlot::Instance(i) => format!("instance {}", self.instance[i].key),
                DispatchSlot::Static(i) => format!("static {}", self.statics[i].key),
            };
            writeln!(f, "        {} -> {}", id.value(), target)?;
        }
        if !self.static_properties.is_empty() {
            let names: Vec<_> = self.static_properties.iter().map(|(k, _)| k.as_str()).collect();
            writeln!(f, "    static properties (read-only): {}", names.join(", "))?;
        }
        if !self.prototype.is_empty() {
            let names: Vec<_> = self.prototype.iter().map(|(k, _)| k.as_str()).collect();
            writeln!(f, "    prototype: {}", names.join(", "))?;
        }
        writeln!(f, "}}")
    }
}

/// Describe the wrapper type for collected members.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn synthesize_wrapper(name: &str, members: &CollectedMembers) -> WrapperDescriptor {
    let instance: Vec<_> = members
        .instance
        .methods()
        .iter()
        .map(BoundCallable::from_collected)
        .collect();
    let statics: Vec<_> = members
        .statics
        .methods()
        .iter()
        .map(BoundCallable::from_collected)
        .collect();
    let constructor = members
        .instance
        .constructor()
        .map(BoundCallable::from_collected);

    // Raw keys first so a bare name never shadows a key of the same text.
    let instance_names = NameSwitch::build(
        instance
            .iter()
            .map(|c| (c.key.as_str(), c.id))
            .chain(instance.iter().map(|c| (c.name.as_str(), c.id)))
            .chain(constructor.iter().map(|c| (c.key.as_str(), c.id)))
            .chain(std::iter::once((CONSTRUCTOR_NAME, MemberId::CONSTRUCTOR))),
    );
    let static_names = NameSwitch::build(
        statics
            .iter()
            .map(|c| (c.key.as_str(), c.id))
            .chain(statics.iter().map(|c| (c.name.as_str(), c.id)))
            .chain(std::iter::once((CONSTRUCTOR_NAME, MemberId::CONSTRUCTOR))),
    );

    WrapperDescriptor {
        name: name.to_string(),
        dispatch: DispatchTable::new(statics.len(), instance.len()),
        instance,
        statics,
        constructor,
        instance_names,
        static_names,
        prototype: members.instance.properties().to_vec(),
        static_properties: members.statics.properties().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MemberCollector;
    use hostbridge_core::ImplementationObject;

    fn noop() -> ScriptFn {
        ScriptFn::new(|_, _, _| Ok(ScriptValue::Undefined))
    }

    fn wrapper(instance: ImplementationObject, statics: ImplementationObject) -> WrapperDescriptor {
        let members = MemberCollector::collect(Some(&instance), Some(&statics)).unwrap();
        synthesize_wrapper("gen/T$Wrapper", &members)
    }

    #[test]
    fn table_covers_contiguous_range() {
        let table = DispatchTable::new(2, 3);
        assert_eq!(table.min_id(), MemberId(-2));
        assert_eq!(table.max_id(), MemberId(4));
        assert_eq!(table.len(), 7);
        assert_eq!(table.lookup(MemberId(-2)), DispatchSlot::Static(1));
        assert_eq!(table.lookup(MemberId(-1)), DispatchSlot::Static(0));
        assert_eq!(table.lookup(MemberId(0)), DispatchSlot::Default);
        assert_eq!(table.lookup(MemberId(1)), DispatchSlot::Constructor);
        assert_eq!(table.lookup(MemberId(2)), DispatchSlot::Instance(0));
        assert_eq!(table.lookup(MemberId(4)), DispatchSlot::Instance(2));
    }

    #[test]
    fn out_of_range_is_default() {
        let table = DispatchTable::new(1, 1);
        assert_eq!(table.lookup(MemberId(3)), DispatchSlot::Default);
        assert_eq!(table.lookup(MemberId(-2)), DispatchSlot::Default);
        assert_eq!(table.lookup(MemberId(i32::MIN)), DispatchSlot::Default);
        assert_eq!(table.lookup(MemberId(i32::MAX)), DispatchSlot::Default);
    }

    #[test]
    fn empty_table_still_has_constructor() {
        let table = DispatchTable::new(0, 0);
        assert_eq!(table.min_id(), MemberId(0));
        assert_eq!(table.max_id(), MemberId(1));
        assert_eq!(table.lookup(MemberId::CONSTRUCTOR), DispatchSlot::Constructor);
    }

    #[test]
    fn name_switch_is_order_independent() {
        let a = NameSwitch::build([("alpha", MemberId(2)), ("beta", MemberId(3))]);
        let b = NameSwitch::build([("beta", MemberId(3)), ("alpha", MemberId(2))]);
        for name in ["alpha", "beta", "gamma"] {
            assert_eq!(a.find(name), b.find(name));
        }
        assert_eq!(a.find("gamma"), MemberId::DEFAULT);
        let names_a: Vec<_> = a.names().collect();
        let names_b: Vec<_> = b.names().collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn name_switch_first_id_wins() {
        let switch = NameSwitch::build([("foo", MemberId(2)), ("foo", MemberId(3))]);
        assert_eq!(switch.len(), 1);
        assert_eq!(switch.find("foo"), MemberId(2));
    }

    #[test]
    fn names_and_keys_resolve() {
        let desc = wrapper(
            ImplementationObject::new()
                .with_fn("foo(I)I", noop())
                .with_fn("foo(Lhost/String;)I", noop()),
            ImplementationObject::new().with_fn("make", noop()),
        );
        assert_eq!(desc.find_member_id(Facet::Instance, "foo"), MemberId(2));
        assert_eq!(desc.find_member_id(Facet::Instance, "foo(Lhost/String;)I"), MemberId(3));
        assert_eq!(desc.find_member_id(Facet::Static, "make"), MemberId(-1));
        assert_eq!(desc.find_member_id(Facet::Static, "constructor"), MemberId::CONSTRUCTOR);
        assert_eq!(desc.find_member_id(Facet::Instance, "make"), MemberId::DEFAULT);
        assert_eq!(desc.member_name(MemberId(3)), Some("foo(Lhost/String;)I"));
        assert_eq!(desc.member_name(MemberId::CONSTRUCTOR), Some("constructor"));
        assert_eq!(desc.member_name(MemberId::DEFAULT), None);
    }

    #[test]
    fn overload_selection_uses_argument_types() {
        let desc = wrapper(
            ImplementationObject::new()
                .with_fn("foo(I)I", noop())
                .with_fn("foo(Lhost/String;)I", noop()),
            ImplementationObject::new(),
        );
        let int = desc
            .select_overload(Facet::Instance, "foo", &[ScriptValue::Int(1)])
            .unwrap();
        assert_eq!(int.key, "foo(I)I");
        let string = desc
            .select_overload(Facet::Instance, "foo", &[ScriptValue::string("x")])
            .unwrap();
        assert_eq!(string.key, "foo(Lhost/String;)I");
        let array = ScriptValue::array(vec![ScriptValue::Int(1)]);
        assert!(desc.select_overload(Facet::Instance, "foo", &[array]).is_none());
        assert!(desc.select_overload(Facet::Instance, "foo", &[]).is_none());
    }

    #[test]
    fn properties_are_split_by_facet() {
        let desc = wrapper(
            ImplementationObject::new().with_value("label", "x"),
            ImplementationObject::new().with_value("VERSION", "1.0"),
        );
        assert_eq!(desc.prototype.len(), 1);
        assert_eq!(desc.static_property("VERSION"), Some(&ScriptValue::string("1.0")));
        assert!(desc.static_property("label").is_none());
    }

    #[test]
    fn listing_shows_every_slot() {
        let desc = wrapper(
            ImplementationObject::new().with_fn("run", noop()),
            ImplementationObject::new()
                .with_fn("make", noop())
                .with_value("VERSION", "1.0"),
        );
        let listing = desc.to_string();
        assert!(listing.contains("dispatch [-1, 2]"));
        assert!(listing.contains("-1 -> static make"));
        assert!(listing.contains("0 -> default"));
        assert!(listing.contains("1 -> constructor (default)"));
        assert!(listing.contains("2 -> instance run"));
        assert!(listing.contains("VERSION"));
    }
}
