//! The static facet of a generated type.
//!
//! [`StaticFacet`] is what generation returns: the engine-visible
//! constructor and namespace of the new type. Script code reads its static
//! properties, calls its static methods and constructs instances through it;
//! host code uses it to reach the backing type.
//!
//! A facet holds the backing type and so keeps its load unit loaded. It is
//! not the only way to: once the script drops it, the wrapper class builds a
//! fresh one on demand for static calls on surviving instances.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use hostbridge_core::{
    Facet, ForeignObject, MemberId, NativeValue, ObjectRef, RuntimeError, ScriptContext,
    ScriptResult, ScriptValue, Scriptable, TypeRef,
};

use crate::unit::LoadUnit;
use crate::wrapper::{ObjectPair, WrapperClass};

/// Constructor and namespace of a generated type.
pub struct StaticFacet {
    backing: TypeRef,
    wrapper: Arc<WrapperClass>,
    this: Weak<StaticFacet>,
}

impl StaticFacet {
    pub(crate) fn new(backing: TypeRef, wrapper: Arc<WrapperClass>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            backing,
            wrapper,
            this: this.clone(),
        })
    }

    /// Qualified name of the generated backing type.
    pub fn name(&self) -> &str {
        self.backing.qualified_name()
    }

    /// The generated backing type, usable wherever the base type is.
    pub fn backing_type(&self) -> &TypeRef {
        &self.backing
    }

    pub fn wrapper_class(&self) -> &Arc<WrapperClass> {
        &self.wrapper
    }

    pub fn load_unit(&self) -> Option<&LoadUnit> {
        self.wrapper.load_unit()
    }

    /// Whether an abstract member was left without an override.
    pub fn is_abstract(&self) -> bool {
        self.backing_type().is_abstract()
    }

    /// This facet as a script value.
    pub fn script_value(&self) -> ScriptValue {
        match self.this.upgrade() {
            Some(facet) => ScriptValue::Object(facet as Arc<dyn Scriptable>),
            None => ScriptValue::Undefined,
        }
    }

    /// A static property.
    pub fn property(&self, name: &str) -> Option<ScriptValue> {
        self.wrapper_class()
            .descriptor()
            .static_property(name)
            .cloned()
    }

    /// Construct an instance from script arguments on the current context.
    pub fn construct(&self, args: &[ScriptValue]) -> ScriptResult<Arc<ObjectPair>> {
        let cx = ScriptContext::current()?;
        self.wrapper_class().construct(&cx, args)
    }

    /// Construct an instance from host arguments and return its backing
    /// view. Needs an active script context.
    pub fn new_instance(&self, args: &[NativeValue]) -> Result<ObjectRef, RuntimeError> {
        self.backing_type().instantiate(args)
    }

    /// Call a static member by name with overload selection.
    pub fn call_static(&self, name: &str, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        let cx = ScriptContext::current()?;
        self.script_value().call_member(&cx, name, args)
    }
}

impl Scriptable for StaticFacet {
    fn class_name(&self) -> &str {
        self.name()
    }

    fn get(&self, name: &str) -> Option<ScriptValue> {
        if let Some(value) = self.property(name) {
            return Some(value);
        }
        self.wrapper_class()
            .member_fn(Facet::Static, name)
            .map(ScriptValue::Function)
    }

    /// Static properties are read-only and static members cannot be
    /// replaced, so every write fails and leaves the facet unchanged.
    fn put(&self, name: &str, _value: ScriptValue) -> ScriptResult<()> {
        tracing::debug!(class = self.name(), name, "rejected write to static facet");
        Err(RuntimeError::ReadOnlyProperty {
            name: name.to_string(),
        })
    }

    fn own_keys(&self) -> Vec<String> {
        let descriptor = self.wrapper_class().descriptor();
        descriptor
            .static_properties
            .iter()
            .map(|(key, _)| key.clone())
            .chain(descriptor.statics.iter().map(|c| c.key.clone()))
            .collect()
    }

    fn as_foreign(&self) -> Option<&dyn ForeignObject> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ForeignObject for StaticFacet {
    fn find_member_id(&self, name: &str) -> MemberId {
        self.wrapper_class()
            .descriptor()
            .find_member_id(Facet::Static, name)
    }

    fn member_name(&self, id: MemberId) -> Option<&str> {
        if id.is_instance() {
            return None;
        }
        self.wrapper_class().descriptor().member_name(id)
    }

    fn member_arity(&self, id: MemberId) -> Option<usize> {
        if id.is_constructor() {
            return self.wrapper_class().descriptor().constructor.as_ref()?.arity();
        }
        self.wrapper_class().descriptor().callable(id)?.arity()
    }

    fn exec_id_call(
        &self,
        cx: &ScriptContext,
        id: MemberId,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        self.wrapper_class().dispatch(cx, None, id, args)
    }
}

impl fmt::Debug for StaticFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFacet")
            .field("name", &self.name())
            .field("abstract", &self.is_abstract())
            .finish()
    }
}
