//! Runtime side of a generated pair.
//!
//! [`WrapperClass`] is the loaded wrapper type: it owns the wrapper
//! descriptor and performs id dispatch. [`ObjectPair`] is one constructed
//! object. A single allocation plays both roles:
//!
//! - the backing instance, through [`HostObject`], handed to host code
//! - the wrapper instance, through [`Scriptable`] and [`ForeignObject`],
//!   handed to script code
//!
//! Each view reaches the other through the same allocation, so the
//! backing/wrapper cycle never becomes a reference-count cycle and both
//! halves are freed together.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};

use hostbridge_core::{
    Facet, ForeignObject, HostObject, MemberId, MethodSignature, NativeValue, ObjectRef,
    RuntimeError, ScriptContext, ScriptFn, ScriptResult, ScriptValue, Scriptable, TypeRef,
    WeakTypeRef, from_script, to_script,
};

use crate::collector::CONSTRUCTOR_NAME;
use crate::facet::StaticFacet;
use crate::synth::{BoundCallable, DispatchSlot, WrapperDescriptor};
use crate::unit::LoadUnit;

/// A loaded wrapper type.
pub struct WrapperClass {
    descriptor: WrapperDescriptor,
    backing_name: String,
    is_abstract: bool,
    backing: OnceLock<WeakTypeRef>,
    unit: OnceLock<LoadUnit>,
    bound: OnceLock<()>,
    /// Last static facet handed out; rebuilt once the script drops it.
    static_this: Mutex<Weak<StaticFacet>>,
}

impl WrapperClass {
    pub fn new(descriptor: WrapperDescriptor, backing_name: String, is_abstract: bool) -> Self {
        Self {
            descriptor,
            backing_name,
            is_abstract,
            backing: OnceLock::new(),
            unit: OnceLock::new(),
            bound: OnceLock::new(),
            static_this: Mutex::new(Weak::new()),
        }
    }

    /// Qualified name of the wrapper type.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Qualified name of the paired backing type.
    pub fn backing_name(&self) -> &str {
        &self.backing_name
    }

    pub fn descriptor(&self) -> &WrapperDescriptor {
        &self.descriptor
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The load unit this wrapper was loaded in.
    pub fn load_unit(&self) -> Option<&LoadUnit> {
        self.unit.get()
    }

    // ==========================================================================
    // Binding
    // ==========================================================================

    pub(crate) fn bind_backing(&self, ty: &TypeRef) -> ScriptResult<()> {
        self.backing
            .set(ty.downgrade())
            .map_err(|_| RuntimeError::DuplicateBinding {
                class_name: self.backing_name.clone(),
            })
    }

    pub(crate) fn attach_unit(&self, unit: LoadUnit) {
        if self.unit.set(unit).is_err() {
            tracing::warn!(class = %self.backing_name, "load unit attached twice");
        }
    }

    /// Bind the static facet. Instances can only be constructed afterwards.
    ///
    /// Binding happens once. The facet itself is not kept alive by the
    /// binding; the backing type is.
    pub fn bind_static(&self, facet: &Arc<StaticFacet>) -> ScriptResult<()> {
        self.bound
            .set(())
            .map_err(|_| RuntimeError::DuplicateBinding {
                class_name: self.backing_name.clone(),
            })?;
        *self.static_this.lock() = Arc::downgrade(facet);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    fn require_bound(&self) -> ScriptResult<()> {
        if self.is_bound() {
            Ok(())
        } else {
            Err(RuntimeError::ConstructionBeforeBinding {
                class_name: self.backing_name.clone(),
            })
        }
    }

    /// The static facet, rebuilt from the backing type if the script
    /// dropped the last one.
    pub fn static_facet(self: &Arc<Self>) -> ScriptResult<Arc<StaticFacet>> {
        self.require_bound()?;
        let mut current = self.static_this.lock();
        if let Some(facet) = current.upgrade() {
            return Ok(facet);
        }
        let facet = StaticFacet::new(self.backing_type()?, Arc::clone(self));
        *current = Arc::downgrade(&facet);
        tracing::trace!(class = %self.backing_name, "rebuilt static facet");
        Ok(facet)
    }

    /// The generated backing type.
    pub fn backing_type(&self) -> ScriptResult<TypeRef> {
        self.backing
            .get()
            .and_then(WeakTypeRef::upgrade)
            .ok_or_else(|| self.unloaded())
    }

    fn unloaded(&self) -> RuntimeError {
        RuntimeError::Unloaded {
            class_name: self.backing_name.clone(),
        }
    }

    // ==========================================================================
    // Construction
    // ==========================================================================

    /// Construct a new pair from script arguments.
    ///
    /// Fails before the static facet is bound, for abstract types, and when
    /// the arguments do not fit the script constructor (or are non-empty
    /// without one). The script constructor runs with the new wrapper as
    /// `this`.
    pub fn construct(
        self: &Arc<Self>,
        cx: &ScriptContext,
        args: &[ScriptValue],
    ) -> ScriptResult<Arc<ObjectPair>> {
        self.require_bound()?;
        let class = self.backing_type()?;
        if self.is_abstract {
            return Err(RuntimeError::AbstractInstantiation {
                type_name: self.backing_name.clone(),
            });
        }

        let method = format!("{}.{CONSTRUCTOR_NAME}", self.backing_name);
        match &self.descriptor.constructor {
            Some(ctor) => check_script_args(&method, ctor, args)?,
            None if !args.is_empty() => {
                return Err(RuntimeError::ArgumentCount {
                    method,
                    expected: 0,
                    actual: args.len(),
                });
            }
            None => {}
        }

        let state = class.initial_state();
        let pair = Arc::new_cyclic(|this| ObjectPair {
            class,
            wrapper: Arc::clone(self),
            state,
            properties: RwLock::new(self.descriptor.prototype.clone()),
            this: this.clone(),
        });

        if let Some(ctor) = &self.descriptor.constructor {
            ctor.function.call(cx, &pair.script_value(), args)?;
        }
        tracing::trace!(class = %self.backing_name, "constructed instance");
        Ok(pair)
    }

    /// Construct from host code. Needs an active script context.
    pub(crate) fn construct_native(
        self: &Arc<Self>,
        args: &[NativeValue],
    ) -> Result<ObjectRef, RuntimeError> {
        let cx = ScriptContext::current()?;
        let script_args: Vec<ScriptValue> = args.iter().map(to_script).collect();
        Ok(self.construct(&cx, &script_args)?.unwrap())
    }

    // ==========================================================================
    // Dispatch
    // ==========================================================================

    /// Run the handler for `id`.
    ///
    /// Instance ids need `receiver`; static ids run with the static facet as
    /// `this`.
    pub fn dispatch(
        self: &Arc<Self>,
        cx: &ScriptContext,
        receiver: Option<&ObjectPair>,
        id: MemberId,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        match self.descriptor.dispatch.lookup(id) {
            DispatchSlot::Default => Err(RuntimeError::NoSuchMember {
                class_name: self.backing_name.clone(),
                id: id.value(),
            }),
            DispatchSlot::Constructor => {
                let pair = self.construct(cx, args)?;
                Ok(pair.script_value())
            }
            DispatchSlot::Instance(index) => {
                let callable = &self.descriptor.instance[index];
                let this = receiver
                    .and_then(ObjectPair::upgrade)
                    .ok_or_else(|| RuntimeError::IncompatibleReceiver {
                        class_name: self.backing_name.clone(),
                        member: callable.key.clone(),
                    })?;
                callable.function.call(cx, &this.script_value(), args)
            }
            DispatchSlot::Static(index) => {
                let callable = &self.descriptor.statics[index];
                let facet = self.static_facet()?;
                callable.function.call(cx, &facet.script_value(), args)
            }
        }
    }

    /// A function value for a member name or raw key.
    ///
    /// Raw keys call exactly that member. Bare names pick the first overload,
    /// in registration order, that accepts the call's arguments. The
    /// function dispatches through its `this` value.
    pub(crate) fn member_fn(self: &Arc<Self>, facet: Facet, name: &str) -> Option<ScriptFn> {
        let id = self.descriptor.find_member_id(facet, name);
        if id.is_default() {
            return None;
        }
        let exact = self
            .descriptor
            .callable(id)
            .is_some_and(|c| c.key == name && c.name != name);

        let class = Arc::clone(self);
        let label = name.to_string();
        let f = ScriptFn::new(move |cx, this, args| {
            let id = if exact || id.is_constructor() {
                id
            } else {
                class
                    .descriptor
                    .select_overload(facet, &label, args)
                    .map(|c| c.id)
                    .ok_or_else(|| RuntimeError::NoMatchingOverload {
                        class_name: class.backing_name.clone(),
                        name: label.clone(),
                        arg_count: args.len(),
                    })?
            };
            let foreign = this
                .as_object()
                .and_then(|obj| obj.as_foreign())
                .ok_or_else(|| RuntimeError::IncompatibleReceiver {
                    class_name: class.backing_name.clone(),
                    member: label.clone(),
                })?;
            foreign.exec_id_call(cx, id, args)
        });
        Some(f.named(name))
    }
}

impl fmt::Debug for WrapperClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperClass")
            .field("name", &self.descriptor.name)
            .field("backing", &self.backing_name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

fn check_script_args(
    method: &str,
    callable: &BoundCallable,
    args: &[ScriptValue],
) -> ScriptResult<()> {
    let Some(sig) = &callable.signature else {
        return Ok(());
    };
    if sig.params.len() != args.len() {
        return Err(RuntimeError::ArgumentCount {
            method: method.to_string(),
            expected: sig.params.len(),
            actual: args.len(),
        });
    }
    for (index, (ty, arg)) in sig.params.iter().zip(args).enumerate() {
        if let Err(err) = from_script(arg, ty) {
            tracing::debug!(%err, index, "constructor argument rejected");
            return Err(RuntimeError::ArgumentType {
                method: method.to_string(),
                index,
                expected: ty.to_string(),
                actual: arg.type_name().to_string(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Object pair
// ============================================================================

/// One constructed object of a generated type.
pub struct ObjectPair {
    class: TypeRef,
    wrapper: Arc<WrapperClass>,
    state: Option<Box<dyn Any + Send + Sync>>,
    properties: RwLock<Vec<(String, ScriptValue)>>,
    this: Weak<ObjectPair>,
}

impl ObjectPair {
    /// The backing instance view.
    pub fn unwrap(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self) as Arc<dyn HostObject>)
    }

    /// The wrapper instance view.
    pub fn script_value(self: &Arc<Self>) -> ScriptValue {
        ScriptValue::Object(Arc::clone(self) as Arc<dyn Scriptable>)
    }

    pub fn wrapper_class(&self) -> &Arc<WrapperClass> {
        &self.wrapper
    }

    fn upgrade(&self) -> Option<Arc<ObjectPair>> {
        self.this.upgrade()
    }

    /// Invoke an instance member by name with overload selection.
    pub fn call(self: &Arc<Self>, name: &str, args: &[ScriptValue]) -> ScriptResult<ScriptValue> {
        let cx = ScriptContext::current()?;
        self.script_value().call_member(&cx, name, args)
    }
}

impl HostObject for ObjectPair {
    fn class(&self) -> &TypeRef {
        &self.class
    }

    fn state(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.state.as_deref()
    }

    fn script_wrapper(&self) -> Option<Arc<dyn Scriptable>> {
        self.upgrade().map(|pair| pair as Arc<dyn Scriptable>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Scriptable for ObjectPair {
    fn class_name(&self) -> &str {
        self.wrapper.name()
    }

    fn get(&self, name: &str) -> Option<ScriptValue> {
        if let Some((_, value)) = self.properties.read().iter().find(|(key, _)| key == name) {
            return Some(value.clone());
        }
        if let Some(f) = self.wrapper.member_fn(Facet::Instance, name) {
            return Some(ScriptValue::Function(f));
        }
        host_method(&self.class, name).map(ScriptValue::Function)
    }

    fn put(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        if !self.wrapper.descriptor.find_member_id(Facet::Instance, name).is_default() {
            return Err(RuntimeError::ReadOnlyProperty {
                name: name.to_string(),
            });
        }
        let mut properties = self.properties.write();
        match properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => properties.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .properties
            .read()
            .iter()
            .map(|(key, _)| key.clone())
            .collect();
        keys.extend(self.wrapper.descriptor.instance.iter().map(|c| c.key.clone()));
        keys
    }

    fn unwrap_native(&self) -> Option<ObjectRef> {
        self.upgrade().map(|pair| pair.unwrap())
    }

    fn as_foreign(&self) -> Option<&dyn ForeignObject> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ForeignObject for ObjectPair {
    fn find_member_id(&self, name: &str) -> MemberId {
        let id = self.wrapper.descriptor.find_member_id(Facet::Instance, name);
        if id.is_default() {
            self.wrapper.descriptor.find_member_id(Facet::Static, name)
        } else {
            id
        }
    }

    fn member_name(&self, id: MemberId) -> Option<&str> {
        self.wrapper.descriptor.member_name(id)
    }

    fn member_arity(&self, id: MemberId) -> Option<usize> {
        self.wrapper.descriptor.callable(id)?.arity()
    }

    fn exec_id_call(
        &self,
        cx: &ScriptContext,
        id: MemberId,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        self.wrapper.dispatch(cx, Some(self), id, args)
    }
}

impl fmt::Debug for ObjectPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPair")
            .field("class", &self.class.qualified_name())
            .field("has_state", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

/// A function value calling the host methods named `name` on `this`.
///
/// Lets script reach base-class methods it did not override.
fn host_method(class: &TypeRef, name: &str) -> Option<ScriptFn> {
    let mut signatures: Vec<MethodSignature> = Vec::new();
    for ty in class.class_chain() {
        for method in ty.methods() {
            if method.name() != name || method.is_static() || method.modifiers.is_private() {
                continue;
            }
            let hash = method.signature.signature_hash();
            if !signatures.iter().any(|s| s.signature_hash() == hash) {
                signatures.push(method.signature.clone());
            }
        }
    }
    if signatures.is_empty() {
        return None;
    }

    let class_name = class.qualified_name().to_string();
    let label = name.to_string();
    let f = ScriptFn::new(move |_cx, this, args| {
        let receiver = this
            .unwrap_native()
            .ok_or_else(|| RuntimeError::IncompatibleReceiver {
                class_name: class_name.clone(),
                member: label.clone(),
            })?;
        for sig in &signatures {
            if sig.params.len() != args.len() {
                continue;
            }
            let converted: Result<Vec<NativeValue>, _> = sig
                .params
                .iter()
                .zip(args)
                .map(|(ty, arg)| from_script(arg, ty))
                .collect();
            if let Ok(native_args) = converted {
                let result = receiver.invoke_method(sig, &native_args)?;
                return Ok(to_script(&result));
            }
        }
        Err(RuntimeError::NoMatchingOverload {
            class_name: class_name.clone(),
            name: label.clone(),
            arg_count: args.len(),
        })
    });
    Some(f.named(name))
}
