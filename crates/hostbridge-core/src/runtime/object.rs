//! Host objects and handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::entries::TypeRef;
use crate::error::RuntimeError;
use crate::script::Scriptable;
use crate::{MethodSignature, NativeValue};

use super::invoke;

/// An object living on the host side.
///
/// Plain host classes use [`NativeInstance`]. Generated types supply their
/// own implementation that is at the same time visible to script.
pub trait HostObject: Send + Sync {
    /// The runtime class of this object.
    fn class(&self) -> &TypeRef;

    /// Native state created by the class chain's initializer.
    fn state(&self) -> Option<&(dyn Any + Send + Sync)>;

    /// The script-facing counterpart of this object, if it has one.
    fn script_wrapper(&self) -> Option<Arc<dyn Scriptable>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Cloneable, thread-safe handle to a host object.
///
/// Equality is reference identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn HostObject>);

impl ObjectRef {
    pub fn new<T: HostObject + 'static>(object: T) -> Self {
        Self(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn HostObject>) -> Self {
        Self(object)
    }

    pub fn class(&self) -> &TypeRef {
        self.0.class()
    }

    /// The native state, downcast to `T`.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.0.state()?.downcast_ref::<T>()
    }

    pub fn script_wrapper(&self) -> Option<Arc<dyn Scriptable>> {
        self.0.script_wrapper()
    }

    /// Downcast the underlying object.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// Identity hash derived from the object's address.
    pub fn identity_hash(&self) -> i32 {
        let addr = Arc::as_ptr(&self.0) as *const () as usize as u64;
        (addr ^ (addr >> 32)) as i32
    }

    /// Whether this object's class is `qualified_name` or a subtype of it.
    pub fn is_instance_of(&self, qualified_name: &str) -> bool {
        self.class().is_subtype_of(qualified_name)
    }

    /// Virtual call by name and method descriptor, e.g. `("run", "()V")`.
    pub fn invoke(
        &self,
        name: &str,
        descriptor: &str,
        args: &[NativeValue],
    ) -> Result<NativeValue, RuntimeError> {
        let signature = MethodSignature::parse(name, descriptor)?;
        self.invoke_method(&signature, args)
    }

    /// Virtual call by signature.
    pub fn invoke_method(
        &self,
        signature: &MethodSignature,
        args: &[NativeValue],
    ) -> Result<NativeValue, RuntimeError> {
        invoke::check_arguments(signature, args)?;
        let class = self.class();
        let (owner, method) =
            class
                .resolve_virtual(signature)
                .ok_or_else(|| RuntimeError::NoSuchMethod {
                    type_name: class.qualified_name().to_string(),
                    method: signature.to_string(),
                })?;
        invoke::execute(owner, method, Some(self), args)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.class().qualified_name())
    }
}

/// Instance of a plain (non-generated) host class.
pub struct NativeInstance {
    class: TypeRef,
    state: Option<Box<dyn Any + Send + Sync>>,
}

impl NativeInstance {
    pub fn new(class: TypeRef, state: Option<Box<dyn Any + Send + Sync>>) -> Self {
        Self { class, state }
    }
}

impl HostObject for NativeInstance {
    fn class(&self) -> &TypeRef {
        &self.class
    }

    fn state(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.state.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for NativeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInstance")
            .field("class", &self.class.qualified_name())
            .field("has_state", &self.state.is_some())
            .finish()
    }
}
