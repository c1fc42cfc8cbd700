//! Native function storage and call context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::entries::TypeRef;
use crate::error::RuntimeError;
use crate::{NativeValue, PrimitiveKind};

use super::ObjectRef;

/// Context for a native method call.
///
/// Gives the body access to its receiver (absent for static methods) and its
/// already type-checked arguments.
pub struct CallContext<'a> {
    this: Option<&'a ObjectRef>,
    method: &'a str,
    args: &'a [NativeValue],
}

impl<'a> CallContext<'a> {
    /// Create a new call context.
    pub fn new(this: Option<&'a ObjectRef>, method: &'a str, args: &'a [NativeValue]) -> Self {
        Self { this, method, args }
    }

    /// Name of the method being called.
    pub fn method(&self) -> &str {
        self.method
    }

    /// The receiver.
    pub fn this(&self) -> Result<&'a ObjectRef, RuntimeError> {
        self.this.ok_or_else(|| RuntimeError::IncompatibleReceiver {
            class_name: "<instance>".to_string(),
            member: self.method.to_string(),
        })
    }

    /// The receiver's native state, downcast to `T`.
    pub fn state<T: Any>(&self) -> Result<&'a T, RuntimeError> {
        let this = self.this()?;
        this.state::<T>()
            .ok_or_else(|| RuntimeError::IncompatibleReceiver {
                class_name: std::any::type_name::<T>().to_string(),
                member: self.method.to_string(),
            })
    }

    /// Number of arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// All arguments.
    pub fn args(&self) -> &'a [NativeValue] {
        self.args
    }

    /// Argument at `index`.
    pub fn arg(&self, index: usize) -> Result<&'a NativeValue, RuntimeError> {
        self.args.get(index).ok_or_else(|| RuntimeError::ArgumentCount {
            method: self.method.to_string(),
            expected: index + 1,
            actual: self.args.len(),
        })
    }

    /// `int` argument at `index`.
    pub fn arg_i32(&self, index: usize) -> Result<i32, RuntimeError> {
        let value = self.arg(index)?;
        value.as_i32().ok_or_else(|| self.mismatch(index, PrimitiveKind::Int.name(), value))
    }

    /// Integral argument at `index`, widened.
    pub fn arg_i64(&self, index: usize) -> Result<i64, RuntimeError> {
        let value = self.arg(index)?;
        value.as_i64().ok_or_else(|| self.mismatch(index, PrimitiveKind::Long.name(), value))
    }

    /// Floating argument at `index`, widened.
    pub fn arg_f64(&self, index: usize) -> Result<f64, RuntimeError> {
        let value = self.arg(index)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(index, PrimitiveKind::Double.name(), value))
    }

    /// String argument at `index`; null yields `None`.
    pub fn arg_str(&self, index: usize) -> Result<Option<&'a str>, RuntimeError> {
        match self.arg(index)? {
            NativeValue::Null => Ok(None),
            NativeValue::String(s) => Ok(Some(s)),
            other => Err(self.mismatch(index, "host/String", other)),
        }
    }

    fn mismatch(&self, index: usize, expected: &str, actual: &NativeValue) -> RuntimeError {
        RuntimeError::ArgumentType {
            method: self.method.to_string(),
            index,
            expected: expected.to_string(),
            actual: actual.type_name(),
        }
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("method", &self.method)
            .field("has_this", &self.this.is_some())
            .field("arg_count", &self.args.len())
            .finish()
    }
}

/// Trait for callable native method bodies.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &CallContext<'_>) -> Result<NativeValue, RuntimeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&CallContext<'_>) -> Result<NativeValue, RuntimeError>,
{
    fn call(&self, ctx: &CallContext<'_>) -> Result<NativeValue, RuntimeError> {
        (self)(ctx)
    }
}

/// Type-erased native method body.
///
/// The callable is shared, so cloning is cheap.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Create a native function from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Result<NativeValue, RuntimeError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Create a native function from any callable.
    pub fn from_callable<C>(callable: C) -> Self
    where
        C: NativeCallable + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callable),
        }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &CallContext<'_>) -> Result<NativeValue, RuntimeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Produces the native state of a new instance.
#[derive(Clone)]
pub struct NativeInit {
    inner: Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>,
}

impl NativeInit {
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move || Box::new(f()) as Box<dyn Any + Send + Sync>),
        }
    }

    /// Create a fresh state value.
    pub fn create(&self) -> Box<dyn Any + Send + Sync> {
        (self.inner)()
    }
}

impl fmt::Debug for NativeInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInit").finish_non_exhaustive()
    }
}

/// Replaces default instantiation of a type.
///
/// Receives the type being instantiated and the constructor arguments.
#[derive(Clone)]
pub struct ConstructorHook {
    inner: Arc<
        dyn Fn(&TypeRef, &[NativeValue]) -> Result<ObjectRef, RuntimeError> + Send + Sync,
    >,
}

impl ConstructorHook {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TypeRef, &[NativeValue]) -> Result<ObjectRef, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn construct(&self, ty: &TypeRef, args: &[NativeValue]) -> Result<ObjectRef, RuntimeError> {
        (self.inner)(ty, args)
    }
}

impl fmt::Debug for ConstructorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorHook").finish_non_exhaustive()
    }
}
