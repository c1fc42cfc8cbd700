//! Script callables.

use std::fmt;
use std::sync::Arc;

use crate::error::ScriptResult;

use super::{ScriptContext, ScriptValue};

/// Trait for values callable from script.
pub trait ScriptCallable: Send + Sync {
    fn call(
        &self,
        cx: &ScriptContext,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue>;
}

impl<F> ScriptCallable for F
where
    F: Fn(&ScriptContext, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue> + Send + Sync,
{
    fn call(
        &self,
        cx: &ScriptContext,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        (self)(cx, this, args)
    }
}

/// Type-erased script function.
///
/// Cloning shares the callable. Equality is identity.
#[derive(Clone)]
pub struct ScriptFn {
    name: Option<Arc<str>>,
    arity: Option<usize>,
    inner: Arc<dyn ScriptCallable>,
}

impl ScriptFn {
    /// Create a script function from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ScriptContext, &ScriptValue, &[ScriptValue]) -> ScriptResult<ScriptValue>
            + Send
            + Sync
            + 'static,
    {
        Self::from_callable(f)
    }

    /// Create a script function from any callable.
    pub fn from_callable<C: ScriptCallable + 'static>(callable: C) -> Self {
        Self {
            name: None,
            arity: None,
            inner: Arc::new(callable),
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare the number of parameters the function expects.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Call the function as one more level of script nesting.
    pub fn call(
        &self,
        cx: &ScriptContext,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        let _frame = cx.enter_call()?;
        self.inner.call(cx, this, args)
    }

    pub fn ptr_eq(&self, other: &ScriptFn) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl PartialEq for ScriptFn {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ScriptFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "ScriptFn({name})"),
            None => write!(f, "ScriptFn(<anonymous>)"),
        }
    }
}
