//! Script value model.
//!
//! ## Key Types
//!
//! - [`ScriptValue`]: Dynamically-typed script value
//! - [`ScriptFn`]: Type-erased script callable
//! - [`Scriptable`]: Object protocol (named properties)
//! - [`ForeignObject`]: Integer-id dispatch protocol
//! - [`ImplementationObject`]: Plain insertion-ordered script object
//! - [`ScriptContext`]: Per-thread execution context

mod context;
mod function;
mod implementation;
mod object;
mod value;

pub use context::{
    CallFrame, ContextGuard, ContextOptions, DEFAULT_MAX_CALL_DEPTH, ScriptContext,
    spawn_in_context,
};
pub use function::{ScriptCallable, ScriptFn};
pub use implementation::ImplementationObject;
pub use object::{ForeignObject, Scriptable};
pub use value::{ScriptValue, format_number};
