//! Host object runtime.
//!
//! ## Key Types
//!
//! - [`ObjectRef`]: Shared handle to any host object
//! - [`HostObject`]: Trait implemented by plain and generated instances
//! - [`NativeFn`]: Type-erased native method body
//! - [`CallContext`]: Receiver and arguments of a native call
//! - [`ForwardingBody`]: Trampoline from a host method into a script callable

mod forward;
pub(crate) mod invoke;
mod native_fn;
mod object;

pub use forward::ForwardingBody;
pub use native_fn::{CallContext, ConstructorHook, NativeCallable, NativeFn, NativeInit};
pub use object::{HostObject, NativeInstance, ObjectRef};
