//! Core types for the host bridge.
//!
//! This crate models the two worlds the bridge connects:
//!
//! - the statically-typed host: descriptors, signatures, type entries,
//!   host objects and virtual invocation
//! - the dynamically-typed script environment: script values, callables,
//!   object protocols and the per-thread execution context
//!
//! plus the marshaling rules between them and the shared error hierarchy.

pub mod convert;
pub mod descriptor;
pub mod entries;
pub mod error;
mod member_id;
mod method_signature;
mod modifiers;
pub mod runtime;
pub mod script;
mod type_hash;
mod value;

pub use convert::{FromScript, accepts, from_script, to_script};
pub use descriptor::{NativeType, PrimitiveKind, well_known};
pub use entries::{FieldEntry, MethodBody, MethodEntry, TypeEntry, TypeRef, WeakTypeRef};
pub use error::{
    BridgeError, ConversionError, DescriptorError, GenerationError, GenerationStage,
    RegistrationError, RuntimeError, ScriptResult,
};
pub use member_id::{Facet, MemberId, MemberIdAllocator};
pub use method_signature::{MethodSignature, parse_method_descriptor};
pub use modifiers::Modifiers;
pub use runtime::{
    CallContext, ConstructorHook, ForwardingBody, HostObject, NativeCallable, NativeFn,
    NativeInit, NativeInstance, ObjectRef,
};
pub use script::{
    CallFrame, ContextGuard, ContextOptions, DEFAULT_MAX_CALL_DEPTH, ForeignObject,
    ImplementationObject, ScriptCallable, ScriptContext, ScriptFn, ScriptValue, Scriptable,
    format_number, spawn_in_context,
};
pub use type_hash::{TypeHash, hash_constants};
pub use value::{NativeArray, NativeValue};
