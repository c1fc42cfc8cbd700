//! Type synthesis.
//!
//! Turns a resolved generation request into two descriptors:
//!
//! - [`backing`]: the host class that extends the base type and forwards
//!   every bound override into script
//! - [`wrapper`]: the script-facing type owning the dispatch tables
//!
//! Neither descriptor is live; [`LoadUnit`](crate::LoadUnit) builds the
//! runtime types from them.

pub mod backing;
pub mod wrapper;

pub use backing::{
    ClassBuilder, ClassDescriptor, FieldDescriptor, MethodDescriptor, WRAPPER_FIELD,
    WRAPPER_SUFFIX, synthesize_backing,
};
pub use wrapper::{
    BoundCallable, DispatchSlot, DispatchTable, NameSwitch, WrapperDescriptor, synthesize_wrapper,
};
