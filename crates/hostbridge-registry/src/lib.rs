//! Host bridge registry crate.
//!
//! Holds [`HostRegistry`], the table of loaded host types, including the
//! built-in `host/Object` and `host/String` roots.

mod registry;

pub use registry::HostRegistry;

// Re-export the types callers need alongside the registry
pub use hostbridge_core::{RegistrationError, TypeRef, WeakTypeRef};
