//! Host type entries.
//!
//! - [`TypeEntry`] - A class or interface with its ancestry and members
//! - [`TypeRef`] - Shared handle to a loaded type entry
//! - [`MethodEntry`], [`MethodBody`] - Declared methods and their implementations
//! - [`FieldEntry`] - Declared fields

mod method;
mod type_entry;

pub use method::{FieldEntry, MethodBody, MethodEntry};
pub use type_entry::{TypeEntry, TypeRef, WeakTypeRef};
