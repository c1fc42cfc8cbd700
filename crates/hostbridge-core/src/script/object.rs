//! Script object protocols.

use std::any::Any;

use crate::MemberId;
use crate::error::ScriptResult;
use crate::runtime::ObjectRef;

use super::{ScriptContext, ScriptValue};

/// An object as script code sees it: a bag of named properties.
pub trait Scriptable: Send + Sync {
    /// Class name shown in errors and diagnostics.
    fn class_name(&self) -> &str;

    /// Read a property. Methods are read as function values.
    fn get(&self, name: &str) -> Option<ScriptValue>;

    /// Write a property.
    fn put(&self, name: &str, value: ScriptValue) -> ScriptResult<()>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Own property keys in enumeration order.
    fn own_keys(&self) -> Vec<String>;

    /// The host object this script object stands for, if any.
    fn unwrap_native(&self) -> Option<ObjectRef> {
        None
    }

    /// The integer-id dispatch protocol, if implemented.
    fn as_foreign(&self) -> Option<&dyn ForeignObject> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// The engine's generic integer-id dispatch protocol.
///
/// Names are resolved to ids once with [`find_member_id`]; calls then go
/// through [`exec_id_call`] without any name lookup.
///
/// [`find_member_id`]: ForeignObject::find_member_id
/// [`exec_id_call`]: ForeignObject::exec_id_call
pub trait ForeignObject: Send + Sync {
    /// The id of a member name, or [`MemberId::DEFAULT`] when unknown.
    fn find_member_id(&self, name: &str) -> MemberId;

    /// The raw member key an id was assigned to.
    fn member_name(&self, id: MemberId) -> Option<&str>;

    /// Declared parameter count of a typed member.
    fn member_arity(&self, id: MemberId) -> Option<usize>;

    /// Invoke the member with the given id.
    fn exec_id_call(
        &self,
        cx: &ScriptContext,
        id: MemberId,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue>;
}
