//! Forwarding trampolines from host methods into script callables.

use std::fmt;
use std::sync::Arc;

use crate::convert::{from_script, to_script};
use crate::error::RuntimeError;
use crate::script::{ScriptContext, ScriptValue};
use crate::{MemberId, MethodSignature, NativeValue};

use super::ObjectRef;

/// Body of a generated override.
///
/// Every override has the same shape: find the calling thread's context, box
/// the arguments, call the paired wrapper's dispatcher with the member id,
/// then unbox the result into the declared return type.
#[derive(Clone, PartialEq, Eq)]
pub struct ForwardingBody {
    member_id: MemberId,
    member: Arc<str>,
}

impl ForwardingBody {
    pub fn new(member_id: MemberId, member: impl Into<Arc<str>>) -> Self {
        Self {
            member_id,
            member: member.into(),
        }
    }

    /// Dispatch id of the bound script callable.
    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    /// Raw key of the bound script callable.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Run the trampoline for `receiver`.
    pub fn invoke(
        &self,
        receiver: &ObjectRef,
        signature: &MethodSignature,
        args: &[NativeValue],
    ) -> Result<NativeValue, RuntimeError> {
        let cx = ScriptContext::current()?;

        let wrapper = receiver
            .script_wrapper()
            .ok_or_else(|| self.incompatible(receiver))?;
        let foreign = wrapper
            .as_foreign()
            .ok_or_else(|| self.incompatible(receiver))?;

        let script_args: Vec<ScriptValue> = args.iter().map(to_script).collect();
        let result = foreign.exec_id_call(&cx, self.member_id, &script_args)?;

        Ok(from_script(&result, &signature.return_type)?)
    }

    fn incompatible(&self, receiver: &ObjectRef) -> RuntimeError {
        RuntimeError::IncompatibleReceiver {
            class_name: receiver.class().qualified_name().to_string(),
            member: self.member.to_string(),
        }
    }
}

impl fmt::Debug for ForwardingBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.member, self.member_id)
    }
}
