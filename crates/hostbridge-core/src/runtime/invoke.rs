//! Method execution shared by virtual and static calls.

use crate::entries::{MethodBody, MethodEntry, TypeEntry};
use crate::error::RuntimeError;
use crate::{MethodSignature, NativeValue};

use super::{CallContext, ObjectRef};

/// Check argument count and types against a signature.
pub(crate) fn check_arguments(
    signature: &MethodSignature,
    args: &[NativeValue],
) -> Result<(), RuntimeError> {
    if args.len() != signature.arity() {
        return Err(RuntimeError::ArgumentCount {
            method: signature.to_string(),
            expected: signature.arity(),
            actual: args.len(),
        });
    }
    for (index, (arg, param)) in args.iter().zip(&signature.params).enumerate() {
        if !arg.conforms_to(param) {
            return Err(RuntimeError::ArgumentType {
                method: signature.to_string(),
                index,
                expected: param.to_string(),
                actual: arg.type_name(),
            });
        }
    }
    Ok(())
}

/// Run a method body declared by `owner`.
pub(crate) fn execute(
    owner: &TypeEntry,
    method: &MethodEntry,
    receiver: Option<&ObjectRef>,
    args: &[NativeValue],
) -> Result<NativeValue, RuntimeError> {
    let result = match &method.body {
        MethodBody::Native(f) => f.call(&CallContext::new(receiver, method.name(), args))?,
        MethodBody::Abstract => {
            return Err(RuntimeError::AbstractMethod {
                type_name: owner.qualified_name().to_string(),
                method: method.signature.to_string(),
            });
        }
        MethodBody::Forward(body) => {
            let receiver = receiver.ok_or_else(|| RuntimeError::IncompatibleReceiver {
                class_name: owner.qualified_name().to_string(),
                member: method.signature.to_string(),
            })?;
            body.invoke(receiver, &method.signature, args)?
        }
    };

    if method.signature.return_type.is_void() {
        Ok(NativeValue::Void)
    } else {
        Ok(result)
    }
}
