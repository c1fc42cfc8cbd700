//! Method and field entries.

use std::fmt;

use crate::runtime::{ForwardingBody, NativeFn};
use crate::{MethodSignature, Modifiers, NativeType};

/// How a method is implemented.
#[derive(Clone)]
pub enum MethodBody {
    /// Implemented by a Rust closure.
    Native(NativeFn),
    /// Declared without an implementation.
    Abstract,
    /// Forwarding trampoline into a paired script wrapper.
    Forward(ForwardingBody),
}

impl MethodBody {
    pub fn is_abstract(&self) -> bool {
        matches!(self, MethodBody::Abstract)
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, MethodBody::Forward(_))
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Native(_) => write!(f, "Native"),
            MethodBody::Abstract => write!(f, "Abstract"),
            MethodBody::Forward(body) => write!(f, "Forward({:?})", body),
        }
    }
}

/// A method declared by a host type.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub signature: MethodSignature,
    pub modifiers: Modifiers,
    pub body: MethodBody,
}

impl MethodEntry {
    /// Create a method entry.
    pub fn new(signature: MethodSignature, modifiers: Modifiers, body: MethodBody) -> Self {
        Self {
            signature,
            modifiers,
            body,
        }
    }

    /// A public method implemented in Rust.
    pub fn native(signature: MethodSignature, f: NativeFn) -> Self {
        Self::new(signature, Modifiers::PUBLIC, MethodBody::Native(f))
    }

    /// A public abstract method.
    pub fn abstract_method(signature: MethodSignature) -> Self {
        Self::new(
            signature,
            Modifiers::PUBLIC | Modifiers::ABSTRACT,
            MethodBody::Abstract,
        )
    }

    /// A public static method implemented in Rust.
    pub fn static_native(signature: MethodSignature, f: NativeFn) -> Self {
        Self::new(
            signature,
            Modifiers::PUBLIC | Modifiers::STATIC,
            MethodBody::Native(f),
        )
    }

    /// Replace the modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as final.
    pub fn as_final(mut self) -> Self {
        self.modifiers |= Modifiers::FINAL;
        self
    }

    /// Narrow visibility to protected.
    pub fn as_protected(mut self) -> Self {
        self.modifiers.remove(Modifiers::PUBLIC | Modifiers::PRIVATE);
        self.modifiers |= Modifiers::PROTECTED;
        self
    }

    /// Narrow visibility to private.
    pub fn as_private(mut self) -> Self {
        self.modifiers.remove(Modifiers::PUBLIC | Modifiers::PROTECTED);
        self.modifiers |= Modifiers::PRIVATE;
        self
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_abstract()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }
}

/// A field declared by a host type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub field_type: NativeType,
    pub modifiers: Modifiers,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, field_type: NativeType, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            field_type,
            modifiers,
        }
    }
}
