//! Unified error types for the host bridge.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BridgeError (top-level wrapper)
//! ├── GenerationError   - Validation failures while generating a type pair
//! ├── RuntimeError      - Failures while constructing or invoking generated types
//! │   └── ConversionError - Marshaling failures between script and host values
//! ├── RegistrationError - Host type registry failures
//! └── DescriptorError   - Malformed type or method descriptors
//! ```
//!
//! Phase errors can be handled directly or converted into [`BridgeError`]
//! with `?`.

use std::fmt;

use thiserror::Error;

use crate::Facet;

// ============================================================================
// Descriptor Errors
// ============================================================================

/// Errors produced while parsing type and method descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor was empty.
    #[error("empty descriptor")]
    Empty,

    /// The descriptor ended in the middle of a type.
    #[error("descriptor '{descriptor}' ends unexpectedly")]
    UnexpectedEnd { descriptor: String },

    /// A character that starts no type was found.
    #[error("invalid character '{ch}' at {position} in descriptor '{descriptor}'")]
    InvalidCharacter {
        descriptor: String,
        position: usize,
        ch: char,
    },

    /// A reference type was not closed with `;`.
    #[error("unterminated reference type at {position} in descriptor '{descriptor}'")]
    UnterminatedReference { descriptor: String, position: usize },

    /// A reference type named nothing (`L;`).
    #[error("empty reference type name at {position} in descriptor '{descriptor}'")]
    EmptyReferenceName { descriptor: String, position: usize },

    /// `void` used as an array element.
    #[error("void array element in descriptor '{descriptor}'")]
    VoidArrayElement { descriptor: String },

    /// `void` used as a parameter type.
    #[error("void parameter at {position} in descriptor '{descriptor}'")]
    VoidParameter { descriptor: String, position: usize },

    /// Characters left over after a complete descriptor.
    #[error("trailing characters at {position} in descriptor '{descriptor}'")]
    TrailingCharacters { descriptor: String, position: usize },

    /// A method descriptor did not start with `(`.
    #[error("method descriptor '{descriptor}' has no parameter list")]
    MissingParameterList { descriptor: String },

    /// Array nesting beyond the supported depth.
    #[error("too many array dimensions in descriptor '{descriptor}'")]
    TooManyDimensions { descriptor: String },
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors produced while marshaling values across the script/host boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The value has a kind the target type never accepts.
    #[error("cannot convert {actual} to {expected}")]
    TypeMismatch { expected: String, actual: String },

    /// A number does not fit the target integral type.
    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    /// NaN or an infinity where an integral value was required.
    #[error("non-finite value {value} cannot be converted to {target}")]
    NotFinite { value: f64, target: &'static str },

    /// Null or undefined where a primitive was required.
    #[error("null cannot be converted to primitive {target}")]
    NullToPrimitive { target: &'static str },

    /// A string that does not name a number.
    #[error("string {value:?} is not a number")]
    NotANumber { value: String },

    /// A value that is not a single Unicode scalar.
    #[error("{value:?} cannot be converted to char")]
    InvalidChar { value: String },

    /// A host object whose class is not a subtype of the target.
    #[error("object of type {actual} is not assignable to {expected}")]
    NotAssignable { expected: String, actual: String },
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Errors raised while constructing or invoking host and generated types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A generated method was invoked on a thread with no active script context.
    #[error("no active script context on this thread")]
    NoActiveContext,

    /// A value could not be marshaled.
    #[error("marshaling failed: {0}")]
    Conversion(#[from] ConversionError),

    /// A descriptor passed at call time was malformed.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// An abstract method was reached by virtual dispatch.
    #[error("abstract method {type_name}.{method} has no implementation")]
    AbstractMethod { type_name: String, method: String },

    /// No method with the requested signature exists.
    #[error("{type_name} has no method {method}")]
    NoSuchMethod { type_name: String, method: String },

    /// A dispatch id reached the default case of a generated wrapper.
    #[error("{class_name} has no member with id {id}")]
    NoSuchMember { class_name: String, id: i32 },

    /// A named member was not found on a script object.
    #[error("{class_name} has no member named '{name}'")]
    UnknownMember { class_name: String, name: String },

    /// The wrong number of arguments was supplied.
    #[error("{method} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// An argument does not conform to its parameter type.
    #[error("argument {index} of {method}: expected {expected}, got {actual}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// An abstract class or interface was instantiated.
    #[error("cannot instantiate abstract type {type_name}")]
    AbstractInstantiation { type_name: String },

    /// A wrapper instance was constructed before its static facet was bound.
    #[error("construction of {class_name} instance before its static facet was bound")]
    ConstructionBeforeBinding { class_name: String },

    /// A static facet was bound twice.
    #[error("duplicate binding of the static facet of {class_name}")]
    DuplicateBinding { class_name: String },

    /// A write to a read-only property.
    #[error("property '{name}' is read-only")]
    ReadOnlyProperty { name: String },

    /// A member was invoked with a receiver of the wrong class.
    #[error("{member} called on incompatible receiver; expected {class_name}")]
    IncompatibleReceiver { class_name: String, member: String },

    /// No overload of a script member accepts the arguments.
    #[error("no overload of {class_name}.{name} accepts {arg_count} argument(s)")]
    NoMatchingOverload {
        class_name: String,
        name: String,
        arg_count: usize,
    },

    /// A value that is not a function was called.
    #[error("'{name}' is not a function")]
    NotCallable { name: String },

    /// Script calls nested beyond the context limit.
    #[error("script call depth exceeded {limit}")]
    StackOverflow { limit: u32 },

    /// A script callable threw.
    #[error("script error: {message}")]
    ScriptThrown { message: String },

    /// The generated type pair behind a handle is no longer loaded.
    #[error("generated type {class_name} has been unloaded")]
    Unloaded { class_name: String },
}

impl RuntimeError {
    /// Convenience constructor for script-thrown errors.
    pub fn thrown(message: impl Into<String>) -> Self {
        RuntimeError::ScriptThrown {
            message: message.into(),
        }
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors produced by the host type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A type with this qualified name is already loaded.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A referenced type was not found.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// The type entry is malformed.
    #[error("invalid type {name}: {reason}")]
    InvalidType { name: String, reason: String },
}

// ============================================================================
// Generation Errors
// ============================================================================

/// Validation errors raised while generating a type pair.
///
/// All of these are raised before anything is loaded and none are retryable
/// without changing the inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The requested base type cannot be extended.
    #[error("base type {name} cannot be extended: {reason}")]
    InvalidBaseType { name: String, reason: &'static str },

    /// A requested interface cannot be implemented.
    #[error("{name} cannot be implemented: {reason}")]
    InvalidInterface { name: String, reason: &'static str },

    /// A member name appears twice in one facet.
    #[error("duplicate {facet} member '{name}'")]
    DuplicateMember { facet: Facet, name: String },

    /// Two callables resolve to the same name and signature.
    #[error("ambiguous {facet} member '{name}': more than one callable for {signature}")]
    AmbiguousBinding {
        facet: Facet,
        name: String,
        signature: String,
    },

    /// A member key carries a malformed signature.
    #[error("malformed signature in member key '{key}': {reason}")]
    MalformedSignature { key: String, reason: String },

    /// A reserved member name was used where it is not allowed.
    #[error("'{name}' is reserved and cannot be a {facet} member")]
    ReservedMember { facet: Facet, name: String },

    /// The requested name is taken by a loaded type.
    #[error("a type named {name} is already loaded")]
    NameCollision { name: String },

    /// The registry refused the generated type.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Stages of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStage {
    Collecting,
    Resolving,
    Synthesizing,
    Loaded,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStage::Collecting => write!(f, "collecting"),
            GenerationStage::Resolving => write!(f, "resolving"),
            GenerationStage::Synthesizing => write!(f, "synthesizing"),
            GenerationStage::Loaded => write!(f, "loaded"),
        }
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for bridge operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Generation failed at the given stage.
    #[error("generation failed while {stage}: {source}")]
    Generation {
        stage: GenerationStage,
        #[source]
        source: GenerationError,
    },

    /// A runtime error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A registry error.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A descriptor error.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl BridgeError {
    pub fn is_generation(&self) -> bool {
        matches!(self, BridgeError::Generation { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, BridgeError::Runtime(_))
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, BridgeError::Registration(_))
    }

    /// The generation error, if this is one.
    pub fn generation_error(&self) -> Option<&GenerationError> {
        match self {
            BridgeError::Generation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for script-facing operations.
pub type ScriptResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_display() {
        assert_eq!(
            RuntimeError::NoActiveContext.to_string(),
            "no active script context on this thread"
        );
    }

    #[test]
    fn conversion_error_wraps_into_runtime() {
        let err: RuntimeError = ConversionError::NullToPrimitive { target: "int" }.into();
        assert_eq!(
            err.to_string(),
            "marshaling failed: null cannot be converted to primitive int"
        );
    }

    #[test]
    fn generation_error_display() {
        let err = GenerationError::DuplicateMember {
            facet: Facet::Static,
            name: "VERSION".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate static member 'VERSION'");
    }

    #[test]
    fn bridge_error_classification() {
        let err = BridgeError::Generation {
            stage: GenerationStage::Resolving,
            source: GenerationError::NameCollision {
                name: "Dup".to_string(),
            },
        };
        assert!(err.is_generation());
        assert!(!err.is_runtime());
        assert_eq!(
            err.to_string(),
            "generation failed while resolving: a type named Dup is already loaded"
        );

        let err: BridgeError = RuntimeError::NoActiveContext.into();
        assert!(err.is_runtime());
        assert!(err.generation_error().is_none());
    }
}
