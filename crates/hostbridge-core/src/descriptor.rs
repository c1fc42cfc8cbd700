//! Host type descriptors.
//!
//! The host describes types with a compact descriptor grammar:
//!
//! ```text
//! V           void (return types only)
//! Z B C S     bool, byte, char, short
//! I J F D     int, long, float, double
//! Lpkg/Name;  reference to the class or interface `pkg/Name`
//! [T          array of T
//! ```
//!
//! Method descriptors wrap the parameter types in parentheses and append the
//! return type, e.g. `(ILhost/String;)Z`.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::TypeHash;
use crate::error::DescriptorError;

/// Qualified names of the types every host registry provides.
pub mod well_known {
    /// The root class. Every reference type is a subtype of it.
    pub const OBJECT: &str = "host/Object";
    /// The host string type.
    pub const STRING: &str = "host/String";
}

/// Maximum nesting of array descriptors.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Primitive kinds, keyed by their descriptor character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PrimitiveKind {
    Void = 0x56,   // V
    Bool = 0x5a,   // Z
    Byte = 0x42,   // B
    Char = 0x43,   // C
    Short = 0x53,  // S
    Int = 0x49,    // I
    Long = 0x4a,   // J
    Float = 0x46,  // F
    Double = 0x44, // D
}

impl PrimitiveKind {
    /// The descriptor character for this primitive.
    pub fn descriptor_char(self) -> char {
        char::from(u8::from(self))
    }

    /// The human-readable name of this primitive.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Whether this is one of the integral kinds (byte, short, int, long).
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    /// Whether this is one of the floating point kinds.
    pub const fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A host type as named by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// A primitive (or void).
    Primitive(PrimitiveKind),
    /// A class or interface, by qualified name.
    Reference(String),
    /// An array of the element type.
    Array(Box<NativeType>),
}

impl NativeType {
    pub const VOID: NativeType = NativeType::Primitive(PrimitiveKind::Void);
    pub const BOOL: NativeType = NativeType::Primitive(PrimitiveKind::Bool);
    pub const INT: NativeType = NativeType::Primitive(PrimitiveKind::Int);
    pub const LONG: NativeType = NativeType::Primitive(PrimitiveKind::Long);
    pub const DOUBLE: NativeType = NativeType::Primitive(PrimitiveKind::Double);

    /// Reference to a class or interface.
    pub fn reference(name: impl Into<String>) -> Self {
        NativeType::Reference(name.into())
    }

    /// The root object type.
    pub fn object() -> Self {
        NativeType::Reference(well_known::OBJECT.to_string())
    }

    /// The host string type.
    pub fn string() -> Self {
        NativeType::Reference(well_known::STRING.to_string())
    }

    /// Array of the given element type.
    pub fn array_of(element: NativeType) -> Self {
        NativeType::Array(Box::new(element))
    }

    /// Parse a complete field-type descriptor such as `I` or `[Lhost/String;`.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let (ty, end) = Self::parse_prefix(descriptor, 0)?;
        if end != descriptor.len() {
            return Err(DescriptorError::TrailingCharacters {
                descriptor: descriptor.to_string(),
                position: end,
            });
        }
        Ok(ty)
    }

    /// Parse one type starting at byte offset `start`, returning the type and
    /// the offset just past it.
    pub fn parse_prefix(descriptor: &str, start: usize) -> Result<(Self, usize), DescriptorError> {
        let bytes = descriptor.as_bytes();
        let mut pos = start;
        let mut dimensions = 0usize;

        while bytes.get(pos) == Some(&b'[') {
            dimensions += 1;
            pos += 1;
            if dimensions > MAX_ARRAY_DIMENSIONS {
                return Err(DescriptorError::TooManyDimensions {
                    descriptor: descriptor.to_string(),
                });
            }
        }

        let Some(&lead) = bytes.get(pos) else {
            return Err(DescriptorError::UnexpectedEnd {
                descriptor: descriptor.to_string(),
            });
        };

        let (mut ty, end) = if lead == b'L' {
            let name_start = pos + 1;
            let Some(offset) = descriptor[name_start..].find(';') else {
                return Err(DescriptorError::UnterminatedReference {
                    descriptor: descriptor.to_string(),
                    position: pos,
                });
            };
            let name = &descriptor[name_start..name_start + offset];
            if name.is_empty() {
                return Err(DescriptorError::EmptyReferenceName {
                    descriptor: descriptor.to_string(),
                    position: pos,
                });
            }
            if let Some(bad) = name.chars().find(|c| matches!(c, '(' | ')' | '[' | '.' | ';')) {
                return Err(DescriptorError::InvalidCharacter {
                    descriptor: descriptor.to_string(),
                    position: pos,
                    ch: bad,
                });
            }
            (NativeType::Reference(name.to_string()), name_start + offset + 1)
        } else {
            match PrimitiveKind::try_from(lead) {
                Ok(kind) => (NativeType::Primitive(kind), pos + 1),
                Err(_) => {
                    return Err(DescriptorError::InvalidCharacter {
                        descriptor: descriptor.to_string(),
                        position: pos,
                        ch: descriptor[pos..].chars().next().unwrap_or('?'),
                    });
                }
            }
        };

        if dimensions > 0 && ty.is_void() {
            return Err(DescriptorError::VoidArrayElement {
                descriptor: descriptor.to_string(),
            });
        }
        for _ in 0..dimensions {
            ty = NativeType::Array(Box::new(ty));
        }
        Ok((ty, end))
    }

    /// The descriptor string for this type.
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    pub(crate) fn write_descriptor(&self, out: &mut String) {
        match self {
            NativeType::Primitive(kind) => out.push(kind.descriptor_char()),
            NativeType::Reference(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            NativeType::Array(element) => {
                out.push('[');
                element.write_descriptor(out);
            }
        }
    }

    /// Identity hash of this type.
    pub fn type_hash(&self) -> TypeHash {
        TypeHash::from_name(&self.descriptor())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NativeType::Primitive(PrimitiveKind::Void))
    }

    /// Primitive (non-void) types are passed by value and never null.
    pub fn is_primitive(&self) -> bool {
        matches!(self, NativeType::Primitive(kind) if *kind != PrimitiveKind::Void)
    }

    /// References and arrays may be null.
    pub fn is_reference(&self) -> bool {
        matches!(self, NativeType::Reference(_) | NativeType::Array(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            NativeType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn reference_name(&self) -> Option<&str> {
        match self {
            NativeType::Reference(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        self.reference_name() == Some(well_known::OBJECT)
    }

    pub fn is_string(&self) -> bool {
        self.reference_name() == Some(well_known::STRING)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Primitive(kind) => write!(f, "{kind}"),
            NativeType::Reference(name) => write!(f, "{name}"),
            NativeType::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_primitives() {
        assert_eq!(NativeType::parse("I").unwrap(), NativeType::INT);
        assert_eq!(NativeType::parse("V").unwrap(), NativeType::VOID);
        assert_eq!(
            NativeType::parse("C").unwrap(),
            NativeType::Primitive(PrimitiveKind::Char)
        );
    }

    #[test]
    fn parse_reference_and_array() {
        assert_eq!(NativeType::parse("Lhost/String;").unwrap(), NativeType::string());
        assert_eq!(
            NativeType::parse("[[J").unwrap(),
            NativeType::array_of(NativeType::array_of(NativeType::LONG))
        );
    }

    #[test]
    fn descriptor_is_inverse_of_parse() {
        for desc in ["Z", "[Lgame/Entity;", "[[D", "Lhost/Object;"] {
            assert_eq!(NativeType::parse(desc).unwrap().descriptor(), desc);
        }
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(NativeType::parse(""), Err(DescriptorError::Empty));
        assert!(matches!(
            NativeType::parse("Q"),
            Err(DescriptorError::InvalidCharacter { ch: 'Q', .. })
        ));
        assert!(matches!(
            NativeType::parse("Lhost/Object"),
            Err(DescriptorError::UnterminatedReference { .. })
        ));
        assert!(matches!(
            NativeType::parse("L;"),
            Err(DescriptorError::EmptyReferenceName { .. })
        ));
        assert!(matches!(
            NativeType::parse("[V"),
            Err(DescriptorError::VoidArrayElement { .. })
        ));
        assert!(matches!(
            NativeType::parse("II"),
            Err(DescriptorError::TrailingCharacters { position: 1, .. })
        ));
        assert!(matches!(
            NativeType::parse("["),
            Err(DescriptorError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(NativeType::parse("[I").unwrap().to_string(), "int[]");
        assert_eq!(NativeType::string().to_string(), "host/String");
    }

    #[test]
    fn classification() {
        assert!(NativeType::INT.is_primitive());
        assert!(!NativeType::VOID.is_primitive());
        assert!(NativeType::array_of(NativeType::INT).is_reference());
        assert!(NativeType::object().is_object());
        assert_eq!(PrimitiveKind::Long.descriptor_char(), 'J');
    }
}
