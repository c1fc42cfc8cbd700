//! Canonical method signatures.

use std::fmt;

use crate::error::DescriptorError;
use crate::{NativeType, TypeHash};

/// A method's name, ordered parameter types and return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Method name.
    pub name: String,
    /// Parameter types.
    pub params: Vec<NativeType>,
    /// Return type.
    pub return_type: NativeType,
}

impl MethodSignature {
    /// Create a new method signature.
    pub fn new(name: impl Into<String>, params: Vec<NativeType>, return_type: NativeType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
        }
    }

    /// Build a signature from a name and a method descriptor like `(IJ)V`.
    pub fn parse(name: impl Into<String>, descriptor: &str) -> Result<Self, DescriptorError> {
        let (params, return_type) = parse_method_descriptor(descriptor)?;
        Ok(Self::new(name, params, return_type))
    }

    /// The method descriptor, e.g. `(Lhost/String;)I`.
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_descriptor(&mut out);
        }
        out.push(')');
        self.return_type.write_descriptor(&mut out);
        out
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Override-slot hash: name and parameter types, return type excluded.
    pub fn signature_hash(&self) -> TypeHash {
        let params: Vec<TypeHash> = self.params.iter().map(NativeType::type_hash).collect();
        TypeHash::from_signature(&self.name, &params)
    }

    /// Whether `other` can stand in for this method exactly: same name,
    /// parameters and return type.
    pub fn matches_exactly(&self, other: &MethodSignature) -> bool {
        self == other
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor())
    }
}

/// Parse a method descriptor into parameter types and return type.
pub fn parse_method_descriptor(
    descriptor: &str,
) -> Result<(Vec<NativeType>, NativeType), DescriptorError> {
    if descriptor.is_empty() {
        return Err(DescriptorError::Empty);
    }
    if !descriptor.starts_with('(') {
        return Err(DescriptorError::MissingParameterList {
            descriptor: descriptor.to_string(),
        });
    }

    let bytes = descriptor.as_bytes();
    let mut pos = 1;
    let mut params = Vec::new();
    loop {
        match bytes.get(pos) {
            None => {
                return Err(DescriptorError::UnexpectedEnd {
                    descriptor: descriptor.to_string(),
                });
            }
            Some(b')') => {
                pos += 1;
                break;
            }
            Some(_) => {
                let (param, end) = NativeType::parse_prefix(descriptor, pos)?;
                if param.is_void() {
                    return Err(DescriptorError::VoidParameter {
                        descriptor: descriptor.to_string(),
                        position: pos,
                    });
                }
                params.push(param);
                pos = end;
            }
        }
    }

    let (return_type, end) = NativeType::parse_prefix(descriptor, pos)?;
    if end != descriptor.len() {
        return Err(DescriptorError::TrailingCharacters {
            descriptor: descriptor.to_string(),
            position: end,
        });
    }
    Ok((params, return_type))
}
