//! Member key parsing.
//!
//! A script member key is either a bare name (`"run"`) or a name followed by
//! a method descriptor (`"foo(I)I"`, `"greet(Lhost/String;)V"`). Bare names
//! are untyped: they accept any arguments and return whatever the script
//! returns. Typed keys let one script name carry several host overloads.

use std::fmt;

use hostbridge_core::{GenerationError, MethodSignature, parse_method_descriptor};

/// A parsed member key.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberKey {
    /// Member name without the descriptor.
    pub name: String,
    /// Declared host signature, if the key carries one.
    pub signature: Option<MethodSignature>,
}

impl MemberKey {
    /// Whether the key carried a descriptor.
    pub fn is_typed(&self) -> bool {
        self.signature.is_some()
    }

    /// Whether this key can stand in for `signature`.
    ///
    /// Typed keys need the exact signature; untyped keys only the name.
    pub fn matches(&self, signature: &MethodSignature) -> bool {
        match &self.signature {
            Some(own) => own.matches_exactly(signature),
            None => self.name == signature.name,
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "{sig}"),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parse a raw member key into a name and optional signature.
pub fn parse_member_key(key: &str) -> Result<MemberKey, GenerationError> {
    let malformed = |reason: String| GenerationError::MalformedSignature {
        key: key.to_string(),
        reason,
    };

    let (name, descriptor) = match key.find('(') {
        Some(pos) => (&key[..pos], Some(&key[pos..])),
        None => (key, None),
    };

    if name.is_empty() {
        return Err(malformed("empty member name".to_string()));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, ')' | ';' | '[' | '/'))
    {
        return Err(malformed(format!("invalid character '{bad}' in member name")));
    }

    let Some(descriptor) = descriptor else {
        return Ok(MemberKey {
            name: name.to_string(),
            signature: None,
        });
    };

    let (params, return_type) =
        parse_method_descriptor(descriptor).map_err(|e| malformed(e.to_string()))?;

    Ok(MemberKey {
        name: name.to_string(),
        signature: Some(MethodSignature::new(name, params, return_type)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_core::NativeType;

    #[test]
    fn bare_name_is_untyped() {
        let key = parse_member_key("run").unwrap();
        assert_eq!(key.name, "run");
        assert!(!key.is_typed());
    }

    #[test]
    fn typed_key() {
        let key = parse_member_key("foo(ILhost/String;)J").unwrap();
        let sig = key.signature.unwrap();
        assert_eq!(sig.name, "foo");
        assert_eq!(sig.params, vec![NativeType::INT, NativeType::string()]);
        assert_eq!(sig.return_type, NativeType::LONG);
    }

    #[test]
    fn array_parameters() {
        let key = parse_member_key("sum([I)I").unwrap();
        let sig = key.signature.unwrap();
        assert_eq!(sig.params, vec![NativeType::array_of(NativeType::INT)]);
    }

    #[test]
    fn malformed_keys() {
        for key in ["", "(I)V", "foo(I", "foo(I)Vx", "foo(Q)V", "foo(V)V", "foo()", "a b"] {
            let err = parse_member_key(key).unwrap_err();
            assert!(
                matches!(&err, GenerationError::MalformedSignature { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn untyped_matches_by_name() {
        let key = parse_member_key("run").unwrap();
        let sig = MethodSignature::parse("run", "()V").unwrap();
        assert!(key.matches(&sig));
        let other = MethodSignature::parse("stop", "()V").unwrap();
        assert!(!key.matches(&other));
    }

    #[test]
    fn typed_matches_exactly() {
        let key = parse_member_key("foo(I)I").unwrap();
        assert!(key.matches(&MethodSignature::parse("foo", "(I)I").unwrap()));
        assert!(!key.matches(&MethodSignature::parse("foo", "(I)J").unwrap()));
        assert!(!key.matches(&MethodSignature::parse("foo", "(J)I").unwrap()));
    }

    #[test]
    fn display_round_trips_key() {
        assert_eq!(parse_member_key("foo(I)I").unwrap().to_string(), "foo(I)I");
        assert_eq!(parse_member_key("bar").unwrap().to_string(), "bar");
    }
}
