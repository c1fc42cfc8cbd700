//! Deterministic hash-based identity for host types and method signatures.
//!
//! [`TypeHash`] is a 64-bit hash computed from qualified names and signatures.
//! The same input always produces the same hash, so override candidates found
//! at different levels of a type hierarchy collapse to one key without any
//! registration-order dependency.
//!
//! # Examples
//!
//! ```
//! use hostbridge_core::TypeHash;
//!
//! let object = TypeHash::from_name("host/Object");
//! assert_eq!(object, TypeHash::from_name("host/Object"));
//!
//! let int = TypeHash::from_name("I");
//! let long = TypeHash::from_name("J");
//! assert_ne!(
//!     TypeHash::from_signature("sum", &[int, int]),
//!     TypeHash::from_signature("sum", &[long, long]),
//! );
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// These keep type hashes, signature hashes and identifier hashes apart even
/// when they are computed from the same string.
pub mod hash_constants {
    /// Separator constant for multi-part hashes.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method signature hashes.
    pub const SIGNATURE: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for member-name hashes used by name switches.
    pub const IDENT: u64 = 0x1a095090689d4647;

    /// Parameter position mixing constants.
    ///
    /// Each position gets its own constant so parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit hash identifying a type or a method signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name or a type descriptor.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a signature hash from a method name and its parameter type hashes.
    ///
    /// The return type is deliberately not part of the hash: two declarations
    /// with the same name and parameters are the same override slot.
    #[inline]
    pub fn from_signature(name: &str, param_hashes: &[TypeHash]) -> Self {
        let mut hash = hash_constants::SIGNATURE ^ xxh64(name.as_bytes(), 0);
        for (i, param) in param_hashes.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
            // wrapping_mul keeps the combination order-sensitive
            hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
        }
        TypeHash(hash)
    }

    /// Create an identifier hash for a script member name.
    #[inline]
    pub fn from_ident(name: &str) -> Self {
        TypeHash(hash_constants::IDENT ^ xxh64(name.as_bytes(), 0))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(TypeHash::from_name("host/Object"), TypeHash::from_name("host/Object"));
        assert_ne!(TypeHash::from_name("host/Object"), TypeHash::from_name("host/String"));
    }

    #[test]
    fn signature_hash_depends_on_parameter_order() {
        let int = TypeHash::from_name("I");
        let string = TypeHash::from_name("Lhost/String;");
        assert_ne!(
            TypeHash::from_signature("put", &[int, string]),
            TypeHash::from_signature("put", &[string, int])
        );
    }

    #[test]
    fn domains_do_not_collide() {
        assert_ne!(TypeHash::from_name("run"), TypeHash::from_ident("run"));
        assert_ne!(TypeHash::from_signature("run", &[]), TypeHash::from_ident("run"));
    }

    #[test]
    fn many_parameters_still_hash() {
        let int = TypeHash::from_name("I");
        let params = vec![int; 20];
        let shorter = vec![int; 19];
        assert_ne!(
            TypeHash::from_signature("wide", &params),
            TypeHash::from_signature("wide", &shorter)
        );
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("I").is_empty());
    }
}
