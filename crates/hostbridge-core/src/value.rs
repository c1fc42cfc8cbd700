//! Host-side values.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::well_known;
use crate::runtime::ObjectRef;
use crate::{NativeType, PrimitiveKind};

/// A value as the statically-typed host sees it.
///
/// Every primitive kind keeps its exact width so a value always knows which
/// descriptor it satisfies.
#[derive(Clone)]
pub enum NativeValue {
    /// Result of a void method.
    Void,
    /// Null reference
    Null,
    Bool(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Host string
    String(Arc<str>),
    /// Host array with its element type
    Array(NativeArray),
    /// Any host object, including generated backing instances
    Object(ObjectRef),
}

/// A typed host array.
#[derive(Clone, PartialEq)]
pub struct NativeArray {
    pub element_type: NativeType,
    pub items: Vec<NativeValue>,
}

impl NativeArray {
    pub fn new(element_type: NativeType, items: Vec<NativeValue>) -> Self {
        Self {
            element_type,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl NativeValue {
    /// Build a host string.
    pub fn string(s: impl AsRef<str>) -> Self {
        NativeValue::String(Arc::from(s.as_ref()))
    }

    /// Human-readable name of this value's runtime type.
    pub fn type_name(&self) -> String {
        match self {
            NativeValue::Void => "void".to_string(),
            NativeValue::Null => "null".to_string(),
            NativeValue::Object(obj) => obj.class().qualified_name().to_string(),
            NativeValue::String(_) => well_known::STRING.to_string(),
            NativeValue::Array(array) => format!("{}[]", array.element_type),
            other => other
                .primitive_kind()
                .map(|kind| kind.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// The primitive kind, for primitive values.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            NativeValue::Bool(_) => Some(PrimitiveKind::Bool),
            NativeValue::Byte(_) => Some(PrimitiveKind::Byte),
            NativeValue::Char(_) => Some(PrimitiveKind::Char),
            NativeValue::Short(_) => Some(PrimitiveKind::Short),
            NativeValue::Int(_) => Some(PrimitiveKind::Int),
            NativeValue::Long(_) => Some(PrimitiveKind::Long),
            NativeValue::Float(_) => Some(PrimitiveKind::Float),
            NativeValue::Double(_) => Some(PrimitiveKind::Double),
            NativeValue::Void => Some(PrimitiveKind::Void),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NativeValue::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Whether this value may be passed where `ty` is expected.
    ///
    /// Primitives must match exactly. Reference types accept null. Every
    /// non-void value is acceptable as `host/Object` (primitives are boxed).
    pub fn conforms_to(&self, ty: &NativeType) -> bool {
        match ty {
            NativeType::Primitive(kind) => self.primitive_kind() == Some(*kind),
            NativeType::Reference(name) => match self {
                NativeValue::Void => false,
                NativeValue::Null => true,
                _ if name == well_known::OBJECT => true,
                NativeValue::String(_) => name == well_known::STRING,
                NativeValue::Object(obj) => obj.is_instance_of(name),
                _ => false,
            },
            NativeType::Array(element) => match self {
                NativeValue::Null => true,
                NativeValue::Array(array) => {
                    array.element_type == **element
                        || array.items.iter().all(|item| item.conforms_to(element))
                }
                _ => false,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Byte(v) => Some(i64::from(*v)),
            NativeValue::Short(v) => Some(i64::from(*v)),
            NativeValue::Int(v) => Some(i64::from(*v)),
            NativeValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            NativeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating value widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Float(v) => Some(f64::from(*v)),
            NativeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            NativeValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Void, NativeValue::Void) => true,
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
            (NativeValue::Byte(a), NativeValue::Byte(b)) => a == b,
            (NativeValue::Char(a), NativeValue::Char(b)) => a == b,
            (NativeValue::Short(a), NativeValue::Short(b)) => a == b,
            (NativeValue::Int(a), NativeValue::Int(b)) => a == b,
            (NativeValue::Long(a), NativeValue::Long(b)) => a == b,
            (NativeValue::Float(a), NativeValue::Float(b)) => a == b,
            (NativeValue::Double(a), NativeValue::Double(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Array(a), NativeValue::Array(b)) => a == b,
            // Object equality is identity
            (NativeValue::Object(a), NativeValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Void => write!(f, "Void"),
            NativeValue::Null => write!(f, "Null"),
            NativeValue::Bool(v) => write!(f, "Bool({v})"),
            NativeValue::Byte(v) => write!(f, "Byte({v})"),
            NativeValue::Char(v) => write!(f, "Char({v:?})"),
            NativeValue::Short(v) => write!(f, "Short({v})"),
            NativeValue::Int(v) => write!(f, "Int({v})"),
            NativeValue::Long(v) => write!(f, "Long({v})"),
            NativeValue::Float(v) => write!(f, "Float({v})"),
            NativeValue::Double(v) => write!(f, "Double({v})"),
            NativeValue::String(s) => write!(f, "String({s:?})"),
            NativeValue::Array(a) => f.debug_list().entries(&a.items).finish(),
            NativeValue::Object(obj) => write!(f, "Object({})", obj.class().qualified_name()),
        }
    }
}

impl fmt::Debug for NativeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeArray")
            .field("element_type", &self.element_type)
            .field("items", &self.items)
            .finish()
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Bool(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        NativeValue::Int(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        NativeValue::Long(v)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Double(v)
    }
}

impl From<char> for NativeValue {
    fn from(v: char) -> Self {
        NativeValue::Char(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::string(v)
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(Arc::from(v))
    }
}

impl From<ObjectRef> for NativeValue {
    fn from(v: ObjectRef) -> Self {
        NativeValue::Object(v)
    }
}
