//! Marshaling between script values and host values.
//!
//! - [`to_script`]: box a host value for script code
//! - [`from_script`]: unbox/cast a script value to a host type
//! - [`FromScript`]: extract a Rust value from a script value
//!
//! ## Unboxing rules
//!
//! | Target | Accepted |
//! |--------|----------|
//! | `V` | anything (discarded) |
//! | `Z` | booleans |
//! | `B S I J` | numbers and numeric strings; floats must be finite, are truncated, and must fit |
//! | `F D` | numbers and numeric strings |
//! | `C` | one-character strings, integral code points |
//! | `Lhost/String;` | strings; booleans and numbers are formatted |
//! | `Lhost/Object;` | any value, boxed to its natural host type |
//! | other references | host objects (or wrappers of one) of a subtype |
//! | arrays | arrays, element by element |
//!
//! Null and undefined become host null for every reference type and are
//! rejected for primitives.

use crate::descriptor::well_known;
use crate::error::ConversionError;
use crate::script::{ScriptValue, format_number};
use crate::{NativeArray, NativeType, NativeValue, PrimitiveKind};

/// Box a host value for script code.
///
/// Generated objects are handed over as their script wrapper so script code
/// sees its own object; other host objects are passed as native values.
pub fn to_script(value: &NativeValue) -> ScriptValue {
    match value {
        NativeValue::Void => ScriptValue::Undefined,
        NativeValue::Null => ScriptValue::Null,
        NativeValue::Bool(v) => ScriptValue::Bool(*v),
        NativeValue::Byte(v) => ScriptValue::Int(i64::from(*v)),
        NativeValue::Short(v) => ScriptValue::Int(i64::from(*v)),
        NativeValue::Int(v) => ScriptValue::Int(i64::from(*v)),
        NativeValue::Long(v) => ScriptValue::Int(*v),
        NativeValue::Float(v) => ScriptValue::Float(f64::from(*v)),
        NativeValue::Double(v) => ScriptValue::Float(*v),
        NativeValue::Char(c) => ScriptValue::string(c.encode_utf8(&mut [0; 4])),
        NativeValue::String(s) => ScriptValue::String(s.clone()),
        NativeValue::Array(array) => {
            ScriptValue::array(array.items.iter().map(to_script).collect())
        }
        NativeValue::Object(obj) => match obj.script_wrapper() {
            Some(wrapper) => ScriptValue::Object(wrapper),
            None => ScriptValue::Native(obj.clone()),
        },
    }
}

/// Unbox/cast a script value to the host type `ty`.
pub fn from_script(value: &ScriptValue, ty: &NativeType) -> Result<NativeValue, ConversionError> {
    match ty {
        NativeType::Primitive(kind) => to_primitive(value, *kind),
        NativeType::Reference(name) => to_reference(value, name),
        NativeType::Array(element) => to_array(value, element),
    }
}

/// Whether `value` can be unboxed to `ty`.
pub fn accepts(value: &ScriptValue, ty: &NativeType) -> bool {
    from_script(value, ty).is_ok()
}

enum Number {
    Int(i64),
    Float(f64),
}

fn mismatch(expected: impl Into<String>, value: &ScriptValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: expected.into(),
        actual: value.describe(),
    }
}

fn numeric(value: &ScriptValue, kind: PrimitiveKind) -> Result<Number, ConversionError> {
    match value {
        ScriptValue::Int(v) => Ok(Number::Int(*v)),
        ScriptValue::Float(v) => Ok(Number::Float(*v)),
        ScriptValue::String(s) => {
            let trimmed = s.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                Ok(Number::Int(v))
            } else if let Ok(v) = trimmed.parse::<f64>() {
                Ok(Number::Float(v))
            } else {
                Err(ConversionError::NotANumber {
                    value: s.to_string(),
                })
            }
        }
        other => Err(mismatch(kind.name(), other)),
    }
}

fn integral(number: Number, kind: PrimitiveKind) -> Result<i64, ConversionError> {
    match number {
        Number::Int(v) => Ok(v),
        Number::Float(v) => {
            if !v.is_finite() {
                return Err(ConversionError::NotFinite {
                    value: v,
                    target: kind.name(),
                });
            }
            let truncated = v.trunc();
            // i64::MAX is not representable; 2^63 is the first value out of range
            if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0
            {
                return Err(ConversionError::OutOfRange {
                    value: format_number(v),
                    target: kind.name(),
                });
            }
            Ok(truncated as i64)
        }
    }
}

fn out_of_range(v: i64, kind: PrimitiveKind) -> ConversionError {
    ConversionError::OutOfRange {
        value: v.to_string(),
        target: kind.name(),
    }
}

fn to_primitive(value: &ScriptValue, kind: PrimitiveKind) -> Result<NativeValue, ConversionError> {
    if kind == PrimitiveKind::Void {
        return Ok(NativeValue::Void);
    }
    if value.is_nullish() {
        return Err(ConversionError::NullToPrimitive {
            target: kind.name(),
        });
    }

    match kind {
        PrimitiveKind::Bool => value
            .as_bool()
            .map(NativeValue::Bool)
            .ok_or_else(|| mismatch(kind.name(), value)),
        PrimitiveKind::Byte => {
            let v = integral(numeric(value, kind)?, kind)?;
            i8::try_from(v)
                .map(NativeValue::Byte)
                .map_err(|_| out_of_range(v, kind))
        }
        PrimitiveKind::Short => {
            let v = integral(numeric(value, kind)?, kind)?;
            i16::try_from(v)
                .map(NativeValue::Short)
                .map_err(|_| out_of_range(v, kind))
        }
        PrimitiveKind::Int => {
            let v = integral(numeric(value, kind)?, kind)?;
            i32::try_from(v)
                .map(NativeValue::Int)
                .map_err(|_| out_of_range(v, kind))
        }
        PrimitiveKind::Long => Ok(NativeValue::Long(integral(numeric(value, kind)?, kind)?)),
        PrimitiveKind::Float => Ok(NativeValue::Float(match numeric(value, kind)? {
            Number::Int(v) => v as f32,
            Number::Float(v) => v as f32,
        })),
        PrimitiveKind::Double => Ok(NativeValue::Double(match numeric(value, kind)? {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        })),
        PrimitiveKind::Char => to_char(value),
        PrimitiveKind::Void => Ok(NativeValue::Void),
    }
}

fn to_char(value: &ScriptValue) -> Result<NativeValue, ConversionError> {
    match value {
        ScriptValue::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(NativeValue::Char(c)),
                _ => Err(ConversionError::InvalidChar {
                    value: s.to_string(),
                }),
            }
        }
        ScriptValue::Int(v) => u32::try_from(*v)
            .ok()
            .and_then(char::from_u32)
            .map(NativeValue::Char)
            .ok_or_else(|| ConversionError::InvalidChar {
                value: v.to_string(),
            }),
        other => Err(mismatch(PrimitiveKind::Char.name(), other)),
    }
}

fn to_reference(value: &ScriptValue, name: &str) -> Result<NativeValue, ConversionError> {
    if value.is_nullish() {
        return Ok(NativeValue::Null);
    }

    if name == well_known::STRING {
        return match value {
            ScriptValue::String(s) => Ok(NativeValue::String(s.clone())),
            ScriptValue::Bool(_) | ScriptValue::Int(_) | ScriptValue::Float(_) => {
                Ok(NativeValue::string(value.to_display_string()))
            }
            other => Err(mismatch(name, other)),
        };
    }

    if name == well_known::OBJECT {
        return match value {
            ScriptValue::Bool(v) => Ok(NativeValue::Bool(*v)),
            ScriptValue::Int(v) => Ok(i32::try_from(*v)
                .map(NativeValue::Int)
                .unwrap_or(NativeValue::Long(*v))),
            ScriptValue::Float(v) => Ok(NativeValue::Double(*v)),
            ScriptValue::String(s) => Ok(NativeValue::String(s.clone())),
            ScriptValue::Array(_) => to_array(value, &NativeType::object()),
            other => other
                .unwrap_native()
                .map(NativeValue::Object)
                .ok_or_else(|| mismatch(name, other)),
        };
    }

    match value.unwrap_native() {
        Some(obj) if obj.is_instance_of(name) => Ok(NativeValue::Object(obj)),
        Some(obj) => Err(ConversionError::NotAssignable {
            expected: name.to_string(),
            actual: obj.class().qualified_name().to_string(),
        }),
        None => Err(mismatch(name, value)),
    }
}

fn to_array(value: &ScriptValue, element: &NativeType) -> Result<NativeValue, ConversionError> {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => Ok(NativeValue::Null),
        ScriptValue::Array(items) => {
            let items = items
                .iter()
                .map(|item| from_script(item, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(NativeValue::Array(NativeArray::new(element.clone(), items)))
        }
        other => Err(mismatch(NativeType::array_of(element.clone()).to_string(), other)),
    }
}

/// Extract a Rust value from a script value.
pub trait FromScript: Sized {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;
}

macro_rules! impl_from_script_int {
    ($($ty:ty => $kind:expr),*) => {
        $(
            impl FromScript for $ty {
                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    if value.is_nullish() {
                        return Err(ConversionError::NullToPrimitive { target: $kind.name() });
                    }
                    let v = integral(numeric(value, $kind)?, $kind)?;
                    <$ty>::try_from(v).map_err(|_| out_of_range(v, $kind))
                }
            }
        )*
    };
}

impl_from_script_int!(
    i8 => PrimitiveKind::Byte,
    i16 => PrimitiveKind::Short,
    i32 => PrimitiveKind::Int,
    i64 => PrimitiveKind::Long
);

impl FromScript for f64 {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match from_script(value, &NativeType::DOUBLE)? {
            NativeValue::Double(v) => Ok(v),
            _ => Err(mismatch("double", value)),
        }
    }
}

impl FromScript for bool {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromScript for String {
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::String(s) => Ok(s.to_string()),
            other => Err(mismatch(well_known::STRING, other)),
        }
    }
}
