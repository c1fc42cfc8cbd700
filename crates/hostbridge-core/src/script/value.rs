//! Script-side values.

use std::fmt;
use std::sync::Arc;

use crate::error::{RuntimeError, ScriptResult};
use crate::runtime::ObjectRef;

use super::{ScriptContext, ScriptFn, Scriptable};

/// A dynamically-typed script value.
///
/// Cloning is cheap: strings, arrays, objects and functions are shared.
#[derive(Clone)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    /// Integral number
    Int(i64),
    /// Floating number
    Float(f64),
    String(Arc<str>),
    Array(Arc<[ScriptValue]>),
    /// Script object
    Object(Arc<dyn Scriptable>),
    Function(ScriptFn),
    /// Host object handed to script as-is
    Native(ObjectRef),
}

impl ScriptValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        ScriptValue::String(Arc::from(s.as_ref()))
    }

    pub fn array(items: Vec<ScriptValue>) -> Self {
        ScriptValue::Array(Arc::from(items))
    }

    pub fn object<T: Scriptable + 'static>(object: T) -> Self {
        ScriptValue::Object(Arc::new(object))
    }

    /// The script-level type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) | ScriptValue::Float(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "object",
            ScriptValue::Function(_) => "function",
            ScriptValue::Native(_) => "native",
        }
    }

    /// Type description for error messages; objects name their class.
    pub fn describe(&self) -> String {
        match self {
            ScriptValue::Object(obj) => obj.class_name().to_string(),
            ScriptValue::Native(obj) => obj.class().qualified_name().to_string(),
            other => other.type_name().to_string(),
        }
    }

    /// Null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Any number as f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(v) => Some(*v as f64),
            ScriptValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ScriptFn> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Scriptable>> {
        match self {
            ScriptValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The host object behind this value: a native value, or a script
    /// object that wraps one.
    pub fn unwrap_native(&self) -> Option<ObjectRef> {
        match self {
            ScriptValue::Native(obj) => Some(obj.clone()),
            ScriptValue::Object(obj) => obj.unwrap_native(),
            _ => None,
        }
    }

    /// Read a property of an object value.
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        match self {
            ScriptValue::Object(obj) => obj.get(name),
            _ => None,
        }
    }

    /// Write a property of an object value.
    pub fn put(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        match self {
            ScriptValue::Object(obj) => obj.put(name, value),
            other => Err(RuntimeError::UnknownMember {
                class_name: other.describe(),
                name: name.to_string(),
            }),
        }
    }

    /// Call a function value.
    pub fn call(
        &self,
        cx: &ScriptContext,
        this: &ScriptValue,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        match self {
            ScriptValue::Function(f) => f.call(cx, this, args),
            other => Err(RuntimeError::NotCallable {
                name: other.describe(),
            }),
        }
    }

    /// Call a method of an object value with the object as `this`.
    pub fn call_member(
        &self,
        cx: &ScriptContext,
        name: &str,
        args: &[ScriptValue],
    ) -> ScriptResult<ScriptValue> {
        match self.get(name) {
            Some(ScriptValue::Function(f)) => f.call(cx, self, args),
            Some(_) => Err(RuntimeError::NotCallable {
                name: name.to_string(),
            }),
            None => Err(RuntimeError::UnknownMember {
                class_name: self.describe(),
                name: name.to_string(),
            }),
        }
    }

    /// String conversion using script formatting rules.
    pub fn to_display_string(&self) -> String {
        match self {
            ScriptValue::Undefined => "undefined".to_string(),
            ScriptValue::Null => "null".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Int(v) => v.to_string(),
            ScriptValue::Float(v) => format_number(*v),
            ScriptValue::String(s) => s.to_string(),
            ScriptValue::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            ScriptValue::Object(obj) => format!("[object {}]", obj.class_name()),
            ScriptValue::Function(f) => format!("function {}()", f.name().unwrap_or("")),
            ScriptValue::Native(obj) => obj.class().qualified_name().to_string(),
        }
    }
}

/// Format a number the way script code prints it: integral values without a
/// fractional part, `NaN` and `Infinity` spelled out.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if v == 0.0 {
        // covers -0.0
        "0".to_string()
    } else {
        format!("{v}")
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Float(b))
            | (ScriptValue::Float(b), ScriptValue::Int(a)) => (*a as f64) == *b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::Object(a), ScriptValue::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a == b,
            (ScriptValue::Native(a), ScriptValue::Native(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "Undefined"),
            ScriptValue::Null => write!(f, "Null"),
            ScriptValue::Bool(v) => write!(f, "Bool({v})"),
            ScriptValue::Int(v) => write!(f, "Int({v})"),
            ScriptValue::Float(v) => write!(f, "Float({v})"),
            ScriptValue::String(s) => write!(f, "String({s:?})"),
            ScriptValue::Array(items) => f.debug_list().entries(items.iter()).finish(),
            ScriptValue::Object(obj) => write!(f, "Object({})", obj.class_name()),
            ScriptValue::Function(func) => write!(f, "{func:?}"),
            ScriptValue::Native(obj) => write!(f, "Native({})", obj.class().qualified_name()),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i32> for ScriptValue {
    fn from(v: i32) -> Self {
        ScriptValue::Int(i64::from(v))
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::string(v)
    }
}

impl From<String> for ScriptValue {
    fn from(v: String) -> Self {
        ScriptValue::String(Arc::from(v))
    }
}

impl From<ScriptFn> for ScriptValue {
    fn from(v: ScriptFn) -> Self {
        ScriptValue::Function(v)
    }
}

impl From<ObjectRef> for ScriptValue {
    fn from(v: ObjectRef) -> Self {
        ScriptValue::Native(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1e21), "1000000000000000000000");
    }

    #[test]
    fn display_strings() {
        assert_eq!(ScriptValue::Bool(true).to_display_string(), "true");
        assert_eq!(ScriptValue::Int(-3).to_display_string(), "-3");
        assert_eq!(
            ScriptValue::array(vec![ScriptValue::Int(1), ScriptValue::Null, "x".into()])
                .to_display_string(),
            "1,,x"
        );
    }

    #[test]
    fn numeric_equality_crosses_representations() {
        assert_eq!(ScriptValue::Int(2), ScriptValue::Float(2.0));
        assert_ne!(ScriptValue::Int(2), ScriptValue::string("2"));
        assert_ne!(ScriptValue::Null, ScriptValue::Undefined);
    }

    #[test]
    fn type_names() {
        assert_eq!(ScriptValue::Float(1.5).type_name(), "number");
        assert_eq!(ScriptValue::Undefined.type_name(), "undefined");
        assert!(ScriptValue::Null.is_nullish());
        assert!(!ScriptValue::Int(0).is_nullish());
    }

    #[test]
    fn calling_a_non_function_fails() {
        let guard = ScriptContext::enter();
        let err = ScriptValue::Int(1)
            .call(guard.context(), &ScriptValue::Undefined, &[])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotCallable { .. }));
    }
}
