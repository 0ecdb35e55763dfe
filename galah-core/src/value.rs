use std::fmt;

use crate::types;

/// A runtime value.
///
/// Values carry no type information beyond their variant. Struct values
/// hold their fields positionally, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    Void,
    Struct(Vec<Value>),
}

impl Value {
    /// Truthiness of an `if` condition. Only integers are ever used as
    /// conditions.
    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Int(value) if *value != 0)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Field `index` of a struct value.
    pub fn field(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.get(index),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Void => f.write_str("()"),
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Void
    }
}

/// A host type with a builtin Galah counterpart.
pub trait Representable: Sized {
    /// Name of the builtin Galah type.
    const TYPE_NAME: &'static str;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl Representable for i64 {
    const TYPE_NAME: &'static str = types::INT;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl Representable for String {
    const TYPE_NAME: &'static str = types::STRING;

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl Representable for bool {
    const TYPE_NAME: &'static str = "Bool";

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }
}

impl Representable for () {
    const TYPE_NAME: &'static str = types::VOID;

    fn into_value(self) -> Value {
        Value::Void
    }

    fn from_value(value: Value) -> Option<Self> {
        matches!(value, Value::Void).then_some(())
    }
}
