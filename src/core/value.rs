use crate::entity::{CollectionRef, EntityRef};
use std::fmt;

/// Dynamic field value exchanged between the accessor layer and entities.
///
/// `Entity` and `Collection` carry shared handles; equality on them is
/// reference identity, never structural.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Entity(EntityRef),
    Collection(CollectionRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Entity(_) => "ENTITY",
            Self::Collection(_) => "COLLECTION",
        }
    }

    /// Loose truthiness used when coercing association values:
    /// `NULL`, `false`, `0`, `0.0`, `""` and `"0"` are falsy, handles never are.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty() && s != "0",
            Self::Entity(_) | Self::Collection(_) => true,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionRef> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a.ptr_eq(b),
            (Self::Collection(a), Self::Collection(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Entity(entity) => write!(f, "{}@{:#x}", entity.class_name(), entity.key().as_usize()),
            Self::Collection(collection) => write!(f, "[{} item(s)]", collection.len()),
        }
    }
}

/// A value did not have the shape a typed slot expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl fmt::Display for ValueMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueMismatch {}

/// Conversion from a dynamic [`Value`] into a typed field or argument.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch>;
}

/// Conversion from a typed field or return value into a dynamic [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> std::result::Result<T, ValueMismatch> {
    Err(ValueMismatch {
        expected,
        found: value.type_name(),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Integer(i) => Ok(i),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Integer(i) => i32::try_from(i).or_else(|_| mismatch("INTEGER (i32)", &Value::Integer(i))),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Integer(i) => u64::try_from(i).or_else(|_| mismatch("INTEGER (u64)", &Value::Integer(i))),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => mismatch("FLOAT", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("TEXT", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => mismatch("BOOLEAN", &other),
        }
    }
}

impl FromValue for EntityRef {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Entity(entity) => Ok(entity),
            other => mismatch("ENTITY", &other),
        }
    }
}

impl FromValue for CollectionRef {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Collection(collection) => Ok(collection),
            other => mismatch("COLLECTION", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueMismatch> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        // Saturate: identifiers beyond i64::MAX are not representable anyway.
        Value::Integer(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoValue for EntityRef {
    fn into_value(self) -> Value {
        Value::Entity(self)
    }
}

impl IntoValue for CollectionRef {
    fn into_value(self) -> Value {
        Value::Collection(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    value.into_value()
                }
            }
        )*
    };
}

impl_from_for_value!(i64, i32, f64, String, &str, bool, EntityRef, CollectionRef);
