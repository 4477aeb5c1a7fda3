//! Values moving between the applications and the column slots

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    date_time::{Date, Time, Timestamp},
    ibase::ISC_QUAD,
    types::DbKey,
};

/// An application side value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    DbKey(DbKey),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
    BlobId(ISC_QUAD),
    ArrayId(ISC_QUAD),
}

/// The application side types, used to request a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Bytes,
    DbKey,
    Date,
    Time,
    Timestamp,
    BlobId,
    ArrayId,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int16(_) => ValueKind::Int16,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::DbKey(_) => ValueKind::DbKey,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::BlobId(_) => ValueKind::BlobId,
            Value::ArrayId(_) => ValueKind::ArrayId,
        }
    }
}

/// Implemented for types that can be stored in a column or parameter
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Implemented for types that can be read from a column
pub trait FromValue: Sized {
    const KIND: ValueKind;

    /// `None` only when the value is not of `KIND`
    fn from_value(value: Value) -> Option<Self>;
}

/// Implements the conversion traits for the types with a `Value` variant
macro_rules! impl_value {
    ( $( $t: ty => $variant: ident ),+ ) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $t {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_value!(
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    DbKey => DbKey,
    Date => Date,
    Time => Time,
    Timestamp => Timestamp
);

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::String(self.clone())
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl IntoValue for NaiveTime {
    fn into_value(self) -> Value {
        Value::Time(self.into())
    }
}

impl FromValue for NaiveDate {
    const KIND: ValueKind = ValueKind::Date;

    fn from_value(value: Value) -> Option<Self> {
        Date::from_value(value).map(NaiveDate::from)
    }
}

impl FromValue for NaiveTime {
    const KIND: ValueKind = ValueKind::Time;

    fn from_value(value: Value) -> Option<Self> {
        Time::from_value(value).map(NaiveTime::from)
    }
}

impl FromValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn from_value(value: Value) -> Option<Self> {
        Timestamp::from_value(value).map(NaiveDateTime::from)
    }
}
