//! Conversions between application values and native engine values
//!
//! Both the row slots and the array elements go through here, so the
//! scaling, rounding and range rules are the same for both.

use std::convert::TryFrom;

use crate::{
    charset::Charset,
    date_time::{Date, Time, Timestamp},
    error::{err_out_of_range, err_type_conv},
    ibase,
    types::{DbKey, WireType},
    value::{Value, ValueKind},
    FbError,
};

/// A decoded native value
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    /// Fixed length text, padded
    Text(Vec<u8>),
    Varying(Vec<u8>),
    Short(i16),
    Long(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Date(ibase::ISC_DATE),
    Time(ibase::ISC_TIME),
    Timestamp(ibase::ISC_TIMESTAMP),
    Blob(ibase::ISC_QUAD),
    Array(ibase::ISC_QUAD),
    Boolean(bool),
}

/// Shape of the native side of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub wire: WireType,
    /// Engine scale, zero or negative
    pub scale: i16,
    /// Byte length of the text types
    pub length: usize,
}

impl Field {
    /// Implied decimal digits of a fixed point column
    pub fn digits(&self) -> i32 {
        (-self.scale).max(0) as i32
    }
}

/// Converts a native value to the requested application type
pub fn load(
    native: &Native,
    field: &Field,
    kind: ValueKind,
    charset: &Charset,
    origin: &'static str,
) -> Result<Value, FbError> {
    let incompatible = || err_type_conv(origin, field.wire.name(), kind_name(kind));

    Ok(match native {
        Native::Text(bytes) | Native::Varying(bytes) => match kind {
            ValueKind::String => Value::String(charset.decode(bytes.as_slice())?),
            ValueKind::Bytes => Value::Bytes(bytes.clone()),
            ValueKind::DbKey => Value::DbKey(DbKey(bytes.clone())),
            ValueKind::Bool => Value::Bool(matches!(
                bytes.first(),
                Some(b'T') | Some(b't') | Some(b'Y') | Some(b'y') | Some(b'1')
            )),
            _ => return incompatible(),
        },

        Native::Short(v) => return load_fixed(*v as i64, field, kind, origin),
        Native::Long(v) => return load_fixed(*v as i64, field, kind, origin),
        Native::Int64(v) => return load_fixed(*v, field, kind, origin),

        Native::Float(v) => match kind {
            ValueKind::Float => Value::Float(*v),
            ValueKind::Double => Value::Double(*v as f64),
            ValueKind::String => Value::String(v.to_string()),
            _ => return incompatible(),
        },

        Native::Double(v) => match kind {
            ValueKind::Double => Value::Double(*v),
            ValueKind::Float => Value::Float(narrow_f32(*v, origin)?),
            ValueKind::String => Value::String(v.to_string()),
            _ => return incompatible(),
        },

        Native::Date(d) => {
            let date = Date::from_isc(*d);
            match kind {
                ValueKind::Date => Value::Date(date),
                ValueKind::Timestamp => Value::Timestamp(date.into()),
                ValueKind::String => Value::String(date.to_string()),
                _ => return incompatible(),
            }
        }

        Native::Time(t) => {
            let time = Time::from_isc(*t);
            match kind {
                ValueKind::Time => Value::Time(time),
                ValueKind::String => Value::String(time.to_string()),
                _ => return incompatible(),
            }
        }

        Native::Timestamp(ts) => {
            let ts = Timestamp::from_isc(*ts);
            match kind {
                ValueKind::Timestamp => Value::Timestamp(ts),
                ValueKind::Date => Value::Date(ts.date),
                ValueKind::Time => Value::Time(ts.time),
                ValueKind::String => Value::String(ts.to_string()),
                _ => return incompatible(),
            }
        }

        Native::Blob(id) => match kind {
            ValueKind::BlobId => Value::BlobId(*id),
            _ => return incompatible(),
        },

        Native::Array(id) => match kind {
            ValueKind::ArrayId => Value::ArrayId(*id),
            _ => return incompatible(),
        },

        Native::Boolean(b) => match kind {
            ValueKind::Bool => Value::Bool(*b),
            ValueKind::String => Value::String(if *b { "true" } else { "false" }.to_string()),
            _ => return incompatible(),
        },
    })
}

fn load_fixed(
    raw: i64,
    field: &Field,
    kind: ValueKind,
    origin: &'static str,
) -> Result<Value, FbError> {
    let digits = field.digits();

    Ok(match kind {
        ValueKind::Bool | ValueKind::Int16 | ValueKind::Int32 | ValueKind::Int64 if digits != 0 => {
            return Err(scaled_integer(origin))
        }
        ValueKind::Bool => Value::Bool(raw != 0),
        ValueKind::Int16 => Value::Int16(i16::try_from(raw).or_else(|_| err_out_of_range(origin))?),
        ValueKind::Int32 => Value::Int32(i32::try_from(raw).or_else(|_| err_out_of_range(origin))?),
        ValueKind::Int64 => Value::Int64(raw),
        ValueKind::Float => Value::Float((raw as f64 / 10f64.powi(digits)) as f32),
        ValueKind::Double => Value::Double(raw as f64 / 10f64.powi(digits)),
        ValueKind::String => Value::String(format_scaled(raw, digits)),
        _ => return err_type_conv(origin, field.wire.name(), kind_name(kind)),
    })
}

/// Converts an application value to the native value of `field`
pub fn store(
    value: Value,
    field: &Field,
    charset: &Charset,
    origin: &'static str,
) -> Result<Native, FbError> {
    let kind = value.kind();
    let incompatible = || err_type_conv(origin, kind_name(kind), field.wire.name());

    Ok(match field.wire {
        WireType::Text => {
            let mut bytes = text_bytes(value, charset, origin, field)?;
            bytes.truncate(field.length);
            bytes.resize(field.length, b' ');
            Native::Text(bytes)
        }

        WireType::Varying => {
            let mut bytes = text_bytes(value, charset, origin, field)?;
            bytes.truncate(field.length);
            Native::Varying(bytes)
        }

        WireType::Short | WireType::Long | WireType::Int64 => {
            let digits = field.digits();
            let fixed = match value {
                Value::Bool(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_)
                    if digits != 0 =>
                {
                    return Err(scaled_integer(origin))
                }
                Value::Bool(b) => b as i64,
                Value::Int16(v) => v as i64,
                Value::Int32(v) => v as i64,
                Value::Int64(v) => v,
                Value::Float(v) => scale_round(v as f64, digits, origin)?,
                Value::Double(v) => scale_round(v, digits, origin)?,
                _ => return incompatible(),
            };

            match field.wire {
                WireType::Short => {
                    Native::Short(i16::try_from(fixed).or_else(|_| err_out_of_range(origin))?)
                }
                WireType::Long => {
                    Native::Long(i32::try_from(fixed).or_else(|_| err_out_of_range(origin))?)
                }
                _ => Native::Int64(fixed),
            }
        }

        WireType::Float => match value {
            Value::Float(v) => Native::Float(v),
            Value::Double(v) => Native::Float(narrow_f32(v, origin)?),
            _ => return incompatible(),
        },

        WireType::Double | WireType::DFloat => match value {
            Value::Float(v) => Native::Double(v as f64),
            Value::Double(v) => Native::Double(v),
            _ => return incompatible(),
        },

        WireType::Date => match value {
            Value::Date(d) => Native::Date(d.to_isc()),
            Value::Timestamp(ts) => Native::Date(ts.date.to_isc()),
            _ => return incompatible(),
        },

        WireType::Time => match value {
            Value::Time(t) => Native::Time(t.to_isc()),
            Value::Timestamp(ts) => Native::Time(ts.time.to_isc()),
            _ => return incompatible(),
        },

        WireType::Timestamp => match value {
            Value::Timestamp(ts) => Native::Timestamp(ts.to_isc()),
            Value::Date(d) => Native::Timestamp(Timestamp::from(d).to_isc()),
            _ => return incompatible(),
        },

        WireType::Blob => match value {
            Value::BlobId(id) => Native::Blob(id),
            _ => return incompatible(),
        },

        WireType::Array => match value {
            Value::ArrayId(id) => Native::Array(id),
            _ => return incompatible(),
        },

        WireType::Boolean => match value {
            Value::Bool(b) => Native::Boolean(b),
            _ => return incompatible(),
        },
    })
}

fn text_bytes(
    value: Value,
    charset: &Charset,
    origin: &'static str,
    field: &Field,
) -> Result<Vec<u8>, FbError> {
    Ok(match value {
        Value::String(s) => charset.encode(s)?.into_owned(),
        Value::Bytes(b) => b,
        Value::DbKey(k) => k.0,
        Value::Bool(b) => vec![if b { b'T' } else { b'F' }],
        other => {
            return err_type_conv(origin, kind_name(other.kind()), field.wire.name())
        }
    })
}

/// Multiplies by `10^digits` and rounds half away from zero
pub fn scale_round(value: f64, digits: i32, origin: &'static str) -> Result<i64, FbError> {
    let scaled = (value * 10f64.powi(digits)).round();

    // i64::MAX as f64 rounds up to 2^63
    if !scaled.is_finite() || scaled < -9.223_372_036_854_775_808e18 || scaled >= 9.223_372_036_854_775_808e18 {
        return err_out_of_range(origin);
    }

    Ok(scaled as i64)
}

fn narrow_f32(value: f64, origin: &'static str) -> Result<f32, FbError> {
    if value.is_finite() && value.abs() > f32::MAX as f64 {
        return err_out_of_range(origin);
    }

    Ok(value as f32)
}

/// Decimal text of a fixed point value
pub fn format_scaled(raw: i64, digits: i32) -> String {
    if digits <= 0 {
        return raw.to_string();
    }

    let divisor = 10u64.pow(digits as u32);
    let abs = raw.unsigned_abs();

    format!(
        "{}{}.{:0width$}",
        if raw < 0 { "-" } else { "" },
        abs / divisor,
        abs % divisor,
        width = digits as usize
    )
}

fn scaled_integer(origin: &'static str) -> FbError {
    FbError::logic(
        origin,
        "NUMERIC/DECIMAL column with a scale: use a floating point value and let the scaling happen",
    )
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Bool => "bool",
        ValueKind::Int16 => "i16",
        ValueKind::Int32 => "i32",
        ValueKind::Int64 => "i64",
        ValueKind::Float => "f32",
        ValueKind::Double => "f64",
        ValueKind::String => "String",
        ValueKind::Bytes => "Vec<u8>",
        ValueKind::DbKey => "DbKey",
        ValueKind::Date => "Date",
        ValueKind::Time => "Time",
        ValueKind::Timestamp => "Timestamp",
        ValueKind::BlobId => "Blob",
        ValueKind::ArrayId => "Array",
    }
}
