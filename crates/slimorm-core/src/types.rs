//! Host type tags, generic DB parameter types, and host-side conversions.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ConversionError, Result};
use crate::value::Value;

/// The host (Rust) type family of a mapped field.
///
/// Dialect type maps are keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    String,
    Char,
    Bytes,
    Uuid,
    Date,
    Time,
    DateTime,
    /// Structured data stored through its JSON text form.
    Json,
    /// A type with no native column mapping and no serialization capability.
    Custom,
}

impl HostType {
    /// Numeric-family types are rendered unquoted in literal SQL.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            HostType::Bool
                | HostType::I8
                | HostType::I16
                | HostType::I32
                | HostType::I64
                | HostType::U8
                | HostType::U16
                | HostType::U32
                | HostType::U64
                | HostType::F32
                | HostType::F64
                | HostType::Decimal
        )
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            HostType::I8
                | HostType::I16
                | HostType::I32
                | HostType::I64
                | HostType::U8
                | HostType::U16
                | HostType::U32
                | HostType::U64
        )
    }

    /// Whether values of this type can fall back to a string column and
    /// string parameter when a dialect has no direct mapping.
    pub const fn is_string_serializable(self) -> bool {
        !matches!(self, HostType::Custom)
    }
}

/// Generic parameter type tag passed to drivers alongside bound values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Single,
    Double,
    Decimal,
    String,
    StringFixedLength,
    Binary,
    Guid,
    Date,
    Time,
    DateTime,
    Object,
}

/// Host type of a field together with its full Rust type path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub host: HostType,
    /// Full type path, reported in unsupported-type errors.
    pub type_name: &'static str,
}

impl FieldType {
    pub const fn new(host: HostType, type_name: &'static str) -> Self {
        Self { host, type_name }
    }

    /// Field type for `T` tagged with an explicit host type.
    pub fn of<T: ?Sized>(host: HostType) -> Self {
        Self::new(host, std::any::type_name::<T>())
    }
}

// ============================================================================
// SqlField
// ============================================================================

/// A Rust type that can be stored in a mapped field.
///
/// `from_value` maps SQL NULL to the type's default value; `Option<T>` maps
/// it to `None` and marks the column nullable.
///
/// Reading is lenient, since drivers disagree on how they hand values back:
/// numeric types parse trimmed text, `bool` accepts `true`/`t`/`yes`/`1` and
/// their negatives as text or any integer, and `String` takes the text form
/// of any non-binary value. Values that cannot fit the target still fail,
/// including finite doubles beyond the `f32` range.
pub trait SqlField: Sized {
    /// Whether the column accepts NULL.
    const NULLABLE: bool = false;

    fn field_type() -> FieldType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(value: &Value, to: &'static str) -> crate::Error {
    ConversionError::new(value.type_name(), to).into()
}

fn narrow_f32(d: f64) -> Result<f32> {
    if d.is_finite() && d.abs() > f64::from(f32::MAX) {
        return Err(ConversionError::new("DOUBLE", "f32")
            .with_detail(format!("{d} is out of range"))
            .into());
    }
    Ok(d as f32)
}

fn parse_text<T: FromStr>(s: &str, to: &'static str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    s.trim().parse::<T>().map_err(|e| {
        ConversionError::new("TEXT", to)
            .with_detail(e.to_string())
            .into()
    })
}

fn value_to_i128(value: &Value, to: &'static str) -> Result<i128> {
    match value {
        Value::Double(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i128),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(*f as i128),
        Value::Decimal(d) if d.fract().is_zero() => d.to_i128().ok_or_else(|| mismatch(value, to)),
        Value::Text(s) => parse_text::<i128>(s, to),
        other => other
            .as_i64()
            .map(i128::from)
            .ok_or_else(|| mismatch(other, to)),
    }
}

macro_rules! impl_sql_field_int {
    ($($ty:ty => $host:ident),* $(,)?) => {
        $(
            impl SqlField for $ty {
                fn field_type() -> FieldType {
                    FieldType::of::<$ty>(HostType::$host)
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: Value) -> Result<Self> {
                    if value.is_null() {
                        return Ok(0);
                    }
                    let wide = value_to_i128(&value, stringify!($ty))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        ConversionError::new(value.type_name(), stringify!($ty))
                            .with_detail(format!("{wide} out of range"))
                            .into()
                    })
                }
            }
        )*
    };
}

impl_sql_field_int! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
}

impl SqlField for u64 {
    fn field_type() -> FieldType {
        FieldType::of::<u64>(HostType::U64)
    }

    fn to_value(&self) -> Value {
        i64::try_from(*self).map_or_else(|_| Value::Decimal(Decimal::from(*self)), Value::BigInt)
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(0);
        }
        let wide = value_to_i128(&value, "u64")?;
        u64::try_from(wide).map_err(|_| mismatch(&value, "u64"))
    }
}

impl SqlField for bool {
    fn field_type() -> FieldType {
        FieldType::of::<bool>(HostType::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" => Ok(false),
                _ => Err(mismatch(&value, "bool")),
            },
            other => other
                .as_i64()
                .map(|i| i != 0)
                .ok_or_else(|| mismatch(other, "bool")),
        }
    }
}

impl SqlField for f32 {
    fn field_type() -> FieldType {
        FieldType::of::<f32>(HostType::F32)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(0.0),
            Value::Float(f) => Ok(*f),
            Value::Double(d) => narrow_f32(*d),
            Value::Text(s) => parse_text::<f64>(s, "f32").and_then(narrow_f32),
            other => other
                .as_f64()
                .ok_or_else(|| mismatch(other, "f32"))
                .and_then(narrow_f32),
        }
    }
}

impl SqlField for f64 {
    fn field_type() -> FieldType {
        FieldType::of::<f64>(HostType::F64)
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(0.0),
            Value::Text(s) => parse_text(s, "f64"),
            other => other.as_f64().ok_or_else(|| mismatch(other, "f64")),
        }
    }
}

impl SqlField for Decimal {
    fn field_type() -> FieldType {
        FieldType::of::<Decimal>(HostType::Decimal)
    }

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(Decimal::ZERO),
            Value::Decimal(d) => Ok(*d),
            Value::Double(d) => Decimal::try_from(*d).map_err(|_| mismatch(&value, "Decimal")),
            Value::Float(f) => Decimal::try_from(*f).map_err(|_| mismatch(&value, "Decimal")),
            Value::Text(s) => parse_text(s, "Decimal"),
            other => other
                .as_i64()
                .map(Decimal::from)
                .ok_or_else(|| mismatch(other, "Decimal")),
        }
    }
}

impl SqlField for String {
    fn field_type() -> FieldType {
        FieldType::of::<String>(HostType::String)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| {
                ConversionError::new("BLOB", "String")
                    .with_detail(e.to_string())
                    .into()
            }),
            other => Ok(other.to_text().unwrap_or_default()),
        }
    }
}

impl SqlField for char {
    fn field_type() -> FieldType {
        FieldType::of::<char>(HostType::Char)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok('\0'),
            Value::Text(s) => s.chars().next().ok_or_else(|| mismatch(&value, "char")),
            other => Err(mismatch(other, "char")),
        }
    }
}

impl SqlField for Vec<u8> {
    fn field_type() -> FieldType {
        FieldType::of::<Vec<u8>>(HostType::Bytes)
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

impl SqlField for Uuid {
    fn field_type() -> FieldType {
        FieldType::of::<Uuid>(HostType::Uuid)
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(Uuid::nil()),
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => parse_text(s, "Uuid"),
            Value::Bytes(b) => Uuid::from_slice(b).map_err(|_| mismatch(&value, "Uuid")),
            other => Err(mismatch(other, "Uuid")),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl SqlField for NaiveDateTime {
    fn field_type() -> FieldType {
        FieldType::of::<NaiveDateTime>(HostType::DateTime)
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(NaiveDateTime::default()),
            Value::Timestamp(ts) => Ok(*ts),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).ok_or_else(|| mismatch(&value, "NaiveDateTime")),
            Value::Text(s) => parse_datetime(s).ok_or_else(|| {
                ConversionError::new("TEXT", "NaiveDateTime")
                    .with_detail(format!("unrecognized timestamp {s:?}"))
                    .into()
            }),
            other => Err(mismatch(other, "NaiveDateTime")),
        }
    }
}

impl SqlField for NaiveDate {
    fn field_type() -> FieldType {
        FieldType::of::<NaiveDate>(HostType::Date)
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(NaiveDate::default()),
            Value::Date(d) => Ok(*d),
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::Text(s) => parse_datetime(s)
                .map(|ts| ts.date())
                .ok_or_else(|| mismatch(&value, "NaiveDate")),
            other => Err(mismatch(other, "NaiveDate")),
        }
    }
}

impl SqlField for NaiveTime {
    fn field_type() -> FieldType {
        FieldType::of::<NaiveTime>(HostType::Time)
    }

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Ok(NaiveTime::default()),
            Value::Time(t) => Ok(*t),
            Value::Timestamp(ts) => Ok(ts.time()),
            Value::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map_err(|_| mismatch(&value, "NaiveTime")),
            other => Err(mismatch(other, "NaiveTime")),
        }
    }
}

impl SqlField for serde_json::Value {
    fn field_type() -> FieldType {
        FieldType::of::<serde_json::Value>(HostType::Json)
    }

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Json(j) => Ok(j),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| {
                ConversionError::new("TEXT", "JSON")
                    .with_detail(e.to_string())
                    .into()
            }),
            other => Err(mismatch(&other, "JSON")),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const NULLABLE: bool = true;

    fn field_type() -> FieldType {
        T::field_type()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

// ============================================================================
// Serialized fields
// ============================================================================

/// Getter half for fields stored through their JSON text form.
pub fn json_to_value<T: Serialize>(value: &T) -> Value {
    match Value::serialized(value) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize field, storing NULL");
            Value::Null
        }
    }
}

/// Setter half for fields stored through their JSON text form.
pub fn json_from_value<T: DeserializeOwned + Default>(value: Value) -> Result<T> {
    let json = match value {
        Value::Null => return Ok(T::default()),
        Value::Json(j) => j,
        Value::Text(s) => serde_json::from_str(&s).map_err(|e| {
            ConversionError::new("TEXT", std::any::type_name::<T>()).with_detail(e.to_string())
        })?,
        other => return Err(mismatch(&other, std::any::type_name::<T>())),
    };
    serde_json::from_value(json).map_err(|e| {
        ConversionError::new("JSON", std::any::type_name::<T>())
            .with_detail(e.to_string())
            .into()
    })
}
