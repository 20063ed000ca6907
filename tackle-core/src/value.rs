use crate::{Error, Result};
use rust_decimal::Decimal;
use std::borrow::Cow;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A database value together with its type tag.
///
/// Every variant carries an `Option` so that a NULL of a known column type is
/// representable; an empty variant doubles as the type prototype used by the
/// metadata layer and the dialect type writers.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Int128(Option<i128>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    UInt128(Option<u128>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>, /* prec: */ u8, /* scale: */ u8),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Int128(l), Self::Int128(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::UInt128(l), Self::UInt128(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l, l_prec, l_scale), Self::Decimal(r, r_prec, r_scale)) => {
                l == r && l_prec == r_prec && l_scale == r_scale
            }
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Value {
    /// True for the untyped NULL and for a typed variant holding no value.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int8(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::Int128(None)
            | Value::UInt8(None)
            | Value::UInt16(None)
            | Value::UInt32(None)
            | Value::UInt64(None)
            | Value::UInt128(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None, ..)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None) => true,
            _ => false,
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Decimal(.., l_prec, l_scale), Self::Decimal(.., r_prec, r_scale)) => {
                l_prec == r_prec && l_scale == r_scale
            }
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }

    /// The empty variant carrying only the type tag.
    pub fn prototype(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Int128(..) => Value::Int128(None),
            Value::UInt8(..) => Value::UInt8(None),
            Value::UInt16(..) => Value::UInt16(None),
            Value::UInt32(..) => Value::UInt32(None),
            Value::UInt64(..) => Value::UInt64(None),
            Value::UInt128(..) => Value::UInt128(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(.., precision, scale) => Value::Decimal(None, *precision, *scale),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
        }
    }
}

fn null_value_error() -> Error {
    Error::UnexpectedData("NULL value bound to a non-nullable target".into())
}

fn convert_error(target: &str, value: &Value) -> Error {
    Error::Mapping(format!("cannot convert {value:?} into `{target}`"))
}

/// Conversion between Rust types and [`Value`], both directions.
///
/// `try_from_value` is checked: integer conversions that fit are accepted,
/// lossy ones are refused, and a NULL into a non-`Option` target is an
/// [`Error::UnexpectedData`] rather than a silent zero value.
pub trait AsValue: Sized {
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_as_value_int {
    ($t:ty, $variant:path, [$($src:path),* $(,)?]) => {
        impl AsValue for $t {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if value.is_null() {
                    return Err(null_value_error());
                }
                match value {
                    $variant(Some(v)) => Ok(v),
                    $($src(Some(v)) => {
                        <$t>::try_from(v).map_err(|_| {
                            Error::Mapping(format!(
                                "value {} does not fit into `{}`",
                                v,
                                stringify!($t)
                            ))
                        })
                    })*
                    other => Err(convert_error(stringify!($t), &other)),
                }
            }
        }
    };
}

impl_as_value_int!(i8, Value::Int8, [Value::UInt8]);
impl_as_value_int!(i16, Value::Int16, [Value::Int8, Value::UInt8, Value::UInt16]);
impl_as_value_int!(
    i32,
    Value::Int32,
    [Value::Int8, Value::Int16, Value::UInt8, Value::UInt16, Value::UInt32]
);
impl_as_value_int!(
    i64,
    Value::Int64,
    [
        Value::Int8,
        Value::Int16,
        Value::Int32,
        Value::UInt8,
        Value::UInt16,
        Value::UInt32,
        Value::UInt64
    ]
);
impl_as_value_int!(
    i128,
    Value::Int128,
    [
        Value::Int8,
        Value::Int16,
        Value::Int32,
        Value::Int64,
        Value::UInt8,
        Value::UInt16,
        Value::UInt32,
        Value::UInt64,
        Value::UInt128
    ]
);
impl_as_value_int!(u8, Value::UInt8, [Value::Int8]);
impl_as_value_int!(u16, Value::UInt16, [Value::Int8, Value::Int16, Value::UInt8]);
impl_as_value_int!(
    u32,
    Value::UInt32,
    [Value::Int8, Value::Int16, Value::Int32, Value::UInt8, Value::UInt16]
);
impl_as_value_int!(
    u64,
    Value::UInt64,
    [
        Value::Int8,
        Value::Int16,
        Value::Int32,
        Value::Int64,
        Value::UInt8,
        Value::UInt16,
        Value::UInt32
    ]
);
impl_as_value_int!(
    u128,
    Value::UInt128,
    [
        Value::Int8,
        Value::Int16,
        Value::Int32,
        Value::Int64,
        Value::Int128,
        Value::UInt8,
        Value::UInt16,
        Value::UInt32,
        Value::UInt64
    ]
);

macro_rules! impl_as_value_direct {
    ($t:ty, $variant:path) => {
        impl AsValue for $t {
            fn as_empty_value() -> Value {
                $variant(None)
            }
            fn as_value(self) -> Value {
                $variant(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if value.is_null() {
                    return Err(null_value_error());
                }
                match value {
                    $variant(Some(v)) => Ok(v),
                    other => Err(convert_error(stringify!($t), &other)),
                }
            }
        }
    };
}

impl_as_value_direct!(String, Value::Varchar);
impl_as_value_direct!(Box<[u8]>, Value::Blob);
impl_as_value_direct!(Date, Value::Date);
impl_as_value_direct!(Time, Value::Time);
impl_as_value_direct!(PrimitiveDateTime, Value::Timestamp);
impl_as_value_direct!(OffsetDateTime, Value::TimestampWithTimezone);
impl_as_value_direct!(Uuid, Value::Uuid);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Err(null_value_error());
        }
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Int8(Some(v)) => Ok(v != 0),
            Value::Int16(Some(v)) => Ok(v != 0),
            Value::Int32(Some(v)) => Ok(v != 0),
            Value::Int64(Some(v)) => Ok(v != 0),
            Value::Int128(Some(v)) => Ok(v != 0),
            Value::UInt8(Some(v)) => Ok(v != 0),
            Value::UInt16(Some(v)) => Ok(v != 0),
            Value::UInt32(Some(v)) => Ok(v != 0),
            Value::UInt64(Some(v)) => Ok(v != 0),
            Value::UInt128(Some(v)) => Ok(v != 0),
            other => Err(convert_error("bool", &other)),
        }
    }
}

impl AsValue for f32 {
    fn as_empty_value() -> Value {
        Value::Float32(None)
    }
    fn as_value(self) -> Value {
        Value::Float32(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Err(null_value_error());
        }
        match value {
            Value::Float32(Some(v)) => Ok(v),
            other => Err(convert_error("f32", &other)),
        }
    }
}

impl AsValue for f64 {
    fn as_empty_value() -> Value {
        Value::Float64(None)
    }
    fn as_value(self) -> Value {
        Value::Float64(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Err(null_value_error());
        }
        match value {
            Value::Float64(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => Ok(v as f64),
            other => Err(convert_error("f64", &other)),
        }
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None, 0, 0)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self), 0, 0)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Err(null_value_error());
        }
        match value {
            Value::Decimal(Some(v), ..) => Ok(v),
            Value::Int8(Some(v)) => Ok(v.into()),
            Value::Int16(Some(v)) => Ok(v.into()),
            Value::Int32(Some(v)) => Ok(v.into()),
            Value::Int64(Some(v)) => Ok(v.into()),
            other => Err(convert_error("Decimal", &other)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Box::<[u8]>::try_from_value(value).map(Into::into)
    }
}

impl AsValue for Cow<'static, str> {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.into_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        String::try_from_value(value).map(Cow::Owned)
    }
}

impl AsValue for &'static str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(convert_error("&'static str", &value))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::try_from_value(value).map(Some)
        }
    }
}

impl<T: AsValue> AsValue for Box<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        (*self).as_value()
    }
    fn try_from_value(value: Value) -> Result<Self> {
        T::try_from_value(value).map(Box::new)
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}
