use rust_decimal::Decimal;
use tackle_core::{AsValue, Error, Value};
use time::macros::{date, datetime, time};
use uuid::Uuid;

#[test]
fn widening_integer_conversions_are_accepted() {
    assert_eq!(i64::try_from_value(Value::Int16(Some(-42))).unwrap(), -42);
    assert_eq!(i64::try_from_value(Value::UInt32(Some(7))).unwrap(), 7);
    assert_eq!(u16::try_from_value(Value::UInt8(Some(255))).unwrap(), 255);
    assert_eq!(i32::try_from_value(Value::UInt16(Some(65535))).unwrap(), 65535);
}

#[test]
fn lossy_integer_conversions_are_refused() {
    assert!(matches!(
        i8::try_from_value(Value::UInt8(Some(200))),
        Err(Error::Mapping(..))
    ));
    assert!(matches!(
        u64::try_from_value(Value::Int64(Some(-1))),
        Err(Error::Mapping(..))
    ));
    assert!(matches!(
        i64::try_from_value(Value::Varchar(Some("42".into()))),
        Err(Error::Mapping(..))
    ));
}

#[test]
fn null_into_non_option_is_an_error() {
    assert!(matches!(
        i32::try_from_value(Value::Int32(None)),
        Err(Error::UnexpectedData(..))
    ));
    assert!(matches!(
        String::try_from_value(Value::Null),
        Err(Error::UnexpectedData(..))
    ));
}

#[test]
fn null_into_option_is_none() {
    assert_eq!(Option::<i32>::try_from_value(Value::Int32(None)).unwrap(), None);
    assert_eq!(Option::<String>::try_from_value(Value::Null).unwrap(), None);
    assert_eq!(
        Option::<i32>::try_from_value(Value::Int32(Some(3))).unwrap(),
        Some(3)
    );
}

#[test]
fn bool_accepts_any_nonzero_integer() {
    assert!(bool::try_from_value(Value::Int64(Some(2))).unwrap());
    assert!(!bool::try_from_value(Value::UInt8(Some(0))).unwrap());
    assert!(bool::try_from_value(Value::Boolean(Some(true))).unwrap());
}

#[test]
fn float_and_decimal_conversions() {
    assert_eq!(f64::try_from_value(Value::Float32(Some(1.5))).unwrap(), 1.5);
    assert!(matches!(
        f32::try_from_value(Value::Float64(Some(1.5))),
        Err(Error::Mapping(..))
    ));
    assert_eq!(
        Decimal::try_from_value(Value::Int32(Some(12))).unwrap(),
        Decimal::from(12)
    );
}

#[test]
fn round_trip_preserves_type_tags() {
    let uuid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
    assert_eq!(
        Uuid::try_from_value(uuid.as_value()).unwrap(),
        uuid
    );
    let d = date!(2024 - 02 - 29);
    assert_eq!(
        time::Date::try_from_value(d.as_value()).unwrap(),
        d
    );
    let t = time!(13:37:00);
    assert_eq!(time::Time::try_from_value(t.as_value()).unwrap(), t);
    let ts = datetime!(2024-02-29 13:37:00);
    assert_eq!(
        time::PrimitiveDateTime::try_from_value(ts.as_value()).unwrap(),
        ts
    );
}

#[test]
fn null_detection_covers_typed_variants() {
    assert!(Value::Null.is_null());
    assert!(Value::Varchar(None).is_null());
    assert!(Value::Decimal(None, 10, 2).is_null());
    assert!(!Value::Int8(Some(0)).is_null());
}

#[test]
fn prototype_drops_the_payload() {
    assert_eq!(
        Value::Varchar(Some("x".into())).prototype(),
        Value::Varchar(None)
    );
    assert_eq!(
        Value::Decimal(Some(Decimal::ONE), 10, 2).prototype(),
        Value::Decimal(None, 10, 2)
    );
    assert!(Value::Int32(Some(1)).same_type(&Value::Int32(None)));
    assert!(!Value::Int32(None).same_type(&Value::Int64(None)));
}
