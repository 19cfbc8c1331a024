#[cfg(test)]
mod tests {
    use keel_core::{AsValue, Record, Value};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::{borrow::Cow, str::FromStr};
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn value_null() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Int64(Some(1)), Value::Null);
        assert_eq!(Value::Int64(None), Value::Int64(None));
        assert_ne!(Value::Int64(None), Value::Varchar(None));
        assert!(Value::Varchar(None).is_null());
        assert!(!Value::Varchar(Some("".into())).is_null());
    }

    #[test]
    fn value_bool() {
        let val: Value = true.into();
        assert_eq!(val, Value::Boolean(Some(true)));
        assert_ne!(val, Value::Boolean(None));
        assert_ne!(val, Value::Varchar(Some("true".into())));
        assert_eq!(bool::try_from_value(val).unwrap(), true);
        assert_eq!(bool::try_from_value(1i64.into()).unwrap(), true);
        assert_eq!(bool::try_from_value(0i32.into()).unwrap(), false);
        assert!(bool::try_from_value(Value::Float64(Some(0.5))).is_err());
    }

    #[test]
    fn value_integers() {
        let val: Value = 127i8.into();
        assert_eq!(val, Value::Int64(Some(127)));
        assert_eq!(i8::try_from_value(val).unwrap(), 127);
        assert_eq!(u8::try_from_value(Value::Int64(Some(255))).unwrap(), 255);
        assert!(u8::try_from_value(Value::Int64(Some(256))).is_err());
        assert!(u32::try_from_value(Value::Int64(Some(-1))).is_err());
        assert_eq!(
            i32::try_from_value(Value::Decimal(Some(Decimal::from(12)))).unwrap(),
            12
        );
        assert!(i32::try_from_value(Value::Decimal(Some(Decimal::new(125, 1)))).is_err());
        assert!(i64::try_from_value(Value::Varchar(Some("1".into()))).is_err());
    }

    #[test]
    fn value_text() {
        let val: Value = "hello".into();
        assert_eq!(val, Value::Varchar(Some("hello".into())));
        assert_eq!(String::try_from_value(val.clone()).unwrap(), "hello");
        assert_eq!(
            Cow::<'static, str>::try_from_value(val).unwrap(),
            Cow::Borrowed("hello")
        );
        assert!(String::try_from_value(Value::Int64(Some(1))).is_err());
    }

    #[test]
    fn value_decimal_from_text() {
        let expected = Decimal::from_str("12.50").unwrap();
        assert_eq!(
            Decimal::try_from_value(Value::Varchar(Some("12.50".into()))).unwrap(),
            expected
        );
        assert_eq!(expected.as_value(), Value::Decimal(Some(expected)));
    }

    #[test]
    fn value_timestamp() {
        let timestamp = datetime!(2025-03-14 15:09:26.5);
        assert_eq!(timestamp.as_value(), Value::Timestamp(Some(timestamp)));
        assert_eq!(
            time::PrimitiveDateTime::try_from_value(Value::Varchar(Some(
                "2025-03-14 15:09:26.5".into()
            )))
            .unwrap(),
            timestamp
        );
    }

    #[test]
    fn value_uuid() {
        let uuid = Uuid::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(uuid.as_value(), Value::Uuid(Some(uuid)));
        assert_eq!(
            Uuid::try_from_value(Value::Varchar(Some(uuid.to_string()))).unwrap(),
            uuid
        );
        assert_eq!(
            Uuid::try_from_value(Value::Blob(Some(uuid.as_bytes().to_vec().into()))).unwrap(),
            uuid
        );
    }

    #[test]
    fn value_option() {
        assert_eq!(None::<i32>.as_value(), Value::Int64(None));
        assert_eq!(Some(5i32).as_value(), Value::Int64(Some(5)));
        assert_eq!(Option::<i32>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<String>::try_from_value(Value::Varchar(None)).unwrap(), None);
        assert!(i32::try_from_value(Value::Null).is_err());
    }

    #[test]
    fn value_equals() {
        assert!(Value::Int64(Some(3)).equals(&Value::Float64(Some(3.0))));
        assert!(Value::Int64(Some(3)).equals(&Value::Decimal(Some(Decimal::from(3)))));
        assert!(!Value::Int64(Some(3)).equals(&Value::Varchar(Some("3".into()))));
        assert!(!Value::Null.equals(&Value::Null));
        assert!(!Value::Varchar(None).equals(&Value::Varchar(None)));
        assert!(Value::Varchar(Some("a".into())).equals(&Value::Varchar(Some("a".into()))));
    }

    #[test]
    fn value_json() {
        assert_eq!(Value::from_json(&json!(null)).unwrap(), Value::Null);
        assert_eq!(Value::from_json(&json!(7)).unwrap(), Value::Int64(Some(7)));
        assert_eq!(Value::from_json(&json!(1.5)).unwrap(), Value::Float64(Some(1.5)));
        assert_eq!(
            Value::from_json(&json!("lion")).unwrap(),
            Value::Varchar(Some("lion".into()))
        );
        assert!(Value::from_json(&json!([1, 2])).is_err());
        assert!(Value::from_json(&json!({ "a": 1 })).is_err());
        assert_eq!(Value::Int64(Some(7)).to_json(), json!(7));
        assert_eq!(Value::Varchar(None).to_json(), json!(null));
        assert_eq!(Value::Decimal(Some(Decimal::from(4))).to_json(), json!(4));
        assert_eq!(
            Value::Decimal(Some(Decimal::from_str("4.25").unwrap())).to_json(),
            json!("4.25")
        );
    }

    #[test]
    fn record_fields() {
        let mut record = Record::new().with("kind", "lion").with("age", 5);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("kind"), Some(&Value::Varchar(Some("lion".into()))));
        record.set("age", 6);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("age"), Some(&Value::Int64(Some(6))));
        assert!(!record.contains("name"));
        let names: Vec<_> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["kind", "age"]);
    }

    #[test]
    fn record_from_json() {
        let record = Record::from_json(&json!({ "kind": "hyena", "name": null })).unwrap();
        assert_eq!(record.get("kind"), Some(&Value::Varchar(Some("hyena".into()))));
        assert_eq!(record.get("name"), Some(&Value::Null));
        assert!(Record::from_json(&json!([1])).is_err());
        assert!(Record::from_json(&json!({ "tags": ["a"] })).is_err());
    }
}
