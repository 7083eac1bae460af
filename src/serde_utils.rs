use serde::{Serialize, Serializer, ser::Error};

/// Serializes a value as a string holding its JSON encoding.
///
/// GIS Cloud expects some nested objects (e.g. a layer's `source`) as
/// JSON text rather than as an embedded object.
pub fn serialize_as_json_string<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    let encoded = serde_json::to_string(value).map_err(S::Error::custom)?;
    serializer.serialize_str(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Inner {
        kind: &'static str,
        size: u32,
    }

    #[derive(Serialize)]
    struct TestStruct {
        #[serde(serialize_with = "serialize_as_json_string")]
        inner: Inner,
    }

    #[test]
    fn test_serialize_as_json_string() {
        let value = TestStruct {
            inner: Inner {
                kind: "file",
                size: 3,
            },
        };
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json["inner"], r#"{"kind":"file","size":3}"#);
    }
}
