//! RFC 3339 serialization for commit timestamps.

use serde::Serializer;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use time::OffsetDateTime;
    use time::macros::datetime;

    #[derive(Serialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: OffsetDateTime,
    }

    #[test]
    fn test_serializes_as_rfc3339() {
        let value = Stamped {
            at: OffsetDateTime::from_unix_timestamp(0).unwrap(),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"at":"1970-01-01T00:00:00Z"}"#);
    }

    #[test]
    fn test_keeps_non_utc_offset() {
        let value = Stamped {
            at: datetime!(2024-03-01 09:00 +09:00),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"at":"2024-03-01T09:00:00+09:00"}"#);
    }
}
