//! Query-string deserialization helpers
//!
//! Query parameters arrive as text, and structs holding a
//! `#[serde(flatten)]` field see every value as a string. These helpers
//! parse the textual form so numeric and boolean params survive flattening.

use serde::{Deserialize, Deserializer};

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid boolean '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Params {
        #[serde(default, deserialize_with = "opt_u32")]
        page: Option<u32>,
        #[serde(default, deserialize_with = "opt_i32")]
        year: Option<i32>,
        #[serde(default, deserialize_with = "flag")]
        low_stock: bool,
    }

    #[test]
    fn parses_textual_values() {
        let params: Params = serde_json::from_value(serde_json::json!({
            "page": "3",
            "year": "2026",
            "low_stock": "true"
        }))
        .unwrap();
        assert_eq!(params.page, Some(3));
        assert_eq!(params.year, Some(2026));
        assert!(params.low_stock);
    }

    #[test]
    fn missing_values_default() {
        let params: Params = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.page, None);
        assert_eq!(params.year, None);
        assert!(!params.low_stock);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(serde_json::from_value::<Params>(serde_json::json!({ "page": "many" })).is_err());
        assert!(serde_json::from_value::<Params>(serde_json::json!({ "low_stock": "sì" })).is_err());
    }
}
