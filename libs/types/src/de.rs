//! Serde helpers for lenient wire parsing.
//!
//! Exchange feeds are inconsistent about numeric fields: the same value can
//! arrive as `"42.5"` or `42.5` depending on endpoint and channel. These
//! helpers normalize both encodings to the decimal string we carry around.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

/// Deserialize a JSON string or bare number into a `String`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    })
}

/// Deserialize an optional JSON string or bare number into `Option<String>`.
///
/// Missing fields need `#[serde(default)]` on the field as usual.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "super::string_or_number")]
        price: String,
        #[serde(default, deserialize_with = "super::opt_string_or_number")]
        funding: Option<String>,
    }

    #[test]
    fn test_accepts_both_encodings() {
        let s: Sample = serde_json::from_str(r#"{"price":"42.50"}"#).unwrap();
        assert_eq!(s.price, "42.50");
        assert_eq!(s.funding, None);

        let s: Sample = serde_json::from_str(r#"{"price":42.5,"funding":0.0001}"#).unwrap();
        assert_eq!(s.price, "42.5");
        assert_eq!(s.funding.as_deref(), Some("0.0001"));
    }
}
