use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// A single property listing as held by the store and returned to the gateway.
///
/// `price` and `bedrooms` are coerced to unsigned integers on the way in. Integral floats and
/// numeric strings are accepted, anything else fails the whole decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub city: String,
    pub address: String,
    #[serde(deserialize_with = "coerce_integer")]
    pub price: u64,
    #[serde(deserialize_with = "coerce_integer")]
    pub bedrooms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListingId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingId::Number(n) => write!(f, "{}", n),
            ListingId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ListingId {
    fn from(id: i64) -> Self {
        ListingId::Number(id)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        ListingId::Text(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInteger {
    Unsigned(u64),
    Float(f64),
    Text(String),
}

fn coerce_integer<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawInteger::deserialize(deserializer)? {
        RawInteger::Unsigned(n) => Ok(n),
        RawInteger::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Ok(f as u64)
        }
        RawInteger::Float(f) => Err(de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            f
        ))),
        RawInteger::Text(s) => s.trim().parse::<u64>().map_err(|_| {
            de::Error::custom(format!("expected a non-negative integer, got {:?}", s))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_plain_listing() {
        let listing: Listing = serde_json::from_value(json!({
            "id": 1,
            "city": "Austin",
            "address": "1 Elm",
            "price": 1000,
            "bedrooms": 2
        }))
        .unwrap();

        assert_eq!(listing.id, ListingId::Number(1));
        assert_eq!(listing.price, 1000);
        assert_eq!(listing.bedrooms, 2);
    }

    #[test]
    fn coerce_numeric_fields() {
        let listing: Listing = serde_json::from_value(json!({
            "id": "a-7",
            "city": "Austin",
            "address": "1 Elm",
            "price": " 800 ",
            "bedrooms": 3.0
        }))
        .unwrap();

        assert_eq!(listing.id, ListingId::Text("a-7".to_string()));
        assert_eq!(listing.price, 800);
        assert_eq!(listing.bedrooms, 3);
    }

    #[test]
    fn reject_malformed_numeric_fields() {
        for price in [json!("cheap"), json!(-5), json!(10.5), json!(null)] {
            let res = serde_json::from_value::<Listing>(json!({
                "id": 1,
                "city": "Austin",
                "address": "1 Elm",
                "price": price,
                "bedrooms": 2
            }));
            assert!(res.is_err(), "price {} should be rejected", price);
        }
    }

    #[test]
    fn reject_missing_fields() {
        let res = serde_json::from_value::<Listing>(json!({
            "id": 1,
            "city": "Austin",
            "address": "1 Elm",
            "price": 900
        }));
        assert!(res.is_err());
    }
}
