//! Custom serde deserializers for flexible type handling
//!
//! The pharmacy API is not consistent about scalar types: prices arrive as
//! numbers on one product and as strings (sometimes with a currency sign) on
//! another, and availability flags show up as booleans, `0`/`1` or strings.

use serde::{Deserialize, Deserializer, de};

/// Deserialize a flexible number that can be:
/// - JSON number: `120`, `99.5`
/// - String: `"120"`, `"99.50"`, `"₹1,299.00"` (currency signs and thousands separators are ignored)
/// - `null` or an empty string (both become `None`)
pub fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleNumber {
        Float(f64),
        String(String),
    }

    let value: Option<FlexibleNumber> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(FlexibleNumber::Float(f)) => Ok(Some(f)),
        Some(FlexibleNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(FlexibleNumber::String(s)) => parse_price(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid numeric string: {}", s))),
    }
}

/// Deserialize a flexible boolean value that can be:
/// - JSON boolean: `true`, `false`
/// - Integer: `0` (false), any positive integer (true)
/// - String: `"0"`, `"1"`, `"false"`, `"true"` (case-insensitive)
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleBool {
        Bool(bool),
        Int(i64),
        String(String),
    }

    let value: Option<FlexibleBool> = Option::deserialize(deserializer)?;

    match value {
        None => Ok(None),
        Some(FlexibleBool::Bool(b)) => Ok(Some(b)),
        Some(FlexibleBool::Int(i)) => Ok(Some(i > 0)),
        Some(FlexibleBool::String(s)) => {
            let s_lower = s.trim().to_lowercase();
            match s_lower.as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(de::Error::custom(format!("invalid boolean string: {}", s))),
            }
        }
    }
}

/// Treat an explicit `null` like a missing field.
pub fn deserialize_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Pull the first decimal number out of a price label such as `"₹1,299.50 MRP"`.
///
/// Returns `None` when the label carries no digits.
pub fn parse_price(label: &str) -> Option<f64> {
    let number: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();

    number.trim_end_matches('.').parse().ok()
}
