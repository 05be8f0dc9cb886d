use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Result};
use serde::de::{self, Deserializer, Visitor};

/// Largest count any store holds; SQLite integers are signed 64-bit.
pub const MAX_COUNT: u64 = i64::MAX as u64;

/// Coerces a raw cell into a count. Anything that is not a number becomes 0,
/// negatives clamp to 0, fractions truncate and huge values cap at [`MAX_COUNT`].
pub fn parse_non_negative_int(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() {
        return 0;
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return n.min(MAX_COUNT);
    }
    match cleaned.parse::<f64>() {
        Ok(f) => coerce_float(f),
        Err(_) => 0,
    }
}

fn coerce_float(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        // `as` saturates at u64::MAX.
        (f.trunc() as u64).min(MAX_COUNT)
    } else {
        0
    }
}

/// `deserialize_with` helper applying [`parse_non_negative_int`] to whatever
/// the store hands back: numbers, strings, or null.
pub fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a count, a numeric string, or null")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u64, E> {
            Ok(v.min(MAX_COUNT))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u64, E> {
            Ok(u64::try_from(v).unwrap_or(0))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<u64, E> {
            Ok(coerce_float(v))
        }

        fn visit_bool<E: de::Error>(self, _v: bool) -> std::result::Result<u64, E> {
            Ok(0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u64, E> {
            Ok(parse_non_negative_int(v))
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<u64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<u64, E> {
            Ok(0)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> std::result::Result<u64, D2::Error> {
            d.deserialize_any(CountVisitor)
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

#[derive(Debug, PartialEq)]
pub struct ParsedInput {
    pub free_text: String,
    pub metadata: HashMap<String, String>,
}

/// Splits `key:value` tokens from the rest of the words.
pub fn parse_args(args: &[String]) -> ParsedInput {
    let mut free_parts = Vec::new();
    let mut metadata = HashMap::new();

    for arg in args {
        if let Some((key, value)) = arg.split_once(':') {
            if !key.is_empty() {
                metadata.insert(key.to_lowercase(), value.to_string());
                continue;
            }
        }
        free_parts.push(arg.as_str());
    }

    ParsedInput {
        free_text: free_parts.join(" "),
        metadata,
    }
}

pub fn expand_key(key: &str, candidates: &[&str]) -> Result<String> {
    if candidates.contains(&key) {
        return Ok(key.to_string());
    }

    let matches: Vec<&str> = candidates
        .iter()
        .filter(|&&c| c.starts_with(key))
        .cloned()
        .collect();

    match matches.len() {
        1 => Ok(matches[0].to_string()),
        0 => Err(anyhow!("Unknown key: '{}'", key)),
        _ => Err(anyhow!("Ambiguous key: '{}' matches {:?}", key, matches)),
    }
}
