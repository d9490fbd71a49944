//! Raw, tool-native metadata records and tolerant scalar coercion

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One scalar value as reported by a metadata tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Tag name -> value, as the metadata tool spells the tags.
pub type RawRecord = HashMap<String, RawValue>;

impl RawValue {
    /// Convert a JSON scalar. Booleans, nulls, arrays and objects have no
    /// raw representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(RawValue::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(RawValue::Integer)
                .or_else(|| n.as_f64().map(RawValue::Float)),
            _ => None,
        }
    }

    /// Textual form. Numbers are rendered, so a numeric `Model` still reads
    /// as text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Float(f) if f.is_finite() => Some(f.to_string()),
            RawValue::Float(_) => None,
        }
    }

    /// Integer form. Floats and fractional strings are truncated toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            RawValue::Float(f) => truncate(*f),
            RawValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate))
            }
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float(f) => f.is_finite().then_some(*f),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    /// Signed decimal degrees. Accepts plain numbers and the
    /// `"<degrees> <N|S|E|W>"` form; southern and western hemispheres are
    /// negative.
    pub fn as_coordinate(&self) -> Option<f64> {
        match self {
            RawValue::Text(s) => {
                let mut parts = s.split_whitespace();
                let degrees: f64 = parts.next()?.parse().ok().filter(|f: &f64| f.is_finite())?;
                match parts.next() {
                    None => Some(degrees),
                    Some(hemisphere) if parts.next().is_none() => {
                        match hemisphere.to_ascii_uppercase().as_str() {
                            "N" | "E" => Some(degrees.abs()),
                            "S" | "W" => Some(-degrees.abs()),
                            _ => None,
                        }
                    }
                    Some(_) => None,
                }
            }
            other => other.as_float(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

fn truncate(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Keep only the scalar members of a JSON object.
pub fn record_from_json(object: &serde_json::Map<String, serde_json::Value>) -> RawRecord {
    object
        .iter()
        .filter_map(|(key, value)| RawValue::from_json(value).map(|v| (key.clone(), v)))
        .collect()
}

/// First candidate key whose value is present and coerces.
pub fn lookup<T>(
    raw: &RawRecord,
    keys: &[&str],
    coerce: impl Fn(&RawValue) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .find_map(|key| raw.get(*key).and_then(|value| coerce(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_coercion() {
        assert_eq!(RawValue::Integer(4000).as_integer(), Some(4000));
        assert_eq!(RawValue::Float(29.97).as_integer(), Some(29));
        assert_eq!(RawValue::from("3000").as_integer(), Some(3000));
        assert_eq!(RawValue::from(" 12.9 ").as_integer(), Some(12));
        assert_eq!(RawValue::from("wide").as_integer(), None);
        assert_eq!(RawValue::Float(f64::NAN).as_integer(), None);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(RawValue::Float(2.8).as_float(), Some(2.8));
        assert_eq!(RawValue::Integer(200).as_float(), Some(200.0));
        assert_eq!(RawValue::from("1.8").as_float(), Some(1.8));
        assert_eq!(RawValue::from("f/1.8").as_float(), None);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(RawValue::from("Canon").as_text(), Some("Canon".to_string()));
        assert_eq!(RawValue::Integer(450).as_text(), Some("450".to_string()));
        assert_eq!(RawValue::from("   ").as_text(), None);
    }

    #[test]
    fn test_coordinate_coercion() {
        assert_eq!(RawValue::from("35.689500 N").as_coordinate(), Some(35.6895));
        assert_eq!(RawValue::from("139.691700 W").as_coordinate(), Some(-139.6917));
        assert_eq!(RawValue::from("33.8688 s").as_coordinate(), Some(-33.8688));
        assert_eq!(RawValue::from("-12.5").as_coordinate(), Some(-12.5));
        assert_eq!(RawValue::Float(48.8566).as_coordinate(), Some(48.8566));
        assert_eq!(RawValue::from("48.8566 X").as_coordinate(), None);
        assert_eq!(RawValue::from("north").as_coordinate(), None);
    }

    #[test]
    fn test_record_from_json_keeps_scalars_only() {
        let value = json!({
            "FileName": "a.jpg",
            "ImageWidth": 4000,
            "FNumber": 2.8,
            "Keywords": ["a", "b"],
            "Flashed": true,
            "Nothing": null,
        });
        let record = record_from_json(value.as_object().unwrap());

        assert_eq!(record.len(), 3);
        assert_eq!(record["FileName"], RawValue::from("a.jpg"));
        assert_eq!(record["ImageWidth"], RawValue::Integer(4000));
        assert_eq!(record["FNumber"], RawValue::Float(2.8));
    }

    #[test]
    fn test_lookup_skips_uncoercible_candidates() {
        let mut record = RawRecord::new();
        record.insert("ImageWidth".to_string(), RawValue::from("unknown"));
        record.insert("ExifImageWidth".to_string(), RawValue::Integer(1024));

        let width = lookup(&record, &["ImageWidth", "ExifImageWidth"], RawValue::as_integer);
        assert_eq!(width, Some(1024));

        let missing = lookup(&record, &["Width"], RawValue::as_integer);
        assert_eq!(missing, None);
    }
}
