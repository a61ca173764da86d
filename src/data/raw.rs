/// Raw key/value metadata as returned by a format extractor.
///
/// Keys are extractor specific ("Microscope Model", "Size Z", ...) and keep
/// the order in which the extractor found them, so the metadata viewer and
/// the ReadMe appendix read the same way every time.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A single raw metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl RawValue {
    /// Values that carry no information ("", "N/A", empty lists)
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Text(s) => is_blank_text(s),
            RawValue::Number(v) => !v.is_finite(),
            RawValue::List(items) => items.iter().all(|s| is_blank_text(s)),
        }
    }

    /// Render for display and ReadMe output; lists are joined with ", "
    pub fn display(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Number(v) => format_number(*v),
            RawValue::List(items) => items
                .iter()
                .filter(|s| !is_blank_text(s))
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// First meaningful item of a list, or the value itself
    pub fn first(&self) -> Option<String> {
        match self {
            RawValue::List(items) => items.iter().find(|s| !is_blank_text(s)).cloned(),
            other if other.is_blank() => None,
            other => Some(other.display()),
        }
    }

    /// Numeric view of the value, parsing text when needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) if v.is_finite() => Some(*v),
            RawValue::Number(_) => None,
            RawValue::Text(s) => s.trim().parse::<f64>().ok(),
            RawValue::List(_) => self.first().and_then(|s| s.trim().parse::<f64>().ok()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        RawValue::List(items)
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawValue::Text(s) => serializer.serialize_str(s),
            RawValue::Number(v) => serializer.serialize_f64(*v),
            RawValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

fn is_blank_text(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case("n/a")
}

/// Integers print without a fractional part, everything else rounded to 3 decimals
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let rounded = (v * 1000.0).round() / 1000.0;
        format!("{}", rounded)
    }
}

/// Ordered raw metadata record for one source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadataRecord {
    entries: Vec<(String, RawValue)>,
}

impl RawMetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value; replacing keeps the original position
    pub fn insert(&mut self, key: &str, value: impl Into<RawValue>) {
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    /// Insert only when the value carries information
    pub fn insert_present(&mut self, key: &str, value: Option<impl Into<RawValue>>) {
        if let Some(value) = value {
            let value = value.into();
            if !value.is_blank() {
                self.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a key, treating blank values as absent
    pub fn get_present(&self, key: &str) -> Option<&RawValue> {
        self.get(key).filter(|v| !v.is_blank())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawMetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawMetadataRecord::new();
        for (k, v) in iter {
            record.insert(&k.into(), v);
        }
        record
    }
}

impl Serialize for RawMetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
