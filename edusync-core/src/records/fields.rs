//! Helpers shared by the record mappings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Builder for a remote field map. Absent values are left out.
#[derive(Debug, Default)]
pub(crate) struct Fields(Map<String, Value>);

impl Fields {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn opt<T: Clone + Into<Value>>(self, key: &str, value: &Option<T>) -> Self {
        match value {
            Some(v) => self.put(key, v.clone()),
            None => self,
        }
    }

    pub(crate) fn loose<T: Clone + Into<Value>>(self, key: &str, value: &Option<Loose<T>>) -> Self {
        match value.as_ref().and_then(Loose::get) {
            Some(v) => self.put(key, v.clone()),
            None => self,
        }
    }

    /// Text with a fallback for missing or empty values.
    pub(crate) fn text_or(self, key: &str, value: &Option<String>, default: &str) -> Self {
        let text = non_empty(value).unwrap_or(default).to_string();
        self.put(key, text)
    }

    /// Booleans become `1`/`0`; missing counts as false.
    pub(crate) fn flag(self, key: &str, value: Option<bool>) -> Self {
        self.put(key, u8::from(value.unwrap_or(false)))
    }

    pub(crate) fn build(self) -> Map<String, Value> {
        self.0
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Joins the non-empty name parts with single spaces.
pub(crate) fn full_name(parts: &[&Option<String>]) -> Option<String> {
    let joined = parts
        .iter()
        .filter_map(|p| non_empty(p))
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// A scalar as another producer wrote it, plus its typed reading.
///
/// Saving writes the original JSON back untouched, so a quoted `"40"` stays a
/// string and a numeric phone number stays a number.
#[derive(Debug, Clone, PartialEq)]
pub struct Loose<T> {
    raw: Value,
    value: Option<T>,
}

impl<T: Clone + Into<Value>> Loose<T> {
    pub fn new(value: T) -> Self {
        Self {
            raw: value.clone().into(),
            value: Some(value),
        }
    }
}

impl<T> Loose<T> {
    /// The typed reading; `None` for blank input.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The JSON exactly as loaded.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl<T> Serialize for Loose<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, T: ParseLoose> Deserialize<'de> for Loose<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let value = T::parse_loose(&raw).map_err(D::Error::custom)?;
        Ok(Self { raw, value })
    }
}

/// Reads a typed value out of loosely typed JSON.
pub trait ParseLoose: Sized {
    fn parse_loose(raw: &Value) -> Result<Option<Self>, String>;
}

/// Text that may arrive as a number or boolean (phone numbers, pincodes).
impl ParseLoose for String {
    fn parse_loose(raw: &Value) -> Result<Option<Self>, String> {
        match raw {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(format!("expected text, found {}", other)),
        }
    }
}

/// Numbers that may arrive quoted.
macro_rules! parse_loose_number {
    ($($ty:ty),*) => {$(
        impl ParseLoose for $ty {
            fn parse_loose(raw: &Value) -> Result<Option<Self>, String> {
                match raw {
                    Value::Null => Ok(None),
                    Value::String(s) if s.trim().is_empty() => Ok(None),
                    Value::String(s) => s
                        .trim()
                        .parse()
                        .map(Some)
                        .map_err(|_| format!("expected a number, found '{}'", s)),
                    Value::Number(_) => serde_json::from_value(raw.clone())
                        .map(Some)
                        .map_err(|e| e.to_string()),
                    other => Err(format!("expected a number, found {}", other)),
                }
            }
        }
    )*};
}

parse_loose_number!(u32, f64);
