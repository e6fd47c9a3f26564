use serde::{
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Serialize, Serializer,
};
use serde_json::Value;

use crate::{
    domain::{FieldKind, FieldSpec, FormSchema, FormVariant},
    error::{FormError, ReportParseError},
};

/// Reports nested deeper than this are rejected at parse time.
pub const MAX_REPORT_DEPTH: usize = 64;

/// Live field values for one form variant, kept in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    schema: &'static FormSchema,
    values: Vec<String>,
}

impl FormState {
    pub fn new(variant: FormVariant) -> Self {
        let schema = FormSchema::for_variant(variant);
        Self {
            schema,
            values: vec![String::new(); schema.fields.len()],
        }
    }

    pub fn schema(&self) -> &'static FormSchema {
        self.schema
    }

    pub fn variant(&self) -> FormVariant {
        self.schema.variant
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.schema
            .position(name)
            .map(|index| self.values[index].as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        let index = self
            .schema
            .position(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        self.values[index] = value.into();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, &str)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn reset(&mut self) {
        for value in &mut self.values {
            value.clear();
        }
    }

    /// Required fields that are still blank. A hint for the caller only;
    /// submission is never blocked on it.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(spec, value)| spec.required && value.trim().is_empty())
            .map(|(spec, _)| spec.name)
            .collect()
    }

    pub fn to_payload(&self) -> SubmissionPayload {
        let entries = self
            .iter()
            .map(|(spec, value)| {
                let value = match spec.kind {
                    FieldKind::MultiValue => PayloadValue::List(split_multi_value(value)),
                    FieldKind::Text | FieldKind::TextArea => PayloadValue::Text(value.to_string()),
                };
                (spec.name.to_string(), value)
            })
            .collect();
        SubmissionPayload { entries }
    }
}

/// Splits a comma-separated entry into trimmed, non-empty tokens.
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Text(String),
    List(Vec<String>),
}

/// Request body for `POST /generate-report`. Serialises as a JSON object whose
/// keys follow the schema's field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionPayload {
    entries: Vec<(String, PayloadValue)>,
}

impl SubmissionPayload {
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, PayloadValue)] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for SubmissionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A generated report, parsed from the response body into a closed set of
/// shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportNode {
    Leaf(String),
    List(Vec<ReportNode>),
    /// Keys in the order the service sent them.
    Section(Vec<(String, ReportNode)>),
    /// Numbers, booleans and null. Kept so the owning key still shows up, but
    /// renders nothing.
    Other,
}

impl ReportNode {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ReportParseError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ReportParseError> {
        if !value.is_object() {
            return Err(ReportParseError::NotAnObject);
        }
        Self::convert(value, 0)
    }

    fn convert(value: &Value, depth: usize) -> Result<Self, ReportParseError> {
        if depth > MAX_REPORT_DEPTH {
            return Err(ReportParseError::TooDeep(MAX_REPORT_DEPTH));
        }
        let node = match value {
            Value::String(text) => Self::Leaf(text.clone()),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(|item| Self::convert(item, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => Self::Section(
                map.iter()
                    .map(|(key, child)| {
                        Self::convert(child, depth + 1).map(|node| (key.clone(), node))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Value::Null | Value::Bool(_) | Value::Number(_) => Self::Other,
        };
        Ok(node)
    }

    pub fn get(&self, key: &str) -> Option<&ReportNode> {
        match self {
            Self::Section(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Leaf(text) => Value::String(text.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Section(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, node)| (key.clone(), node.to_value()))
                    .collect(),
            ),
            Self::Other => Value::Null,
        }
    }
}

impl Serialize for ReportNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(text) => serializer.serialize_str(text),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Section(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, node) in entries {
                    map.serialize_entry(key, node)?;
                }
                map.end()
            }
            Self::Other => serializer.serialize_unit(),
        }
    }
}

/// Body of a failed `/generate-report` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Human-readable message from a failure body, if it carries one. A list
    /// of validation entries (`[{"msg": ...}, ...]`) is flattened into one
    /// line.
    pub fn detail_from_slice(bytes: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(bytes).ok()?;
        match body.detail? {
            Value::String(detail) if !detail.is_empty() => Some(detail),
            Value::Array(entries) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
