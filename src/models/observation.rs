use crate::models::Cell;
use serde_json::{Map, Value as JsonValue};

/// One measured substance, flattened from a JSON object.
///
/// Nested objects are flattened into dotted keys (`lab.name`); keys keep
/// the order in which they appear in the source object.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    fields: Vec<(String, JsonValue)>,
}

impl Observation {
    pub fn from_object(object: &Map<String, JsonValue>) -> Self {
        let mut fields = Vec::with_capacity(object.len());
        flatten_into(&mut fields, None, object);
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, JsonValue)] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The flattened field as a table cell, `Missing` when absent
    pub fn cell(&self, key: &str) -> Cell {
        self.get(key).map_or(Cell::Missing, Cell::from_json)
    }
}

fn flatten_into(
    fields: &mut Vec<(String, JsonValue)>,
    prefix: Option<&str>,
    object: &Map<String, JsonValue>,
) {
    for (key, value) in object {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(nested) => flatten_into(fields, Some(&path), nested),
            other => fields.push((path, other.clone())),
        }
    }
}

/// Outcome of parsing one observation payload.
///
/// Callers treat `Absent` and `Malformed` alike (zero observations) but can
/// report them separately.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedObservations {
    Absent,
    Malformed(String),
    Parsed(Vec<Observation>),
}

impl ParsedObservations {
    /// Parse a payload cell holding a JSON array of objects.
    ///
    /// Array elements that are not objects (including `null`) are skipped.
    pub fn parse(cell: &Cell) -> Self {
        let text = match cell {
            Cell::Missing => return ParsedObservations::Absent,
            Cell::Text(text) => text.as_str(),
            Cell::Number(_) => {
                return ParsedObservations::Malformed("expected a JSON array, found a number".into())
            }
        };

        match serde_json::from_str::<JsonValue>(text) {
            Ok(JsonValue::Array(items)) => ParsedObservations::Parsed(
                items
                    .iter()
                    .filter_map(JsonValue::as_object)
                    .map(Observation::from_object)
                    .collect(),
            ),
            Ok(other) => ParsedObservations::Malformed(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            )),
            Err(e) => ParsedObservations::Malformed(e.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ParsedObservations::Parsed(observations) => observations.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_observations(self) -> Vec<Observation> {
        match self {
            ParsedObservations::Parsed(observations) => observations,
            _ => Vec::new(),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
