use crate::utils::constants::MISSING_MARKERS;
use serde_json::Value as JsonValue;
use std::fmt;

/// A single table value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Interpret a raw CSV field. Empty fields and the usual missing markers become `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        if MISSING_MARKERS.contains(&raw) || MISSING_MARKERS.contains(&raw.trim()) {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Convert a flattened JSON leaf into a cell
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Cell::Missing,
            JsonValue::String(s) => Cell::Text(s.clone()),
            JsonValue::Number(n) => n.as_f64().map_or_else(|| Cell::Text(n.to_string()), Cell::Number),
            JsonValue::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the cell; unparsable or non-finite values yield `None`
    pub fn to_number(&self) -> Option<f64> {
        let number = match self {
            Cell::Missing => return None,
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        number.is_finite().then_some(number)
    }

    /// Coerce to `Number`, turning anything non-numeric into `Missing`
    pub fn coerce_numeric(&self) -> Cell {
        self.to_number().map_or(Cell::Missing, Cell::Number)
    }

    /// Key used for joins: trimmed text, `None` when missing
    pub fn join_key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) => Some(format_number(*n)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

/// Shortest round-trip rendering of a float
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_missing_markers() {
        assert_eq!(Cell::from_raw(""), Cell::Missing);
        assert_eq!(Cell::from_raw("NA"), Cell::Missing);
        assert_eq!(Cell::from_raw(" nan "), Cell::Missing);
        assert_eq!(Cell::from_raw("Amsterdam"), Cell::text("Amsterdam"));
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Cell::text("12.5").to_number(), Some(12.5));
        assert_eq!(Cell::text(" 3 ").to_number(), Some(3.0));
        assert_eq!(Cell::text("bad").to_number(), None);
        assert_eq!(Cell::text("inf").to_number(), None);
        assert_eq!(Cell::Number(f64::NAN).to_number(), None);
        assert_eq!(Cell::text("bad").coerce_numeric(), Cell::Missing);
        assert_eq!(Cell::text("1e3").coerce_numeric(), Cell::Number(1000.0));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Cell::from_json(&json!(null)), Cell::Missing);
        assert_eq!(Cell::from_json(&json!("ng/L")), Cell::text("ng/L"));
        assert_eq!(Cell::from_json(&json!(4)), Cell::Number(4.0));
        assert_eq!(Cell::from_json(&json!([1, 2])), Cell::text("[1,2]"));
    }

    #[test]
    fn test_json_booleans_coerce_to_one_and_zero() {
        assert_eq!(Cell::from_json(&json!(true)), Cell::Number(1.0));
        assert_eq!(Cell::from_json(&json!(false)).coerce_numeric(), Cell::Number(0.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Cell::Number(12.5).to_string(), "12.5");
        assert_eq!(Cell::Number(100000.0).to_string(), "100000");
        assert_eq!(Cell::Number(-0.0).to_string(), "0");
        assert_eq!(Cell::Missing.to_string(), "");
    }

    #[test]
    fn test_join_key() {
        assert_eq!(Cell::text(" 335-67-1 ").join_key().as_deref(), Some("335-67-1"));
        assert_eq!(Cell::text("  ").join_key(), None);
        assert_eq!(Cell::Missing.join_key(), None);
    }
}
