use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{HarvestError, HarvestResult};

/// A typed ordering-field value, as carried by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorValue {
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    Int,
    Float,
    Timestamp,
    Text,
}

impl CursorValue {
    pub fn kind(&self) -> CursorKind {
        match self {
            CursorValue::Int(_) => CursorKind::Int,
            CursorValue::Float(_) => CursorKind::Float,
            CursorValue::Timestamp(_) => CursorKind::Timestamp,
            CursorValue::Text(_) => CursorKind::Text,
        }
    }

    /// Serialize for a cursor string. Timestamps are ISO-8601 with a trailing `Z`.
    pub fn encode(&self) -> String {
        match self {
            CursorValue::Int(v) => v.to_string(),
            CursorValue::Float(v) => v.to_string(),
            CursorValue::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            CursorValue::Text(v) => v.clone(),
        }
    }

    /// Same-kind comparison; values of different kinds are unordered.
    pub fn compare(&self, other: &CursorValue) -> Option<Ordering> {
        match (self, other) {
            (CursorValue::Int(a), CursorValue::Int(b)) => Some(a.cmp(b)),
            (CursorValue::Float(a), CursorValue::Float(b)) => a.partial_cmp(b),
            (CursorValue::Timestamp(a), CursorValue::Timestamp(b)) => Some(a.cmp(b)),
            (CursorValue::Text(a), CursorValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Parse a cursor string into a value of the ordering field's kind.
pub fn parse_cursor(raw: &str, kind: CursorKind) -> HarvestResult<CursorValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HarvestError::InvalidCursor("empty cursor".to_string()));
    }
    let invalid = |what: &str| HarvestError::InvalidCursor(format!("'{}' is not {}", raw, what));

    match kind {
        CursorKind::Int => trimmed
            .parse()
            .map(CursorValue::Int)
            .map_err(|_| invalid("an integer")),
        CursorKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(CursorValue::Float)
            .ok_or_else(|| invalid("a number")),
        CursorKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| CursorValue::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|_| invalid("an ISO-8601 timestamp")),
        CursorKind::Text => Ok(CursorValue::Text(raw.to_string())),
    }
}
