use super::field::{Field, FieldUpdate};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Id used when an update carries no usable vehicle id
pub const UNKNOWN_SOURCE_ID: u64 = 0;

/// Per-pair problems found while parsing an update.
///
/// None of these abort the update; the offending pair is dropped and the
/// rest of the batch is still applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestDiagnostic {
    InvalidId { value: String },
    InvalidValue { key: String, value: String },
    UnknownKey { key: String },
}

impl fmt::Display for IngestDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestDiagnostic::InvalidId { value } => {
                write!(f, "invalid id '{}', using {}", value, UNKNOWN_SOURCE_ID)
            }
            IngestDiagnostic::InvalidValue { key, value } => {
                write!(f, "invalid value '{}' for key '{}'", value, key)
            }
            IngestDiagnostic::UnknownKey { key } => write!(f, "unknown key '{}'", key),
        }
    }
}

impl IngestDiagnostic {
    fn log(&self) {
        match self {
            IngestDiagnostic::InvalidId { value } => warn!(id = %value, "invalid id"),
            IngestDiagnostic::InvalidValue { key, value } => {
                warn!(key = %key, value = %value, "invalid value in params")
            }
            IngestDiagnostic::UnknownKey { key } => warn!(key = %key, "unknown key found"),
        }
    }
}

/// Classification of a single key/value pair
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// The `id` key, resolved separately by [`parse_id`]
    Id,
    Assign(FieldUpdate),
    Ignored(IngestDiagnostic),
}

/// Result of parsing one ingestion request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedUpdate {
    pub id: u64,
    pub updates: Vec<FieldUpdate>,
    pub diagnostics: Vec<IngestDiagnostic>,
}

/// Resolve the vehicle id, falling back to the unknown-source id.
pub fn parse_id(raw: Option<&str>) -> Result<u64, IngestDiagnostic> {
    let raw = raw.unwrap_or_default();
    raw.parse::<u64>()
        .map_err(|_| IngestDiagnostic::InvalidId {
            value: raw.to_string(),
        })
}

pub fn classify_pair(key: &str, value: &str) -> PairOutcome {
    if key == "id" {
        return PairOutcome::Id;
    }

    let Some(field) = Field::from_key(key) else {
        return PairOutcome::Ignored(IngestDiagnostic::UnknownKey {
            key: key.to_string(),
        });
    };

    match value.parse::<f64>() {
        Ok(parsed) => PairOutcome::Assign(FieldUpdate::new(field, parsed)),
        Err(_) => PairOutcome::Ignored(IngestDiagnostic::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a full update from its key/value pairs.
///
/// Only the first occurrence of each key counts: the first `id` pair names the
/// vehicle, and a repeated field key keeps its first value, or nothing when that
/// first value does not parse. Values are parsed exactly as decoded, with no
/// trimming. Diagnostics are logged at warn level and returned to the caller.
pub fn parse_update<I, K, V>(pairs: I) -> ParsedUpdate
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut raw_id: Option<String> = None;
    let mut updates = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (key, value) in pairs {
        if !seen.insert(key.as_ref().to_string()) {
            continue;
        }

        match classify_pair(key.as_ref(), value.as_ref()) {
            PairOutcome::Id => raw_id = Some(value.as_ref().to_string()),
            PairOutcome::Assign(update) => updates.push(update),
            PairOutcome::Ignored(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    let id = match parse_id(raw_id.as_deref()) {
        Ok(id) => id,
        Err(diagnostic) => {
            diagnostics.insert(0, diagnostic);
            UNKNOWN_SOURCE_ID
        }
    };

    for diagnostic in &diagnostics {
        diagnostic.log();
    }

    ParsedUpdate {
        id,
        updates,
        diagnostics,
    }
}
