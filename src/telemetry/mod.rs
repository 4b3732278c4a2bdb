// Telemetry field parsing: query pairs -> typed field assignments

mod field;
mod parser;

pub use field::{Field, FieldUpdate};
pub use parser::{
    classify_pair, parse_id, parse_update, IngestDiagnostic, PairOutcome, ParsedUpdate,
    UNKNOWN_SOURCE_ID,
};
