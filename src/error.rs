// src/error.rs

use thiserror::Error;

/// Faults that abort a pipeline run. All of these are fail-fast: once one is
/// raised, no dimension or fact table from that run is published.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A source field was missing or could not be coerced to its type.
    /// Record 0 refers to the header row; `column` is None for faults that
    /// span the whole record.
    #[error(
        "parse error in source at record {record}{}: {detail}",
        .column.as_ref().map(|c| format!(" (column `{c}`)")).unwrap_or_default()
    )]
    Parse {
        record: usize,
        column: Option<String>,
        detail: String,
    },

    /// A parsed value fell outside its valid domain (e.g. mes not in 1..=12).
    #[error("domain error at record {record}: {field} = {value} is out of range")]
    Domain {
        record: usize,
        field: &'static str,
        value: i64,
    },

    /// A fact row's derived key has no matching dimension row.
    #[error(
        "join integrity violation: {orphans} fact row(s) have no matching \
         {dimension} row (first offending key: {first_key})"
    )]
    JoinIntegrity {
        dimension: &'static str,
        orphans: usize,
        first_key: String,
    },

    /// The sector vocabulary is internally inconsistent.
    #[error("sector vocabulary misconfigured: {detail}")]
    Configuration { detail: String },

    #[error("reading source file: {0}")]
    Io(#[from] std::io::Error),
}
