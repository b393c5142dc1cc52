// src/source/mod.rs

use std::{fs::File, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, instrument};

use crate::error::EtlError;
use crate::star::sector::{self, SECTOR_COUNT};

/// One row of the wide source table. Every record carries the full indicator
/// set; `values` is ordered the same way as `sector::SECTORS`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub year: i32,
    pub month: u32,
    pub values: [f64; SECTOR_COUNT],
}

/// Read the `;`-delimited wide source file into typed records.
///
/// Header names are trimmed of surrounding whitespace before matching. A
/// missing required column, a non-numeric `anio`/`mes`/indicator value, or a
/// wrong field separator (which collapses the header into one unmatchable
/// field) all fail with a parse error naming the offending column and record.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_source(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, EtlError> {
    let file = File::open(path.as_ref())?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .from_reader(file);

    let headers = rdr
        .headers()
        .map_err(|e| EtlError::Parse {
            record: 0,
            column: None,
            detail: format!("reading header row: {e}"),
        })?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EtlError::Parse {
                record: 0,
                column: Some(name.to_string()),
                detail: "required column missing from header (is the field separator `;`?)"
                    .to_string(),
            })
    };
    let year_idx = column("anio")?;
    let month_idx = column("mes")?;
    let mut value_idx = [0usize; SECTOR_COUNT];
    for (i, &(col, _)) in sector::SECTORS.iter().enumerate() {
        value_idx[i] = column(col)?;
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record_no = idx + 1;
        let record = result.map_err(|e| EtlError::Parse {
            record: record_no,
            column: None,
            detail: e.to_string(),
        })?;

        let year = field(&record, year_idx, "anio", record_no)?
            .parse::<i32>()
            .map_err(|_| invalid(&record, year_idx, "anio", record_no))?;
        let month = field(&record, month_idx, "mes", record_no)?
            .parse::<u32>()
            .map_err(|_| invalid(&record, month_idx, "mes", record_no))?;

        let mut values = [0.0; SECTOR_COUNT];
        for (i, &(col, _)) in sector::SECTORS.iter().enumerate() {
            values[i] = parse_value(field(&record, value_idx[i], col, record_no)?, col, record_no)?;
        }

        records.push(RawRecord { year, month, values });
    }

    info!(records = records.len(), "loaded source file");
    Ok(records)
}

fn field<'a>(
    record: &'a StringRecord,
    idx: usize,
    column: &str,
    record_no: usize,
) -> Result<&'a str, EtlError> {
    record.get(idx).ok_or_else(|| EtlError::Parse {
        record: record_no,
        column: Some(column.to_string()),
        detail: "field missing from record".to_string(),
    })
}

fn invalid(record: &StringRecord, idx: usize, column: &str, record_no: usize) -> EtlError {
    EtlError::Parse {
        record: record_no,
        column: Some(column.to_string()),
        detail: format!(
            "invalid numeric value `{}`",
            record.get(idx).unwrap_or_default()
        ),
    }
}

/// Numeric coercion for indicator values. Accepts `.` as the decimal
/// separator; a value whose only separator is a single `,` is read as a
/// comma-decimal (Ecuadorian locale exports). Thousands grouping, empty
/// fields and anything else non-numeric are parse errors, never a silent
/// zero.
fn parse_value(raw: &str, column: &str, record_no: usize) -> Result<f64, EtlError> {
    let normalized = if raw.contains(',') && !raw.contains('.') && raw.matches(',').count() == 1 {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized.parse::<f64>().map_err(|_| EtlError::Parse {
        record: record_no,
        column: Some(column.to_string()),
        detail: format!("invalid numeric value `{raw}`"),
    })
}
