// src/star/time.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::error::EtlError;
use crate::source::RawRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub time_key: i64,
    pub year: i32,
    pub month: u32,
    pub quarter: String,
    pub month_name: String,
}

/// Surrogate key in `YYYYMM01` form as a base-10 integer; the trailing 01 is
/// a constant synthetic day-of-month. Pure function of (year, month), and
/// injective over valid inputs since months occupy two fixed decimal digits.
pub fn time_key(year: i32, month: u32) -> i64 {
    year as i64 * 10_000 + month as i64 * 100 + 1
}

/// Calendar quarter for a month in 1..=12, rendered "1".."4".
pub fn quarter(month: u32) -> String {
    (((month - 1) / 3) + 1).to_string()
}

/// Full English month name, or None when the month is outside 1..=12.
pub fn month_name(month: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(2000, month, 1).map(|d| d.format("%B").to_string())
}

/// Build the time dimension: one row per distinct (year, month) pair in the
/// source, sorted by key. A month outside 1..=12 is a data-integrity fault
/// reported with the first record that carries it, never clamped.
#[instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn build_time_dimension(records: &[RawRecord]) -> Result<Vec<TimeRow>, EtlError> {
    // Dedup by value; keep the first record number for error context.
    let mut seen: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for (idx, rec) in records.iter().enumerate() {
        seen.entry((rec.year, rec.month)).or_insert(idx + 1);
    }
    debug!(distinct = seen.len(), "distinct (year, month) pairs");

    let mut rows = Vec::with_capacity(seen.len());
    for ((year, month), record) in seen {
        let month_name = month_name(month).ok_or(EtlError::Domain {
            record,
            field: "mes",
            value: month as i64,
        })?;
        rows.push(TimeRow {
            time_key: time_key(year, month),
            year,
            month,
            quarter: quarter(month),
            month_name,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::sector::SECTOR_COUNT;
    use std::collections::HashSet;

    fn record(year: i32, month: u32) -> RawRecord {
        RawRecord {
            year,
            month,
            values: [0.0; SECTOR_COUNT],
        }
    }

    #[test]
    fn time_key_formula() {
        assert_eq!(time_key(2024, 3), 20240301);
        assert_eq!(time_key(1999, 12), 19991201);
        assert_eq!(time_key(2100, 1), 21000101);
    }

    #[test]
    fn time_key_injective_over_realistic_years() {
        let mut keys = HashSet::new();
        for year in 1900..=2100 {
            for month in 1..=12 {
                assert!(keys.insert(time_key(year, month)));
            }
        }
        assert_eq!(keys.len(), 201 * 12);
    }

    #[test]
    fn quarter_mapping() {
        let expected = [
            "1", "1", "1", "2", "2", "2", "3", "3", "3", "4", "4", "4",
        ];
        for month in 1..=12u32 {
            assert_eq!(quarter(month), expected[(month - 1) as usize]);
        }
    }

    #[test]
    fn month_names_are_full_english() {
        assert_eq!(month_name(1).as_deref(), Some("January"));
        assert_eq!(month_name(3).as_deref(), Some("March"));
        assert_eq!(month_name(12).as_deref(), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn deduplicates_year_month_pairs() {
        let records = vec![
            record(2024, 1),
            record(2024, 2),
            record(2024, 1),
            record(2023, 1),
            record(2024, 2),
        ];
        let rows = build_time_dimension(&records).unwrap();
        assert_eq!(rows.len(), 3);
        // sorted by (year, month), so keys ascend
        assert_eq!(rows[0].time_key, 20230101);
        assert_eq!(rows[1].time_key, 20240101);
        assert_eq!(rows[2].time_key, 20240201);
    }

    #[test]
    fn example_row_for_march_2024() {
        let rows = build_time_dimension(&[record(2024, 3)]).unwrap();
        assert_eq!(
            rows,
            vec![TimeRow {
                time_key: 20240301,
                year: 2024,
                month: 3,
                quarter: "1".to_string(),
                month_name: "March".to_string(),
            }]
        );
    }

    #[test]
    fn month_thirteen_is_a_domain_error() {
        let err = build_time_dimension(&[record(2024, 13)]).unwrap_err();
        assert!(matches!(
            err,
            EtlError::Domain {
                record: 1,
                field: "mes",
                value: 13,
            }
        ));
    }

    #[test]
    fn month_zero_is_a_domain_error() {
        let err = build_time_dimension(&[record(2024, 1), record(2024, 0)]).unwrap_err();
        assert!(matches!(
            err,
            EtlError::Domain {
                record: 2,
                field: "mes",
                value: 0,
            }
        ));
    }
}
