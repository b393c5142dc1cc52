// src/star/fact.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::error::EtlError;
use crate::source::RawRecord;
use crate::star::sector::{self, SectorRow};
use crate::star::time::{self, TimeRow};

#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub time_key: i64,
    pub sector_key: i64,
    pub value: f64,
}

/// Melt the wide records into one fact row per (record, sector) and resolve
/// both surrogate keys against the dimension outputs.
///
/// The time join is on the single integer `time_key`, recomputed here from
/// (year, month) with the same formula the time dimension uses, so there is
/// no quarter/month-name string tuple to drift out of agreement. Output
/// cardinality is exactly `records.len() * SECTOR_COUNT`; an unresolvable key
/// aborts the run instead of producing a null-keyed row.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn build_facts(
    records: &[RawRecord],
    time_dim: &[TimeRow],
    sector_dim: &[SectorRow],
) -> Result<Vec<FactRow>, EtlError> {
    let time_keys: HashSet<i64> = time_dim.iter().map(|t| t.time_key).collect();
    let sector_keys: HashMap<&str, i64> = sector_dim
        .iter()
        .map(|s| (s.sector_name.as_str(), s.sector_key))
        .collect();

    let mut facts = Vec::with_capacity(records.len() * sector::SECTOR_COUNT);
    let mut time_orphans = 0usize;
    let mut first_time_orphan: Option<i64> = None;
    let mut sector_orphans = 0usize;
    let mut first_sector_orphan: Option<&str> = None;

    for rec in records {
        let time_key = time::time_key(rec.year, rec.month);
        for (i, &(_, sector_name)) in sector::SECTORS.iter().enumerate() {
            if !time_keys.contains(&time_key) {
                time_orphans += 1;
                first_time_orphan.get_or_insert(time_key);
                continue;
            }
            let Some(&sector_key) = sector_keys.get(sector_name) else {
                sector_orphans += 1;
                first_sector_orphan.get_or_insert(sector_name);
                continue;
            };
            facts.push(FactRow {
                time_key,
                sector_key,
                value: rec.values[i],
            });
        }
    }

    if time_orphans > 0 {
        warn!(orphans = time_orphans, "facts with no time dimension match");
        return Err(EtlError::JoinIntegrity {
            dimension: "time",
            orphans: time_orphans,
            first_key: first_time_orphan.unwrap_or_default().to_string(),
        });
    }
    if sector_orphans > 0 {
        warn!(orphans = sector_orphans, "facts with no sector dimension match");
        return Err(EtlError::JoinIntegrity {
            dimension: "sector",
            orphans: sector_orphans,
            first_key: first_sector_orphan.unwrap_or_default().to_string(),
        });
    }

    debug!(facts = facts.len(), "resolved fact rows");
    Ok(facts)
}
