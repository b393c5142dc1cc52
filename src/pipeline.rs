// src/pipeline.rs

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task;
use tracing::{info, instrument};

use crate::source::{self, RawRecord};
use crate::star::fact::{self, FactRow};
use crate::star::sector::{self, SectorRow};
use crate::star::time::{self, TimeRow};

/// The three tables handed to the warehouse sink, built together or not at
/// all: any stage error aborts the run with no partial output.
#[derive(Debug)]
pub struct StarSchema {
    pub time: Vec<TimeRow>,
    pub sectors: Vec<SectorRow>,
    pub facts: Vec<FactRow>,
}

/// Run the full transform: load the source once, build the two dimensions on
/// parallel blocking tasks (they share nothing), then resolve facts against
/// both once both have completed.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub async fn run(path: impl AsRef<Path>) -> Result<StarSchema> {
    let records: Arc<Vec<RawRecord>> = Arc::new(source::load_source(path.as_ref())?);

    let time_task = {
        let records = Arc::clone(&records);
        task::spawn_blocking(move || time::build_time_dimension(&records))
    };
    let sector_task = task::spawn_blocking(sector::build_sector_dimension);

    let (time_res, sector_res) = tokio::try_join!(time_task, sector_task)
        .context("dimension builder task failed")?;
    let time = time_res?;
    let sectors = sector_res?;
    info!(
        time_rows = time.len(),
        sector_rows = sectors.len(),
        "dimensions built"
    );

    let facts = fact::build_facts(&records, &time, &sectors)?;
    info!(fact_rows = facts.len(), "facts resolved");

    Ok(StarSchema {
        time,
        sectors,
        facts,
    })
}
