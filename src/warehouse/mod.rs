// src/warehouse/mod.rs

use std::{
    fs,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{info, instrument};

use crate::pipeline::StarSchema;
use crate::star::{fact::FactRow, sector::SectorRow, time::TimeRow};

/// Parquet sink for the three star-schema tables. Passed into the runner
/// explicitly so the transform itself touches no I/O.
pub struct ParquetWarehouse {
    out_dir: PathBuf,
}

impl ParquetWarehouse {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating warehouse directory {:?}", &out_dir))?;
        Ok(Self { out_dir })
    }

    /// Publish all three tables, or none. Each table is serialized to a
    /// `.tmp` path first; the renames into place only happen after every
    /// table has been written, so a failed run leaves no visible output.
    #[instrument(level = "info", skip_all, fields(out_dir = %self.out_dir.display()))]
    pub fn publish(&self, star: &StarSchema) -> Result<()> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(3);

        let result = (|| -> Result<()> {
            staged.push(self.stage("dim_tiempo", time_batch(&star.time)?)?);
            staged.push(self.stage("dim_sector", sector_batch(&star.sectors)?)?);
            staged.push(self.stage("fact_iaenp", fact_batch(&star.facts)?)?);
            Ok(())
        })();

        if let Err(e) = result {
            for (tmp, _) in &staged {
                let _ = fs::remove_file(tmp);
            }
            return Err(e);
        }

        for (i, (tmp, out)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, out) {
                // best-effort rollback: un-publish what already landed and
                // drop the remaining staged files
                for (_, published) in &staged[..i] {
                    let _ = fs::remove_file(published);
                }
                for (pending, _) in &staged[i..] {
                    let _ = fs::remove_file(pending);
                }
                return Err(e).with_context(|| format!("renaming {:?} -> {:?}", tmp, out));
            }
        }
        info!(
            time_rows = star.time.len(),
            sector_rows = star.sectors.len(),
            fact_rows = star.facts.len(),
            "published star schema"
        );
        Ok(())
    }

    fn stage(&self, table: &str, batch: RecordBatch) -> Result<(PathBuf, PathBuf)> {
        let out_path = self.out_dir.join(format!("{table}.parquet"));
        let tmp_path = out_path.with_extension("tmp");

        let file = File::create(&tmp_path)
            .with_context(|| format!("creating {:?}", &tmp_path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .with_context(|| format!("opening Parquet writer for {table}"))?;
        writer
            .write(&batch)
            .with_context(|| format!("writing {table}"))?;
        writer
            .close()
            .with_context(|| format!("closing {table}"))?;

        Ok((tmp_path, out_path))
    }
}

// Warehouse column names keep the Spanish names the downstream dataset uses.

fn time_batch(rows: &[TimeRow]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("id_tiempo", DataType::Int64, false),
        Field::new("anio", DataType::Int32, false),
        Field::new("mes", DataType::Int32, false),
        Field::new("trimestre", DataType::Utf8, false),
        Field::new("nombre_mes", DataType::Utf8, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.time_key))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|r| r.month as i32),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.quarter.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.month_name.as_str()),
        )),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building dim_tiempo batch")
}

fn sector_batch(rows: &[SectorRow]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("id_sector", DataType::Int64, false),
        Field::new("nombre_sector", DataType::Utf8, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.sector_key),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.sector_name.as_str()),
        )),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building dim_sector batch")
}

fn fact_batch(rows: &[FactRow]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("id_tiempo", DataType::Int64, false),
        Field::new("id_sector", DataType::Int64, false),
        Field::new("valor_indice", DataType::Float64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.time_key))),
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.sector_key),
        )),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.value))),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building fact_iaenp batch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::sector::build_sector_dimension;
    use crate::star::time::build_time_dimension;
    use crate::{source::RawRecord, star::fact::build_facts};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn sample_star() -> StarSchema {
        let records = vec![
            RawRecord {
                year: 2024,
                month: 3,
                values: [101.5, 98.2, 95.0, 102.1, 99.0],
            },
            RawRecord {
                year: 2024,
                month: 4,
                values: [102.0, 98.9, 95.3, 102.8, 99.6],
            },
        ];
        let time = build_time_dimension(&records).unwrap();
        let sectors = build_sector_dimension().unwrap();
        let facts = build_facts(&records, &time, &sectors).unwrap();
        StarSchema {
            time,
            sectors,
            facts,
        }
    }

    fn parquet_rows(path: &Path) -> usize {
        let file = File::open(path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        reader.map(|batch| batch.unwrap().num_rows()).sum()
    }

    #[test]
    fn publishes_all_three_tables() {
        let dir = tempdir().unwrap();
        let sink = ParquetWarehouse::new(dir.path()).unwrap();
        sink.publish(&sample_star()).unwrap();

        assert_eq!(parquet_rows(&dir.path().join("dim_tiempo.parquet")), 2);
        assert_eq!(parquet_rows(&dir.path().join("dim_sector.parquet")), 5);
        assert_eq!(parquet_rows(&dir.path().join("fact_iaenp.parquet")), 10);
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let sink = ParquetWarehouse::new(dir.path()).unwrap();
        sink.publish(&sample_star()).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_rename_unpublishes_earlier_tables() {
        let dir = tempdir().unwrap();
        let sink = ParquetWarehouse::new(dir.path()).unwrap();
        // occupy the fact table's final path with a directory so its rename
        // fails after the two dimension tables have already landed
        fs::create_dir(dir.path().join("fact_iaenp.parquet")).unwrap();

        assert!(sink.publish(&sample_star()).is_err());

        assert!(!dir.path().join("dim_tiempo.parquet").exists());
        assert!(!dir.path().join("dim_sector.parquet").exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn fact_values_round_trip() {
        let dir = tempdir().unwrap();
        let sink = ParquetWarehouse::new(dir.path()).unwrap();
        let star = sample_star();
        sink.publish(&star).unwrap();

        let file = File::open(dir.path().join("fact_iaenp.parquet")).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        let keys = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        let values = batch
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(keys.value(0), star.facts[0].time_key);
        assert_eq!(values.value(0), star.facts[0].value);
    }
}
