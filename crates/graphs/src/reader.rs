//! Reads GraphRecords from Parquet files.

use arrow::array::*;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::{GraphRecord, GraphSummary};

/// Static methods for reading graph data from Parquet files.
pub struct GraphReader;

impl GraphReader {
    /// Read all graph records from a Parquet file.
    pub fn read_all(path: &Path) -> anyhow::Result<Vec<GraphRecord>> {
        let file = std::fs::File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut records = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            let mut batch_records = extract_records_from_batch(&batch)?;
            records.append(&mut batch_records);
        }

        tracing::debug!(
            count = records.len(),
            path = %path.display(),
            "Read graph records"
        );

        Ok(records)
    }

    /// Read graph records from multiple Parquet files.
    pub fn read_multiple(paths: &[PathBuf]) -> anyhow::Result<Vec<GraphRecord>> {
        let mut all_records = Vec::new();
        for path in paths {
            let mut records = Self::read_all(path)?;
            all_records.append(&mut records);
        }
        Ok(all_records)
    }

    /// Compute summary statistics from a graph Parquet file.
    pub fn read_summary(path: &Path) -> anyhow::Result<GraphSummary> {
        let records = Self::read_all(path)?;

        let mut problems = HashSet::new();
        let mut total_nodes = 0u64;
        let mut total_edges = 0u64;
        let mut total_actions = 0u64;

        for record in &records {
            problems.insert(record.problem.clone());
            total_nodes += record.num_nodes() as u64;
            total_edges += record.num_edges() as u64;
            total_actions += record.y.len() as u64;
        }

        Ok(GraphSummary {
            total_records: records.len(),
            unique_problems: problems.len(),
            total_nodes,
            total_edges,
            total_actions,
        })
    }

    /// Read only records for a specific problem from a Parquet file.
    pub fn read_for_problem(path: &Path, problem: &str) -> anyhow::Result<Vec<GraphRecord>> {
        let records = Self::read_all(path)?;
        Ok(records
            .into_iter()
            .filter(|r| r.problem == problem)
            .collect())
    }
}

/// Extract graph records from a single Arrow RecordBatch.
fn extract_records_from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<GraphRecord>> {
    let problems = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 0 (problem) is not StringArray"))?;

    let nodes = list_column(batch, 1, "nodes")?;
    let sources = list_column(batch, 2, "sources")?;
    let targets = list_column(batch, 3, "targets")?;
    let indices = list_column(batch, 4, "indices")?;

    let labels = batch
        .column(5)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| anyhow::anyhow!("Column 5 (y) is not ListArray"))?;

    let timestamps = batch
        .column(6)
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| anyhow::anyhow!("Column 6 (timestamp_ms) is not UInt64Array"))?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        records.push(GraphRecord {
            problem: problems.value(i).to_string(),
            nodes: int_list(nodes, i)?,
            sources: int_list(sources, i)?,
            targets: int_list(targets, i)?,
            indices: int_list(indices, i)?,
            y: float_list(labels, i)?,
            timestamp_ms: timestamps.value(i),
        });
    }

    Ok(records)
}

fn list_column<'a>(
    batch: &'a RecordBatch,
    index: usize,
    name: &str,
) -> anyhow::Result<&'a ListArray> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| anyhow::anyhow!("Column {index} ({name}) is not ListArray"))
}

fn int_list(column: &ListArray, row: usize) -> anyhow::Result<Vec<i32>> {
    let values = column.value(row);
    let values = values
        .as_any()
        .downcast_ref::<Int32Array>()
        .ok_or_else(|| anyhow::anyhow!("list items are not Int32Array"))?;
    Ok(values.values().to_vec())
}

fn float_list(column: &ListArray, row: usize) -> anyhow::Result<Vec<f64>> {
    let values = column.value(row);
    let values = values
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow::anyhow!("list items are not Float64Array"))?;
    Ok(values.values().to_vec())
}
