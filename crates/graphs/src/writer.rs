//! Writes GraphRecords to Parquet files using Arrow.

use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::path::PathBuf;
use std::sync::Arc;

use crate::types::GraphRecord;

/// Arrow schema for graph Parquet files (7 columns).
pub fn graph_schema() -> Schema {
    Schema::new(vec![
        Field::new("problem", DataType::Utf8, false),
        int_list_field("nodes"),
        int_list_field("sources"),
        int_list_field("targets"),
        int_list_field("indices"),
        Field::new(
            "y",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("timestamp_ms", DataType::UInt64, false),
    ])
}

fn int_list_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::List(Arc::new(Field::new("item", DataType::Int32, true))),
        false,
    )
}

/// Buffers graph records and writes them to a Parquet file.
pub struct GraphWriter {
    records: Vec<GraphRecord>,
    output_path: PathBuf,
}

impl GraphWriter {
    /// Create a new writer that will write to the given path.
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            records: Vec::new(),
            output_path,
        }
    }

    /// Buffer a single graph record.
    pub fn record(&mut self, record: GraphRecord) {
        self.records.push(record);
    }

    /// Buffer multiple graph records.
    pub fn record_all(&mut self, records: Vec<GraphRecord>) {
        self.records.extend(records);
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all buffered records to the Parquet file and return the output path.
    pub fn finish(self) -> anyhow::Result<PathBuf> {
        let schema = Arc::new(graph_schema());

        let batch = if self.records.is_empty() {
            RecordBatch::new_empty(schema.clone())
        } else {
            build_record_batch(&self.records)?
        };

        let file = std::fs::File::create(&self.output_path)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::info!(
            records = self.records.len(),
            path = %self.output_path.display(),
            "Wrote graph Parquet file"
        );

        Ok(self.output_path)
    }
}

/// Build an Arrow RecordBatch from graph records.
fn build_record_batch(records: &[GraphRecord]) -> anyhow::Result<RecordBatch> {
    let schema = Arc::new(graph_schema());

    let problems: StringArray = records.iter().map(|r| Some(r.problem.as_str())).collect();

    let mut nodes = ListBuilder::new(Int32Builder::new());
    let mut sources = ListBuilder::new(Int32Builder::new());
    let mut targets = ListBuilder::new(Int32Builder::new());
    let mut indices = ListBuilder::new(Int32Builder::new());
    let mut labels = ListBuilder::new(Float64Builder::new());
    for r in records {
        nodes.values().append_slice(&r.nodes);
        nodes.append(true);
        sources.values().append_slice(&r.sources);
        sources.append(true);
        targets.values().append_slice(&r.targets);
        targets.append(true);
        indices.values().append_slice(&r.indices);
        indices.append(true);
        labels.values().append_slice(&r.y);
        labels.append(true);
    }

    let timestamps: UInt64Array = records.iter().map(|r| Some(r.timestamp_ms)).collect();

    let columns: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(problems),
        Arc::new(nodes.finish()),
        Arc::new(sources.finish()),
        Arc::new(targets.finish()),
        Arc::new(indices.finish()),
        Arc::new(labels.finish()),
        Arc::new(timestamps),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}
