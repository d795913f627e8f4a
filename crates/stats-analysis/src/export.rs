use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow_array::builder::{Float64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use clap::ValueEnum;
use parquet::arrow::ArrowWriter;
use simstats::{compare_by_group, RuleTable};

use crate::batch::AnalyzedReport;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Parquet,
    Csv,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Parquet => "parquet",
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

/// Create the schema for summary record batches: identifying columns, one
/// column per rule, the comparison columns and the list of defaulted fields
pub fn create_summary_schema(table: &RuleTable) -> SchemaRef {
    let mut fields = vec![
        Field::new("label", DataType::Utf8, false),
        Field::new("group", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("operating_point", DataType::Utf8, false),
    ];
    fields.extend(
        table
            .names()
            .map(|name| Field::new(name, DataType::Float64, false)),
    );
    fields.push(Field::new("speedup", DataType::Float64, false));
    fields.push(Field::new("throughput_gain", DataType::Float64, false));
    fields.push(Field::new("defaulted", DataType::Utf8, false));

    Arc::new(Schema::new(fields))
}

/// Convert analyzed reports to an Arrow RecordBatch, one row per report
pub fn reports_to_batch(
    reports: &[AnalyzedReport],
    table: &RuleTable,
    schema: SchemaRef,
) -> Result<RecordBatch> {
    let rows = reports.len();

    let mut label_builder = StringBuilder::with_capacity(rows, rows * 16);
    let mut group_builder = StringBuilder::with_capacity(rows, rows * 16);
    let mut source_builder = StringBuilder::with_capacity(rows, rows * 64);
    let mut point_builder = StringBuilder::with_capacity(rows, rows * 12);
    let mut metric_builders: Vec<Float64Builder> = table
        .names()
        .map(|_| Float64Builder::with_capacity(rows))
        .collect();
    let mut speedup_builder = Float64Builder::with_capacity(rows);
    let mut gain_builder = Float64Builder::with_capacity(rows);
    let mut defaulted_builder = StringBuilder::with_capacity(rows, rows * 32);

    let relative = compare_by_group(reports.iter().map(|r| (r.group.as_str(), &r.derived)));

    for (report, rel) in reports.iter().zip(&relative) {
        label_builder.append_value(&report.label);
        group_builder.append_value(&report.group);
        source_builder.append_value(&report.source);
        point_builder.append_value(&report.operating_point.name);

        for (builder, name) in metric_builders.iter_mut().zip(table.names()) {
            let value = report
                .derived
                .get(name)
                .ok_or_else(|| anyhow!("{}: field {} missing from record", report.label, name))?;
            builder.append_value(value);
        }

        speedup_builder.append_value(rel.speedup);
        gain_builder.append_value(rel.throughput_gain);
        defaulted_builder.append_value(report.derived.defaulted().collect::<Vec<_>>().join(","));
    }

    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(label_builder.finish()),
        Arc::new(group_builder.finish()),
        Arc::new(source_builder.finish()),
        Arc::new(point_builder.finish()),
    ];
    arrays.extend(
        metric_builders
            .iter_mut()
            .map(|b| Arc::new(b.finish()) as ArrayRef),
    );
    arrays.push(Arc::new(speedup_builder.finish()));
    arrays.push(Arc::new(gain_builder.finish()));
    arrays.push(Arc::new(defaulted_builder.finish()));

    RecordBatch::try_new(schema, arrays).with_context(|| "Failed to create summary record batch")
}

/// Write `batch` to `writer` in the given format
pub fn write_batch<W: Write + Send>(writer: W, batch: &RecordBatch, format: Format) -> Result<()> {
    match format {
        Format::Parquet => {
            let mut arrow_writer = ArrowWriter::try_new(writer, batch.schema(), None)
                .with_context(|| "Failed to create Arrow writer")?;
            arrow_writer
                .write(batch)
                .with_context(|| "Failed to write batch to Parquet")?;
            arrow_writer
                .close()
                .map(|_| ())
                .with_context(|| "Failed to close Parquet writer")
        }
        Format::Csv => {
            let mut csv_writer = arrow_csv::WriterBuilder::new()
                .with_header(true)
                .build(writer);
            csv_writer
                .write(batch)
                .with_context(|| "Failed to write batch to CSV")
        }
        Format::Json => {
            let mut json_writer = arrow_json::ArrayWriter::new(writer);
            json_writer
                .write(batch)
                .with_context(|| "Failed to write batch to JSON")?;
            json_writer
                .finish()
                .with_context(|| "Failed to finish JSON output")
        }
    }
}

/// Write the summary of `reports` to `path`
pub fn export(
    path: &Path,
    reports: &[AnalyzedReport],
    table: &RuleTable,
    format: Format,
) -> Result<()> {
    let schema = create_summary_schema(table);
    let batch = reports_to_batch(reports, table, schema)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_batch(file, &batch, format)
}
