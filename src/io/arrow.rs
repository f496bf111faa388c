//! Arrow IPC results. Enable via the `arrow` feature.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Builder, UInt32Builder},
    compute::cast,
    datatypes::{DataType, Field, Float64Type, Schema, SchemaRef, UInt64Type},
    ipc::{reader::FileReader, writer::FileWriter},
    record_batch::RecordBatch,
};
use ndarray::Array3;

use super::{RowTable, CHAIN_COLUMN, SAMPLE_COLUMN};
use crate::error::{MovieError, Result};

/// Schema of a results table: chain (UInt32), sample (UInt32), then one
/// Float64 column per entry of `columns`.
pub(crate) fn results_schema(columns: &[String]) -> SchemaRef {
    let mut fields = vec![
        Field::new(CHAIN_COLUMN, DataType::UInt32, false),
        Field::new(SAMPLE_COLUMN, DataType::UInt32, false),
    ];
    fields.extend(
        columns
            .iter()
            .map(|name| Field::new(name.as_str(), DataType::Float64, true)),
    );
    Arc::new(Schema::new(fields))
}

/// Builds a single record batch from `data[chain][sample][column]`.
pub(crate) fn results_batch(columns: &[String], data: &Array3<f64>) -> Result<RecordBatch> {
    let (n_chains, n_samples, n_cols) = data.dim();
    let schema = results_schema(columns);

    let mut chain_builder = UInt32Builder::with_capacity(n_chains * n_samples);
    let mut sample_builder = UInt32Builder::with_capacity(n_chains * n_samples);
    let mut col_builders: Vec<Float64Builder> = (0..n_cols)
        .map(|_| Float64Builder::with_capacity(n_chains * n_samples))
        .collect();

    for chain_idx in 0..n_chains {
        for sample_idx in 0..n_samples {
            chain_builder.append_value(chain_idx as u32);
            sample_builder.append_value(sample_idx as u32);
            for (col_idx, builder) in col_builders.iter_mut().enumerate() {
                builder.append_value(data[[chain_idx, sample_idx, col_idx]]);
            }
        }
    }

    let mut arrays = vec![
        Arc::new(chain_builder.finish()) as ArrayRef,
        Arc::new(sample_builder.finish()) as ArrayRef,
    ];
    arrays.extend(
        col_builders
            .iter_mut()
            .map(|builder| Arc::new(builder.finish()) as ArrayRef),
    );
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Appends the rows of `batch` to `table`, matching value columns by name.
pub(crate) fn append_batch(table: &mut RowTable, batch: &RecordBatch) -> Result<()> {
    let column = |name: &str| -> Result<ArrayRef> {
        batch
            .column_by_name(name)
            .cloned()
            .ok_or_else(|| MovieError::data(format!("results lack a '{name}' column")))
    };

    let index = |name: &str| -> Result<Vec<usize>> {
        let array = cast(&column(name)?, &DataType::UInt64)?;
        if array.null_count() > 0 {
            return Err(MovieError::data(format!("null entries in '{name}' column")));
        }
        Ok(array
            .as_primitive::<UInt64Type>()
            .values()
            .iter()
            .map(|&v| v as usize)
            .collect())
    };
    table.chain.extend(index(CHAIN_COLUMN)?);
    table.sample.extend(index(SAMPLE_COLUMN)?);

    for (name, values) in table.columns.iter().zip(table.values.iter_mut()) {
        let array = cast(&column(name)?, &DataType::Float64)?;
        let array = array.as_primitive::<Float64Type>();
        values.extend((0..array.len()).map(|i| {
            if array.is_null(i) {
                f64::NAN
            } else {
                array.value(i)
            }
        }));
    }
    Ok(())
}

/// Value column names of a results schema, in schema order.
pub(crate) fn value_columns(schema: &Schema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .filter(|name| name != CHAIN_COLUMN && name != SAMPLE_COLUMN)
        .collect()
}

/// Saves a run (chain × sample × column) as an Apache Arrow IPC file.
pub fn save_arrow(columns: &[String], data: &Array3<f64>, path: impl AsRef<Path>) -> Result<()> {
    let batch = results_batch(columns, data)?;

    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

/// Reads every record batch of an Arrow IPC results file.
pub fn read_arrow(path: impl AsRef<Path>) -> Result<RowTable> {
    let file = File::open(path)?;
    let reader = FileReader::try_new(file, None)?;
    let mut table = RowTable::with_columns(value_columns(&reader.schema()));
    for batch in reader {
        append_batch(&mut table, &batch?)?;
    }
    Ok(table)
}
