//! Parquet results. Enable via the `parquet` feature.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatchReader;
use ndarray::Array3;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReader, ArrowWriter},
    file::properties::WriterProperties,
};

use super::arrow::{append_batch, results_batch, value_columns};
use super::RowTable;
use crate::error::Result;

const BATCH_SIZE: usize = 8192;

/// Saves a run (chain × sample × column) to a Parquet file.
///
/// ```rust
/// # use posterior_movie::io::parquet::save_parquet;
/// let data = ndarray::arr3(&[[[42.0_f64]]]); // 1 chain, 1 sample, 1 column
/// save_parquet(&["x".to_string()], &data, std::env::temp_dir().join("run.parquet"))?;
/// # Ok::<(), posterior_movie::error::MovieError>(())
/// ```
pub fn save_parquet(
    columns: &[String],
    data: &Array3<f64>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let batch = results_batch(columns, data)?;

    let file = File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    // Close the writer to ensure metadata is written
    writer.close()?;
    Ok(())
}

pub fn read_parquet(path: impl AsRef<Path>) -> Result<RowTable> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReader::try_new(file, BATCH_SIZE)?;
    let mut table = RowTable::with_columns(value_columns(&reader.schema()));
    for batch in reader {
        append_batch(&mut table, &batch?)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ResultsFile;
    use ndarray::arr3;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parquet_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // chain=0 => sample=0 => [1.0, 2.0], sample=1 => [3.0, 4.0]
        // chain=1 => sample=0 => [10.0, 20.0], sample=1 => [30.0, 40.0]
        let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]], [[10.0, 20.0], [30.0, 40.0]]]);
        let columns = vec!["x".to_string(), "y".to_string()];
        let file = NamedTempFile::new()?;
        save_parquet(&columns, &data, file.path())?;

        let table = read_parquet(file.path())?;
        assert_eq!(table.columns, columns);
        let results = ResultsFile::from_rows(table)?;
        assert_eq!(results.data(), &data);
        Ok(())
    }
}
