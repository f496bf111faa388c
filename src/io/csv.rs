/*!
# CSV results

Reads and writes results stores as CSV. Enable via the `csv` feature (on by
default).
*/

use std::fs::File;
use std::path::Path;

use csv::{Reader, Writer};
use ndarray::{Array3, Axis};

use super::{RowTable, CHAIN_COLUMN, SAMPLE_COLUMN};
use crate::error::{MovieError, Result};

/**
Saves a run as a CSV file.

The data is expected to be in a shape of **chain × sample × column**.

The resulting CSV file will have:
- A header row containing `"chain"`, `"sample"`, and one entry of `columns`
  per value column.
- Each subsequent row will correspond to a single sample of a specific chain.

# Examples

```rust
use posterior_movie::io::csv::save_csv;
use ndarray::arr3;

// one chain, two samples, two columns
let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]]]);
let columns = vec!["x".to_string(), "y".to_string()];

save_csv(&columns, &data, std::env::temp_dir().join("run.csv"))?;
# Ok::<(), posterior_movie::error::MovieError>(())
```
*/
pub fn save_csv(columns: &[String], data: &Array3<f64>, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);

    let mut header: Vec<String> = vec![CHAIN_COLUMN.to_string(), SAMPLE_COLUMN.to_string()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;

    for (chain_idx, chain) in data.axis_iter(Axis(0)).enumerate() {
        for (sample_idx, sample) in chain.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(sample.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Reads a CSV results file into rows. Columns may come in any order as long
/// as `chain` and `sample` are present.
pub fn read_csv(path: impl AsRef<Path>) -> Result<RowTable> {
    let mut rdr = Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| MovieError::data(format!("CSV results lack a '{name}' column")))
    };
    let chain_pos = position(CHAIN_COLUMN)?;
    let sample_pos = position(SAMPLE_COLUMN)?;
    let value_pos: Vec<usize> = (0..headers.len())
        .filter(|&i| i != chain_pos && i != sample_pos)
        .collect();

    let mut table =
        RowTable::with_columns(value_pos.iter().map(|&i| headers[i].trim().to_string()).collect());
    let mut row = Vec::with_capacity(value_pos.len());
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let index = |pos: usize| -> Result<usize> {
            record[pos].trim().parse().map_err(|e| {
                MovieError::data(format!("row {}: bad index '{}': {e}", line + 1, &record[pos]))
            })
        };
        let (chain, sample) = (index(chain_pos)?, index(sample_pos)?);

        row.clear();
        for &pos in &value_pos {
            let field = record[pos].trim();
            let value = if field.is_empty() {
                f64::NAN
            } else {
                field.parse().map_err(|e| {
                    MovieError::data(format!("row {}: bad value '{field}': {e}", line + 1))
                })?
            };
            row.push(value);
        }
        table.push_row(chain, sample, &row);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ResultsFile;
    use ndarray::arr3;
    use std::fs;
    use tempfile::NamedTempFile;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Test multiple chains, multiple samples, multiple columns to CSV.
    #[test]
    fn test_save_csv_multi_chain() {
        // data[chain][sample][column]
        let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]], [[10.0, 20.0], [30.0, 40.0]]]);
        let file = NamedTempFile::new().expect("Could not create temp file");

        let result = save_csv(&columns(&["x", "y"]), &data, file.path());
        assert!(result.is_ok());

        let contents = fs::read_to_string(file.path()).unwrap();
        let expected = "\
chain,sample,x,y
0,0,1,2
0,1,3,4
1,0,10,20
1,1,30,40";
        assert_eq!(contents.trim(), expected);
    }

    #[test]
    fn test_read_csv_reordered_columns() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(
            file.path(),
            "x,sample,chain,loglikelihood\n1.5,0,0,-1\n2.5,0,1,\n3.5,1,0,-3\n4.5,1,1,-4\n",
        )
        .unwrap();

        let table = read_csv(file.path()).unwrap();
        assert_eq!(table.columns, columns(&["x", "loglikelihood"]));
        assert_eq!(table.chain, vec![0, 1, 0, 1]);
        assert_eq!(table.sample, vec![0, 0, 1, 1]);
        assert!(table.values[1][1].is_nan());

        let results = ResultsFile::from_rows(table).unwrap();
        assert_eq!(results.data()[[1, 1, 0]], 4.5);
    }

    #[test]
    fn test_read_csv_missing_index_column() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "chain,x\n0,1.0\n").unwrap();
        assert!(matches!(read_csv(file.path()), Err(MovieError::Data(_))));
    }

    #[test]
    fn test_read_csv_bad_value() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        fs::write(file.path(), "chain,sample,x\n0,0,abc\n").unwrap();
        assert!(read_csv(file.path()).is_err());
    }

    #[test]
    fn test_csv_round_trip_through_results_file(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.csv");
        let data = arr3(&[[[0.5, -1.0]], [[0.25, f64::NAN]]]);
        let original = ResultsFile::new(columns(&["a", "b"]), data)?;
        original.save(&path)?;

        let loaded = ResultsFile::open(&path)?;
        assert_eq!(loaded.columns(), original.columns());
        assert_eq!(loaded.data()[[1, 0, 0]], 0.25);
        assert!(loaded.data()[[1, 0, 1]].is_nan());
        Ok(())
    }
}
