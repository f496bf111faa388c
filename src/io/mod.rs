/*!
# Results store

An ensemble sampler run stored as a flat table: the index columns `chain`
(walker) and `sample` (iteration), followed by one floating point column per
stored quantity.

```text
chain,sample,x,y,loglikelihood
0,0,1.2,-0.4,-3.1
1,0,0.7,0.2,-2.2
...
```

[`ResultsFile`] holds the whole run in memory as a `chain × sample × column`
array. The on-disk format is picked from the file extension; each format lives
behind its cargo feature (`csv`, `arrow`, `parquet`).
*/

#[cfg(feature = "arrow")]
pub mod arrow;

#[cfg(feature = "csv")]
pub mod csv;

#[cfg(feature = "parquet")]
pub mod parquet;

use std::path::Path;

use ndarray::{Array2, Array3, Axis};
use tracing::debug;

use crate::error::{MovieError, Result};
use crate::samples::Samples;
use crate::thinning::FrameSelection;

pub const CHAIN_COLUMN: &str = "chain";
pub const SAMPLE_COLUMN: &str = "sample";

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Arrow,
    Parquet,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("arrow" | "ipc" | "feather") => Ok(Format::Arrow),
            Some("parquet") => Ok(Format::Parquet),
            _ => Err(MovieError::data(format!(
                "cannot infer results format of {}",
                path.display()
            ))),
        }
    }
}

/// Column-wise rows as decoded by a format reader, before validation.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    pub columns: Vec<String>,
    pub chain: Vec<usize>,
    pub sample: Vec<usize>,
    /// One vector per entry of `columns`.
    pub values: Vec<Vec<f64>>,
}

impl RowTable {
    pub fn with_columns(columns: Vec<String>) -> Self {
        let values = vec![Vec::new(); columns.len()];
        Self {
            columns,
            chain: Vec::new(),
            sample: Vec::new(),
            values,
        }
    }

    pub fn push_row(&mut self, chain: usize, sample: usize, row: &[f64]) {
        self.chain.push(chain);
        self.sample.push(sample);
        for (column, &value) in self.values.iter_mut().zip(row) {
            column.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// A complete sampler run held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsFile {
    columns: Vec<String>,
    /// `chain × sample × column`
    data: Array3<f64>,
}

impl ResultsFile {
    pub fn new(columns: Vec<String>, data: Array3<f64>) -> Result<Self> {
        if data.shape()[2] != columns.len() {
            return Err(MovieError::data(format!(
                "{} column names for {} value columns",
                columns.len(),
                data.shape()[2]
            )));
        }
        if data.shape()[0] == 0 || data.shape()[1] == 0 {
            return Err(MovieError::data("results contain no samples"));
        }
        for (i, name) in columns.iter().enumerate() {
            if name == CHAIN_COLUMN || name == SAMPLE_COLUMN {
                return Err(MovieError::data(format!("'{name}' is a reserved column")));
            }
            if columns[..i].contains(name) {
                return Err(MovieError::data(format!("duplicate column '{name}'")));
            }
        }
        Ok(Self { columns, data })
    }

    /// Assembles a run from decoded rows. Every `(chain, sample)` pair of the
    /// run must appear exactly once; row order does not matter.
    pub fn from_rows(table: RowTable) -> Result<Self> {
        if table.is_empty() {
            return Err(MovieError::data("results contain no samples"));
        }
        let overflow = || MovieError::data("chain or sample index out of range");
        let extent = |idx: &[usize]| -> Result<usize> {
            idx.iter()
                .max()
                .map_or(Ok(0), |&m| m.checked_add(1).ok_or_else(overflow))
        };
        let n_chains = extent(&table.chain)?;
        let n_samples = extent(&table.sample)?;
        let expected = n_chains.checked_mul(n_samples).ok_or_else(overflow)?;
        if expected != table.len() {
            return Err(MovieError::data(format!(
                "expected {} rows for {} chains × {} samples, found {}",
                expected,
                n_chains,
                n_samples,
                table.len()
            )));
        }

        let mut data =
            Array3::<f64>::from_elem((n_chains, n_samples, table.columns.len()), f64::NAN);
        let mut seen = Array2::<bool>::from_elem((n_chains, n_samples), false);
        for row in 0..table.len() {
            let (c, s) = (table.chain[row], table.sample[row]);
            if std::mem::replace(&mut seen[[c, s]], true) {
                return Err(MovieError::data(format!(
                    "duplicate row for chain {c}, sample {s}"
                )));
            }
            for (col, values) in table.values.iter().enumerate() {
                data[[c, s, col]] = values[row];
            }
        }
        Self::new(table.columns, data)
    }

    /// Reads a run, choosing the format from the file extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        debug!(path = %path.display(), ?format, "reading results");
        let table = match format {
            #[cfg(feature = "csv")]
            Format::Csv => csv::read_csv(path)?,
            #[cfg(feature = "arrow")]
            Format::Arrow => arrow::read_arrow(path)?,
            #[cfg(feature = "parquet")]
            Format::Parquet => parquet::read_parquet(path)?,
            #[allow(unreachable_patterns)]
            other => return Err(unsupported(other)),
        };
        Self::from_rows(table)
    }

    /// Writes the run, choosing the format from the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match Format::from_path(path)? {
            #[cfg(feature = "csv")]
            Format::Csv => csv::save_csv(&self.columns, &self.data, path),
            #[cfg(feature = "arrow")]
            Format::Arrow => arrow::save_arrow(&self.columns, &self.data, path),
            #[cfg(feature = "parquet")]
            Format::Parquet => parquet::save_parquet(&self.columns, &self.data, path),
            #[allow(unreachable_patterns)]
            other => Err(unsupported(other)),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_chains(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_iterations(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                MovieError::data(format!(
                    "no column '{name}' in results (available: {})",
                    self.columns.join(", ")
                ))
            })
    }

    /// Loads the walker values of `params` (and of `z_column`, if given) at
    /// every iteration of `selection`.
    ///
    /// Consumes the run: nothing else is read once the frames are extracted.
    pub fn read_samples(
        self,
        params: &[String],
        z_column: Option<&str>,
        selection: &FrameSelection,
    ) -> Result<Samples> {
        let iterations: Vec<usize> = selection.iterations().collect();
        if let Some(&last) = iterations.last() {
            if last >= self.n_iterations() {
                return Err(MovieError::data(format!(
                    "iteration {last} requested but the run has {} iterations",
                    self.n_iterations()
                )));
            }
        }
        let param_idx = params
            .iter()
            .map(|p| self.column_index(p))
            .collect::<Result<Vec<_>>>()?;
        let z_idx = z_column.map(|z| self.column_index(z)).transpose()?;

        // chain × frame × column
        let thinned = self.data.select(Axis(1), &iterations);
        let table = |col: usize| thinned.index_axis(Axis(2), col).t().to_owned();

        debug!(
            frames = iterations.len(),
            walkers = self.n_chains(),
            "extracted thinned samples"
        );
        Samples::new(
            params.to_vec(),
            param_idx.into_iter().map(table).collect(),
            z_idx.map(table),
        )
    }
}

#[allow(dead_code)]
fn unsupported(format: Format) -> MovieError {
    MovieError::data(format!(
        "{format:?} results need the matching cargo feature to be enabled"
    ))
}
