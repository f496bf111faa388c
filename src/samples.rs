//! Thinned posterior samples held in memory for the whole run.

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{MovieError, Result};

/// Walker values per parameter and frame.
///
/// Every table has shape `frame × walker`; row `k` is the ensemble at the
/// iteration shown by frame `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    names: Vec<String>,
    values: Vec<Array2<f64>>,
    z_values: Option<Array2<f64>>,
}

/// One frame's worth of data, borrowed from [`Samples`].
#[derive(Debug, Clone)]
pub struct FrameSlice<'a> {
    pub frame: usize,
    /// One walker vector per parameter, in parameter order.
    pub values: Vec<ArrayView1<'a, f64>>,
    pub z_values: Option<ArrayView1<'a, f64>>,
}

impl Samples {
    pub fn new(
        names: Vec<String>,
        values: Vec<Array2<f64>>,
        z_values: Option<Array2<f64>>,
    ) -> Result<Self> {
        if names.len() != values.len() {
            return Err(MovieError::data(format!(
                "{} parameter names for {} sample tables",
                names.len(),
                values.len()
            )));
        }
        let shape = match values.first().or(z_values.as_ref()) {
            Some(table) => table.dim(),
            None => return Err(MovieError::data("no parameters to plot")),
        };
        let mismatched = values
            .iter()
            .chain(z_values.iter())
            .any(|table| table.dim() != shape);
        if mismatched {
            return Err(MovieError::data(
                "sample tables disagree on frame or walker count",
            ));
        }
        Ok(Self {
            names,
            values,
            z_values,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_params(&self) -> usize {
        self.names.len()
    }

    pub fn frame_count(&self) -> usize {
        self.shape().0
    }

    pub fn n_walkers(&self) -> usize {
        self.shape().1
    }

    fn shape(&self) -> (usize, usize) {
        self.values
            .first()
            .or(self.z_values.as_ref())
            .map_or((0, 0), |t| t.dim())
    }

    /// Full `frame × walker` table of a parameter.
    pub fn param(&self, name: &str) -> Option<&Array2<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.values[idx])
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Array2<f64>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn z_values(&self) -> Option<&Array2<f64>> {
        self.z_values.as_ref()
    }

    /// Slices out the walker vectors of `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame >= self.frame_count()`.
    pub fn frame(&self, frame: usize) -> FrameSlice<'_> {
        FrameSlice {
            frame,
            values: self
                .values
                .iter()
                .map(|table| table.index_axis(Axis(0), frame))
                .collect(),
            z_values: self
                .z_values
                .as_ref()
                .map(|table| table.index_axis(Axis(0), frame)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn two_param_samples() -> Samples {
        Samples::new(
            vec!["x".into(), "y".into()],
            vec![
                arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]),
                arr2(&[[-1.0, -2.0, -3.0], [-4.0, -5.0, -6.0]]),
            ],
            Some(arr2(&[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]])),
        )
        .unwrap()
    }

    #[test]
    fn test_shape_accessors() {
        let samples = two_param_samples();
        assert_eq!(samples.n_params(), 2);
        assert_eq!(samples.frame_count(), 2);
        assert_eq!(samples.n_walkers(), 3);
        assert!(samples.param("y").is_some());
        assert!(samples.param("z").is_none());
    }

    #[test]
    fn test_frame_slices_columns() {
        let samples = two_param_samples();
        let slice = samples.frame(1);
        assert_eq!(slice.frame, 1);
        assert_eq!(slice.values[0], arr1(&[4.0, 5.0, 6.0]));
        assert_eq!(slice.values[1], arr1(&[-4.0, -5.0, -6.0]));
        assert_eq!(slice.z_values.unwrap(), arr1(&[0.4, 0.5, 0.6]));
    }

    #[test]
    fn test_rejects_mismatched_tables() {
        let result = Samples::new(
            vec!["x".into(), "y".into()],
            vec![arr2(&[[1.0, 2.0]]), arr2(&[[1.0], [2.0]])],
            None,
        );
        assert!(result.is_err());
        assert!(Samples::new(vec![], vec![], None).is_err());
    }
}
