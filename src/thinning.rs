/*!
# Frame selection

Converts the user's choice of a frame count or a frame step into a thinning
interval over the sampler iterations, and derives the sample numbers and file
names of the frames.

Frame `k` shows iteration `start + k * interval`. Its sample number is that
iteration counted from one.

```rust
use posterior_movie::thinning::{FrameRequest, FrameSelection};

let request = FrameRequest::from_options(None, Some(9)).unwrap();
let selection = FrameSelection::resolve(request, 100, 0).unwrap();
assert_eq!(selection.interval, 9);
assert_eq!(selection.frame_count, 11);
assert_eq!(selection.sample_number(10), 91);
```
*/

use std::path::{Path, PathBuf};

use crate::error::{MovieError, Result};

/// How the user asked for frames. Exactly one of the two must be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    /// Target number of frames.
    Count(usize),
    /// Number of iterations between consecutive frames.
    Step(usize),
}

impl FrameRequest {
    /// Builds the request from the two mutually exclusive options.
    pub fn from_options(frame_number: Option<usize>, frame_step: Option<usize>) -> Result<Self> {
        match (frame_number, frame_step) {
            (Some(count), None) => Ok(FrameRequest::Count(count)),
            (None, Some(step)) => Ok(FrameRequest::Step(step)),
            (Some(_), Some(_)) => Err(MovieError::config(
                "--frame-number and --frame-step are mutually exclusive",
            )),
            (None, None) => Err(MovieError::config(
                "one of --frame-number or --frame-step is required",
            )),
        }
    }
}

/// Iteration window the frames are drawn from, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThinWindow {
    pub start: usize,
    pub end: Option<usize>,
}

impl ThinWindow {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self {
            start: start.unwrap_or(0),
            end,
        }
    }

    /// Number of iterations inside the window for a run of `n_iterations`.
    pub fn len(&self, n_iterations: usize) -> Result<usize> {
        let end = self.end.map_or(n_iterations, |e| e.min(n_iterations));
        if self.start >= end {
            return Err(MovieError::config(format!(
                "thinning window [{}, {}) is empty for a run of {} iterations",
                self.start, end, n_iterations
            )));
        }
        Ok(end - self.start)
    }
}

/// The resolved, fixed-for-the-run frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelection {
    /// First iteration of the window.
    pub start: usize,
    /// Iterations between consecutive frames.
    pub interval: usize,
    pub frame_count: usize,
}

impl FrameSelection {
    /// Resolves `request` against `n_iterations` iterations starting at `start`.
    ///
    /// A frame count `F` gives `interval = floor(N / (F - 1)) - 1`, a frame step
    /// `S` gives `interval = S` and `floor(N / (S + 1)) + 1` frames. The two
    /// formulas are not exact inverses of each other.
    pub fn resolve(request: FrameRequest, n_iterations: usize, start: usize) -> Result<Self> {
        let (interval, frame_count) = match request {
            FrameRequest::Count(count) => {
                if count < 2 {
                    return Err(MovieError::config(format!(
                        "--frame-number must be at least 2, got {count}"
                    )));
                }
                let per_frame = n_iterations / (count - 1);
                if per_frame == 0 {
                    return Err(MovieError::config(format!(
                        "cannot draw {count} frames from {n_iterations} iterations"
                    )));
                }
                (per_frame - 1, count)
            }
            FrameRequest::Step(step) => (step, n_iterations / (step + 1) + 1),
        };
        if interval == 0 {
            return Err(MovieError::config(format!(
                "thinning interval resolves to 0 for {n_iterations} iterations; \
                 every frame would show the same sample"
            )));
        }
        Ok(Self {
            start,
            interval,
            frame_count,
        })
    }

    /// Iteration index shown by `frame`.
    pub fn iteration(&self, frame: usize) -> usize {
        self.start + frame * self.interval
    }

    pub fn iterations(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.frame_count).map(|frame| self.iteration(frame))
    }

    /// One-based sample number printed on `frame`.
    pub fn sample_number(&self, frame: usize) -> usize {
        self.iteration(frame) + 1
    }

    pub fn max_sample_number(&self) -> usize {
        self.sample_number(self.frame_count.saturating_sub(1))
    }

    /// Width every sample number is zero-padded to.
    pub fn label_width(&self) -> usize {
        digit_count(self.max_sample_number())
    }

    pub fn padded_sample_number(&self, frame: usize) -> String {
        format!(
            "{:0width$}",
            self.sample_number(frame),
            width = self.label_width()
        )
    }

    /// `<prefix>-<padded sample number>.png`
    pub fn frame_path(&self, prefix: &Path, frame: usize) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(format!("-{}.png", self.padded_sample_number(frame)));
        PathBuf::from(name)
    }
}

fn digit_count(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_step_scenario() {
        let sel = FrameSelection::resolve(FrameRequest::Step(9), 100, 0).unwrap();
        assert_eq!(sel.interval, 9);
        assert_eq!(sel.frame_count, 11);
        let numbers: Vec<usize> = (0..sel.frame_count).map(|k| sel.sample_number(k)).collect();
        assert_eq!(numbers, vec![1, 10, 19, 28, 37, 46, 55, 64, 73, 82, 91]);
    }

    #[test]
    fn test_frame_number_scenario() {
        let sel = FrameSelection::resolve(FrameRequest::Count(11), 100, 0).unwrap();
        assert_eq!(sel.interval, 9);
        assert_eq!(sel.frame_count, 11);
    }

    #[test]
    fn test_both_or_neither_rejected() {
        assert!(FrameRequest::from_options(Some(3), Some(2))
            .unwrap_err()
            .is_config());
        assert!(FrameRequest::from_options(None, None)
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_degenerate_requests_are_config_errors() {
        for request in [
            FrameRequest::Count(0),
            FrameRequest::Count(1),
            FrameRequest::Count(500),
            FrameRequest::Step(0),
        ] {
            let err = FrameSelection::resolve(request, 100, 0).unwrap_err();
            assert!(err.is_config(), "{request:?} gave {err}");
        }
    }

    #[test]
    fn test_padding_and_paths() {
        let sel = FrameSelection::resolve(FrameRequest::Step(9), 100, 0).unwrap();
        assert_eq!(sel.max_sample_number(), 91);
        assert_eq!(sel.label_width(), 2);
        assert_eq!(sel.padded_sample_number(0), "01");
        assert_eq!(
            sel.frame_path(Path::new("out/movie"), 2),
            PathBuf::from("out/movie-19.png")
        );
    }

    #[test]
    fn test_window_offsets_sample_numbers() {
        let window = ThinWindow::new(Some(50), Some(80));
        let n = window.len(100).unwrap();
        assert_eq!(n, 30);
        let sel = FrameSelection::resolve(FrameRequest::Step(9), n, window.start).unwrap();
        assert_eq!(sel.frame_count, 4);
        assert_eq!(sel.iterations().collect::<Vec<_>>(), vec![50, 59, 68, 77]);
        assert_eq!(sel.sample_number(0), 51);
    }

    #[test]
    fn test_empty_window() {
        assert!(ThinWindow::new(Some(100), None).len(100).is_err());
        assert!(ThinWindow::new(Some(10), Some(5)).len(100).is_err());
        assert_eq!(ThinWindow::new(None, Some(1_000)).len(100).unwrap(), 100);
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(1000), 4);
    }
}
