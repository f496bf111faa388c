/*!
# Pairwise density estimates

A smoothed 2-D histogram of one panel's walker positions, the density level
enclosing a given probability mass, and iso-density contour segments traced
with marching squares.
*/

use ndarray::{Array2, ArrayView1};

/// Normalized density on a regular grid of cells covering `x × y`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    x: (f64, f64),
    y: (f64, f64),
    /// `ix × iy`; sums to one unless no point fell inside the grid.
    cells: Array2<f64>,
}

/// A straight piece of a contour line in data coordinates.
pub type Segment = [(f64, f64); 2];

impl DensityGrid {
    /// Bins the points `(xs[i], ys[i])` inside the bounds into `bins × bins`
    /// cells and smooths with a Gaussian of width `smoothing` cells. Points
    /// outside the bounds or with a NaN coordinate are ignored.
    pub fn estimate(
        xs: ArrayView1<f64>,
        ys: ArrayView1<f64>,
        x: (f64, f64),
        y: (f64, f64),
        bins: usize,
        smoothing: f64,
    ) -> Self {
        let bins = bins.max(1);
        let mut counts = Array2::<f64>::zeros((bins, bins));
        for (&px, &py) in xs.iter().zip(ys.iter()) {
            if let (Some(ix), Some(iy)) = (bin_of(px, x, bins), bin_of(py, y, bins)) {
                counts[[ix, iy]] += 1.0;
            }
        }

        let mut cells = if smoothing > 0.0 {
            smooth(&counts, smoothing)
        } else {
            counts
        };
        let total = cells.sum();
        if total > 0.0 {
            cells /= total;
        }
        Self { x, y, cells }
    }

    pub fn bins(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.cells[[ix, iy]]
    }

    pub fn max(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// Lower-left and upper-right corners of a cell.
    pub fn cell_bounds(&self, ix: usize, iy: usize) -> ((f64, f64), (f64, f64)) {
        let (dx, dy) = self.cell_size();
        let x0 = self.x.0 + ix as f64 * dx;
        let y0 = self.y.0 + iy as f64 * dy;
        ((x0, y0), (x0 + dx, y0 + dy))
    }

    fn cell_size(&self) -> (f64, f64) {
        let (nx, ny) = self.bins();
        (
            (self.x.1 - self.x.0) / nx as f64,
            (self.y.1 - self.y.0) / ny as f64,
        )
    }

    /// Density threshold whose superlevel set holds `fraction` of the mass,
    /// or `None` for an empty grid.
    pub fn credible_level(&self, fraction: f64) -> Option<f64> {
        let mut values: Vec<f64> = self
            .cells
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_unstable_by(|a, b| b.total_cmp(a));
        let target = fraction.clamp(0.0, 1.0) * values.iter().sum::<f64>();
        let mut mass = 0.0;
        for &v in &values {
            mass += v;
            if mass >= target {
                return Some(v);
            }
        }
        values.last().copied()
    }

    /// Contour of the `level` iso-line through the cell centers.
    ///
    /// The grid is padded with a ring of empty cells so regions touching the
    /// border still close; end points are clamped to the grid bounds.
    pub fn contour(&self, level: f64) -> Vec<Segment> {
        let (nx, ny) = self.bins();
        let (dx, dy) = self.cell_size();
        // padded index p sits at cell center p - 1
        let at = |px: usize, py: usize| -> f64 {
            if px == 0 || py == 0 || px > nx || py > ny {
                0.0
            } else {
                self.cells[[px - 1, py - 1]]
            }
        };
        let center = |px: usize, py: usize| -> (f64, f64) {
            (
                self.x.0 + (px as f64 - 0.5) * dx,
                self.y.0 + (py as f64 - 0.5) * dy,
            )
        };
        let clamp = |(px, py): (f64, f64)| -> (f64, f64) {
            (px.clamp(self.x.0, self.x.1), py.clamp(self.y.0, self.y.1))
        };

        let mut segments = Vec::new();
        for px in 0..=nx {
            for py in 0..=ny {
                // corners counter-clockwise from the lower left
                let corners = [(px, py), (px + 1, py), (px + 1, py + 1), (px, py + 1)];
                let values = corners.map(|(cx, cy)| at(cx, cy));
                let case = values
                    .iter()
                    .enumerate()
                    .fold(0usize, |acc, (bit, &v)| acc | (usize::from(v >= level) << bit));

                for &(e0, e1) in EDGE_TABLE[case] {
                    let point = |edge: usize| {
                        let (a, b) = EDGES[edge];
                        let pa = center(corners[a].0, corners[a].1);
                        let pb = center(corners[b].0, corners[b].1);
                        let t = crossing(values[a], values[b], level);
                        clamp((pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1)))
                    };
                    segments.push([point(e0), point(e1)]);
                }
            }
        }
        segments
    }
}

/// Corner pairs of the four cell edges: bottom, right, top, left.
const EDGES: [(usize, usize); 4] = [(0, 1), (1, 2), (3, 2), (0, 3)];

/// Edge pairs crossed by the iso-line for each of the 16 corner patterns.
/// Saddles (5 and 10) are split without disambiguation.
const EDGE_TABLE: [&[(usize, usize)]; 16] = [
    &[],
    &[(3, 0)],
    &[(0, 1)],
    &[(3, 1)],
    &[(1, 2)],
    &[(3, 0), (1, 2)],
    &[(0, 2)],
    &[(3, 2)],
    &[(2, 3)],
    &[(0, 2)],
    &[(0, 1), (2, 3)],
    &[(1, 2)],
    &[(1, 3)],
    &[(0, 1)],
    &[(0, 3)],
    &[],
];

fn crossing(va: f64, vb: f64, level: f64) -> f64 {
    if (vb - va).abs() < f64::EPSILON {
        0.5
    } else {
        ((level - va) / (vb - va)).clamp(0.0, 1.0)
    }
}

/// Bin of `v` among `bins` equal bins over `[lo, hi]`; `hi` falls in the last.
pub(crate) fn bin_of(v: f64, (lo, hi): (f64, f64), bins: usize) -> Option<usize> {
    if !(lo..=hi).contains(&v) || hi <= lo {
        return None;
    }
    let idx = ((v - lo) / (hi - lo) * bins as f64) as usize;
    Some(idx.min(bins - 1))
}

/// Separable Gaussian blur with a kernel truncated at three widths or at the
/// grid size, whichever is smaller.
fn smooth(counts: &Array2<f64>, width: f64) -> Array2<f64> {
    let (nx, ny) = counts.dim();
    let max_radius = nx.max(ny) as f64;
    let radius = (3.0 * width).ceil().min(max_radius) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / width).powi(2)).exp())
        .collect();

    let pass = |src: &Array2<f64>, along_x: bool| {
        Array2::from_shape_fn((nx, ny), |(ix, iy)| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let offset = k as isize - radius;
                    let (sx, sy) = if along_x {
                        (ix as isize + offset, iy as isize)
                    } else {
                        (ix as isize, iy as isize + offset)
                    };
                    let inside =
                        (0..nx as isize).contains(&sx) && (0..ny as isize).contains(&sy);
                    inside.then(|| w * src[[sx as usize, sy as usize]])
                })
                .sum::<f64>()
        })
    };
    let rows = pass(counts, true);
    pass(&rows, false)
}
