/*!
# Frame rendering

One frame is a corner plot: an `n × n` grid of panels for `n` parameters with
the marginal histogram of each parameter on the diagonal and the pairwise
views (density, scatter, credible contours) below it. When the walkers are
color-mapped a colorbar strip is added on the right.

The pipeline only talks to the [`FigureRenderer`] trait. [`PlottersRenderer`]
draws PNG files with the plotters bitmap backend.
*/

use std::cmp::Ordering;
use std::path::Path;

use ndarray::ArrayView1;
use plotters::chart::ChartContext;
use plotters::coord::{cartesian::Cartesian2d, types::RangedCoordf64, Shift};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::density::{bin_of, DensityGrid};
use crate::error::{MovieError, Result};
use crate::params::ParameterSpec;
use crate::ranges::{percentile, AxisRange};
use crate::style::PlotStyle;

const TICK_PT: f64 = 7.0;
const LABEL_PT: f64 = 9.0;
const TICKS: usize = 4;
const COLORBAR_STEPS: usize = 128;
const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);

/// The "Sample N" label in the top right corner of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub text: String,
    /// Right edge of the text as a fraction of the figure width.
    pub x: f64,
    /// Top of the text as a fraction of the figure height, from the bottom.
    pub y: f64,
    /// Font size in points.
    pub font_pt: f64,
}

impl Annotation {
    const X: f64 = 0.9;
    const X_WITH_COLORBAR: f64 = 0.8;
    const Y: f64 = 0.97;
    const FONT_PT: f64 = 8.0;

    /// Label for a frame. The font grows with `scale`, the panel count per side.
    pub fn sample(padded_number: &str, has_colorbar: bool, scale: f64) -> Self {
        Self {
            text: format!("Sample {padded_number}"),
            x: if has_colorbar {
                Self::X_WITH_COLORBAR
            } else {
                Self::X
            },
            y: Self::Y,
            font_pt: Self::FONT_PT * scale,
        }
    }

    /// Anchor in pixels of a `width × height` image (origin top left).
    pub fn anchor_px(&self, (width, height): (u32, u32)) -> (i32, i32) {
        (
            (self.x * width as f64).round() as i32,
            ((1.0 - self.y) * height as f64).round() as i32,
        )
    }
}

/// Walker colors and the shared scale they are mapped through.
#[derive(Debug, Clone)]
pub struct ColorAxis<'a> {
    pub label: &'a str,
    pub range: AxisRange,
    pub values: ArrayView1<'a, f64>,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameFigure<'a> {
    pub frame: usize,
    pub params: &'a [ParameterSpec],
    /// Walker values per parameter, in `params` order.
    pub values: Vec<ArrayView1<'a, f64>>,
    pub ranges: &'a [AxisRange],
    pub color: Option<ColorAxis<'a>>,
    pub style: &'a PlotStyle,
    pub annotation: Annotation,
}

impl FrameFigure<'_> {
    pub fn has_colorbar(&self) -> bool {
        self.color.is_some()
    }

    pub fn layout(&self) -> FigureLayout {
        FigureLayout::new(self.params.len(), self.style, self.has_colorbar())
    }

    /// Checks that every per-parameter and per-walker vector lines up.
    pub fn validate(&self) -> Result<()> {
        let n = self.params.len();
        if n == 0 {
            return Err(MovieError::render(self.frame, "no parameters to draw"));
        }
        if self.values.len() != n || self.ranges.len() != n {
            return Err(MovieError::render(
                self.frame,
                format!(
                    "{n} parameters but {} value vectors and {} ranges",
                    self.values.len(),
                    self.ranges.len()
                ),
            ));
        }
        let walkers = self.values[0].len();
        let ragged = self
            .values
            .iter()
            .map(|v| v.len())
            .chain(self.color.iter().map(|c| c.values.len()))
            .any(|len| len != walkers);
        if ragged {
            return Err(MovieError::render(
                self.frame,
                "walker vectors differ in length",
            ));
        }
        Ok(())
    }
}

/// Pixel geometry of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureLayout {
    pub n_panels: usize,
    pub panel_px: u32,
    /// Width of the colorbar strip; zero without one.
    pub colorbar_px: u32,
}

impl FigureLayout {
    pub fn new(n_panels: usize, style: &PlotStyle, has_colorbar: bool) -> Self {
        let panel_px = style.panel_px();
        Self {
            n_panels,
            panel_px,
            colorbar_px: if has_colorbar { panel_px * 2 / 5 } else { 0 },
        }
    }

    pub fn grid_px(&self) -> u32 {
        self.n_panels as u32 * self.panel_px
    }

    /// Image size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.grid_px() + self.colorbar_px, self.grid_px())
    }

    /// Figure scale factor: panels per side.
    pub fn scale(&self) -> f64 {
        self.n_panels.max(1) as f64
    }

    fn margin_px(&self) -> i32 {
        (self.panel_px / 40).max(1) as i32
    }

    fn label_area_px(&self) -> i32 {
        (self.panel_px as f64 * 0.18).round() as i32
    }
}

/// Draws a frame and writes it to `path`.
pub trait FigureRenderer {
    fn render(&mut self, figure: &FrameFigure<'_>, path: &Path) -> Result<()>;
}

/// PNG frames through the plotters bitmap backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlottersRenderer;

impl FigureRenderer for PlottersRenderer {
    fn render(&mut self, figure: &FrameFigure<'_>, path: &Path) -> Result<()> {
        figure.validate()?;
        let layout = figure.layout();
        let root = BitMapBackend::new(path, layout.size()).into_drawing_area();
        draw_figure(&root, figure, &layout)
            .map_err(|e| MovieError::render(figure.frame, e))?;
        root.present()
            .map_err(|e| MovieError::render(figure.frame, e))?;
        Ok(())
    }
}

type DrawResult<DB> =
    std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;
type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Debug, Clone, Copy)]
struct PanelEdges {
    bottom: bool,
    left: bool,
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &FrameFigure<'_>,
    layout: &FigureLayout,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    let grid_area = match &figure.color {
        Some(axis) => {
            let (grid, bar) = root.split_horizontally(layout.grid_px() as i32);
            draw_colorbar(&bar, axis, figure.style, layout)?;
            grid
        }
        None => root.clone(),
    };

    let n = layout.n_panels;
    for (idx, area) in grid_area.split_evenly((n, n)).iter().enumerate() {
        let (row, col) = (idx / n, idx % n);
        let edges = PanelEdges {
            bottom: row + 1 == n,
            left: col == 0,
        };
        match row.cmp(&col) {
            Ordering::Equal if figure.style.plot_marginal => {
                draw_marginal(area, figure, col, edges, layout)?
            }
            Ordering::Greater => draw_pair(area, figure, col, row, edges, layout)?,
            _ => {}
        }
    }

    draw_annotation(root, &figure.annotation, figure.style)
}

fn draw_marginal<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &FrameFigure<'_>,
    idx: usize,
    edges: PanelEdges,
    layout: &FigureLayout,
) -> DrawResult<DB> {
    let style = figure.style;
    let values = figure.values[idx];
    let bounds = figure.ranges[idx].plot_bounds();
    let counts = histogram(values, bounds, style.density_bins);
    let top = counts.iter().copied().fold(0.0, f64::max).max(1.0) * 1.1;

    let mut chart = ChartBuilder::on(area)
        .margin(layout.margin_px())
        .x_label_area_size(layout.label_area_px())
        .y_label_area_size(layout.label_area_px())
        .build_cartesian_2d(bounds.0..bounds.1, 0.0..top)?;
    let label = figure.params[idx].label.as_str();
    configure_axes(&mut chart, edges.bottom.then_some(label), None, style)?;

    let width = (bounds.1 - bounds.0) / counts.len() as f64;
    chart.draw_series(
        counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0.0)
            .map(|(i, &count)| {
                let x0 = bounds.0 + i as f64 * width;
                Rectangle::new([(x0, 0.0), (x0 + width, count)], BAR_COLOR.mix(0.6).filled())
            }),
    )?;

    let stroke = line_px(style);
    chart.draw_series(
        style
            .marginal_percentiles
            .iter()
            .filter_map(|&p| percentile(values, p))
            .map(|q| PathElement::new(vec![(q, 0.0), (q, top)], BLACK.stroke_width(stroke))),
    )?;
    Ok(())
}

fn draw_pair<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &FrameFigure<'_>,
    xi: usize,
    yi: usize,
    edges: PanelEdges,
    layout: &FigureLayout,
) -> DrawResult<DB> {
    let style = figure.style;
    let (xs, ys) = (figure.values[xi], figure.values[yi]);
    let xb = figure.ranges[xi].plot_bounds();
    let yb = figure.ranges[yi].plot_bounds();

    let mut chart = ChartBuilder::on(area)
        .margin(layout.margin_px())
        .x_label_area_size(layout.label_area_px())
        .y_label_area_size(layout.label_area_px())
        .build_cartesian_2d(xb.0..xb.1, yb.0..yb.1)?;
    configure_axes(
        &mut chart,
        edges.bottom.then_some(figure.params[xi].label.as_str()),
        edges.left.then_some(figure.params[yi].label.as_str()),
        style,
    )?;

    let grid = (style.plot_density || style.plot_contours).then(|| {
        DensityGrid::estimate(xs, ys, xb, yb, style.density_bins, style.density_smoothing)
    });

    if let Some(grid) = grid.as_ref().filter(|_| style.plot_density) {
        let peak = grid.max();
        let (nx, ny) = grid.bins();
        if peak > 0.0 {
            chart.draw_series(
                (0..nx)
                    .flat_map(|ix| (0..ny).map(move |iy| (ix, iy)))
                    .filter(|&(ix, iy)| grid.value(ix, iy) > 0.0)
                    .map(|(ix, iy)| {
                        let (p0, p1) = grid.cell_bounds(ix, iy);
                        let shade = style.density_cmap.color(grid.value(ix, iy) / peak);
                        Rectangle::new([p0, p1], shade.filled())
                    }),
            )?;
        }
    }

    if style.plot_scatter {
        let marker = style.marker_px();
        chart.draw_series(
            xs.iter()
                .zip(ys.iter())
                .enumerate()
                .filter(|(_, (&x, &y))| inside(x, xb) && inside(y, yb))
                .map(|(i, (&x, &y))| {
                    let fill = match &figure.color {
                        Some(axis) => style
                            .scatter_cmap
                            .color(axis.range.normalize(axis.values[i]))
                            .filled(),
                        None => BAR_COLOR.mix(0.5).filled(),
                    };
                    Circle::new((x, y), marker, fill)
                }),
        )?;
    }

    if let Some(grid) = grid.as_ref().filter(|_| style.plot_contours) {
        let stroke = line_px(style);
        for &p in &style.contour_percentiles {
            let Some(level) = grid.credible_level(p / 100.0) else {
                continue;
            };
            chart.draw_series(
                grid.contour(level)
                    .into_iter()
                    .map(|[a, b]| PathElement::new(vec![a, b], BLACK.stroke_width(stroke))),
            )?;
        }
    }
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    axis: &ColorAxis<'_>,
    style: &PlotStyle,
    layout: &FigureLayout,
) -> DrawResult<DB> {
    let (lo, hi) = axis.range.plot_bounds();
    let mut chart = ChartBuilder::on(area)
        .margin(layout.margin_px())
        .x_label_area_size(layout.label_area_px())
        .right_y_label_area_size(layout.label_area_px())
        .build_cartesian_2d(0.0..1.0, lo..hi)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .x_labels(0)
        .y_labels(TICKS)
        .y_label_formatter(&format_tick)
        .label_style(("sans-serif", font_px(style, TICK_PT)))
        .axis_desc_style(("sans-serif", font_px(style, LABEL_PT)))
        .y_desc(axis.label)
        .draw()?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    chart.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = lo + i as f64 * step;
        let shade = style.scatter_cmap.color(axis.range.normalize(y0 + 0.5 * step));
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], shade.filled())
    }))?;
    Ok(())
}

fn draw_annotation<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    annotation: &Annotation,
    style: &PlotStyle,
) -> DrawResult<DB> {
    let text = ("sans-serif", font_px(style, annotation.font_pt))
        .into_text_style(root)
        .pos(Pos::new(HPos::Right, VPos::Top));
    root.draw_text(
        &annotation.text,
        &text,
        annotation.anchor_px(root.dim_in_pixel()),
    )
}

/// Axis descriptions double as the switch for tick labels: panels not on
/// the bottom row or the left column show neither.
fn configure_axes<DB: DrawingBackend>(
    chart: &mut Chart<'_, DB>,
    x_desc: Option<&str>,
    y_desc: Option<&str>,
    style: &PlotStyle,
) -> DrawResult<DB> {
    let x_fmt: &dyn Fn(&f64) -> String = if x_desc.is_some() {
        &format_tick
    } else {
        &blank_tick
    };
    let y_fmt: &dyn Fn(&f64) -> String = if y_desc.is_some() {
        &format_tick
    } else {
        &blank_tick
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_labels(TICKS)
        .y_labels(TICKS)
        .x_label_formatter(x_fmt)
        .y_label_formatter(y_fmt)
        .label_style(("sans-serif", font_px(style, TICK_PT)))
        .axis_desc_style(("sans-serif", font_px(style, LABEL_PT)));
    if let Some(desc) = x_desc {
        mesh.x_desc(desc);
    }
    if let Some(desc) = y_desc {
        mesh.y_desc(desc);
    }
    mesh.draw()
}

/// Counts of the finite `values` in `bins` equal bins over `bounds`.
fn histogram(values: ArrayView1<f64>, bounds: (f64, f64), bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let mut counts = vec![0.0; bins];
    for idx in values.iter().filter_map(|&v| bin_of(v, bounds, bins)) {
        counts[idx] += 1.0;
    }
    counts
}

fn inside(v: f64, (lo, hi): (f64, f64)) -> bool {
    (lo..=hi).contains(&v)
}

fn font_px(style: &PlotStyle, pt: f64) -> i32 {
    (pt * style.px_per_pt()).round().max(1.0) as i32
}

fn line_px(style: &PlotStyle) -> u32 {
    (0.8 * style.px_per_pt()).round().max(1.0) as u32
}

fn format_tick(v: &f64) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-2..1e4).contains(&magnitude) {
        return format!("{v:.1e}");
    }
    let fixed = format!("{v:.2}");
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn blank_tick(_: &f64) -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn params() -> Vec<ParameterSpec> {
        vec![ParameterSpec::new("x"), ParameterSpec::new("y")]
    }

    #[test]
    fn test_annotation_position() {
        let plain = Annotation::sample("091", false, 2.0);
        assert_eq!(plain.text, "Sample 091");
        assert_eq!(plain.x, 0.9);
        assert_eq!(plain.y, 0.97);
        assert_eq!(plain.font_pt, 16.0);

        let with_bar = Annotation::sample("091", true, 2.0);
        assert_eq!(with_bar.x, 0.8);
        assert_eq!(with_bar.anchor_px((1000, 600)), (800, 18));
        assert_eq!(plain.anchor_px((1000, 600)), (900, 18));
    }

    #[test]
    fn test_layout_size() {
        let style = PlotStyle::default();
        let layout = FigureLayout::new(2, &style, false);
        assert_eq!(layout.size(), (1200, 1200));
        assert_eq!(layout.scale(), 2.0);

        let with_bar = FigureLayout::new(2, &style, true);
        assert_eq!(with_bar.size(), (1440, 1200));
        assert_eq!(with_bar.grid_px(), 1200);
    }

    #[test]
    fn test_validate_rejects_ragged_input() {
        let style = PlotStyle::default();
        let params = params();
        let ranges = [AxisRange::new(0.0, 1.0), AxisRange::new(0.0, 1.0)];
        let (a, b) = (arr1(&[0.1, 0.2]), arr1(&[0.3]));
        let figure = FrameFigure {
            frame: 4,
            params: &params,
            values: vec![a.view(), b.view()],
            ranges: &ranges,
            color: None,
            style: &style,
            annotation: Annotation::sample("5", false, 2.0),
        };
        match figure.validate() {
            Err(MovieError::Render { frame, .. }) => assert_eq!(frame, 4),
            other => panic!("expected a render error, got {other:?}"),
        }

        let figure = FrameFigure {
            values: vec![a.view(), a.view()],
            ..figure
        };
        assert!(figure.validate().is_ok());
        assert!(!figure.has_colorbar());
    }

    #[test]
    fn test_histogram_counts() {
        let values = arr1(&[0.0, 0.1, 0.6, 1.0, f64::NAN, 2.0]);
        assert_eq!(histogram(values.view(), (0.0, 1.0), 2), vec![2.0, 2.0]);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(&0.0), "0");
        assert_eq!(format_tick(&1.5), "1.5");
        assert_eq!(format_tick(&-2.25), "-2.25");
        assert_eq!(format_tick(&10.0), "10");
        assert_eq!(format_tick(&12345.0), "1.2e4");
        assert_eq!(blank_tick(&3.0), "");
    }

    #[test]
    fn test_plotters_renderer_writes_png() {
        // text rendering loads system fonts; without any there is nothing to check
        if ("sans-serif", 12.0).into_font().box_size("Sample 1").is_err() {
            eprintln!("no sans-serif font available, skipping PNG rendering");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame-1.png");
        let style = PlotStyle {
            plot_density: true,
            plot_contours: true,
            marginal_percentiles: vec![5.0, 95.0],
            dpi: 50,
            ..PlotStyle::default()
        };
        let params = params();
        let ranges = [AxisRange::new(-1.0, 1.0), AxisRange::new(-2.0, 2.0)];
        let x = arr1(&[-0.5, 0.0, 0.2, 0.9]);
        let y = arr1(&[1.0, -1.5, 0.3, 0.0]);
        let z = arr1(&[1.0, 2.0, 3.0, 4.0]);
        let figure = FrameFigure {
            frame: 0,
            params: &params,
            values: vec![x.view(), y.view()],
            ranges: &ranges,
            color: Some(ColorAxis {
                label: "loglikelihood",
                range: AxisRange::new(1.0, 4.0),
                values: z.view(),
            }),
            style: &style,
            annotation: Annotation::sample("1", true, 2.0),
        };
        PlottersRenderer.render(&figure, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
