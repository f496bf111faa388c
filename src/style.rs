//! Plot style options and color maps.

use clap::ValueEnum;
use plotters::style::RGBColor;

/// Sequential color maps for scatter points and density panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    Greys,
}

// Anchor colors at 0, 1/4, 1/2, 3/4 and 1, sampled from the matplotlib maps.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];
const PLASMA: [(u8, u8, u8); 5] = [
    (13, 8, 135),
    (126, 3, 168),
    (204, 71, 120),
    (248, 149, 64),
    (240, 249, 33),
];
const GREYS: [(u8, u8, u8); 2] = [(255, 255, 255), (0, 0, 0)];

impl Colormap {
    fn anchors(&self) -> &'static [(u8, u8, u8)] {
        match self {
            Colormap::Viridis => &VIRIDIS,
            Colormap::Plasma => &PLASMA,
            Colormap::Greys => &GREYS,
        }
    }

    /// Maps `t` in `[0, 1]` to a color; values outside are clamped and NaN
    /// maps to the low end.
    pub fn color(&self, t: f64) -> RGBColor {
        let anchors = self.anchors();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (anchors.len() - 1) as f64;
        let lo = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - lo as f64;
        let (a, b) = (anchors[lo], anchors[lo + 1]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }
}

/// Everything that controls how a frame looks. Shared by all frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub plot_marginal: bool,
    pub plot_scatter: bool,
    pub plot_density: bool,
    pub plot_contours: bool,
    /// Percentiles (0-100) marked on the marginal histograms.
    pub marginal_percentiles: Vec<f64>,
    /// Credible-region percentiles (0-100) drawn as contours.
    pub contour_percentiles: Vec<f64>,
    pub scatter_cmap: Colormap,
    /// Scatter marker radius in pixels at 100 dpi.
    pub point_size: u32,
    pub density_cmap: Colormap,
    /// Bins per axis of the density grid and the marginal histograms.
    pub density_bins: usize,
    /// Gaussian smoothing width of the density grid, in bins.
    pub density_smoothing: f64,
    pub dpi: u32,
    /// Edge length of one panel in inches.
    pub panel_size: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            plot_marginal: true,
            plot_scatter: true,
            plot_density: false,
            plot_contours: false,
            marginal_percentiles: Vec::new(),
            contour_percentiles: vec![50.0, 90.0],
            scatter_cmap: Colormap::Viridis,
            point_size: 3,
            density_cmap: Colormap::Viridis,
            density_bins: 40,
            density_smoothing: 1.5,
            dpi: 200,
            panel_size: 3.0,
        }
    }
}

impl PlotStyle {
    /// Pixels per point (1/72 inch) at the configured resolution.
    pub fn px_per_pt(&self) -> f64 {
        self.dpi as f64 / 72.0
    }

    /// Edge length of one panel in pixels.
    pub fn panel_px(&self) -> u32 {
        (self.panel_size * self.dpi as f64).round().max(1.0) as u32
    }

    pub fn marker_px(&self) -> i32 {
        ((self.point_size as f64 * self.dpi as f64 / 100.0).round() as i32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(Colormap::Viridis.color(0.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.color(1.0), RGBColor(253, 231, 37));
        assert_eq!(Colormap::Greys.color(0.5), RGBColor(128, 128, 128));
        assert_eq!(Colormap::Plasma.color(2.0), Colormap::Plasma.color(1.0));
        assert_eq!(Colormap::Plasma.color(f64::NAN), Colormap::Plasma.color(0.0));
    }

    #[test]
    fn test_colormap_interpolates_between_anchors() {
        // halfway between the first two viridis anchors
        assert_eq!(Colormap::Viridis.color(0.125), RGBColor(64, 42, 112));
    }

    #[test]
    fn test_pixel_sizes() {
        let style = PlotStyle::default();
        assert_eq!(style.panel_px(), 600);
        assert_eq!(style.marker_px(), 6);
        assert!((style.px_per_pt() - 200.0 / 72.0).abs() < 1e-12);
    }
}
