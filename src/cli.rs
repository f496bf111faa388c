//! Command line options of the `posterior-movie` binary.

use std::path::PathBuf;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use crate::error::{MovieError, Result};
use crate::movie::{MovieConfig, MovieOutput};
use crate::params::{parse_bounds, ParameterSpec};
use crate::style::{Colormap, PlotStyle};
use crate::thinning::{FrameRequest, ThinWindow};

/// Command line options.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Render how an ensemble sampler's posterior evolves, one frame per thinned iteration"
)]
pub struct CliOptions {
    /// Results file (.csv, .arrow/.ipc/.feather or .parquet).
    #[arg(long, value_name = "PATH")]
    pub input_file: PathBuf,

    /// Frame file prefix; frames are written to PREFIX-<sample>.png.
    #[arg(long, value_name = "PREFIX")]
    pub output_file: PathBuf,

    /// Number of frames to draw.
    #[arg(long, value_name = "F")]
    pub frame_number: Option<usize>,

    /// Iterations between consecutive frames.
    #[arg(long, value_name = "S")]
    pub frame_step: Option<usize>,

    /// Parameters to plot. Defaults to every column but the z column.
    #[arg(long, num_args = 1.., value_name = "NAME[:LABEL]")]
    pub parameters: Vec<String>,

    /// First iteration considered.
    #[arg(long, value_name = "ITER")]
    pub thin_start: Option<usize>,

    /// Iteration to stop at (exclusive).
    #[arg(long, value_name = "ITER")]
    pub thin_end: Option<usize>,

    /// Log progress at info level.
    #[arg(long, short)]
    pub verbose: bool,

    #[command(flatten)]
    pub posterior: PosteriorStyleArgs,

    #[command(flatten)]
    pub scatter: ScatterStyleArgs,

    #[command(flatten)]
    pub density: DensityStyleArgs,

    #[command(flatten)]
    pub movie: MovieArgs,
}

#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Posterior style")]
pub struct PosteriorStyleArgs {
    /// Draw marginal histograms on the diagonal.
    #[arg(long)]
    pub plot_marginal: bool,

    /// Scatter the walkers in the pairwise panels.
    #[arg(long)]
    pub plot_scatter: bool,

    /// Shade the pairwise panels by walker density.
    #[arg(long)]
    pub plot_density: bool,

    /// Draw credible-region contours in the pairwise panels.
    #[arg(long)]
    pub plot_contours: bool,

    /// Fixed axis minimum per parameter.
    #[arg(long, num_args = 1.., value_name = "NAME:VALUE")]
    pub mins: Vec<String>,

    /// Fixed axis maximum per parameter.
    #[arg(long, num_args = 1.., value_name = "NAME:VALUE")]
    pub maxs: Vec<String>,

    /// Percentiles marked on the marginal histograms.
    #[arg(long, num_args = 1.., value_name = "P")]
    pub marginal_percentiles: Vec<f64>,

    /// Credible regions (percent of mass) drawn as contours.
    #[arg(long, num_args = 1.., value_name = "P", default_values_t = [50.0, 90.0])]
    pub contour_percentiles: Vec<f64>,

    #[arg(long, default_value_t = 200)]
    pub dpi: u32,

    /// Panel edge length in inches.
    #[arg(long, default_value_t = 3.0)]
    pub panel_size: f64,
}

#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Scatter style")]
pub struct ScatterStyleArgs {
    /// Column to color the walkers by, e.g. loglikelihood.
    #[arg(long, value_name = "NAME")]
    pub z_arg: Option<String>,

    /// Lower end of the color scale.
    #[arg(long, allow_negative_numbers = true)]
    pub vmin: Option<f64>,

    /// Upper end of the color scale.
    #[arg(long, allow_negative_numbers = true)]
    pub vmax: Option<f64>,

    #[arg(long, value_enum, default_value_t = Colormap::Viridis)]
    pub scatter_cmap: Colormap,

    /// Marker radius in pixels at 100 dpi.
    #[arg(long, default_value_t = 3)]
    pub point_size: u32,
}

#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Density style")]
pub struct DensityStyleArgs {
    #[arg(long, value_enum, default_value_t = Colormap::Viridis)]
    pub density_cmap: Colormap,

    /// Bins per axis for densities and histograms.
    #[arg(long, default_value_t = 40)]
    pub density_bins: usize,

    /// Gaussian smoothing width in bins.
    #[arg(long, default_value_t = 1.5)]
    pub density_smoothing: f64,
}

#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Movie")]
pub struct MovieArgs {
    /// Stitch the frames into this movie with ffmpeg.
    #[arg(long, value_name = "PATH")]
    pub movie_file: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub frame_rate: u32,

    /// Delete the frames once the movie is written.
    #[arg(long)]
    pub cleanup: bool,

    /// ffmpeg executable.
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,
}

impl CliOptions {
    /// Validates the options and builds the run configuration.
    pub fn into_config(self) -> Result<MovieConfig> {
        let request = FrameRequest::from_options(self.frame_number, self.frame_step)?;
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.parse::<ParameterSpec>())
            .collect::<Result<Vec<_>>>()?;

        Ok(MovieConfig {
            input_file: self.input_file,
            output_prefix: self.output_file,
            request,
            window: ThinWindow::new(self.thin_start, self.thin_end),
            parameters,
            mins: parse_bounds(&self.posterior.mins)?,
            maxs: parse_bounds(&self.posterior.maxs)?,
            style: plot_style(&self.posterior, &self.scatter, &self.density)?,
            z_arg: self.scatter.z_arg,
            vmin: self.scatter.vmin,
            vmax: self.scatter.vmax,
            movie: self.movie.into_output()?,
            show_progress: true,
        })
    }
}

impl MovieArgs {
    fn into_output(self) -> Result<Option<MovieOutput>> {
        let Some(path) = self.movie_file else {
            if self.cleanup {
                return Err(MovieError::config("--cleanup requires --movie-file"));
            }
            return Ok(None);
        };
        if self.frame_rate == 0 {
            return Err(MovieError::config("--frame-rate must be positive"));
        }
        Ok(Some(MovieOutput {
            path,
            frame_rate: self.frame_rate,
            cleanup: self.cleanup,
            ffmpeg: self.ffmpeg,
        }))
    }
}

fn plot_style(
    posterior: &PosteriorStyleArgs,
    scatter: &ScatterStyleArgs,
    density: &DensityStyleArgs,
) -> Result<PlotStyle> {
    for &p in posterior
        .marginal_percentiles
        .iter()
        .chain(&posterior.contour_percentiles)
    {
        if !(0.0..=100.0).contains(&p) {
            return Err(MovieError::config(format!(
                "percentile {p} is outside [0, 100]"
            )));
        }
    }
    if posterior.dpi == 0 || !(posterior.panel_size > 0.0) {
        return Err(MovieError::config("--dpi and --panel-size must be positive"));
    }
    if density.density_bins == 0 {
        return Err(MovieError::config("--density-bins must be positive"));
    }
    if !(density.density_smoothing.is_finite() && density.density_smoothing >= 0.0) {
        return Err(MovieError::config(
            "--density-smoothing must be finite and not negative",
        ));
    }

    // nothing asked for: marginals and scatter
    let any_plot = posterior.plot_marginal
        || posterior.plot_scatter
        || posterior.plot_density
        || posterior.plot_contours;
    Ok(PlotStyle {
        plot_marginal: posterior.plot_marginal || !any_plot,
        plot_scatter: posterior.plot_scatter || !any_plot,
        plot_density: posterior.plot_density,
        plot_contours: posterior.plot_contours,
        marginal_percentiles: posterior.marginal_percentiles.clone(),
        contour_percentiles: posterior.contour_percentiles.clone(),
        scatter_cmap: scatter.scatter_cmap,
        point_size: scatter.point_size,
        density_cmap: density.density_cmap,
        density_bins: density.density_bins,
        density_smoothing: density.density_smoothing,
        dpi: posterior.dpi,
        panel_size: posterior.panel_size,
    })
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
