//! The frame pipeline: open the run, thin it, fix the axes, draw every frame
//! and optionally stitch the frames into a movie.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::{MovieError, Result};
use crate::io::ResultsFile;
use crate::params::ParameterSpec;
use crate::ranges::{color_range, AxisRange, AxisRanges};
use crate::render::{Annotation, ColorAxis, FigureRenderer, FrameFigure, PlottersRenderer};
use crate::samples::Samples;
use crate::style::PlotStyle;
use crate::thinning::{FrameRequest, FrameSelection, ThinWindow};

/// Movie assembly settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieOutput {
    pub path: PathBuf,
    pub frame_rate: u32,
    /// Delete the frame images once the movie is written.
    pub cleanup: bool,
    /// The `ffmpeg` executable to run.
    pub ffmpeg: PathBuf,
}

/// A validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieConfig {
    pub input_file: PathBuf,
    /// Frame `k` is written to `<output_prefix>-<sample number>.png`.
    pub output_prefix: PathBuf,
    pub request: FrameRequest,
    pub window: ThinWindow,
    /// Parameters to plot. Empty selects every value column but the z column.
    pub parameters: Vec<ParameterSpec>,
    pub mins: HashMap<String, f64>,
    pub maxs: HashMap<String, f64>,
    /// Column the walkers are colored by.
    pub z_arg: Option<String>,
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
    pub style: PlotStyle,
    pub movie: Option<MovieOutput>,
    pub show_progress: bool,
}

impl MovieConfig {
    /// A configuration with default style and no movie.
    pub fn new(
        input_file: impl Into<PathBuf>,
        output_prefix: impl Into<PathBuf>,
        request: FrameRequest,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            output_prefix: output_prefix.into(),
            request,
            window: ThinWindow::default(),
            parameters: Vec::new(),
            mins: HashMap::new(),
            maxs: HashMap::new(),
            z_arg: None,
            vmin: None,
            vmax: None,
            style: PlotStyle::default(),
            movie: None,
            show_progress: false,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub selection: FrameSelection,
    pub parameters: Vec<ParameterSpec>,
    pub ranges: AxisRanges,
    pub color_range: Option<AxisRange>,
    /// Frame images in frame order. Empty after a cleanup.
    pub frames: Vec<PathBuf>,
    pub movie: Option<PathBuf>,
}

/// Runs the whole pipeline with PNG output.
pub fn run(config: &MovieConfig) -> Result<FrameReport> {
    run_with(config, &mut PlottersRenderer)
}

/// Runs the pipeline, drawing frames through `renderer`.
///
/// The first failing frame aborts the run; frames written before it stay on
/// disk.
pub fn run_with<R: FigureRenderer>(config: &MovieConfig, renderer: &mut R) -> Result<FrameReport> {
    let results = ResultsFile::open(&config.input_file)?;
    info!(
        path = %config.input_file.display(),
        chains = results.n_chains(),
        iterations = results.n_iterations(),
        "loaded results"
    );

    let n_iterations = config.window.len(results.n_iterations())?;
    let selection = FrameSelection::resolve(config.request, n_iterations, config.window.start)?;
    info!(
        interval = selection.interval,
        frames = selection.frame_count,
        start = selection.start,
        "resolved frame selection"
    );

    let parameters = resolve_parameters(
        &config.parameters,
        results.columns(),
        config.z_arg.as_deref(),
    );
    warn_unused_bounds(&parameters, &config.mins, &config.maxs);
    let names: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
    let samples = results.read_samples(&names, config.z_arg.as_deref(), &selection)?;

    let ranges = AxisRanges::compute(&samples, &config.mins, &config.maxs)?;
    let color_range = samples
        .z_values()
        .map(|z| color_range(z, config.vmin, config.vmax))
        .transpose()?;

    let mut frames = render_frames(
        renderer,
        config,
        &parameters,
        &samples,
        &selection,
        &ranges.to_vec(),
        color_range,
    )?;

    let movie = match &config.movie {
        Some(output) => {
            assemble_movie(output, &config.output_prefix, &frames)?;
            if output.cleanup {
                remove_frames(&frames)?;
                frames.clear();
            }
            Some(output.path.clone())
        }
        None => None,
    };

    Ok(FrameReport {
        selection,
        parameters,
        ranges,
        color_range,
        frames,
        movie,
    })
}

/// The requested parameters, or every value column except `z_column`.
pub fn resolve_parameters(
    requested: &[ParameterSpec],
    columns: &[String],
    z_column: Option<&str>,
) -> Vec<ParameterSpec> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    columns
        .iter()
        .filter(|c| Some(c.as_str()) != z_column)
        .map(|c| ParameterSpec::new(c.as_str()))
        .collect()
}

fn warn_unused_bounds(
    parameters: &[ParameterSpec],
    mins: &HashMap<String, f64>,
    maxs: &HashMap<String, f64>,
) {
    for name in mins.keys().chain(maxs.keys()) {
        if !parameters.iter().any(|p| &p.name == name) {
            warn!(parameter = %name, "axis bound given for a parameter that is not plotted");
        }
    }
}

fn render_frames<R: FigureRenderer>(
    renderer: &mut R,
    config: &MovieConfig,
    parameters: &[ParameterSpec],
    samples: &Samples,
    selection: &FrameSelection,
    ranges: &[AxisRange],
    color_range: Option<AxisRange>,
) -> Result<Vec<PathBuf>> {
    let scale = parameters.len().max(1) as f64;
    let pb = progress_bar(selection.frame_count, config.show_progress);
    let mut written = Vec::with_capacity(selection.frame_count);

    for frame in 0..selection.frame_count {
        let slice = samples.frame(frame);
        let color = match (slice.z_values, color_range, config.z_arg.as_deref()) {
            (Some(values), Some(range), Some(label)) => Some(ColorAxis {
                label,
                range,
                values,
            }),
            _ => None,
        };
        let annotation = Annotation::sample(
            &selection.padded_sample_number(frame),
            color.is_some(),
            scale,
        );
        let figure = FrameFigure {
            frame,
            params: parameters,
            values: slice.values,
            ranges,
            color,
            style: &config.style,
            annotation,
        };

        let path = selection.frame_path(&config.output_prefix, frame);
        debug!(
            frame,
            sample = selection.sample_number(frame),
            path = %path.display(),
            "rendering frame"
        );
        if let Err(err) = renderer.render(&figure, &path) {
            pb.abandon_with_message(format!("failed at frame {frame}"));
            return Err(err);
        }
        written.push(path);
        pb.inc(1);
    }

    pb.finish_with_message("Done!");
    info!(frames = written.len(), "frames written");
    Ok(written)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    let pb = ProgressBar::new(len as u64);
    pb.set_style(style);
    pb.set_prefix("Frames");
    pb
}

/// ffconcat script listing `frames` in order, each shown for one frame period.
///
/// Entries are file names, resolved by ffmpeg against the script's directory.
/// The last frame is listed twice so its duration is honored.
pub fn concat_list(frames: &[PathBuf], frame_rate: u32) -> String {
    let quote = |path: &Path| {
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
        format!("'{}'", name.replace('\'', r"'\''"))
    };
    let duration = 1.0 / f64::from(frame_rate.max(1));
    let mut script = String::from("ffconcat version 1.0\n");
    for frame in frames {
        script.push_str(&format!("file {}\nduration {duration}\n", quote(frame)));
    }
    if let Some(last) = frames.last() {
        script.push_str(&format!("file {}\n", quote(last)));
    }
    script
}

/// Path of the ffconcat script written next to the frames of `prefix`.
pub fn concat_list_path(prefix: &Path) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push("-frames.ffconcat");
    PathBuf::from(path)
}

/// Stitches exactly `frames`, in order, into `output.path` with ffmpeg.
///
/// Other files sharing the prefix are never read. The concat script is
/// removed once ffmpeg returns.
pub fn assemble_movie(output: &MovieOutput, prefix: &Path, frames: &[PathBuf]) -> Result<()> {
    if frames.is_empty() {
        return Err(MovieError::Movie("no frames to assemble".into()));
    }
    info!(
        movie = %output.path.display(),
        rate = output.frame_rate,
        frames = frames.len(),
        "assembling movie"
    );
    let list = concat_list_path(prefix);
    fs::write(&list, concat_list(frames, output.frame_rate))?;
    let status = Command::new(&output.ffmpeg)
        .arg("-y")
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(&list)
        .arg("-r")
        .arg(output.frame_rate.to_string())
        .args(["-pix_fmt", "yuv420p"])
        .arg(&output.path)
        .status();
    if let Err(e) = fs::remove_file(&list) {
        warn!(path = %list.display(), "could not remove concat script: {e}");
    }
    let status = status.map_err(|e| {
        MovieError::Movie(format!(
            "could not run {}: {e}",
            output.ffmpeg.display()
        ))
    })?;
    if !status.success() {
        return Err(MovieError::Movie(format!("ffmpeg exited with {status}")));
    }
    Ok(())
}

fn remove_frames(frames: &[PathBuf]) -> Result<()> {
    for path in frames {
        fs::remove_file(path)?;
    }
    debug!(frames = frames.len(), "removed frame images");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_skip_z_column() {
        let columns = vec!["x".to_string(), "y".to_string(), "loglikelihood".to_string()];
        let params = resolve_parameters(&[], &columns, Some("loglikelihood"));
        assert_eq!(params, vec![ParameterSpec::new("x"), ParameterSpec::new("y")]);

        let all = resolve_parameters(&[], &columns, None);
        assert_eq!(all.len(), 3);

        let requested = vec![ParameterSpec::new("y")];
        assert_eq!(resolve_parameters(&requested, &columns, None), requested);
    }

    #[test]
    fn test_concat_list_names_only_given_frames() {
        let dir = tempfile::tempdir().unwrap();
        // left over from an earlier run with a wider padding
        fs::write(dir.path().join("post-001.png"), b"old").unwrap();
        let frames = vec![dir.path().join("post-01.png"), dir.path().join("post-10.png")];

        let script = concat_list(&frames, 4);
        assert_eq!(
            script,
            "ffconcat version 1.0\n\
             file 'post-01.png'\nduration 0.25\n\
             file 'post-10.png'\nduration 0.25\n\
             file 'post-10.png'\n"
        );
        assert!(!script.contains("post-001"));
        assert_eq!(
            concat_list_path(&dir.path().join("post")),
            dir.path().join("post-frames.ffconcat")
        );
    }

    #[test]
    fn test_concat_list_quotes_names() {
        let script = concat_list(&[PathBuf::from("it's-1.png")], 1);
        assert!(script.contains(r"file 'it'\''s-1.png'"));
    }

    #[cfg(unix)]
    #[test]
    fn test_assemble_movie_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("frames");
        let frames = vec![dir.path().join("frames-1.png")];
        let mut output = MovieOutput {
            path: dir.path().join("movie.mp4"),
            frame_rate: 5,
            cleanup: false,
            ffmpeg: PathBuf::from("true"),
        };
        assert!(assemble_movie(&output, &prefix, &frames).is_ok());
        assert!(!concat_list_path(&prefix).exists());
        assert!(matches!(
            assemble_movie(&output, &prefix, &[]),
            Err(MovieError::Movie(_))
        ));

        output.ffmpeg = PathBuf::from("false");
        assert!(matches!(
            assemble_movie(&output, &prefix, &frames),
            Err(MovieError::Movie(_))
        ));

        output.ffmpeg = PathBuf::from("/nonexistent/ffmpeg");
        assert!(matches!(
            assemble_movie(&output, &prefix, &frames),
            Err(MovieError::Movie(_))
        ));
        assert!(!concat_list_path(&prefix).exists());
    }

    #[test]
    fn test_remove_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<PathBuf> = (1..=2)
            .map(|i| dir.path().join(format!("f-{i}.png")))
            .collect();
        for path in &frames {
            fs::write(path, b"png").unwrap();
        }
        remove_frames(&frames).unwrap();
        assert!(frames.iter().all(|p| !p.exists()));
    }
}
