//! Frames for a movie of an ensemble sampler's posterior.
//!
//! Reads a results file holding every walker's position at every iteration,
//! thins it to a set of frames and draws one corner plot per frame with axes
//! and color scales shared by the whole run. See [`movie::run`].

pub mod cli;
pub mod density;
pub mod error;
pub mod io;
pub mod movie;
pub mod params;
pub mod ranges;
pub mod render;
pub mod samples;
pub mod style;
pub mod thinning;
