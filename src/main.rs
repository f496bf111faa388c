use std::error::Error;

use clap::Parser;
use posterior_movie::cli::{init_logging, CliOptions};
use posterior_movie::movie;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    let options = CliOptions::parse();
    init_logging(options.verbose);

    let config = options.into_config()?;
    let report = movie::run(&config)?;
    if let Some(path) = &report.movie {
        info!(movie = %path.display(), "movie written");
    }
    info!("Done");
    Ok(())
}
