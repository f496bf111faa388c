//! Writes a synthetic ensemble run to try `posterior-movie` without a sampler.
//!
//! Every walker starts near (10, 12) and follows an AR(1) walk whose
//! stationary law is a 2D Gaussian with mean 0 and covariance [[2, 1], [1, 2]].

use std::error::Error;
use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};
use std::path::PathBuf;

use clap::Parser;
use ndarray::Array3;
use posterior_movie::io::ResultsFile;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

#[derive(Parser, Debug)]
#[command(about = "Write a synthetic ensemble run converging to a correlated 2D Gaussian")]
struct DemoOptions {
    /// Results file to write (.csv, .arrow or .parquet).
    #[arg(long, default_value = "demo_run.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 32)]
    walkers: usize,

    #[arg(long, default_value_t = 500)]
    iterations: usize,

    /// Autocorrelation of a walker between iterations.
    #[arg(long, default_value_t = 0.98)]
    rho: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const START: [f64; 2] = [10.0, 12.0];
const COLUMNS: [&str; 3] = ["x", "y", "loglikelihood"];

/// `walkers × iterations × [x, y, loglikelihood]`
fn simulate(
    walkers: usize,
    iterations: usize,
    rho: f64,
    seed: u64,
) -> Result<Array3<f64>, Box<dyn Error>> {
    let normal = Normal::new(0.0, 1.0)?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let noise = (1.0 - rho * rho).max(0.0).sqrt();

    let mut data = Array3::zeros((walkers, iterations, COLUMNS.len()));
    for chain in 0..walkers {
        let mut x = [
            START[0] + normal.sample(&mut rng),
            START[1] + normal.sample(&mut rng),
        ];
        for iter in 0..iterations {
            if iter > 0 {
                let (e0, e1) = (normal.sample(&mut rng), normal.sample(&mut rng));
                // Cholesky factor of the target covariance
                let step = [SQRT_2 * e0, FRAC_1_SQRT_2 * e0 + 1.5_f64.sqrt() * e1];
                x = [rho * x[0] + noise * step[0], rho * x[1] + noise * step[1]];
            }
            data[[chain, iter, 0]] = x[0];
            data[[chain, iter, 1]] = x[1];
            data[[chain, iter, 2]] = log_likelihood(x);
        }
    }
    Ok(data)
}

fn log_likelihood([x, y]: [f64; 2]) -> f64 {
    // inverse covariance is [[2, -1], [-1, 2]] / 3, determinant 3
    let quad = (2.0 * x * x - 2.0 * x * y + 2.0 * y * y) / 3.0;
    -0.5 * quad - (2.0 * PI).ln() - 0.5 * 3.0_f64.ln()
}

fn main() -> Result<(), Box<dyn Error>> {
    let opts = DemoOptions::parse();
    let data = simulate(opts.walkers, opts.iterations, opts.rho, opts.seed)?;
    let results = ResultsFile::new(COLUMNS.map(String::from).to_vec(), data)?;
    results.save(&opts.output)?;
    println!(
        "Wrote {} walkers x {} iterations to {}",
        opts.walkers,
        opts.iterations,
        opts.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{s, Axis};

    #[test]
    fn test_walkers_converge_to_target() {
        let data = simulate(64, 400, 0.95, 7).unwrap();
        assert_eq!(data.dim(), (64, 400, 3));

        let first = data.slice(s![.., 0, 0]);
        assert!(first.mean().unwrap() > 8.0);

        let last = data.index_axis(Axis(1), 399);
        let mean_x = last.slice(s![.., 0]).mean().unwrap();
        let mean_y = last.slice(s![.., 1]).mean().unwrap();
        assert!(mean_x.abs() < 1.0, "mean x {mean_x}");
        assert!(mean_y.abs() < 1.0, "mean y {mean_y}");
    }

    #[test]
    fn test_log_likelihood_peak() {
        let peak = log_likelihood([0.0, 0.0]);
        assert_abs_diff_eq!(peak, -(2.0 * PI).ln() - 0.5 * 3.0_f64.ln(), epsilon = 1e-12);
        assert!(log_likelihood([1.0, -1.0]) < log_likelihood([1.0, 1.0]));
    }

    #[test]
    fn test_demo_run_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let data = simulate(4, 10, 0.9, 1).unwrap();
        ResultsFile::new(COLUMNS.map(String::from).to_vec(), data.clone())
            .unwrap()
            .save(&path)
            .unwrap();

        let results = ResultsFile::open(&path).unwrap();
        assert_eq!(results.columns(), COLUMNS.map(String::from).as_slice());
        assert_eq!(results.n_chains(), 4);
        assert_eq!(results.n_iterations(), 10);
        assert_abs_diff_eq!(results.data()[[3, 9, 2]], data[[3, 9, 2]], epsilon = 1e-12);
    }
}
