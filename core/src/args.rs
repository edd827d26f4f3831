use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rf3-split")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Dataset root: a directory of .rf3 files or a zip archive of them.
    pub dataset: PathBuf,

    /// Where to write the split manifest.
    #[arg(short, long, default_value = "split.txt")]
    pub output: PathBuf,

    /// Relative weight of the training subset.
    #[arg(long, default_value_t = 0.7)]
    pub train_ratio: f64,

    /// Relative weight of the validation subset.
    #[arg(long, default_value_t = 0.15)]
    pub val_ratio: f64,

    /// Relative weight of the test subset.
    #[arg(long, default_value_t = 0.15)]
    pub test_ratio: f64,

    /// Seed for a reproducible shuffle.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log to a file instead of the terminal.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
}
