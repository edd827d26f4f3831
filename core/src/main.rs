mod args;

use args::Args;
use clap::Parser;
use dataset::{split_identifiers, SampleSource, Split, SplitManifest, SplitRatios};
use log::{info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use simplelog::{Config, SimpleLogger, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    let ratios = SplitRatios::new(args.train_ratio, args.val_ratio, args.test_ratio);
    let manifest = split_dataset(&args.dataset, ratios, args.seed)?;

    manifest.save(&args.output)?;
    info!("Wrote split manifest to {:?}", args.output);

    Ok(())
}

fn split_dataset(
    path: &Path,
    ratios: SplitRatios,
    seed: Option<u64>,
) -> Result<SplitManifest, Box<dyn Error>> {
    let source = SampleSource::detect(path)?;
    let identifiers = source.resolve()?;

    let split: Split = match seed {
        Some(seed) => split_identifiers(identifiers, ratios, &mut StdRng::seed_from_u64(seed))?,
        None => split_identifiers(identifiers, ratios, &mut rand::thread_rng())?,
    };

    Ok(SplitManifest::new(
        source.archive().map(Path::to_path_buf),
        split,
    ))
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    match &args.log_file {
        Some(log_file) => WriteLogger::init(
            LevelFilter::Debug,
            Config::default(),
            File::create(log_file)?,
        )?,
        None => SimpleLogger::init(LevelFilter::Info, Config::default())?,
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_seeded_split_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            fs::write(dir.path().join(format!("field_{}.rf3", i)), "RF3").unwrap();
        }

        let a = split_dataset(dir.path(), SplitRatios::default(), Some(42)).unwrap();
        let b = split_dataset(dir.path(), SplitRatios::default(), Some(42)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.archive, None);
        assert_eq!(a.split.len(), 12);
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        assert!(split_dataset(&dir.path().join("nope"), SplitRatios::default(), None).is_err());
    }
}
