use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dataset::{Dataset, SampleDataset};
use crate::error::{DatasetError, Result};
use crate::manifest::SplitManifest;
use crate::resolver::SampleSource;
use crate::store::FieldStore;

/// Relative weights of the train, validation and test subsets.
///
/// The weights do not have to sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.15,
            test: 0.15,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Self {
        Self { train, val, test }
    }

    fn validate(&self) -> Result<f64> {
        let weights = [self.train, self.val, self.test];

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DatasetError::Configuration(format!(
                "split ratios must be finite and non-negative, got {:?}",
                weights
            )));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(DatasetError::Configuration(
                "at least one split ratio must be positive".to_string(),
            ));
        }

        if !total.is_finite() {
            return Err(DatasetError::Configuration(format!(
                "split ratios {:?} are too large to add up",
                weights
            )));
        }

        Ok(total)
    }

    /// Subset sizes for `total` items by largest-remainder allocation.
    ///
    /// Every subset first gets the floor of its exact share. Items left over
    /// go to the subsets with the largest fractional parts; ties go to train,
    /// then val, then test.
    pub fn sizes(&self, total: usize) -> Result<[usize; 3]> {
        let weight_sum = self.validate()?;
        let weights = [self.train, self.val, self.test];

        let exact: Vec<f64> = weights
            .iter()
            .map(|w| total as f64 * w / weight_sum)
            .collect();

        let mut sizes = [0usize; 3];
        for (size, share) in sizes.iter_mut().zip(&exact) {
            *size = (share.floor() as usize).min(total);
        }

        // Floating point noise can push the floors over the total.
        while sizes.iter().sum::<usize>() > total {
            if let Some(largest) = (0..3).max_by_key(|&k| sizes[k]) {
                sizes[largest] -= 1;
            }
        }

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| {
            let rem_a = exact[a] - exact[a].floor();
            let rem_b = exact[b] - exact[b].floor();
            rem_b.total_cmp(&rem_a).then(a.cmp(&b))
        });

        let mut leftover = total - sizes.iter().sum::<usize>();
        for &k in order.iter().cycle() {
            if leftover == 0 {
                break;
            }
            sizes[k] += 1;
            leftover -= 1;
        }

        Ok(sizes)
    }
}

/// Three disjoint identifier subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shuffles `identifiers` with `rng` and cuts them into train, val and test.
pub fn split_identifiers<R: Rng + ?Sized>(
    mut identifiers: Vec<String>,
    ratios: SplitRatios,
    rng: &mut R,
) -> Result<Split> {
    let [num_train, num_val, _] = ratios.sizes(identifiers.len())?;

    identifiers.shuffle(rng);

    let test = identifiers.split_off(num_train + num_val);
    let val = identifiers.split_off(num_train);
    let train = identifiers;

    log::info!(
        "Split {} samples into {} train, {} val, {} test",
        train.len() + val.len() + test.len(),
        train.len(),
        val.len(),
        test.len()
    );

    Ok(Split { train, val, test })
}

type Factory<D> = Box<dyn Fn(Vec<String>, Option<PathBuf>) -> Result<D>>;

/// Splits a dataset root once and builds train/val/test datasets from it.
///
/// Each built dataset only receives its subset of identifiers and the shared
/// archive locator; the factory decides everything else.
pub struct DatasetBuilder<D> {
    archive: Option<PathBuf>,
    split: Split,
    factory: Factory<D>,
}

impl<S: FieldStore + 'static> DatasetBuilder<SampleDataset<S>> {
    /// Splits `dataset_path` (a directory or zip archive) with the thread RNG
    /// and builds whole-field datasets.
    pub fn new(store: Arc<S>, dataset_path: impl AsRef<Path>, ratios: SplitRatios) -> Result<Self> {
        Self::with_rng(store, dataset_path, ratios, &mut rand::thread_rng())
    }

    /// Like [`DatasetBuilder::new`] with a caller-provided RNG.
    pub fn with_rng<R: Rng + ?Sized>(
        store: Arc<S>,
        dataset_path: impl AsRef<Path>,
        ratios: SplitRatios,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_factory(dataset_path, ratios, rng, move |files, archive| {
            SampleDataset::from_files(Arc::clone(&store), files, archive)
        })
    }
}

impl<D: Dataset> DatasetBuilder<D> {
    /// Splits `dataset_path` and builds datasets with `factory`.
    pub fn with_factory<R, F>(
        dataset_path: impl AsRef<Path>,
        ratios: SplitRatios,
        rng: &mut R,
        factory: F,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
        F: Fn(Vec<String>, Option<PathBuf>) -> Result<D> + 'static,
    {
        let dataset_path = dataset_path.as_ref();
        log::info!("Loading dataset from {:?}...", dataset_path);

        let source = SampleSource::detect(dataset_path)?;
        let identifiers = source.resolve()?;
        let archive = source.archive().map(Path::to_path_buf);

        let split = split_identifiers(identifiers, ratios, rng)?;

        Ok(Self {
            archive,
            split,
            factory: Box::new(factory),
        })
    }

    /// Restores a previously saved split without reshuffling.
    pub fn from_manifest<F>(manifest: SplitManifest, factory: F) -> Self
    where
        F: Fn(Vec<String>, Option<PathBuf>) -> Result<D> + 'static,
    {
        Self {
            archive: manifest.archive,
            split: manifest.split,
            factory: Box::new(factory),
        }
    }

    pub fn build_train_dataset(&self) -> Result<D> {
        self.build(&self.split.train)
    }

    pub fn build_val_dataset(&self) -> Result<D> {
        self.build(&self.split.val)
    }

    pub fn build_test_dataset(&self) -> Result<D> {
        self.build(&self.split.test)
    }

    fn build(&self, files: &[String]) -> Result<D> {
        (self.factory)(files.to_vec(), self.archive.clone())
    }

    pub fn train_files(&self) -> &[String] {
        &self.split.train
    }

    pub fn val_files(&self) -> &[String] {
        &self.split.val
    }

    pub fn test_files(&self) -> &[String] {
        &self.split.test
    }

    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    /// Snapshot of the split, e.g. for [`SplitManifest::save`].
    pub fn manifest(&self) -> SplitManifest {
        SplitManifest {
            archive: self.archive.clone(),
            split: self.split.clone(),
        }
    }
}

impl<D> fmt::Debug for DatasetBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetBuilder")
            .field("archive", &self.archive)
            .field("train", &self.split.train.len())
            .field("val", &self.split.val.len())
            .field("test", &self.split.test.len())
            .finish_non_exhaustive()
    }
}
