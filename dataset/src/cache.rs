use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::dataset::{Dataset, SampleDataset, Transform};
use crate::error::{DatasetError, Result};
use crate::iter::DatasetIter;
use crate::progress::CacheProgressBar;
use crate::resolver::open_archive;
use crate::store::FieldStore;

pub const CACHE_EXTENSION: &str = "rf3c";

// Created next to the source archive.
const CACHE_DIR: &str = "tmp";

const FIELD_SLOT: &str = "field_";
const METADATA_SLOT: &str = "metadata_";
// Written last; a cache without it was not finished.
const LEN_SLOT: &str = "len";

fn field_slot(index: usize) -> String {
    format!("{}{}", FIELD_SLOT, index)
}

fn metadata_slot(index: usize) -> String {
    format!("{}{}", METADATA_SLOT, index)
}

/// A dataset materialized into one indexed cache file.
///
/// The cache is a zip container of uncompressed, bincode-encoded entries:
/// `field_<i>` holds the (transformed) sample and `metadata_<i>` the metadata
/// header, which is left out when the dataset produced no metadata. The
/// sample count goes into a final `len` entry.
///
/// Building is not atomic. If it fails midway the file at the target path has
/// no `len` entry, is rejected by [`SampleCache::open`] and has to be rebuilt.
pub struct SampleCache<P, H> {
    path: PathBuf,
    len: usize,
    _marker: PhantomData<fn() -> (P, H)>,
}

impl<P, H> SampleCache<P, H> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: DeserializeOwned, H: DeserializeOwned> SampleCache<P, H> {
    /// Opens a completely built cache file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut zip = open_archive(path)?;

        let len: u64 = read_slot(&mut zip, LEN_SLOT)?.ok_or_else(|| {
            DatasetError::file_format(
                &path.to_string_lossy(),
                io::Error::new(io::ErrorKind::InvalidData, "cache build did not complete"),
            )
        })?;
        let len = len as usize;

        log::debug!("Opened cache {:?} with {} samples", path, len);

        Ok(Self {
            path: path.to_path_buf(),
            len,
            _marker: PhantomData,
        })
    }
}

impl<P: Serialize + DeserializeOwned, H: Serialize + DeserializeOwned> SampleCache<P, H> {
    /// Writes every sample of `dataset` to a fresh cache at `path`.
    ///
    /// Returns `None` without touching the filesystem when the dataset is
    /// empty. An existing file at `path` is removed first.
    pub fn build<S, T>(dataset: &SampleDataset<S, T>, path: impl AsRef<Path>) -> Result<Option<Self>>
    where
        S: FieldStore<Header = H>,
        T: Transform<S, Output = P>,
    {
        if dataset.is_empty() {
            log::info!("Dataset is empty, nothing to cache");
            return Ok(None);
        }

        let path = path.as_ref();

        if path.exists() {
            log::warn!("Removing existing cache {:?}", path);
            fs::remove_file(path)?;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = ZipWriter::new(BufWriter::new(File::create(path)?));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(true);

        let progress = CacheProgressBar::new(dataset.len());

        for (index, item) in dataset.iter().enumerate() {
            let (payload, metadata) = item?;

            writer.start_file(field_slot(index), options)?;
            bincode::serialize_into(&mut writer, &payload)?;

            if let Some(metadata) = metadata {
                let header = metadata.into_header(|full| dataset.store().header_of(&full));
                writer.start_file(metadata_slot(index), options)?;
                bincode::serialize_into(&mut writer, &header)?;
            }

            progress.inc();
        }

        writer.start_file(LEN_SLOT, options)?;
        bincode::serialize_into(&mut writer, &(dataset.len() as u64))?;

        progress.finish();
        writer.finish()?.flush()?;

        log::info!("Cached {} samples to {:?}", dataset.len(), path);

        Ok(Some(Self {
            path: path.to_path_buf(),
            len: dataset.len(),
            _marker: PhantomData,
        }))
    }

    /// Like [`SampleCache::build`], at the default path of a single-layer
    /// dataset: `<archive dir>/tmp/<archive stem>_<channel>_<layer>.rf3c`.
    pub fn prepare<S, T>(dataset: &SampleDataset<S, T>) -> Result<Option<Self>>
    where
        S: FieldStore<Header = H>,
        T: Transform<S, Output = P>,
    {
        if dataset.is_empty() {
            log::info!("Dataset is empty, nothing to cache");
            return Ok(None);
        }

        let path = default_path(dataset)?;
        Self::build(dataset, path)
    }
}

/// Default cache location for a single-layer dataset read from an archive.
pub fn default_path<S: FieldStore, T>(dataset: &SampleDataset<S, T>) -> Result<PathBuf> {
    let archive = dataset.archive().ok_or_else(|| {
        DatasetError::Configuration("a default cache path needs an archive locator".to_string())
    })?;

    let selection = dataset.layer_selection().ok_or_else(|| {
        DatasetError::Configuration(
            "a default cache path needs a channel and layer selection".to_string(),
        )
    })?;

    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dir = archive
        .parent()
        .map(|p| p.join(CACHE_DIR))
        .unwrap_or_else(|| PathBuf::from(CACHE_DIR));

    Ok(dir.join(format!(
        "{}_{}_{}.{}",
        stem, selection.channel, selection.layer, CACHE_EXTENSION
    )))
}

fn read_slot<T: DeserializeOwned>(
    zip: &mut ZipArchive<BufReader<File>>,
    name: &str,
) -> Result<Option<T>> {
    let entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(bincode::deserialize_from(entry)?))
}

impl<P: DeserializeOwned, H: DeserializeOwned> Dataset for SampleCache<P, H> {
    type Item = (P, Option<H>);

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        if index >= self.len {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        let mut zip = open_archive(&self.path)?;

        let slot = field_slot(index);
        let payload = read_slot(&mut zip, &slot)?.ok_or_else(|| {
            DatasetError::file_format(
                &slot,
                io::Error::new(io::ErrorKind::NotFound, "slot missing from cache"),
            )
        })?;
        let metadata = read_slot(&mut zip, &metadata_slot(index))?;

        Ok((payload, metadata))
    }
}

impl<'a, P: DeserializeOwned, H: DeserializeOwned> IntoIterator for &'a SampleCache<P, H> {
    type Item = Result<(P, Option<H>)>;
    type IntoIter = DatasetIter<'a, SampleCache<P, H>>;

    fn into_iter(self) -> Self::IntoIter {
        DatasetIter::new(self)
    }
}

impl<P, H> fmt::Debug for SampleCache<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleCache")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_names() {
        assert_eq!(field_slot(0), "field_0");
        assert_eq!(metadata_slot(12), "metadata_12");
    }
}
