use ahash::AHashSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{DatasetError, Result};

/// File extension of radiation field samples.
pub const SAMPLE_EXTENSION: &str = "rf3";

// Conventional two-level layout: samples in `fields/`, auxiliary spectra next to it.
const FIELDS_DIR: &str = "fields";
const SPECTRA_DIR: &str = "spectra";

/// Where the sample identifiers of a dataset come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    Directory(PathBuf),
    Archive(PathBuf),
    Files(Vec<String>),
}

impl SampleSource {
    /// Classifies a dataset root as a directory or a zip archive.
    pub fn detect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }

        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }

        if path.is_file() && is_zip_archive(path) {
            return Ok(Self::Archive(path.to_path_buf()));
        }

        Err(DatasetError::Configuration(format!(
            "dataset path {:?} is neither a directory nor a zip archive",
            path
        )))
    }

    /// The archive locator that identifiers of this source are relative to.
    pub fn archive(&self) -> Option<&Path> {
        match self {
            Self::Archive(path) => Some(path),
            _ => None,
        }
    }

    /// Produces the ordered, duplicate-free list of sample identifiers.
    pub fn resolve(&self) -> Result<Vec<String>> {
        let identifiers = match self {
            Self::Directory(dir) => list_directory(dir)?,
            Self::Archive(archive) => list_archive(archive)?,
            Self::Files(files) => files.clone(),
        };

        Ok(dedup_identifiers(identifiers))
    }
}

fn list_directory(dir: &Path) -> Result<Vec<String>> {
    let mut files = matching_files(dir)?;

    if files.is_empty() && dir.join(FIELDS_DIR).is_dir() && dir.join(SPECTRA_DIR).is_dir() {
        log::debug!(
            "No samples directly in {:?}, looking in {}/",
            dir,
            FIELDS_DIR
        );
        files = matching_files(&dir.join(FIELDS_DIR))?;
    }

    if files.is_empty() {
        return Err(DatasetError::NotFound(dir.to_path_buf()));
    }

    log::info!("Found {} samples in {:?}", files.len(), dir);

    Ok(files)
}

fn matching_files(dir: &Path) -> Result<Vec<String>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == SAMPLE_EXTENSION))
        .collect();

    paths.sort();

    Ok(paths
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect())
}

fn list_archive(archive: &Path) -> Result<Vec<String>> {
    let zip = open_archive(archive)?;
    let suffix = format!(".{}", SAMPLE_EXTENSION);

    // Central directory order, which is the order entries were written in.
    let entries: Vec<String> = (0..zip.len())
        .filter_map(|i| zip.name_for_index(i))
        .filter(|name| name.ends_with(&suffix))
        .map(str::to_string)
        .collect();

    log::info!("Found {} samples in archive {:?}", entries.len(), archive);

    Ok(entries)
}

fn is_zip_archive(path: &Path) -> bool {
    open_archive(path).is_ok()
}

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Reads the raw bytes of a single archive entry.
///
/// A missing entry or an unreadable entry body is reported against the entry
/// name, not the archive.
pub(crate) fn read_archive_entry(archive: &Path, name: &str) -> Result<Vec<u8>> {
    let mut zip = open_archive(archive)?;

    let mut entry = zip.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => DatasetError::file_format(
            name,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("entry missing from archive {:?}", archive),
            ),
        ),
        other => DatasetError::Archive(other),
    })?;

    // The declared size comes from the archive header and is not trusted.
    let mut buffer = Vec::new();
    entry
        .read_to_end(&mut buffer)
        .map_err(|e| DatasetError::file_format(name, e))?;

    Ok(buffer)
}

/// Drops repeated identifiers, keeping the first occurrence.
pub(crate) fn dedup_identifiers(identifiers: Vec<String>) -> Vec<String> {
    let total = identifiers.len();
    let mut seen = AHashSet::with_capacity(total);

    let unique: Vec<String> = identifiers
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    if unique.len() < total {
        log::warn!(
            "Dropped {} duplicate sample identifiers",
            total - unique.len()
        );
    }

    unique
}
