use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DatasetError, Result};
use crate::iter::DatasetIter;
use crate::resolver::{read_archive_entry, SampleSource};
use crate::store::{FieldStore, Metadata, MetadataLoadMode, MetadataOf, Sample, SampleOf};

/// Indexed collection of training items.
pub trait Dataset {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Self::Item>;

    /// Loads each index in order with [`Dataset::get`], stopping at the first error.
    /// Repeated indices are loaded repeatedly.
    fn get_many(&self, indices: &[usize]) -> Result<Vec<Self::Item>> {
        indices.iter().map(|&index| self.get(index)).collect()
    }

    fn iter(&self) -> DatasetIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetIter::new(self)
    }
}

/// Post-load hook applied to every decoded sample.
pub trait Transform<S: FieldStore> {
    type Output;

    fn apply(&self, sample: SampleOf<S>) -> Self::Output;
}

/// Returns samples unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<S: FieldStore> Transform<S> for Identity {
    type Output = SampleOf<S>;

    fn apply(&self, sample: SampleOf<S>) -> SampleOf<S> {
        sample
    }
}

impl<S, F, O> Transform<S> for F
where
    S: FieldStore,
    F: Fn(SampleOf<S>) -> O,
{
    type Output = O;

    fn apply(&self, sample: SampleOf<S>) -> O {
        self(sample)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Cartesian voxel grid layer.
    Grid,
    /// Polar segment layer.
    Polar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSelection {
    pub channel: String,
    pub layer: String,
}

impl LayerSelection {
    pub fn new(channel: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            layer: layer.into(),
        }
    }
}

/// What a dataset extracts from each radiation field file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extraction {
    #[default]
    WholeField,
    /// One layer of one channel. The selection has to be set before the first access.
    SingleLayer {
        kind: LayerKind,
        selection: Option<LayerSelection>,
    },
}

impl Extraction {
    pub fn grid_layer() -> Self {
        Self::SingleLayer {
            kind: LayerKind::Grid,
            selection: None,
        }
    }

    pub fn polar_layer() -> Self {
        Self::SingleLayer {
            kind: LayerKind::Polar,
            selection: None,
        }
    }
}

/// Construction parameters for a [`SampleDataset`].
///
/// When `file_paths` is set it is used as is, and the entries are read from
/// `archive` if one is given. With only `archive` set, the identifiers are
/// the `.rf3` entries of the archive.
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    pub file_paths: Option<Vec<String>>,
    pub archive: Option<PathBuf>,
    pub metadata_load_mode: MetadataLoadMode,
    pub extraction: Extraction,
}

/// Lazily decoding dataset of radiation field files.
///
/// Nothing is kept in memory between accesses: every `get` reads and decodes
/// the file (or archive entry) again. Not meant to be shared by several
/// prefetching consumers.
pub struct SampleDataset<S: FieldStore, T = Identity> {
    store: Arc<S>,
    identifiers: Vec<String>,
    archive: Option<PathBuf>,
    metadata_load_mode: MetadataLoadMode,
    extraction: Extraction,
    transform: T,
}

#[derive(Clone, Copy)]
enum Input<'a> {
    Path(&'a Path),
    Buffer(&'a [u8]),
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Field,
    Grid(&'a LayerSelection),
    Polar(&'a LayerSelection),
}

impl<S: FieldStore> SampleDataset<S> {
    pub fn new(store: Arc<S>, options: DatasetOptions) -> Result<Self> {
        let DatasetOptions {
            file_paths,
            archive,
            metadata_load_mode,
            extraction,
        } = options;

        let identifiers = match (file_paths, &archive) {
            (Some(files), _) => SampleSource::Files(files).resolve()?,
            (None, Some(archive)) => SampleSource::Archive(archive.clone()).resolve()?,
            (None, None) => {
                return Err(DatasetError::Configuration(
                    "either file paths or an archive must be provided".to_string(),
                ))
            }
        };

        Ok(Self {
            store,
            identifiers,
            archive,
            metadata_load_mode,
            extraction,
            transform: Identity,
        })
    }

    /// Whole-field dataset over the given identifiers with header metadata.
    pub fn from_files(
        store: Arc<S>,
        file_paths: Vec<String>,
        archive: Option<PathBuf>,
    ) -> Result<Self> {
        Self::new(
            store,
            DatasetOptions {
                file_paths: Some(file_paths),
                archive,
                ..DatasetOptions::default()
            },
        )
    }
}

impl<S: FieldStore, T> SampleDataset<S, T> {
    /// Replaces the post-load hook.
    pub fn with_transform<U: Transform<S>>(self, transform: U) -> SampleDataset<S, U> {
        SampleDataset {
            store: self.store,
            identifiers: self.identifiers,
            archive: self.archive,
            metadata_load_mode: self.metadata_load_mode,
            extraction: self.extraction,
            transform,
        }
    }

    /// Selects the layer that a single-layer dataset extracts.
    pub fn set_channel_and_layer(
        &mut self,
        channel: impl Into<String>,
        layer: impl Into<String>,
    ) -> Result<()> {
        match &mut self.extraction {
            Extraction::SingleLayer { selection, .. } => {
                *selection = Some(LayerSelection::new(channel, layer));
                Ok(())
            }
            Extraction::WholeField => Err(DatasetError::Configuration(
                "channel and layer can only be set on single-layer datasets".to_string(),
            )),
        }
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    pub fn metadata_load_mode(&self) -> MetadataLoadMode {
        self.metadata_load_mode
    }

    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    pub fn layer_selection(&self) -> Option<&LayerSelection> {
        match &self.extraction {
            Extraction::SingleLayer { selection, .. } => selection.as_ref(),
            Extraction::WholeField => None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn target(&self, id: &str) -> Result<Target<'_>> {
        match &self.extraction {
            Extraction::WholeField => Ok(Target::Field),
            Extraction::SingleLayer {
                selection: None, ..
            } => Err(DatasetError::Precondition(id.to_string())),
            Extraction::SingleLayer {
                kind: LayerKind::Grid,
                selection: Some(selection),
            } => Ok(Target::Grid(selection)),
            Extraction::SingleLayer {
                kind: LayerKind::Polar,
                selection: Some(selection),
            } => Ok(Target::Polar(selection)),
        }
    }

    fn decode(
        &self,
        id: &str,
        target: Target<'_>,
        input: Input<'_>,
    ) -> Result<(SampleOf<S>, Option<MetadataOf<S>>)> {
        let sample = self
            .decode_sample(target, input)
            .map_err(|e| DatasetError::file_format(id, e))?;
        let metadata = self
            .decode_metadata(input)
            .map_err(|e| DatasetError::file_format(id, e))?;

        Ok((sample, metadata))
    }

    fn decode_sample(&self, target: Target<'_>, input: Input<'_>) -> io::Result<SampleOf<S>> {
        let store = self.store.as_ref();

        match (target, input) {
            (Target::Field, Input::Path(path)) => store.load(path).map(Sample::Field),
            (Target::Field, Input::Buffer(buffer)) => {
                store.load_from_buffer(buffer).map(Sample::Field)
            }
            (Target::Grid(s), Input::Path(path)) => store
                .load_single_grid_layer(path, &s.channel, &s.layer)
                .map(Sample::Grid),
            (Target::Grid(s), Input::Buffer(buffer)) => store
                .load_single_grid_layer_from_buffer(buffer, &s.channel, &s.layer)
                .map(Sample::Grid),
            (Target::Polar(s), Input::Path(path)) => store
                .load_single_polar_layer(path, &s.channel, &s.layer)
                .map(Sample::Polar),
            (Target::Polar(s), Input::Buffer(buffer)) => store
                .load_single_polar_layer_from_buffer(buffer, &s.channel, &s.layer)
                .map(Sample::Polar),
        }
    }

    fn decode_metadata(&self, input: Input<'_>) -> io::Result<Option<MetadataOf<S>>> {
        let store = self.store.as_ref();

        let metadata = match (self.metadata_load_mode, input) {
            (MetadataLoadMode::Disabled, _) => return Ok(None),
            (MetadataLoadMode::Full, Input::Path(path)) => {
                Metadata::Full(store.load_metadata(path)?)
            }
            (MetadataLoadMode::Full, Input::Buffer(buffer)) => {
                Metadata::Full(store.load_metadata_from_buffer(buffer)?)
            }
            (MetadataLoadMode::Header, Input::Path(path)) => {
                Metadata::Header(store.peek_metadata(path)?)
            }
            (MetadataLoadMode::Header, Input::Buffer(buffer)) => {
                Metadata::Header(store.peek_metadata_from_buffer(buffer)?)
            }
        };

        Ok(Some(metadata))
    }
}

impl<S: FieldStore, T: Transform<S>> Dataset for SampleDataset<S, T> {
    type Item = (T::Output, Option<MetadataOf<S>>);

    fn len(&self) -> usize {
        self.identifiers.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        let id = self
            .identifiers
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.identifiers.len(),
            })?;

        // Checked before touching the file so nothing is decoded on failure.
        let target = self.target(id)?;

        let (sample, metadata) = match &self.archive {
            Some(archive) => {
                let buffer = read_archive_entry(archive, id)?;
                self.decode(id, target, Input::Buffer(&buffer))?
            }
            None => self.decode(id, target, Input::Path(Path::new(id)))?,
        };

        log::debug!("Loaded sample {} ({})", index, id);

        Ok((self.transform.apply(sample), metadata))
    }
}

impl<'a, S: FieldStore, T: Transform<S>> IntoIterator for &'a SampleDataset<S, T> {
    type Item = Result<(T::Output, Option<MetadataOf<S>>)>;
    type IntoIter = DatasetIter<'a, SampleDataset<S, T>>;

    fn into_iter(self) -> Self::IntoIter {
        DatasetIter::new(self)
    }
}

impl<S: FieldStore, T> fmt::Debug for SampleDataset<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleDataset")
            .field("samples", &self.identifiers.len())
            .field("archive", &self.archive)
            .field("metadata_load_mode", &self.metadata_load_mode)
            .field("extraction", &self.extraction)
            .finish_non_exhaustive()
    }
}
