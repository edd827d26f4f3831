use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Capability interface to the radiation field file format.
///
/// Every operation comes in two forms: one reading a file from the filesystem
/// and one decoding an in-memory buffer, which is how archive entries are
/// read. Malformed input should be reported as `io::ErrorKind::InvalidData`.
pub trait FieldStore {
    /// A complete decoded radiation field.
    type Field;
    /// Full metadata, including dynamic entries such as spectra.
    type Metadata;
    /// Lightweight metadata header.
    type Header;
    /// A single layer of a cartesian (voxel grid) channel.
    type Grid;
    /// A single layer of a polar channel.
    type Polar;

    fn load(&self, path: &Path) -> io::Result<Self::Field>;
    fn load_from_buffer(&self, buffer: &[u8]) -> io::Result<Self::Field>;

    fn load_metadata(&self, path: &Path) -> io::Result<Self::Metadata>;
    fn load_metadata_from_buffer(&self, buffer: &[u8]) -> io::Result<Self::Metadata>;

    fn peek_metadata(&self, path: &Path) -> io::Result<Self::Header>;
    fn peek_metadata_from_buffer(&self, buffer: &[u8]) -> io::Result<Self::Header>;

    fn load_single_grid_layer(
        &self,
        path: &Path,
        channel: &str,
        layer: &str,
    ) -> io::Result<Self::Grid>;
    fn load_single_grid_layer_from_buffer(
        &self,
        buffer: &[u8],
        channel: &str,
        layer: &str,
    ) -> io::Result<Self::Grid>;

    fn load_single_polar_layer(
        &self,
        path: &Path,
        channel: &str,
        layer: &str,
    ) -> io::Result<Self::Polar>;
    fn load_single_polar_layer_from_buffer(
        &self,
        buffer: &[u8],
        channel: &str,
        layer: &str,
    ) -> io::Result<Self::Polar>;

    /// Reduces full metadata to its header.
    fn header_of(&self, metadata: &Self::Metadata) -> Self::Header;
}

/// When and how much metadata is decoded alongside each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataLoadMode {
    Full,
    #[default]
    Header,
    Disabled,
}

/// A decoded sample: the whole field or one extracted layer of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sample<F, G, P> {
    Field(F),
    Grid(G),
    Polar(P),
}

pub type SampleOf<S> =
    Sample<<S as FieldStore>::Field, <S as FieldStore>::Grid, <S as FieldStore>::Polar>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metadata<M, H> {
    Full(M),
    Header(H),
}

pub type MetadataOf<S> = Metadata<<S as FieldStore>::Metadata, <S as FieldStore>::Header>;

impl<M, H> Metadata<M, H> {
    /// Returns the header, reducing full metadata with `reduce`.
    pub fn into_header(self, reduce: impl FnOnce(M) -> H) -> H {
        match self {
            Metadata::Full(metadata) => reduce(metadata),
            Metadata::Header(header) => header,
        }
    }
}
