pub mod builder;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod iter;
pub mod manifest;
pub mod resolver;
pub mod store;

mod progress;

pub use builder::{split_identifiers, DatasetBuilder, Split, SplitRatios};
pub use cache::SampleCache;
pub use dataset::{
    Dataset, DatasetOptions, Extraction, Identity, LayerKind, LayerSelection, SampleDataset,
    Transform,
};
pub use error::{DatasetError, Result};
pub use iter::DatasetIter;
pub use manifest::SplitManifest;
pub use resolver::{SampleSource, SAMPLE_EXTENSION};
pub use store::{FieldStore, Metadata, MetadataLoadMode, MetadataOf, Sample, SampleOf};
