#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use dataset::FieldStore;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const CHANNEL: &str = "dose";
pub const LAYER: &str = "doserate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestField {
    pub name: String,
    pub energy: u32,
    pub layers: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    pub name: String,
    pub energy: u32,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestHeader {
    pub name: String,
    pub energy: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGrid {
    pub channel: String,
    pub layer: String,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPolar {
    pub channel: String,
    pub layer: String,
    pub segments: Vec<f32>,
}

/// Field store over a tiny text format:
///
/// ```text
/// RF3
/// name=sample_00
/// energy=100
/// layer=dose/doserate:1,2,3
/// ```
#[derive(Debug, Default)]
pub struct TestStore {
    path_reads: AtomicUsize,
    buffer_reads: AtomicUsize,
}

impl TestStore {
    pub fn path_reads(&self) -> usize {
        self.path_reads.load(Ordering::Relaxed)
    }

    pub fn buffer_reads(&self) -> usize {
        self.buffer_reads.load(Ordering::Relaxed)
    }

    pub fn total_reads(&self) -> usize {
        self.path_reads() + self.buffer_reads()
    }

    fn read_path(&self, path: &Path) -> io::Result<TestField> {
        self.path_reads.fetch_add(1, Ordering::Relaxed);
        parse(&fs::read(path)?)
    }

    fn read_buffer(&self, buffer: &[u8]) -> io::Result<TestField> {
        self.buffer_reads.fetch_add(1, Ordering::Relaxed);
        parse(buffer)
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse(bytes: &[u8]) -> io::Result<TestField> {
    let text = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
    let mut lines = text.lines();

    if lines.next() != Some("RF3") {
        return Err(invalid("missing RF3 magic"));
    }

    let mut name = None;
    let mut energy = None;
    let mut layers = BTreeMap::new();

    for line in lines {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| invalid(format!("malformed line '{}'", line)))?;

        match key {
            "name" => name = Some(value.to_string()),
            "energy" => energy = Some(value.parse().map_err(|_| invalid("bad energy"))?),
            "layer" => {
                let (layer, values) = value
                    .split_once(':')
                    .ok_or_else(|| invalid("malformed layer"))?;
                let values = values
                    .split(',')
                    .map(|v| v.parse::<f32>().map_err(|_| invalid("bad layer value")))
                    .collect::<io::Result<Vec<f32>>>()?;
                layers.insert(layer.to_string(), values);
            }
            _ => return Err(invalid(format!("unknown key '{}'", key))),
        }
    }

    Ok(TestField {
        name: name.ok_or_else(|| invalid("missing name"))?,
        energy: energy.ok_or_else(|| invalid("missing energy"))?,
        layers,
    })
}

fn metadata_of(field: TestField) -> TestMetadata {
    TestMetadata {
        comment: format!("full metadata of {}", field.name),
        name: field.name,
        energy: field.energy,
    }
}

fn header_of(field: TestField) -> TestHeader {
    TestHeader {
        name: field.name,
        energy: field.energy,
    }
}

fn layer_values(field: &TestField, channel: &str, layer: &str) -> io::Result<Vec<f32>> {
    field
        .layers
        .get(&format!("{}/{}", channel, layer))
        .cloned()
        .ok_or_else(|| invalid(format!("no layer {}/{}", channel, layer)))
}

fn grid_of(field: TestField, channel: &str, layer: &str) -> io::Result<TestGrid> {
    Ok(TestGrid {
        channel: channel.to_string(),
        layer: layer.to_string(),
        values: layer_values(&field, channel, layer)?,
    })
}

fn polar_of(field: TestField, channel: &str, layer: &str) -> io::Result<TestPolar> {
    Ok(TestPolar {
        channel: channel.to_string(),
        layer: layer.to_string(),
        segments: layer_values(&field, channel, layer)?,
    })
}

impl FieldStore for TestStore {
    type Field = TestField;
    type Metadata = TestMetadata;
    type Header = TestHeader;
    type Grid = TestGrid;
    type Polar = TestPolar;

    fn load(&self, path: &Path) -> io::Result<TestField> {
        self.read_path(path)
    }

    fn load_from_buffer(&self, buffer: &[u8]) -> io::Result<TestField> {
        self.read_buffer(buffer)
    }

    fn load_metadata(&self, path: &Path) -> io::Result<TestMetadata> {
        self.read_path(path).map(metadata_of)
    }

    fn load_metadata_from_buffer(&self, buffer: &[u8]) -> io::Result<TestMetadata> {
        self.read_buffer(buffer).map(metadata_of)
    }

    fn peek_metadata(&self, path: &Path) -> io::Result<TestHeader> {
        self.read_path(path).map(header_of)
    }

    fn peek_metadata_from_buffer(&self, buffer: &[u8]) -> io::Result<TestHeader> {
        self.read_buffer(buffer).map(header_of)
    }

    fn load_single_grid_layer(
        &self,
        path: &Path,
        channel: &str,
        layer: &str,
    ) -> io::Result<TestGrid> {
        grid_of(self.read_path(path)?, channel, layer)
    }

    fn load_single_grid_layer_from_buffer(
        &self,
        buffer: &[u8],
        channel: &str,
        layer: &str,
    ) -> io::Result<TestGrid> {
        grid_of(self.read_buffer(buffer)?, channel, layer)
    }

    fn load_single_polar_layer(
        &self,
        path: &Path,
        channel: &str,
        layer: &str,
    ) -> io::Result<TestPolar> {
        polar_of(self.read_path(path)?, channel, layer)
    }

    fn load_single_polar_layer_from_buffer(
        &self,
        buffer: &[u8],
        channel: &str,
        layer: &str,
    ) -> io::Result<TestPolar> {
        polar_of(self.read_buffer(buffer)?, channel, layer)
    }

    fn header_of(&self, metadata: &TestMetadata) -> TestHeader {
        TestHeader {
            name: metadata.name.clone(),
            energy: metadata.energy,
        }
    }
}

pub fn sample_name(index: usize) -> String {
    format!("sample_{:02}.rf3", index)
}

pub fn sample_text(index: usize) -> String {
    format!(
        "RF3\nname=sample_{index:02}\nenergy={energy}\nlayer=dose/doserate:{a},{b},{c}\nlayer=dose/spectra:{c},{a}\n",
        index = index,
        energy = 60 + 10 * index,
        a = index as f32 * 0.5,
        b = index as f32 + 1.0,
        c = index as f32 * 2.0,
    )
}

/// Writes `count` sample files into `dir` and returns their paths as identifiers.
pub fn write_samples(dir: &Path, count: usize) -> Vec<String> {
    fs::create_dir_all(dir).unwrap();
    (0..count)
        .map(|i| {
            let path = dir.join(sample_name(i));
            fs::write(&path, sample_text(i)).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

/// Writes a zip archive at `path` holding the given `(entry name, content)` pairs.
pub fn write_archive(path: &Path, entries: &[(String, String)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes a zip archive with `count` samples at its root and returns the archive path.
pub fn write_sample_archive(dir: &Path, count: usize) -> PathBuf {
    let path = dir.join("fields.zip");
    let entries: Vec<(String, String)> = (0..count)
        .map(|i| (sample_name(i), sample_text(i)))
        .collect();
    write_archive(&path, &entries);
    path
}
