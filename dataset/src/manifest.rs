use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::builder::Split;

const ARCHIVE_KEY: &str = "archive=";
const TRAIN_SECTION: &str = "[train]";
const VAL_SECTION: &str = "[val]";
const TEST_SECTION: &str = "[test]";

/// A saved train/val/test split, so the same partition can be rebuilt later.
///
/// Plain text: an `archive=` header line (empty when the identifiers are
/// filesystem paths) followed by `[train]`, `[val]` and `[test]` sections
/// with one identifier per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitManifest {
    pub archive: Option<PathBuf>,
    pub split: Split,
}

impl SplitManifest {
    pub fn new(archive: Option<PathBuf>, split: Split) -> Self {
        Self { archive, split }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let archive = self
            .archive
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(writer, "{}{}", ARCHIVE_KEY, archive)?; // Header

        for (section, ids) in [
            (TRAIN_SECTION, &self.split.train),
            (VAL_SECTION, &self.split.val),
            (TEST_SECTION, &self.split.test),
        ] {
            writeln!(writer, "{}", section)?;
            for id in ids {
                writeln!(writer, "{}", id)?;
            }
        }

        Ok(())
    }

    pub fn read<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing archive header"))??;
        let archive = header
            .strip_prefix(ARCHIVE_KEY)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Malformed archive header"))?
            .trim();
        let archive = (!archive.is_empty()).then(|| PathBuf::from(archive));

        let mut split = Split::default();
        let mut current: Option<&mut Vec<String>> = None;

        for line_res in lines {
            let line = line_res?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line {
                TRAIN_SECTION => current = Some(&mut split.train),
                VAL_SECTION => current = Some(&mut split.val),
                TEST_SECTION => current = Some(&mut split.test),
                id => match current.as_mut() {
                    Some(ids) => ids.push(id.to_string()),
                    None => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("Identifier '{}' outside of a section", id),
                        ))
                    }
                },
            }
        }

        Ok(Self { archive, split })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }
}
