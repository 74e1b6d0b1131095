use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{error::Error, Result};

/// Suffix of the temporary file an artifact gets written to before it replaces the real one.
const TMP_SUFFIX: &str = ".tmp";

/// A sparse line index. Holds the byte offset of every `index_interval`-th line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseIndex {
    /// Count of lines in the indexed file
    total_lines: usize,
    /// Offset of the first byte of the lines 0, `index_interval`, 2 * `index_interval`, ...
    offsets: Vec<u64>,
    /// Distance in lines between two checkpoints
    index_interval: usize,
}

impl SparseIndex {
    /// Create a new SparseIndex. Returns an error if the given values don't form a valid index.
    pub fn new(total_lines: usize, offsets: Vec<u64>, index_interval: usize) -> Result<Self> {
        let index = Self {
            total_lines,
            offsets,
            index_interval,
        };
        index.validate()?;
        Ok(index)
    }

    /// Checks the invariants of the index.
    pub fn validate(&self) -> Result<()> {
        if self.index_interval == 0 {
            return Err(Error::MalformedIndex("index interval is zero".into()));
        }

        let expected = self.total_lines / self.index_interval
            + (self.total_lines % self.index_interval != 0) as usize;
        if self.offsets.len() != expected {
            return Err(Error::MalformedIndex(format!(
                "expected {} checkpoints for {} lines with interval {}, found {}",
                expected,
                self.total_lines,
                self.index_interval,
                self.offsets.len()
            )));
        }

        if let Some(first) = self.offsets.first() {
            if *first != 0 {
                return Err(Error::MalformedIndex(format!(
                    "first checkpoint is at offset {}",
                    first
                )));
            }
        }

        if let Some((pos, (a, b))) = self
            .offsets
            .iter()
            .tuple_windows()
            .find_position(|(a, b)| a > b)
        {
            return Err(Error::MalformedIndex(format!(
                "checkpoint {} (offset {}) is behind checkpoint {} (offset {})",
                pos + 1,
                b,
                pos,
                a
            )));
        }

        Ok(())
    }

    /// Returns the amount of lines in the indexed file.
    #[inline]
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    #[inline]
    pub fn index_interval(&self) -> usize {
        self.index_interval
    }

    #[inline]
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Returns the amount of checkpoints stored in the index.
    #[inline]
    pub fn checkpoints(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` if the index doesn't contain any line.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_lines == 0
    }

    /// Returns the byte range of the chunk holding `line`. The end is `None` if the chunk reaches
    /// until the end of the file. Returns `None` if `line` is out of bounds.
    pub fn checkpoint_range(&self, line: usize) -> Option<(u64, Option<u64>)> {
        if line >= self.total_lines {
            return None;
        }

        let checkpoint = line / self.index_interval;
        let start = *self.offsets.get(checkpoint)?;
        let end = self.offsets.get(checkpoint + 1).copied();
        Some((start, end))
    }

    /// Returns the position of `line` within its chunk.
    #[inline]
    pub fn position_in_chunk(&self, line: usize) -> usize {
        line % self.index_interval
    }

    /// Decodes and validates an encoded index.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let index: SparseIndex = serde_json::from_slice(data)?;
        index.validate()?;
        Ok(index)
    }

    /// Encodes the index into its persisted format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Loads the index artifact at `path`. Every failure is reported as `Error::Artifact`.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let async_path: async_std::path::PathBuf = path.to_path_buf().into();
        let data = async_std::fs::read(&async_path)
            .await
            .map_err(|e| Error::from(e).artifact(path))?;
        Self::decode(&data).map_err(|e| e.artifact(path))
    }

    /// Writes the index to `path`. The index gets written into a temporary file next to `path`
    /// first, which then atomically replaces `path`.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = tmp_path(path);

        if let Err(err) = write_file(&tmp_path, self) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Returns the path of the temporary file used while writing the artifact `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn write_file(path: &Path, index: &SparseIndex) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, index)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
