use std::{convert::TryInto, path::Path, sync::Arc};

use tracing::debug;

use crate::{
    error::Error,
    index::SparseIndex,
    source::{ChunkSource, FileSource},
    Result,
};

/// Resolves line numbers to their text using a loaded `SparseIndex` and bounded reads on a
/// `ChunkSource`. Immutable after creation and cheap to clone.
#[derive(Debug)]
pub struct LineResolver<S: ChunkSource> {
    index: Arc<SparseIndex>,
    source: S,
}

impl LineResolver<FileSource> {
    /// Loads the index artifact at `artifact` for the file at `source`.
    ///
    /// Returns `Error::Artifact` if the artifact is missing or malformed.
    pub async fn load<S: AsRef<Path>, A: AsRef<Path>>(source: S, artifact: A) -> Result<Self> {
        let index = SparseIndex::load(artifact.as_ref()).await?;
        debug!(
            artifact = ?artifact.as_ref(),
            lines = index.total_lines(),
            interval = index.index_interval(),
            "index loaded"
        );
        Ok(Self::new(FileSource::new(source.as_ref()), Arc::new(index)))
    }
}

impl<S: ChunkSource> LineResolver<S> {
    /// Create a new `LineResolver`. The index won't be checked against `source`. Using an index
    /// of a different file won't return an error but make the resolver useless.
    #[inline]
    pub fn new(source: S, index: Arc<SparseIndex>) -> Self {
        Self { index, source }
    }

    #[inline]
    pub fn index(&self) -> &SparseIndex {
        &self.index
    }

    /// Returns the amount of lines of the indexed file.
    #[inline]
    pub fn total_lines(&self) -> usize {
        self.index.total_lines()
    }

    /// Reads the given line. Returns `Ok(None)` if the line doesn't exist, which includes
    /// negative line numbers.
    pub async fn get_line<L: TryInto<usize>>(&self, line: L) -> Result<Option<String>> {
        let line = match line.try_into() {
            Ok(line) => line,
            Err(_) => return Ok(None),
        };

        let raw = match self.get_line_raw(line).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        decode_ascii(raw, line).map(Some)
    }

    /// Reads the raw bytes of the given line, without its line terminator.
    pub async fn get_line_raw(&self, line: usize) -> Result<Option<Vec<u8>>> {
        let (start, end) = match self.index.checkpoint_range(line) {
            Some(range) => range,
            None => return Ok(None),
        };

        let chunk = self.source.read_chunk(start, end).await?;

        let pos = self.index.position_in_chunk(line);
        let line = chunk_lines(&chunk).nth(pos).map(<[u8]>::to_vec);
        Ok(line)
    }
}

impl<S: ChunkSource + Clone> Clone for LineResolver<S> {
    /// Does not clone the index but the Arc reference to it
    #[inline]
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            source: self.source.clone(),
        }
    }
}

/// Splits a chunk into its lines. Lines end with `\n` while a `\r` directly in front of it belongs
/// to the terminator too. A trailing terminator doesn't produce an empty line at the end.
pub fn chunk_lines(chunk: &[u8]) -> impl Iterator<Item = &[u8]> {
    chunk.split_inclusive(|b| *b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    })
}

/// Turns the bytes of `line` into a String. Only ASCII is accepted.
fn decode_ascii(raw: Vec<u8>, line: usize) -> Result<String> {
    if let Some(position) = raw.iter().position(|b| !b.is_ascii()) {
        return Err(Error::NonAscii { line, position });
    }

    Ok(String::from_utf8(raw)?)
}
