use std::{io::SeekFrom, path::PathBuf, sync::Arc};

use async_std::{fs, io::prelude::*};
use async_trait::async_trait;

use crate::Result;

/// Something a chunk of bytes can be read from.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Reads the bytes in `start..end`. If `end` is `None`, reads until the end of the source.
    async fn read_chunk(&self, start: u64, end: Option<u64>) -> Result<Vec<u8>>;
}

/// A file on disk. Every read opens its own handle, so reads don't share any state.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    async fn read_chunk(&self, start: u64, end: Option<u64>) -> Result<Vec<u8>> {
        let path: async_std::path::PathBuf = self.path.clone().into();
        let mut file = fs::File::open(path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::new();
        match end {
            Some(end) => {
                // Bounded by the real file length, even if the index claims a bigger chunk
                (&mut file)
                    .take(end.saturating_sub(start))
                    .read_to_end(&mut buf)
                    .await?;
            }
            None => {
                file.read_to_end(&mut buf).await?;
            }
        }

        Ok(buf)
    }
}

// little shortcut
pub trait Bytes: AsRef<[u8]> + Send + Sync {}
impl<T: AsRef<[u8]> + Send + Sync> Bytes for T {}

/// In-memory data which can be cloned very cheaply.
#[derive(Debug)]
pub struct MemSource<T: Bytes>(Arc<T>);

impl<T: Bytes> MemSource<T> {
    #[inline]
    pub fn new(data: T) -> Self {
        Self(Arc::new(data))
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        (*self.0).as_ref()
    }
}

impl<T: Bytes> Clone for MemSource<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Bytes> From<T> for MemSource<T> {
    #[inline]
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

#[async_trait]
impl<T: Bytes> ChunkSource for MemSource<T> {
    async fn read_chunk(&self, start: u64, end: Option<u64>) -> Result<Vec<u8>> {
        let data = self.data();
        let start = (start as usize).min(data.len());
        let end = end.map_or(data.len(), |e| (e as usize).min(data.len()));
        Ok(data[start..end.max(start)].to_vec())
    }
}
