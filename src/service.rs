use std::{convert::TryInto, path::Path};

use once_cell::sync::OnceCell;
use tracing::info;

use crate::{
    error::Error,
    resolver::LineResolver,
    source::{ChunkSource, FileSource},
    Result,
};

/// Serves lines of a single file. Starts out not ready and becomes ready once, when its index was
/// loaded successfully. Queries before that fail with `Error::NotReady`.
#[derive(Debug)]
pub struct LineService<S: ChunkSource = FileSource> {
    resolver: OnceCell<LineResolver<S>>,
}

impl<S: ChunkSource> Default for LineService<S> {
    fn default() -> Self {
        Self {
            resolver: OnceCell::new(),
        }
    }
}

impl LineService<FileSource> {
    /// Loads the index artifact for `source`. Returns the artifact error if loading fails, in
    /// which case the service stays not ready.
    pub async fn load<S: AsRef<Path>, A: AsRef<Path>>(&self, source: S, artifact: A) -> Result<()> {
        if self.is_ready() {
            return Err(Error::AlreadyLoaded);
        }

        info!(artifact = ?artifact.as_ref(), "loading index");
        let resolver = LineResolver::load(source, artifact).await?;

        self.set_resolver(resolver)?;
        info!("line service is ready");
        Ok(())
    }
}

impl<S: ChunkSource> LineService<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the service ready using an already built `resolver`.
    pub fn set_resolver(&self, resolver: LineResolver<S>) -> Result<()> {
        self.resolver
            .set(resolver)
            .map_err(|_| Error::AlreadyLoaded)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.resolver.get().is_some()
    }

    /// Returns the resolver or `Error::NotReady` if no index was loaded yet.
    #[inline]
    pub fn resolver(&self) -> Result<&LineResolver<S>> {
        self.resolver.get().ok_or(Error::NotReady)
    }

    /// Returns the amount of lines of the served file.
    pub fn total_lines(&self) -> Result<usize> {
        Ok(self.resolver()?.total_lines())
    }

    /// Reads the given line. `Ok(None)` means the line doesn't exist.
    pub async fn get_line<L: TryInto<usize>>(&self, line: L) -> Result<Option<String>> {
        self.resolver()?.get_line(line).await
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::*;
    use crate::{index::SparseIndex, source::MemSource};

    #[async_std::test]
    async fn test_not_ready() {
        let service: LineService = LineService::new();
        assert!(!service.is_ready());
        assert!(matches!(service.get_line(0).await, Err(Error::NotReady)));
        assert!(matches!(service.total_lines(), Err(Error::NotReady)));
    }

    #[async_std::test]
    async fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::write(&source, "a\nb\n").unwrap();

        let service: LineService = LineService::new();
        let err = service
            .load(&source, dir.path().join("missing.idx"))
            .await
            .unwrap_err();
        assert!(err.is_artifact());
        assert!(!service.is_ready());
        assert!(matches!(service.get_line(0).await, Err(Error::NotReady)));
    }

    #[async_std::test]
    async fn test_load_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let artifact = dir.path().join("source.idx");
        fs::write(&source, "a\nb\nc\n").unwrap();
        SparseIndex::new(3, vec![0, 4], 2)
            .unwrap()
            .write_to(&artifact)
            .unwrap();

        let service: LineService = LineService::new();
        service.load(&source, &artifact).await.unwrap();
        assert!(service.is_ready());
        assert_eq!(service.total_lines().unwrap(), 3);
        assert_eq!(service.get_line(2).await.unwrap().as_deref(), Some("c"));
        assert_eq!(service.get_line(3).await.unwrap(), None);

        let res = service.load(&source, &artifact).await;
        assert!(matches!(res, Err(Error::AlreadyLoaded)));
        assert!(service.is_ready());
    }

    #[async_std::test]
    async fn test_concurrent_queries() {
        let text: String = (0..200).map(|i| format!("row {}\n", i)).collect();
        let mut offsets = Vec::new();
        let mut offset = 0;
        for (i, line) in text.split_inclusive('\n').enumerate() {
            if i % 16 == 0 {
                offsets.push(offset);
            }
            offset += line.len() as u64;
        }
        let index = SparseIndex::new(200, offsets, 16).unwrap();

        let service: Arc<LineService<MemSource<String>>> = Arc::new(LineService::new());
        service
            .set_resolver(LineResolver::new(MemSource::new(text), Arc::new(index)))
            .unwrap();

        let tasks: Vec<_> = (0..200usize)
            .map(|i| {
                let service = Arc::clone(&service);
                async_std::task::spawn(async move { (i, service.get_line(i).await) })
            })
            .collect();

        for task in tasks {
            let (i, line) = task.await;
            assert_eq!(line.unwrap(), Some(format!("row {}", i)));
        }
    }
}
