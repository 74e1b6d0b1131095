use std::{
    fs,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};

use tracing::{info, trace};

use crate::{error::Error, index::SparseIndex, Result};

/// Assumed average length of a line in bytes, used to estimate the line count of a file.
pub const AVG_LINE_LENGTH_BYTES: u64 = 80;

/// Amount of checkpoints an index should roughly contain, regardless of the files size.
pub const TARGET_INDEX_ENTRIES: u64 = 100_000;

/// Progress gets reported every `PROGRESS_LINES` lines.
const PROGRESS_LINES: usize = 10_000;

/// Settings used to pick the interval of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    pub avg_line_length: u64,
    pub target_index_entries: u64,
    /// Use this interval instead of estimating one from the files size
    pub fixed_interval: Option<usize>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            avg_line_length: AVG_LINE_LENGTH_BYTES,
            target_index_entries: TARGET_INDEX_ENTRIES,
            fixed_interval: None,
        }
    }
}

impl BuilderConfig {
    pub fn avg_line_length(mut self, avg_line_length: u64) -> Self {
        self.avg_line_length = avg_line_length;
        self
    }

    pub fn target_index_entries(mut self, target_index_entries: u64) -> Self {
        self.target_index_entries = target_index_entries;
        self
    }

    pub fn fixed_interval(mut self, interval: usize) -> Self {
        self.fixed_interval = Some(interval);
        self
    }

    /// Returns the index interval to use for a file of `file_size` bytes. Bigger files get a
    /// coarser interval so the index keeps roughly `target_index_entries` checkpoints.
    pub fn interval_for(&self, file_size: u64) -> usize {
        if let Some(interval) = self.fixed_interval {
            return interval.max(1);
        }

        let estimated_lines = file_size / self.avg_line_length.max(1);
        (estimated_lines / self.target_index_entries.max(1)).max(1) as usize
    }
}

/// Builds sparse indices with a single sequential scan over a file.
pub struct IndexBuilder {
    config: BuilderConfig,
    progress: Option<Box<dyn FnMut(u64, u64)>>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

impl IndexBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Calls `f` with the amount of scanned bytes and the total size of the file while building.
    pub fn on_progress<F: FnMut(u64, u64) + 'static>(mut self, f: F) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Builds the index of the file at `source` and atomically stores it at `artifact`.
    ///
    /// Returns `Error::EmptySource` without writing anything if `source` is empty.
    pub fn build<S: AsRef<Path>, A: AsRef<Path>>(
        &mut self,
        source: S,
        artifact: A,
    ) -> Result<SparseIndex> {
        let source = source.as_ref();
        let artifact = artifact.as_ref();

        info!(source = ?source, "building sparse index");
        let start = Instant::now();

        let index = self.build_index(source)?;

        info!(
            lines = index.total_lines(),
            checkpoints = index.checkpoints(),
            elapsed = ?start.elapsed(),
            "indexing complete"
        );

        index.write_to(artifact)?;
        info!(artifact = ?artifact, "index saved");

        Ok(index)
    }

    /// Builds the index of the file at `source` without persisting it.
    pub fn build_index<P: AsRef<Path>>(&mut self, source: P) -> Result<SparseIndex> {
        let source = source.as_ref();
        let file_size = fs::metadata(source)?.len();
        if file_size == 0 {
            return Err(Error::EmptySource(source.to_path_buf()));
        }

        let interval = self.config.interval_for(file_size);
        info!(interval, file_size, "using index interval");

        let reader = BufReader::new(fs::File::open(source)?);
        self.scan(reader, interval, file_size)
    }

    /// Scans `reader` and records the offset of every `interval`-th line.
    pub fn scan<R: BufRead>(
        &mut self,
        mut reader: R,
        interval: usize,
        total_size: u64,
    ) -> Result<SparseIndex> {
        let interval = interval.max(1);

        let mut offsets: Vec<u64> = Vec::new();
        let mut curr_offset: u64 = 0;
        let mut line_count: usize = 0;

        let mut buff = Vec::with_capacity(1000);

        loop {
            buff.clear();
            let n = reader.read_until(b'\n', &mut buff)?;
            if n == 0 {
                break;
            }

            if line_count % interval == 0 {
                offsets.push(curr_offset);
            }

            curr_offset += n as u64;
            line_count += 1;

            if line_count % PROGRESS_LINES == 0 {
                trace!(lines = line_count, bytes = curr_offset, "indexing");
                if let Some(progress) = self.progress.as_mut() {
                    progress(curr_offset, total_size);
                }
            }
        }

        if let Some(progress) = self.progress.as_mut() {
            progress(curr_offset, total_size.max(curr_offset));
        }

        SparseIndex::new(line_count, offsets, interval)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    fn scan_str(s: &str, interval: usize) -> SparseIndex {
        IndexBuilder::default()
            .scan(s.as_bytes(), interval, s.len() as u64)
            .unwrap()
    }

    #[test]
    fn test_interval() {
        let config = BuilderConfig::default();
        assert_eq!(config.interval_for(1), 1);
        assert_eq!(config.interval_for(80 * 100_000), 1);
        assert_eq!(config.interval_for(80 * 100_000 * 2), 2);
        assert_eq!(config.interval_for(80 * 100_000 * 3 - 1), 2);
        assert_eq!(config.interval_for(10 * 1024 * 1024 * 1024), 1342);

        let config = config.avg_line_length(10).target_index_entries(10);
        assert_eq!(config.interval_for(1000), 10);

        let config = config.fixed_interval(7);
        assert_eq!(config.interval_for(1), 7);
    }

    #[test]
    fn test_scan() {
        let index = scan_str("alpha\nbeta\ngamma\ndelta\nepsilon\n", 2);
        assert_eq!(index.total_lines(), 5);
        assert_eq!(index.index_interval(), 2);
        assert_eq!(index.offsets(), &[0, 11, 23]);
    }

    #[test]
    fn test_scan_no_trailing_newline() {
        let index = scan_str("alpha\nbeta\ngamma", 1);
        assert_eq!(index.total_lines(), 3);
        assert_eq!(index.offsets(), &[0, 6, 11]);
    }

    #[test]
    fn test_scan_empty_lines() {
        let index = scan_str("\n\n\nx\n", 3);
        assert_eq!(index.total_lines(), 4);
        assert_eq!(index.offsets(), &[0, 3]);
    }

    #[test]
    fn test_scan_offsets_invariants() {
        let text: String = (0..1000).map(|i| format!("line number {}\n", i)).collect();
        for interval in &[1, 2, 3, 7, 64, 999, 1000, 5000] {
            let index = scan_str(&text, *interval);
            assert_eq!(index.total_lines(), 1000);
            assert_eq!(index.offsets()[0], 0);
            assert_eq!(index.checkpoints(), (1000 + interval - 1) / interval);
            assert!(index.offsets().windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_progress() {
        let text: String = (0..25_000).map(|i| format!("{}\n", i)).collect();
        let reports = Rc::new(RefCell::new(Vec::new()));

        let r = Rc::clone(&reports);
        let mut builder = IndexBuilder::default().on_progress(move |done, total| {
            r.borrow_mut().push((done, total));
        });

        builder.scan(text.as_bytes(), 1, text.len() as u64).unwrap();

        let reports = reports.borrow();
        assert_eq!(reports.len(), 3);
        assert_eq!(*reports.last().unwrap(), (text.len() as u64, text.len() as u64));
        assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty");
        let artifact = dir.path().join("empty.idx");
        fs::write(&source, b"").unwrap();

        let res = IndexBuilder::default().build(&source, &artifact);
        assert!(matches!(res, Err(Error::EmptySource(_))));
        assert!(!artifact.exists());
        assert!(!crate::index::tmp_path(&artifact).exists());
    }

    #[test]
    fn test_build_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let artifact = dir.path().join("source.idx");
        let text: String = (0..500).map(|i| format!("entry {}\n", i)).collect();
        fs::write(&source, &text).unwrap();

        let config = BuilderConfig::default().avg_line_length(4).target_index_entries(50);
        let first = IndexBuilder::new(config).build(&source, &artifact).unwrap();
        let first_bytes = fs::read(&artifact).unwrap();

        let second = IndexBuilder::new(config).build(&source, &artifact).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_bytes, fs::read(&artifact).unwrap());
        assert_eq!(first.total_lines(), 500);
    }
}
