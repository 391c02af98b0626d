//! Balanced 2-way external sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, RunSize};
use crate::generator::RunGenerator;
use crate::merger::BalancedMerger;
use crate::registry::RunRegistry;
use crate::run::{FileRunStore, RunHandle, RunStore, StorageError};

/// Sorting error.
#[derive(Debug)]
pub enum SortError<I: Error> {
    /// Invalid sorter configuration.
    Config(ConfigError),
    /// Run creation, write or read failure.
    Storage(StorageError),
    /// Input data stream error.
    Input(I),
    /// Output data stream error.
    Output(io::Error),
}

impl<I> Error for SortError<I>
where
    I: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::Config(err) => err,
            SortError::Storage(err) => err,
            SortError::Input(err) => err,
            SortError::Output(err) => err,
        })
    }
}

impl<I: Error> Display for SortError<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(err) => write!(f, "invalid configuration: {}", err),
            SortError::Storage(err) => write!(f, "run storage failure: {}", err),
            SortError::Input(err) => write!(f, "input data stream error: {}", err),
            SortError::Output(err) => write!(f, "output data stream error: {}", err),
        }
    }
}

impl<I: Error> From<ConfigError> for SortError<I> {
    fn from(err: ConfigError) -> Self {
        SortError::Config(err)
    }
}

impl<I: Error> From<StorageError> for SortError<I> {
    fn from(err: StorageError) -> Self {
        SortError::Storage(err)
    }
}

/// Sorting summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Number of runs created from the input.
    pub initial_runs: usize,
    /// Number of performed merge passes.
    pub merge_passes: usize,
    /// Number of lines written to the output.
    pub lines_written: usize,
}

/// Balanced sorter builder. Provides methods for [`BalancedSorter`] initialization.
#[derive(Clone, Default)]
pub struct BalancedSorterBuilder {
    /// Maximum number of lines per initial run.
    run_size: Option<usize>,
    /// Whether to merge the initial runs.
    merge: bool,
    /// Directory to be used to store runs.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl BalancedSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        BalancedSorterBuilder::default()
    }

    /// Builds a [`BalancedSorter`] instance using provided configuration.
    pub fn build(self) -> Result<BalancedSorter, ConfigError> {
        let run_size = match self.run_size {
            Some(run_size) => RunSize::new(run_size)?,
            None => return Err(ConfigError::MissingRunSize),
        };

        return Ok(BalancedSorter::new(
            run_size,
            self.merge,
            self.tmp_dir.as_deref(),
            self.rw_buf_size,
        ));
    }

    /// Sets maximum number of lines per initial run.
    pub fn with_run_size(mut self, run_size: usize) -> BalancedSorterBuilder {
        self.run_size = Some(run_size);
        return self;
    }

    /// Enables or disables merging of the initial runs.
    pub fn with_merge(mut self, merge: bool) -> BalancedSorterBuilder {
        self.merge = merge;
        return self;
    }

    /// Sets directory to be used to store runs.
    pub fn with_tmp_dir(mut self, path: &Path) -> BalancedSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> BalancedSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

/// Balanced 2-way external sorter of text lines.
pub struct BalancedSorter {
    /// Maximum number of lines per initial run.
    run_size: RunSize,
    /// Whether to merge the initial runs.
    merge: bool,
    /// Directory to be used to store runs.
    tmp_dir: PathBuf,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl BalancedSorter {
    /// Creates a new balanced sorter instance.
    ///
    /// # Arguments
    /// * `run_size` - Maximum number of lines per initial run.
    /// * `merge` - Whether to merge the initial runs. If disabled only the first initial run is emitted.
    /// * `tmp_path` - Directory to be used to store runs. If parameter is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Run files read/write buffer size.
    pub fn new(run_size: RunSize, merge: bool, tmp_path: Option<&Path>, rw_buf_size: Option<usize>) -> Self {
        let tmp_dir = match tmp_path {
            Some(tmp_path) => tmp_path.to_path_buf(),
            None => std::env::temp_dir(),
        };

        BalancedSorter {
            run_size,
            merge,
            tmp_dir,
            rw_buf_size,
        }
    }

    /// Sorts lines from the input writing the result to the output, one line per record.
    /// Runs are stored as files in the sorter temporary directory.
    ///
    /// # Arguments
    /// * `input` - Input stream lines to be fetched from
    /// * `output` - Output stream the result is written to
    pub fn sort<I, E, W>(&self, input: I, output: &mut W) -> Result<SortStats, SortError<E>>
    where
        I: IntoIterator<Item = Result<String, E>>,
        E: Error,
        W: Write,
    {
        let mut store = FileRunStore::new(&self.tmp_dir, self.rw_buf_size)?;
        self.sort_with_store(&mut store, input, output)
    }

    /// Sorts lines from the input using a custom run store.
    ///
    /// Every run created during the call is discarded before it returns,
    /// whether sorting succeeded or not.
    pub fn sort_with_store<S, I, E, W>(
        &self,
        store: &mut S,
        input: I,
        output: &mut W,
    ) -> Result<SortStats, SortError<E>>
    where
        S: RunStore,
        I: IntoIterator<Item = Result<String, E>>,
        E: Error,
        W: Write,
    {
        let mut registry = RunRegistry::new();
        let result = self.run_pipeline(store, &mut registry, input, output);
        registry.discard_all(store);

        return result;
    }

    fn run_pipeline<S, I, E, W>(
        &self,
        store: &mut S,
        registry: &mut RunRegistry,
        input: I,
        output: &mut W,
    ) -> Result<SortStats, SortError<E>>
    where
        S: RunStore,
        I: IntoIterator<Item = Result<String, E>>,
        E: Error,
        W: Write,
    {
        log::info!("creating initial runs (run size: {})", self.run_size.get());
        let runs = RunGenerator::new(&mut *store, &mut *registry, self.run_size).generate(input)?;
        log::info!("initial runs created: {}", runs.len());

        let mut stats = SortStats {
            initial_runs: runs.len(),
            ..SortStats::default()
        };

        let result = if self.merge {
            log::info!("starting balanced 2-way merge");
            let mut merger = BalancedMerger::new(&mut *store, &mut *registry);
            let sorted = merger.merge_all(runs)?;
            stats.merge_passes = merger.passes();
            log::info!("merging complete");
            sorted
        } else {
            if !runs.is_empty() {
                log::info!("no merging requested");
            }
            runs.into_iter().next()
        };

        if let Some(run) = result {
            stats.lines_written = Self::write_run::<_, E, _>(store, &run, output)?;
        }
        output.flush().map_err(SortError::Output)?;

        return Ok(stats);
    }

    fn write_run<S, E, W>(store: &S, run: &RunHandle, output: &mut W) -> Result<usize, SortError<E>>
    where
        S: RunStore,
        E: Error,
        W: Write,
    {
        let mut written = 0;
        for line in store.open_for_read(run)? {
            let line = line?;
            output
                .write_all(line.as_bytes())
                .and_then(|_| output.write_all(b"\n"))
                .map_err(SortError::Output)?;
            written += 1;
        }

        return Ok(written);
    }
}
