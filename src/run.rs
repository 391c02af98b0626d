//! Sorted runs storage.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;
use tempfile;

/// Default run file read/write buffer size.
pub const DEFAULT_RW_BUF_SIZE: usize = 8192;

/// Opaque run identifier issued by a [`RunStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunHandle {
    id: u64,
    name: String,
}

impl RunHandle {
    pub(crate) fn new(id: u64, name: String) -> Self {
        RunHandle { id, name }
    }

    /// Returns store-unique run identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns human readable run name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Origin of a run. Only affects run naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Run produced from a sorted input buffer.
    Initial,
    /// Run produced by merging two runs.
    Merged,
    /// Zero-line run paired with an unpaired run.
    Empty,
}

impl RunKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RunKind::Initial => "run",
            RunKind::Merged => "merge",
            RunKind::Empty => "empty",
        }
    }
}

/// Run storage error.
#[derive(Debug)]
pub enum StorageError {
    /// Storage location does not exist or is not writable.
    Unwritable(PathBuf),
    /// Run could not be allocated.
    Create(io::Error),
    /// Writing to a run failed.
    Write(RunHandle, io::Error),
    /// Reading from a run failed.
    Read(RunHandle, io::Error),
    /// Run is not known to the store.
    UnknownRun(RunHandle),
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            StorageError::Create(err) => Some(err),
            StorageError::Write(_, err) => Some(err),
            StorageError::Read(_, err) => Some(err),
            StorageError::Unwritable(_) | StorageError::UnknownRun(_) => None,
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            StorageError::Unwritable(path) => write!(f, "cannot write in temporary directory {}", path.display()),
            StorageError::Create(err) => write!(f, "run not created: {}", err),
            StorageError::Write(run, err) => write!(f, "run {} write failed: {}", run, err),
            StorageError::Read(run, err) => write!(f, "run {} read failed: {}", run, err),
            StorageError::UnknownRun(run) => write!(f, "run {} does not exist", run),
        }
    }
}

/// Storage of sorted runs. Runs are written once with their complete content and read
/// sequentially any number of times afterwards.
pub trait RunStore {
    /// Sequential run reader.
    type Reader: Iterator<Item = Result<String, StorageError>>;

    /// Allocates a new uniquely named run holding zero lines.
    fn create_run(&mut self, kind: RunKind) -> Result<RunHandle, StorageError>;

    /// Writes lines to the run in the given order, one line per record.
    ///
    /// Stops at the first erroneous item and returns its error.
    fn write_lines<I, L>(&mut self, run: &RunHandle, lines: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = Result<L, StorageError>>,
        L: AsRef<str>;

    /// Opens a forward-only reader producing run lines in storage order.
    fn open_for_read(&self, run: &RunHandle) -> Result<Self::Reader, StorageError>;

    /// Deletes the run. Failures are logged and never propagated.
    fn discard(&mut self, run: &RunHandle);

    /// Creates a zero-line run used as a merge partner for an unpaired run.
    fn create_empty_run(&mut self) -> Result<RunHandle, StorageError> {
        self.create_run(RunKind::Empty)
    }
}

/// Run store keeping every run in a separate file of a directory.
pub struct FileRunStore {
    /// Directory the run files are created in.
    dir: PathBuf,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Next run identifier.
    next_id: u64,
}

impl FileRunStore {
    /// Creates a new file run store.
    ///
    /// # Arguments
    /// * `dir` - Directory run files are created in. It must exist and be writable.
    /// * `rw_buf_size` - Run file read/write buffer size. If the parameter is [`None`]
    ///   [`DEFAULT_RW_BUF_SIZE`] is used.
    pub fn new(dir: &Path, rw_buf_size: Option<usize>) -> Result<Self, StorageError> {
        // an anonymous file proves actual write access for this process
        let writable = match fs::metadata(dir) {
            Ok(metadata) => metadata.is_dir() && tempfile::tempfile_in(dir).is_ok(),
            Err(_) => false,
        };
        if !writable {
            return Err(StorageError::Unwritable(dir.to_path_buf()));
        }

        log::info!("using {} as a temporary directory", dir.display());

        return Ok(FileRunStore {
            dir: dir.to_path_buf(),
            rw_buf_size,
            next_id: 0,
        });
    }

    /// Returns the directory run files are created in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_path(&self, run: &RunHandle) -> PathBuf {
        self.dir.join(run.name())
    }

    fn buf_size(&self) -> usize {
        self.rw_buf_size.unwrap_or(DEFAULT_RW_BUF_SIZE)
    }
}

impl RunStore for FileRunStore {
    type Reader = FileRunReader;

    fn create_run(&mut self, kind: RunKind) -> Result<RunHandle, StorageError> {
        let id = self.next_id;
        self.next_id += 1;

        let prefix = format!("{}{}-", kind.prefix(), id);
        let tmp_file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(StorageError::Create)?;
        // the file outlives this call, its deletion is driven by `discard`
        let (_, path) = tmp_file.keep().map_err(|err| StorageError::Create(err.error))?;

        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return Err(StorageError::Create(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("temporary file {} has no name", path.display()),
                )))
            }
        };

        log::debug!("created temporary file {}", name);

        return Ok(RunHandle::new(id, name));
    }

    fn write_lines<I, L>(&mut self, run: &RunHandle, lines: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = Result<L, StorageError>>,
        L: AsRef<str>,
    {
        let file = fs::OpenOptions::new()
            .append(true)
            .open(self.run_path(run))
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => StorageError::UnknownRun(run.clone()),
                _ => StorageError::Write(run.clone(), err),
            })?;

        let mut run_writer = io::BufWriter::with_capacity(self.buf_size(), file);
        for line in lines.into_iter() {
            let line = line?;
            run_writer
                .write_all(line.as_ref().as_bytes())
                .and_then(|_| run_writer.write_all(b"\n"))
                .map_err(|err| StorageError::Write(run.clone(), err))?;
        }
        run_writer.flush().map_err(|err| StorageError::Write(run.clone(), err))?;

        log::debug!("wrote data: {}", run);

        return Ok(());
    }

    fn open_for_read(&self, run: &RunHandle) -> Result<Self::Reader, StorageError> {
        let file = fs::File::open(self.run_path(run)).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StorageError::UnknownRun(run.clone()),
            _ => StorageError::Read(run.clone(), err),
        })?;

        let run_reader = io::BufReader::with_capacity(self.buf_size(), file);

        return Ok(FileRunReader {
            run: run.clone(),
            lines: run_reader.split(b'\n'),
        });
    }

    fn discard(&mut self, run: &RunHandle) {
        match fs::remove_file(self.run_path(run)) {
            Ok(()) => log::debug!("deleted file: {}", run),
            Err(err) if err.kind() == io::ErrorKind::NotFound => log::debug!("file already deleted: {}", run),
            Err(err) => log::warn!("failed to delete file {}: {}", run, err),
        }
    }
}

/// Sequential line reader over a run file.
/// Lines are split on `\n` only, so every line reads back exactly as it was written.
pub struct FileRunReader {
    run: RunHandle,
    lines: io::Split<io::BufReader<fs::File>>,
}

impl Iterator for FileRunReader {
    type Item = Result<String, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?.and_then(|bytes| {
            String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
        });

        match line {
            Ok(line) => Some(Ok(line)),
            Err(err) => Some(Err(StorageError::Read(self.run.clone(), err))),
        }
    }
}

/// In-memory run store.
pub mod mem {
    use std::collections::HashMap;
    use std::rc::Rc;

    use log;

    use super::{RunHandle, RunKind, RunStore, StorageError};

    /// Run store keeping every run in memory. Useful for exercising run processing
    /// without touching the file system.
    #[derive(Default)]
    pub struct MemoryRunStore {
        runs: HashMap<u64, Rc<[String]>>,
        next_id: u64,
    }

    impl MemoryRunStore {
        pub fn new() -> Self {
            MemoryRunStore::default()
        }

        /// Returns number of runs currently stored.
        pub fn len(&self) -> usize {
            self.runs.len()
        }

        pub fn is_empty(&self) -> bool {
            self.runs.is_empty()
        }

        /// Checks if the run is still stored.
        pub fn contains(&self, run: &RunHandle) -> bool {
            self.runs.contains_key(&run.id())
        }
    }

    impl RunStore for MemoryRunStore {
        type Reader = MemoryRunReader;

        fn create_run(&mut self, kind: RunKind) -> Result<RunHandle, StorageError> {
            let id = self.next_id;
            self.next_id += 1;

            self.runs.insert(id, Rc::from(Vec::new()));
            let run = RunHandle::new(id, format!("{}{}-mem", kind.prefix(), id));
            log::debug!("created memory run {}", run);

            return Ok(run);
        }

        fn write_lines<I, L>(&mut self, run: &RunHandle, lines: I) -> Result<(), StorageError>
        where
            I: IntoIterator<Item = Result<L, StorageError>>,
            L: AsRef<str>,
        {
            if !self.contains(run) {
                return Err(StorageError::UnknownRun(run.clone()));
            }

            let mut content: Vec<String> = self.runs[&run.id()].to_vec();
            for line in lines.into_iter() {
                content.push(line?.as_ref().to_string());
            }
            self.runs.insert(run.id(), Rc::from(content));

            return Ok(());
        }

        fn open_for_read(&self, run: &RunHandle) -> Result<Self::Reader, StorageError> {
            match self.runs.get(&run.id()) {
                Some(lines) => Ok(MemoryRunReader {
                    lines: Rc::clone(lines),
                    pos: 0,
                }),
                None => Err(StorageError::UnknownRun(run.clone())),
            }
        }

        fn discard(&mut self, run: &RunHandle) {
            if self.runs.remove(&run.id()).is_none() {
                log::debug!("memory run already deleted: {}", run);
            }
        }
    }

    /// Sequential line reader over an in-memory run.
    pub struct MemoryRunReader {
        lines: Rc<[String]>,
        pos: usize,
    }

    impl Iterator for MemoryRunReader {
        type Item = Result<String, StorageError>;

        fn next(&mut self) -> Option<Self::Item> {
            let line = self.lines.get(self.pos)?.clone();
            self.pos += 1;
            Some(Ok(line))
        }
    }

}
