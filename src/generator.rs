//! Initial runs generator.

use std::error::Error;

use log;

use crate::buffer::LimitedBuffer;
use crate::config::RunSize;
use crate::registry::RunRegistry;
use crate::run::{RunHandle, RunKind, RunStore, StorageError};
use crate::sort::SortError;

/// Splits an input line stream into sorted runs of at most `run_size` lines.
pub struct RunGenerator<'a, S: RunStore> {
    store: &'a mut S,
    registry: &'a mut RunRegistry,
    run_size: RunSize,
}

impl<'a, S: RunStore> RunGenerator<'a, S> {
    /// Creates a run generator.
    ///
    /// # Arguments
    /// * `store` - Store the runs are created in
    /// * `registry` - Registry every created run is handed over to
    /// * `run_size` - Maximum number of lines per run
    pub fn new(store: &'a mut S, registry: &'a mut RunRegistry, run_size: RunSize) -> Self {
        RunGenerator {
            store,
            registry,
            run_size,
        }
    }

    /// Reads the input to exhaustion and returns the created runs in creation order.
    /// Empty input produces no runs.
    ///
    /// # Arguments
    /// * `input` - Input stream lines to be fetched from
    pub fn generate<I, E>(&mut self, input: I) -> Result<Vec<RunHandle>, SortError<E>>
    where
        I: IntoIterator<Item = Result<String, E>>,
        E: Error,
    {
        let mut buffer = LimitedBuffer::with_capacity(self.run_size.get());
        let mut runs = Vec::new();

        for line in input.into_iter() {
            match line {
                Ok(line) => buffer.push(line),
                Err(err) => return Err(SortError::Input(err)),
            }

            if buffer.is_full() {
                runs.push(self.flush(&mut buffer)?);
            }
        }

        if !buffer.is_empty() {
            runs.push(self.flush(&mut buffer)?);
        }

        return Ok(runs);
    }

    fn flush(&mut self, buffer: &mut LimitedBuffer<String>) -> Result<RunHandle, StorageError> {
        log::debug!("sorting run data ({} lines) ...", buffer.len());
        buffer.sort();

        let run = self.store.create_run(RunKind::Initial)?;
        self.registry.register(run.clone());
        self.store.write_lines(&run, buffer.iter().map(Ok))?;
        buffer.clear();

        return Ok(run);
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use rstest::*;

    use crate::config::RunSize;
    use crate::registry::RunRegistry;
    use crate::run::mem::MemoryRunStore;
    use crate::run::{RunHandle, RunStore};
    use crate::sort::SortError;

    use super::RunGenerator;

    fn read_run(store: &MemoryRunStore, run: &RunHandle) -> Vec<String> {
        store.open_for_read(run).unwrap().map(Result::unwrap).collect()
    }

    fn lines(count: usize) -> Vec<Result<String, io::Error>> {
        Vec::from_iter((0..count).rev().map(|i| Ok(format!("{:05}", i))))
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(63, 1)]
    #[case(64, 1)]
    #[case(65, 2)]
    #[case(192, 3)]
    #[case(200, 4)]
    fn test_generate_run_count(#[case] input_len: usize, #[case] expected_runs: usize) {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();

        let runs = RunGenerator::new(&mut store, &mut registry, RunSize::new(64).unwrap())
            .generate(lines(input_len))
            .unwrap();

        assert_eq!(runs.len(), expected_runs);
        assert_eq!(registry.len(), expected_runs);
        assert_eq!(store.len(), expected_runs);

        let total: usize = runs.iter().map(|run| read_run(&store, run).len()).sum();
        assert_eq!(total, input_len);
    }

    #[test]
    fn test_generate_sorts_each_run() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();

        let runs = RunGenerator::new(&mut store, &mut registry, RunSize::new(64).unwrap())
            .generate(lines(100))
            .unwrap();

        // input is descending so the first run holds the largest lines
        let first = read_run(&store, &runs[0]);
        assert_eq!(first, Vec::from_iter((36..100).map(|i| format!("{:05}", i))));

        let second = read_run(&store, &runs[1]);
        assert_eq!(second, Vec::from_iter((0..36).map(|i| format!("{:05}", i))));
    }

    #[test]
    fn test_generate_input_error() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();

        let mut input = lines(70);
        input.push(Err(io::Error::new(io::ErrorKind::Other, "test error")));

        let result = RunGenerator::new(&mut store, &mut registry, RunSize::new(64).unwrap()).generate(input);

        assert!(matches!(result, Err(SortError::Input(err)) if err.to_string() == "test error"));
        // the run flushed before the failure is still owned by the registry
        assert_eq!(registry.len(), 1);
    }
}
