//! Balanced 2-way merger.

use std::error::Error;

use log;

use crate::registry::RunRegistry;
use crate::run::{RunHandle, RunKind, RunStore, StorageError};

/// Two-way merger implementation.
/// Merges two sorted inputs into a single sorted output keeping only the current front item
/// of each input in memory. Equal items are taken from the left input first.
///
/// Input errors are passed through as they are met. Iterating after an error resumes with
/// the remaining items, none of the already read items is lost.
pub struct TwoWayMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    left: C::IntoIter,
    right: C::IntoIter,
    left_front: Option<T>,
    right_front: Option<T>,
    left_exhausted: bool,
    right_exhausted: bool,
}

impl<T, E, C> TwoWayMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    /// Creates an instance of a two-way merger.
    /// Input items should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `left` - Input winning ties
    /// * `right` - Second input
    pub fn new(left: C, right: C) -> Self {
        TwoWayMerger {
            left: left.into_iter(),
            right: right.into_iter(),
            left_front: None,
            right_front: None,
            left_exhausted: false,
            right_exhausted: false,
        }
    }

    /// Pulls the next item of `source` into an empty `front`.
    fn refill(source: &mut C::IntoIter, front: &mut Option<T>, exhausted: &mut bool) -> Result<(), E> {
        if front.is_none() && !*exhausted {
            match source.next() {
                Some(Ok(item)) => *front = Some(item),
                Some(Err(err)) => return Err(err),
                None => *exhausted = true,
            }
        }

        return Ok(());
    }
}

impl<T, E, C> Iterator for TwoWayMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = Self::refill(&mut self.left, &mut self.left_front, &mut self.left_exhausted) {
            return Some(Err(err));
        }
        if let Err(err) = Self::refill(&mut self.right, &mut self.right_front, &mut self.right_exhausted) {
            return Some(Err(err));
        }

        let from_left = match (&self.left_front, &self.right_front) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(left), Some(right)) => left <= right,
        };

        let result = if from_left {
            self.left_front.take()
        } else {
            self.right_front.take()
        };

        return result.map(Ok);
    }
}

/// Merges runs two at a time, generation after generation, until a single run remains.
pub struct BalancedMerger<'a, S: RunStore> {
    store: &'a mut S,
    registry: &'a mut RunRegistry,
    passes: usize,
}

impl<'a, S: RunStore> BalancedMerger<'a, S> {
    /// Creates a balanced merger.
    ///
    /// # Arguments
    /// * `store` - Store the runs are read from and merged runs are created in
    /// * `registry` - Registry every created run is handed over to
    pub fn new(store: &'a mut S, registry: &'a mut RunRegistry) -> Self {
        BalancedMerger {
            store,
            registry,
            passes: 0,
        }
    }

    /// Returns number of merge passes performed so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Merges all the runs into a single sorted run.
    ///
    /// Returns [`None`] if there are no runs at all. A single run is returned as is.
    /// Consecutive runs are paired by position; an unpaired last run is merged with
    /// an empty run. Any storage error aborts the whole merge.
    pub fn merge_all(&mut self, runs: Vec<RunHandle>) -> Result<Option<RunHandle>, StorageError> {
        if runs.len() <= 1 {
            if runs.is_empty() {
                log::info!("no runs to merge");
            }
            return Ok(runs.into_iter().next());
        }

        let mut generation = runs;
        while generation.len() > 1 {
            let mut next_generation = Vec::with_capacity((generation.len() + 1) / 2);

            let mut pairs = generation.into_iter();
            while let Some(left) = pairs.next() {
                let right = match pairs.next() {
                    Some(right) => right,
                    None => {
                        let empty = self.store.create_empty_run()?;
                        self.registry.register(empty.clone());
                        empty
                    }
                };
                next_generation.push(self.merge(&left, &right)?);
            }

            generation = next_generation;
            self.passes += 1;
            log::info!("runs after merge pass {}: {}", self.passes, generation.len());
        }

        return Ok(generation.pop());
    }

    /// Streams two sorted runs into a new sorted run. Neither input is loaded in memory as a whole.
    pub fn merge(&mut self, left: &RunHandle, right: &RunHandle) -> Result<RunHandle, StorageError> {
        let output = self.store.create_run(RunKind::Merged)?;
        self.registry.register(output.clone());

        let left_reader = self.store.open_for_read(left)?;
        let right_reader = self.store.open_for_read(right)?;
        self.store
            .write_lines(&output, TwoWayMerger::new(left_reader, right_reader))?;

        log::debug!("merged {} and {} into {}", left, right, output);

        return Ok(output);
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use std::error::Error;
    use std::io::{self, ErrorKind};

    use rstest::*;

    use crate::registry::RunRegistry;
    use crate::run::mem::MemoryRunStore;
    use crate::run::{RunHandle, RunKind, RunStore};

    use super::{BalancedMerger, TwoWayMerger};

    #[rstest]
    #[case(vec![], vec![], vec![])]
    #[case(vec![Ok(1), Ok(2)], vec![], vec![Ok(1), Ok(2)])]
    #[case(vec![], vec![Ok(1), Ok(2)], vec![Ok(1), Ok(2)])]
    #[case(
        vec![Ok(1), Ok(4), Ok(5), Ok(7)],
        vec![Ok(2), Ok(3), Ok(6), Ok(8), Ok(9)],
        vec![Ok(1), Ok(2), Ok(3), Ok(4), Ok(5), Ok(6), Ok(7), Ok(8), Ok(9)],
    )]
    #[case(
        vec![Result::Err(io::Error::new(ErrorKind::Other, "test error"))],
        vec![Ok(1)],
        vec![Result::Err(io::Error::new(ErrorKind::Other, "test error")), Ok(1)],
    )]
    #[case(
        vec![Ok(1)],
        vec![Result::Err(io::Error::new(ErrorKind::Other, "test error")), Ok(2)],
        vec![Result::Err(io::Error::new(ErrorKind::Other, "test error")), Ok(1), Ok(2)],
    )]
    #[case(
        vec![Result::Err(io::Error::new(ErrorKind::Other, "left error"))],
        vec![Result::Err(io::Error::new(ErrorKind::Other, "right error"))],
        vec![
            Result::Err(io::Error::new(ErrorKind::Other, "left error")),
            Result::Err(io::Error::new(ErrorKind::Other, "right error")),
        ],
    )]
    #[case(
        vec![Ok(1), Ok(3), Result::Err(io::Error::new(ErrorKind::Other, "test error"))],
        vec![Ok(2), Ok(4)],
        vec![Ok(1), Ok(2), Ok(3), Result::Err(io::Error::new(ErrorKind::Other, "test error")), Ok(4)],
    )]
    fn test_two_way_merger(
        #[case] left: Vec<Result<i32, io::Error>>,
        #[case] right: Vec<Result<i32, io::Error>>,
        #[case] expected_result: Vec<Result<i32, io::Error>>,
    ) {
        let merger = TwoWayMerger::new(left, right);
        let actual_result = merger.collect();
        assert!(
            compare_vectors_of_result::<_, io::Error>(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    #[test]
    fn test_two_way_merger_ties_prefer_left() {
        #[derive(Debug, PartialEq, Eq)]
        struct Tagged(u8, &'static str);

        impl PartialOrd for Tagged {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for Tagged {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0)
            }
        }

        let left: Vec<Result<Tagged, io::Error>> = vec![Ok(Tagged(1, "left")), Ok(Tagged(2, "left"))];
        let right: Vec<Result<Tagged, io::Error>> = vec![Ok(Tagged(1, "right")), Ok(Tagged(2, "right"))];

        let merged: Vec<_> = TwoWayMerger::new(left, right).map(Result::unwrap).collect();
        let sources = Vec::from_iter(merged.iter().map(|item| item.1));
        assert_eq!(sources, vec!["left", "right", "left", "right"]);
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual.len() == expected.len()
            && actual
                .into_iter()
                .zip(expected)
                .all(
                    |(actual_result, expected_result)| match (actual_result, expected_result) {
                        (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                        (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                        _ => false,
                    },
                )
    }

    fn make_run(store: &mut MemoryRunStore, lines: &[&str]) -> RunHandle {
        let run = store.create_run(RunKind::Initial).unwrap();
        store.write_lines(&run, lines.iter().map(Ok)).unwrap();
        run
    }

    fn read_run(store: &MemoryRunStore, run: &RunHandle) -> Vec<String> {
        store.open_for_read(run).unwrap().map(Result::unwrap).collect()
    }

    #[test]
    fn test_merge_all_no_runs() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();
        let mut merger = BalancedMerger::new(&mut store, &mut registry);

        assert_eq!(merger.merge_all(Vec::new()).unwrap(), None);
        assert_eq!(merger.passes(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_merge_all_single_run() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();
        let run = make_run(&mut store, &["a", "b"]);

        let mut merger = BalancedMerger::new(&mut store, &mut registry);
        assert_eq!(merger.merge_all(vec![run.clone()]).unwrap(), Some(run));
        assert_eq!(merger.passes(), 0);
        assert!(registry.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[case(2, 1, 1)]
    #[case(3, 2, 4)]
    #[case(4, 2, 3)]
    #[case(5, 3, 8)]
    fn test_merge_all(#[case] run_count: usize, #[case] expected_passes: usize, #[case] expected_created: usize) {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();

        let mut expected = Vec::new();
        let mut runs = Vec::new();
        for i in 0..run_count {
            let lines = Vec::from_iter((0..3).map(|j| format!("{}-{}", j, i)));
            expected.extend(lines.iter().cloned());
            runs.push(make_run(&mut store, &Vec::from_iter(lines.iter().map(String::as_str))));
        }
        expected.sort();

        let mut merger = BalancedMerger::new(&mut store, &mut registry);
        let sorted = merger.merge_all(runs).unwrap().unwrap();
        assert_eq!(merger.passes(), expected_passes);

        assert_eq!(read_run(&store, &sorted), expected);
        assert_eq!(registry.len(), expected_created);
        assert_eq!(store.len(), run_count + expected_created);

        registry.discard_all(&mut store);
        assert_eq!(store.len(), run_count);
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();
        let left = make_run(&mut store, &["a", "b", "b", "d"]);
        let right = make_run(&mut store, &["b", "c", "d", "d"]);

        let merged = BalancedMerger::new(&mut store, &mut registry).merge(&left, &right).unwrap();

        assert_eq!(read_run(&store, &merged), vec!["a", "b", "b", "b", "c", "d", "d", "d"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_merge_unknown_run() {
        let mut store = MemoryRunStore::new();
        let mut registry = RunRegistry::new();
        let left = make_run(&mut store, &["a"]);
        let right = make_run(&mut store, &["b"]);
        store.discard(&right);

        let result = BalancedMerger::new(&mut store, &mut registry).merge_all(vec![left, right]);

        assert!(result.is_err());
        // the output run was registered before the failure
        assert_eq!(registry.len(), 1);
    }
}
