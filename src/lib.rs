//! `xsort` is a balanced 2-way external merge sort of line-oriented text.
//!
//! External sorting handles data that does not fit comfortably into the main memory. Sorting is achieved
//! in two phases. During the first phase the input is split into chunks of at most `run size` lines, each
//! chunk is heap sorted in memory and saved to a temporary file as a *run*. During the second phase the runs
//! are merged two at a time into twice as long runs, pass after pass, until a single sorted run remains.
//! An unpaired run is merged with an empty run, so every merge step is a true two-way merge.
//! For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! Lines are ordered lexicographically by code point. Every temporary run is deleted when sorting finishes,
//! whether it succeeded or not.
//!
//! # Example
//!
//! ```no_run
//! use std::io::{self, prelude::*};
//! use std::path;
//!
//! use xsort::BalancedSorterBuilder;
//!
//! fn main() {
//!     let sorter = BalancedSorterBuilder::new()
//!         .with_run_size(64)
//!         .with_merge(true)
//!         .with_tmp_dir(path::Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let mut output = io::BufWriter::new(io::stdout().lock());
//!     sorter.sort(io::stdin().lock().lines(), &mut output).unwrap();
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod generator;
pub mod heap;
pub mod merger;
pub mod registry;
pub mod run;
pub mod sort;

pub use buffer::LimitedBuffer;
pub use config::{ConfigError, RunSize, MAX_RUN_SIZE, MIN_RUN_SIZE};
pub use generator::RunGenerator;
pub use heap::{heap_sort, heap_sort_by};
pub use merger::{BalancedMerger, TwoWayMerger};
pub use registry::RunRegistry;
pub use run::{FileRunStore, RunHandle, RunKind, RunStore, StorageError};
pub use sort::{BalancedSorter, BalancedSorterBuilder, SortError, SortStats};
