use std::io::{self, prelude::*};
use std::path;
use std::process;

use clap::ArgEnum;
use env_logger;
use log;

use xsort::{BalancedSorter, RunSize};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let run_size: RunSize = arg_parser.value_of_t_or_exit("run_size");
    let merge = arg_parser.is_present("ways");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let rw_buf_size: Option<usize> = arg_parser
        .is_present("rw_buf_size")
        .then(|| arg_parser.value_of_t_or_exit("rw_buf_size"));

    let sorter = BalancedSorter::new(run_size, merge, tmp_dir.map(path::Path::new), rw_buf_size);

    let input_stream = io::stdin();
    let output_stream = io::stdout();
    let mut output_stream = io::BufWriter::new(output_stream.lock());

    match sorter.sort(input_stream.lock().lines(), &mut output_stream) {
        Ok(stats) => log::info!(
            "sorting done (initial runs: {}, merge passes: {}, lines: {})",
            stats.initial_runs,
            stats.merge_passes,
            stats.lines_written
        ),
        Err(err) => {
            log::error!("error during sorting: {}", err);
            process::exit(1);
        }
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("xsort")
        .about("balanced 2-way external merge sort of stdin lines")
        .arg(
            clap::Arg::new("run_size")
                .help("maximum number of lines per initial sorted run (64 to 1024)")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<RunSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(err.to_string()),
                }),
        )
        .arg(
            clap::Arg::new("ways")
                .help("pass 2 to merge the initial runs, otherwise only the first run is written")
                .takes_value(true)
                .possible_values(["2"]),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary runs")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("run file read/write buffer size in bytes")
                .takes_value(true),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
