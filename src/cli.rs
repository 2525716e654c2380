//! Command line interface, built using [`crate::clap` with `Derive`](https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html)
use std::fmt;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

use crate::scoring::{DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN, DEFAULT_MATCH, DEFAULT_MISMATCH};

/// Default number of CPU threads
pub const DEFAULT_THREADS: usize = 1;

#[doc(hidden)]
fn valid_cpus(s: &str) -> Result<usize, String> {
    let threads: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a valid number of cores"))?;
    if threads < 1 {
        Err("Threads must be one or higher".to_string())
    } else {
        Ok(threads)
    }
}

#[doc(hidden)]
fn valid_length(s: &str) -> Result<usize, String> {
    let len: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a valid sequence length"))?;
    if len < 1 {
        Err("Random sequences must have at least one base".to_string())
    } else {
        Ok(len)
    }
}

#[doc(hidden)]
fn non_positive(s: &str) -> Result<i32, String> {
    let v: i32 = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a valid score"))?;
    if v > 0 {
        Err("Gap costs must be zero or negative".to_string())
    } else {
        Ok(v)
    }
}

/// Prints a warning if more threads than available have been requested
pub fn check_threads(threads: usize) {
    let max_threads = num_cpus::get();
    if threads > max_threads {
        log::warn!("{threads} threads is greater than available cores {max_threads}");
    }
}

/// Where the scan kernels run
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Backend {
    /// WGSL compute shaders on a GPU adapter
    Gpu,
    /// Rayon emulation of the same kernels on the CPU
    Host,
}

/// As text, for use in logging messages
impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Gpu => write!(f, "GPU (wgpu)"),
            Self::Host => write!(f, "host emulation"),
        }
    }
}

/// Options that apply to all subcommands
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[doc(hidden)]
    #[command(subcommand)]
    pub command: Commands,

    /// Show progress messages
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommands and their specific options
#[derive(Subcommand)]
pub enum Commands {
    #[command(group(
        ArgGroup::new("column_input")
            .required(true)
            .args(["column", "column_random"]),
    ))]
    #[command(group(
        ArgGroup::new("row_input")
            .required(true)
            .args(["row", "row_random"]),
    ))]
    /// Local alignment score matrix of two sequences
    Align {
        /// FASTA/FASTQ file with the column (longer) sequence; the first record is used
        #[arg(long, group = "column_input")]
        column: Option<String>,

        /// Generate a random column sequence of this length instead
        #[arg(long, value_parser = valid_length, group = "column_input")]
        column_random: Option<usize>,

        /// FASTA/FASTQ file with the row (shorter) sequence; the first record is used
        #[arg(long, group = "row_input")]
        row: Option<String>,

        /// Generate a random row sequence of this length instead
        #[arg(long, value_parser = valid_length, group = "row_input")]
        row_random: Option<usize>,

        /// Seed for random sequences (entropy if absent)
        #[arg(long)]
        seed: Option<u64>,

        /// Match score
        #[arg(long = "match", default_value_t = DEFAULT_MATCH, allow_negative_numbers = true)]
        match_score: i32,

        /// Mismatch score
        #[arg(long, default_value_t = DEFAULT_MISMATCH, allow_negative_numbers = true)]
        mismatch: i32,

        /// Gap opening score (zero or negative)
        #[arg(long, value_parser = non_positive, default_value_t = DEFAULT_GAP_OPEN, allow_negative_numbers = true)]
        gap_open: i32,

        /// Gap extension score per position (zero or negative)
        #[arg(long, value_parser = non_positive, default_value_t = DEFAULT_GAP_EXTEND, allow_negative_numbers = true)]
        gap_extend: i32,

        /// Number of CPU threads
        #[arg(long, value_parser = valid_cpus, default_value_t = DEFAULT_THREADS)]
        threads: usize,

        /// Device the scan kernels run on
        #[arg(long, value_enum, default_value_t = Backend::Gpu)]
        backend: Backend,

        /// WGSL file to use instead of the built-in scan kernels
        #[arg(long)]
        kernel: Option<String>,

        /// Write a JSON summary of the run to this file
        #[arg(long)]
        summary: Option<String>,

        /// Print the full score matrix as tab separated values
        #[arg(long, default_value_t = false)]
        print_matrix: bool,

        /// Write the matrix here instead of stdout
        #[arg(long, requires = "print_matrix")]
        matrix_out: Option<String>,

        /// Recompute the matrix sequentially on the CPU and fail on any difference
        #[arg(long, default_value_t = false)]
        verify: bool,
    },
    /// List the compute devices that can run the scan kernels
    Devices,
}

/// Function to parse command line args into [`Args`] struct
pub fn cli_args() -> Args {
    Args::parse()
}
