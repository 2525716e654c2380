//! Smith-Waterman local alignment with affine gaps, where the horizontal gap
//! recurrence of every matrix row runs as a parallel max-decay prefix scan on
//! a compute device.
#![warn(missing_docs)]
use std::path::Path;

extern crate num_cpus;

/// Error type shared by every stage
pub mod error;

/// Declarations and definitions to encode nucleotides in two bits
pub mod bit_encoding;

/// Named nucleotide sequences, parsed or random
pub mod sequence;

/// Match/mismatch and affine gap parameters
pub mod scoring;

/// Power-of-two padding of device buffers
pub mod padding;

/// Per-row working buffers with storage exchange
pub mod row_buffer;

/// Contiguous storage of the score matrix
pub mod score_matrix;

/// Buffer and kernel dispatch boundary, with wgpu and host implementations
pub mod device;

/// Max-decay prefix scan over a device buffer
pub mod scan;

/// The row recurrence that feeds the scan
pub mod recurrence;

/// Outer row loop, timing and best cell
pub mod driver;

/// Sequential reference aligner used for verification
pub mod reference;

/// Contains functions to store the output of the program
pub mod save_functions;

pub mod cli;

pub mod io_utils;

use crate::cli::*;
use crate::device::host::HostDevice;
use crate::device::ScanDevice;
use crate::driver::{Alignment, AlignmentDriver};
use crate::error::{Error, Result};
use crate::io_utils::*;
use crate::reference::{reference_matrix, verify, MAX_VERIFY_CELLS};
use crate::scoring::ScoringParams;
use crate::sequence::Sequence;

/// Everything the `align` subcommand needs, resolved from the command line.
pub struct AlignOpts<'a> {
    /// Scoring parameters
    pub scoring:      ScoringParams,
    /// Requested device
    pub backend:      Backend,
    /// Alternative kernel source
    pub kernel:       Option<&'a Path>,
    /// Draw a progress bar over rows
    pub progress:     bool,
    /// Recompute with the reference aligner
    pub verify:       bool,
}

fn run_on<D: ScanDevice>(device: D, rows: &Sequence, columns: &Sequence, opts: &AlignOpts) -> Result<Alignment> {
    AlignmentDriver::new(device, rows, columns, opts.scoring)?.run(opts.progress)
}

/// Align `rows` against `columns` on the requested device.
pub fn align(rows: &Sequence, columns: &Sequence, opts: &AlignOpts) -> Result<Alignment> {
    let aln = match opts.backend {
        #[cfg(feature = "gpu")]
        Backend::Gpu => {
            let source = device::load_kernel_source(opts.kernel)?;
            let gpu = device::wgpu_backend::WgpuDevice::new(&source)?;
            run_on(gpu, rows, columns, opts)?
        }
        #[cfg(not(feature = "gpu"))]
        Backend::Gpu => {
            return Err(Error::NoDevice("built without the `gpu` feature; use --backend host".to_owned()));
        }
        Backend::Host => {
            if opts.kernel.is_some() {
                log::warn!("--kernel has no effect on the host backend");
            }
            run_on(HostDevice::new(), rows, columns, opts)?
        }
    };

    if opts.verify {
        let cells = aln.matrix.num_rows() * aln.matrix.num_cols();
        if cells > MAX_VERIFY_CELLS {
            return Err(Error::InvalidUsage(format!(
                "--verify is limited to {MAX_VERIFY_CELLS} cells, this matrix has {cells}"
            )));
        }
        log::info!("Verifying against the sequential reference");
        let expected = reference_matrix(rows.codes(), columns.codes(), &opts.scoring);
        verify(&expected, &aln.matrix)?;
        log::info!("Verification passed");
    }
    Ok(aln)
}

/// Run one parsed command line.
pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Align {
            column,
            column_random,
            row,
            row_random,
            seed,
            match_score,
            mismatch,
            gap_open,
            gap_extend,
            threads,
            backend,
            kernel,
            summary,
            print_matrix,
            matrix_out,
            verify,
        } => {
            check_threads(*threads);

            log::info!("Checking requested threads and creating pool if needed");
            rayon::ThreadPoolBuilder::new()
                .num_threads(*threads)
                .build_global()?;

            let scoring = ScoringParams {
                match_score: *match_score,
                mismatch:    *mismatch,
                gap_open:    *gap_open,
                gap_extend:  *gap_extend,
            }
            .validate()?;

            let mut rng = make_rng(*seed);
            let mut columns = load_or_generate("column", column, *column_random, &mut rng)?;
            let mut rows = load_or_generate("row", row, *row_random, &mut rng)?;
            if rows.len() > columns.len() {
                log::info!("Row sequence is the longer one; swapping so rows follow {}", columns);
                std::mem::swap(&mut rows, &mut columns);
            }

            log::info!("Beginning alignment on {}", backend);
            let opts = AlignOpts {
                scoring,
                backend:  *backend,
                kernel:   kernel.as_deref().map(Path::new),
                progress: args.verbose,
                verify:   *verify,
            };
            let aln = align(&rows, &columns, &opts)?;

            println!(
                "best score {} at row {} col {}; {} rows x {} cols in {} ms on {}",
                aln.best.score,
                aln.best.row,
                aln.best.col,
                rows.len(),
                columns.len(),
                aln.elapsed.as_millis(),
                aln.device.name,
            );

            if let Some(path) = summary {
                save_functions::save_summary(&aln, &scoring, path)?;
            }
            if *print_matrix {
                save_functions::save_matrix(&aln, matrix_out)?;
            }
        }
        Commands::Devices => {
            println!("host\t{}", HostDevice::new().info());
            #[cfg(feature = "gpu")]
            for info in device::wgpu_backend::list_adapters()? {
                println!("gpu\t{info}");
            }
        }
    }
    Ok(())
}

#[doc(hidden)]
pub fn main() {
    let args = cli_args();
    let level = if args.verbose {
        log::Level::Info
    } else {
        log::Level::Warn
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("swscan: {}", Error::from(e));
        std::process::exit(1);
    }

    log::info!("Starting program!");
    if let Err(e) = run(&args) {
        log::error!("{e}");
        eprintln!("swscan: {e}");
        std::process::exit(1);
    }
    log::info!("Finishing program!");
}
