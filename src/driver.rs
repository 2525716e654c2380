//! The outer row loop of an alignment.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::device::{DeviceInfo, ScanDevice};
use crate::error::{Error, Result};
use crate::recurrence::RowStage;
use crate::row_buffer::RowBuffers;
use crate::scan::ScanEngine;
use crate::score_matrix::{BestHit, ScoreMatrix};
use crate::scoring::ScoringParams;
use crate::sequence::Sequence;

/// Everything a finished run reports.
#[derive(Debug)]
pub struct Alignment {
    /// Final `H` matrix
    pub matrix:     ScoreMatrix,
    /// Highest scoring cell
    pub best:       BestHit,
    /// Wall time of the row loop
    pub elapsed:    Duration,
    /// Device buffer length used by the scans
    pub padded_len: usize,
    /// Rounds per sweep
    pub rounds:     u32,
    /// Device the scans ran on
    pub device:     DeviceInfo,
}

/// Owns the matrix, row buffers and scan engine for one pair of sequences.
///
/// Rows follow the row sequence (the shorter one in normal use), columns the
/// column sequence, so each device scan covers `columns + 1` elements.
pub struct AlignmentDriver<'a, D: ScanDevice> {
    rows:    &'a Sequence,
    columns: &'a Sequence,
    scoring: ScoringParams,
    matrix:  ScoreMatrix,
    bufs:    RowBuffers,
    scan:    ScanEngine<D>,
}

impl<'a, D: ScanDevice> AlignmentDriver<'a, D> {
    /// Validate the scoring and size every buffer for the pair.
    pub fn new(device: D, rows: &'a Sequence, columns: &'a Sequence, scoring: ScoringParams) -> Result<Self> {
        let scoring = scoring.validate()?;
        // a local score never exceeds one match per base of the shorter sequence
        let ceiling = scoring.match_score.max(0) as i64 * rows.len().min(columns.len()) as i64;
        if ceiling > i32::MAX as i64 {
            return Err(Error::InvalidScoring(format!(
                "match score {} over {} bases can reach {ceiling}, beyond the 32-bit score range",
                scoring.match_score,
                rows.len().min(columns.len()),
            )));
        }
        let width = columns.len() + 1;
        log::info!("Aligning rows {} against columns {}", rows, columns);
        log::info!("Scoring: {}", scoring);
        let scan = ScanEngine::new(device, width)?;
        Ok(Self {
            rows,
            columns,
            scoring,
            matrix: ScoreMatrix::new(rows.len() + 1, width),
            bufs: RowBuffers::new(width),
            scan,
        })
    }

    /// Fill the matrix row by row, stopping at the first device error.
    pub fn run(mut self, progress: bool) -> Result<Alignment> {
        let stage = RowStage::new(self.rows.codes(), self.columns.codes(), self.scoring);
        let bar = if progress {
            let bar = ProgressBar::new(self.rows.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        for r in 1..=self.rows.len() {
            let (prev_h, h_cur) = self.matrix.prev_and_current(r);
            stage.process(r, prev_h, h_cur, &mut self.bufs, &mut self.scan)?;
            bar.inc(1);
        }
        let elapsed = start.elapsed();
        bar.finish_and_clear();

        let best = self.matrix.best();
        log::info!(
            "Row loop done in {} ms; best score {} at ({}, {})",
            elapsed.as_millis(), best.score, best.row, best.col,
        );

        Ok(Alignment {
            best,
            elapsed,
            padded_len: self.scan.padded_len(),
            rounds: self.scan.rounds(),
            device: self.scan.device().info().clone(),
            matrix: self.matrix,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::host::HostDevice;
    use crate::reference::{reference_matrix, verify};

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn align(rows: &[u8], cols: &[u8], scoring: ScoringParams) -> Alignment {
        let rows = Sequence::from_ascii("rows", rows).unwrap();
        let cols = Sequence::from_ascii("cols", cols).unwrap();
        AlignmentDriver::new(HostDevice::new(), &rows, &cols, scoring)
            .unwrap()
            .run(false)
            .unwrap()
    }

    #[test]
    fn test_single_match() {
        let out = align(b"A", b"A", ScoringParams::default());
        assert_eq!(out.matrix.get(1, 1), 5);
        assert_eq!(out.best, BestHit { score: 5, row: 1, col: 1 });
        assert_eq!(out.padded_len, 2);
        assert_eq!(out.rounds, 1);
    }

    #[test]
    fn test_single_mismatch() {
        let out = align(b"A", b"C", ScoringParams::default());
        assert_eq!(out.matrix.get(1, 1), 0);
        assert_eq!(out.best, BestHit::default());
    }

    #[test]
    fn test_boundaries_stay_zero() {
        let out = align(b"GATTACA", b"CATTAGATTACATT", ScoringParams::default());
        let m = &out.matrix;
        assert!(m.row(0).iter().all(|&v| v == 0));
        assert!((0..m.num_rows()).all(|r| m.get(r, 0) == 0));
        assert!(m.min_value() >= 0);
        assert_eq!(out.best.score, 35);
    }

    #[test]
    fn test_matches_reference_with_gaps() {
        let rows = b"ACGTACGTTGCA";
        let cols = b"TTACGTTTACGTTGCAGG";
        let scoring = ScoringParams { gap_open: -2, gap_extend: -1, ..Default::default() };
        let out = align(rows, cols, scoring);
        let expected = reference_matrix(
            Sequence::from_ascii("r", rows).unwrap().codes(),
            Sequence::from_ascii("c", cols).unwrap().codes(),
            &scoring,
        );
        verify(&expected, &out.matrix).unwrap();
    }

    #[test]
    fn test_empty_row_sequence() {
        let out = align(b"", b"ACGT", ScoringParams::default());
        assert_eq!(out.matrix.num_rows(), 1);
        assert_eq!(out.best, BestHit::default());
    }

    #[test]
    fn test_rejects_positive_gap() {
        let rows = Sequence::from_ascii("r", b"A").unwrap();
        let scoring = ScoringParams { gap_extend: 1, ..Default::default() };
        let res = AlignmentDriver::new(HostDevice::new(), &rows, &rows, scoring);
        assert!(matches!(res, Err(Error::InvalidScoring(_))));
    }

    #[test]
    fn test_rejects_scores_beyond_i32() {
        let long = Sequence::from_ascii("a", &[b'A'; 2100]).unwrap();
        let scoring = ScoringParams { match_score: 1 << 20, ..Default::default() };
        let res = AlignmentDriver::new(HostDevice::new(), &long, &long, scoring);
        assert!(matches!(res, Err(Error::InvalidScoring(_))));

        // the same score fits when one sequence is short enough
        let short = Sequence::from_ascii("b", &[b'A'; 2047]).unwrap();
        let out = AlignmentDriver::new(HostDevice::new(), &short, &long, scoring)
            .unwrap()
            .run(false)
            .unwrap();
        assert_eq!(out.best.score, 2047 << 20);
    }

    fn bases(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..=max_len)
    }

    proptest! {
        #[test]
        fn prop_matches_reference(
            rows in bases(20),
            cols in bases(20),
            match_score in 1i32..=10,
            mismatch in -10i32..=0,
            gap_open in -12i32..=0,
            gap_extend in -6i32..=0,
        ) {
            let scoring = ScoringParams { match_score, mismatch, gap_open, gap_extend };
            let out = align(&rows, &cols, scoring);
            let expected = reference_matrix(
                Sequence::from_ascii("r", &rows).unwrap().codes(),
                Sequence::from_ascii("c", &cols).unwrap().codes(),
                &scoring,
            );
            prop_assert_eq!(&out.matrix, &expected);
            prop_assert!(out.matrix.min_value() >= 0);
        }
    }
}
