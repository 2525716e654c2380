//! One row of the affine-gap local alignment recurrence.
//!
//! For row `r` the stage computes, over columns `c >= 1`:
//!
//! ```none
//! F[c]     = max(F_prev[c], H[r-1][c] + open) + extend
//! H_hat[c] = max(H[r-1][c-1] + s(r, c), F[c], 0)
//! P        = exclusive max-decay scan of H_hat with decay `extend`
//! E[c]     = P[c] + extend
//! H[r][c]  = max(H_hat[c], E[c] + open)
//! ```
//!
//! `E[c]` equals `max over k < c of H_hat[k] + (c - k) * extend`, the
//! horizontal gap before paying `open`. Using `H_hat` instead of `H` inside
//! that maximum is exact because a gap that continues from a gap is never
//! worse than re-opening (`open <= 0`). Column 0 is the local alignment
//! boundary and stays zero.

use rayon::prelude::*;

use crate::device::ScanDevice;
use crate::error::{Error, Result};
use crate::row_buffer::RowBuffers;
use crate::scan::{ScanEngine, NEG_INF};
use crate::scoring::ScoringParams;

/// Vertical gaps of the current row from the previous row.
pub fn vertical_gap_row(prev_h: &[i32], f_prev: &[i32], f_cur: &mut [i32], scoring: &ScoringParams) {
    f_cur[0] = NEG_INF;
    f_cur[1..]
        .par_iter_mut()
        .zip(f_prev[1..].par_iter().zip(prev_h[1..].par_iter()))
        .for_each(|(f, (&fp, &h))| {
            *f = fp.max(h.saturating_add(scoring.gap_open)).saturating_add(scoring.gap_extend);
        });
}

/// Gap-free tentative scores: diagonal move, vertical gap or a fresh start.
pub fn gap_free_row(
    prev_h:     &[i32],
    f_cur:      &[i32],
    row_symbol: u8,
    columns:    &[u8],
    h_hat:      &mut [i32],
    scoring:    &ScoringParams,
) {
    h_hat[0] = 0;
    h_hat[1..]
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, hh)| {
            let c = i + 1;
            let diag = prev_h[c - 1].saturating_add(scoring.score(row_symbol, columns[c - 1]));
            *hh = diag.max(f_cur[c]).max(0);
        });
}

/// Final scores from the tentative row and the scanned horizontal prefixes.
pub fn final_row(h_hat: &[i32], e_prefix: &[i32], h_cur: &mut [i32], scoring: &ScoringParams) {
    h_cur[0] = 0;
    h_cur[1..]
        .par_iter_mut()
        .zip(h_hat[1..].par_iter().zip(e_prefix[1..].par_iter()))
        .for_each(|(h, (&hh, &p))| {
            let e = p.saturating_add(scoring.gap_extend);
            *h = hh.max(e.saturating_add(scoring.gap_open));
        });
}

/// Drives the three elementwise steps and the device scan for one row.
pub struct RowStage<'a> {
    rows:    &'a [u8],
    columns: &'a [u8],
    scoring: ScoringParams,
}

impl<'a> RowStage<'a> {
    /// Stage for the given encoded sequences
    pub fn new(rows: &'a [u8], columns: &'a [u8], scoring: ScoringParams) -> Self {
        Self { rows, columns, scoring }
    }

    /// Build row `r` (1-based) into `h_cur` from `prev_h`.
    ///
    /// On return `bufs.f_prev` holds row `r`'s vertical gaps.
    pub fn process<D: ScanDevice>(
        &self,
        r:      usize,
        prev_h: &[i32],
        h_cur:  &mut [i32],
        bufs:   &mut RowBuffers,
        scan:   &mut ScanEngine<D>,
    ) -> Result<()> {
        if bufs.is_empty() || bufs.len() != h_cur.len() || prev_h.len() != h_cur.len() {
            return Err(Error::InvalidUsage(format!(
                "row of {} columns with buffers of {} and previous row of {}",
                h_cur.len(),
                bufs.len(),
                prev_h.len()
            )));
        }
        vertical_gap_row(prev_h, &bufs.f_prev, &mut bufs.f_cur, &self.scoring);
        gap_free_row(prev_h, &bufs.f_cur, self.rows[r - 1], self.columns, &mut bufs.h_hat, &self.scoring);
        scan.exclusive_scan(&bufs.h_hat, self.scoring.gap_extend, &mut bufs.e)?;
        final_row(&bufs.h_hat, &bufs.e, h_cur, &self.scoring);
        bufs.advance()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_process_rejects_mismatched_rows() {
        use crate::device::host::HostDevice;

        let codes = [0u8, 1, 2];
        let stage = RowStage::new(&codes, &codes, ScoringParams::default());
        let mut scan = ScanEngine::new(HostDevice::new(), 4).unwrap();
        let prev_h = [0; 4];
        let mut h_cur = [0; 4];

        let mut short = RowBuffers::new(3);
        let res = stage.process(1, &prev_h, &mut h_cur, &mut short, &mut scan);
        assert!(matches!(res, Err(Error::InvalidUsage(_))));

        let mut bufs = RowBuffers::new(4);
        stage.process(1, &prev_h, &mut h_cur, &mut bufs, &mut scan).unwrap();
        // A against ACT: only the first column matches
        assert_eq!(h_cur, [0, 5, 0, 0]);
    }

    #[test]
    fn test_vertical_gap_row() {
        let scoring = ScoringParams::default();
        let prev_h = [0, 10, 0, 3];
        let f_prev = [NEG_INF, NEG_INF, 5, NEG_INF];
        let mut f_cur = [0; 4];
        vertical_gap_row(&prev_h, &f_prev, &mut f_cur, &scoring);
        assert_eq!(f_cur, [NEG_INF, 1, 4, -6]);
    }

    #[test]
    fn test_gap_free_row_floors_at_zero() {
        let scoring = ScoringParams::default();
        let prev_h = [0, 0, 7];
        let f_cur = [NEG_INF, -9, 2];
        let columns = [0u8, 1];
        let mut h_hat = [9; 3];
        gap_free_row(&prev_h, &f_cur, 1, &columns, &mut h_hat, &scoring);
        // c=1: mismatch -3 -> 0; c=2: match on diagonal 0 + 5
        assert_eq!(h_hat, [0, 0, 5]);
    }

    #[test]
    fn test_final_row_opens_horizontal_gap() {
        let scoring = ScoringParams { gap_open: -2, gap_extend: -1, ..Default::default() };
        let h_hat = [0, 10, 0, 0];
        // exclusive prefix of h_hat with decay -1
        let e_prefix = [NEG_INF, 0, 10, 9];
        let mut h_cur = [1; 4];
        final_row(&h_hat, &e_prefix, &mut h_cur, &scoring);
        assert_eq!(h_cur, [0, 10, 7, 6]);
    }
}
