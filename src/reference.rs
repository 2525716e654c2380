//! Plain sequential Gotoh local alignment, used to check device results.

use crate::error::{Error, Result};
use crate::scan::NEG_INF;
use crate::score_matrix::ScoreMatrix;
use crate::scoring::ScoringParams;

/// Largest matrix (in cells) `--verify` will recompute
pub const MAX_VERIFY_CELLS: usize = 1 << 28;

/// The full `H` matrix computed cell by cell with explicit `E` and `F`.
///
/// Boundaries are `H = 0` and `E = F = NEG_INF`; additions saturate the same
/// way the row stage does, so the matrices compare exactly.
pub fn reference_matrix(rows: &[u8], columns: &[u8], scoring: &ScoringParams) -> ScoreMatrix {
    let ncols = columns.len() + 1;
    let mut h = ScoreMatrix::new(rows.len() + 1, ncols);
    let mut f = vec![NEG_INF; ncols];

    for r in 1..=rows.len() {
        let (prev, cur) = h.prev_and_current(r);
        let mut e = NEG_INF;
        for c in 1..ncols {
            e = e.max(cur[c - 1].saturating_add(scoring.gap_open)).saturating_add(scoring.gap_extend);
            f[c] = f[c].max(prev[c].saturating_add(scoring.gap_open)).saturating_add(scoring.gap_extend);
            let diag = prev[c - 1].saturating_add(scoring.score(rows[r - 1], columns[c - 1]));
            cur[c] = diag.max(e).max(f[c]).max(0);
        }
    }
    h
}

/// First cell, in row-major order, where `found` differs from `expected`.
pub fn verify(expected: &ScoreMatrix, found: &ScoreMatrix) -> Result<()> {
    if expected.num_rows() != found.num_rows() || expected.num_cols() != found.num_cols() {
        return Err(Error::InvalidUsage(format!(
            "cannot compare a {}x{} matrix with a {}x{} one",
            expected.num_rows(),
            expected.num_cols(),
            found.num_rows(),
            found.num_cols()
        )));
    }
    for (r, (exp_row, found_row)) in expected.rows().zip(found.rows()).enumerate() {
        if let Some(c) = exp_row.iter().zip(found_row).position(|(a, b)| a != b) {
            return Err(Error::VerificationFailed {
                row: r,
                col: c,
                expected: exp_row[c],
                found: found_row[c],
            });
        }
    }
    Ok(())
}
