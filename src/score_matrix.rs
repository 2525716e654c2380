//! Dense storage for the final alignment scores `H`.

use std::io::Write;

use rayon::prelude::*;

/// Best cell of a local alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BestHit {
    /// Score at the cell
    pub score: i32,
    /// Row index (1-based into the row sequence, 0 if the matrix is all zero)
    pub row: usize,
    /// Column index (1-based into the column sequence)
    pub col: usize,
}

/// `(rows+1) x (cols+1)` scores in one contiguous row-major buffer.
///
/// Row 0 and column 0 start at zero and are never written by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreMatrix {
    data:     Vec<i32>,
    num_rows: usize,
    num_cols: usize,
}

impl ScoreMatrix {
    /// All-zero matrix with `num_rows` rows and `num_cols` columns.
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            data: vec![0; num_rows * num_cols],
            num_rows,
            num_cols,
        }
    }

    /// Number of rows (row sequence length + 1)
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns (column sequence length + 1)
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Single cell
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> i32 {
        self.data[r * self.num_cols + c]
    }

    /// Read access to row `r`
    pub fn row(&self, r: usize) -> &[i32] {
        &self.data[r * self.num_cols..(r + 1) * self.num_cols]
    }

    /// Row `r - 1` shared and row `r` exclusive, for `r >= 1`.
    pub fn prev_and_current(&mut self, r: usize) -> (&[i32], &mut [i32]) {
        assert!(r >= 1 && r < self.num_rows, "row {r} out of range");
        let (head, tail) = self.data.split_at_mut(r * self.num_cols);
        (&head[(r - 1) * self.num_cols..], &mut tail[..self.num_cols])
    }

    /// Iterate over the rows
    pub fn rows(&self) -> impl Iterator<Item = &[i32]> {
        self.data.chunks(self.num_cols.max(1)).take(self.num_rows)
    }

    /// Highest score; ties resolve to the first cell in row-major order.
    pub fn best(&self) -> BestHit {
        if self.num_cols == 0 {
            return BestHit::default();
        }
        self.data
            .par_chunks(self.num_cols)
            .enumerate()
            .map(|(r, row)| {
                let mut best = BestHit { score: row[0], row: r, col: 0 };
                for (c, &v) in row.iter().enumerate().skip(1) {
                    if v > best.score {
                        best = BestHit { score: v, row: r, col: c };
                    }
                }
                best
            })
            .reduce(BestHit::default, |a, b| {
                if b.score > a.score || (b.score == a.score && (b.row, b.col) < (a.row, a.col)) {
                    b
                } else {
                    a
                }
            })
    }

    /// Smallest value anywhere in the matrix
    pub fn min_value(&self) -> i32 {
        self.data.par_iter().copied().min().unwrap_or(0)
    }

    /// Tab separated dump, one matrix row per line.
    pub fn write_tsv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for row in self.rows() {
            let mut first = true;
            for v in row {
                if !first {
                    out.write_all(b"\t")?;
                }
                write!(out, "{v}")?;
                first = false;
            }
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}
