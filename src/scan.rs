//! Parallel max-with-decay prefix scan.
//!
//! For an array `X` and a decay `d <= 0` the inclusive scan is
//!
//! ```none
//! S[0] = X[0]
//! S[c] = max(S[c-1] + d, X[c])
//! ```
//!
//! which is the horizontal-gap recurrence of an affine-gap alignment row.
//! Written as a fold over blocks `(value, width)` with
//!
//! ```none
//! (vL, wL) . (vR, wR) = (max(vL + d*wR, vR), wL + wR)
//! ```
//!
//! the operator is associative, so the classic work-efficient up/down tree
//! computes every prefix in `2 * log2(n)` rounds. In a power-of-two tree the
//! widths are implicit (both children at round `k` span `2^k` elements), so
//! the device buffer only carries values.
//!
//! All arithmetic saturates at [`NEG_INF`], which is also the identity used
//! for tail padding and for the root before the downsweep.

use rayon::prelude::*;

use crate::device::{KernelArgs, ScanDevice, ScanKernel};
use crate::error::{Error, Result};
use crate::padding::{log2_pow2, next_pow2};

/// Identity of the max-decay operator and the "no gap open" sentinel.
pub const NEG_INF: i32 = i32::MIN;

/// `d * width`, saturating at [`NEG_INF`]. `d` must not be positive.
#[inline]
pub fn decay_span(decay: i32, width: u64) -> i32 {
    let span = decay as i64 * width.min(1 << 31) as i64;
    span.max(NEG_INF as i64) as i32
}

/// Carry `prefix` across `width` positions and merge it with `value`.
#[inline]
pub fn carry(prefix: i32, decay: i32, width: u64, value: i32) -> i32 {
    prefix.saturating_add(decay_span(decay, width)).max(value)
}

/// A contiguous run of scanned elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Scan result at the last element of the run
    pub value: i32,
    /// Number of elements folded into the run
    pub width: u64,
}

impl Block {
    /// One element
    pub fn single(value: i32) -> Self {
        Self { value, width: 1 }
    }

    /// `self` followed by `right`
    pub fn combine(self, right: Block, decay: i32) -> Block {
        Block {
            value: carry(self.value, decay, right.width, right.value),
            width: self.width + right.width,
        }
    }
}

/// Inclusive scan evaluated as the plain left-to-right chain of
/// single-element blocks.
pub fn sequential_scan(input: &[i32], decay: i32) -> Vec<i32> {
    let mut out = Vec::with_capacity(input.len());
    let mut running: Option<Block> = None;
    for &x in input {
        let block = match running {
            Some(acc) => acc.combine(Block::single(x), decay),
            None => Block::single(x),
        };
        out.push(block.value);
        running = Some(block);
    }
    out
}


/// Runs max-decay scans of rows up to a fixed capacity on a [`ScanDevice`].
///
/// Owns one padded device buffer, reused (and fully overwritten) by every
/// scan.
pub struct ScanEngine<D: ScanDevice> {
    device:     D,
    buffer:     D::Buffer,
    capacity:   usize,
    padded_len: usize,
    rounds:     u32,
    padding:    Vec<i32>,
}

impl<D: ScanDevice> ScanEngine<D> {
    /// Engine for rows of at most `capacity` elements.
    pub fn new(mut device: D, capacity: usize) -> Result<Self> {
        let padded_len = next_pow2(capacity);
        if padded_len > u32::MAX as usize / 2 + 1 {
            return Err(Error::InvalidUsage(format!(
                "row of {capacity} elements exceeds the 32-bit kernel index range"
            )));
        }
        let rounds = log2_pow2(padded_len);
        let buffer = device.alloc(padded_len)?;
        log::info!(
            "Scan engine: row {} padded to {} ({} rounds per sweep) on {}",
            capacity, padded_len, rounds, device.info(),
        );
        Ok(Self {
            device,
            buffer,
            capacity,
            padded_len,
            rounds,
            padding: Vec::new(),
        })
    }

    /// Padded buffer length
    pub fn padded_len(&self) -> usize {
        self.padded_len
    }

    /// Rounds per sweep
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// The device the scans run on
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Exclusive scan: `output[0] = NEG_INF`, `output[c] = S[c-1]`.
    pub fn exclusive_scan(&mut self, input: &[i32], decay: i32, output: &mut [i32]) -> Result<()> {
        self.check(input, decay, output)?;
        let n = input.len();

        let tail = self.padded_len - n;
        if self.padding.len() < tail {
            self.padding.resize(tail, NEG_INF);
        }
        self.device.write(&self.buffer, 0, input)?;
        self.device.write(&self.buffer, n, &self.padding[..tail])?;

        for depth in 0..self.rounds {
            let global = self.padded_len >> (depth + 1);
            self.device.enqueue(ScanKernel::Upsweep, &self.buffer, KernelArgs { depth, decay }, global)?;
        }

        self.device.write(&self.buffer, self.padded_len - 1, &[NEG_INF])?;

        for depth in (0..self.rounds).rev() {
            let global = self.padded_len >> (depth + 1);
            self.device.enqueue(ScanKernel::Downsweep, &self.buffer, KernelArgs { depth, decay }, global)?;
        }

        self.device.read(&self.buffer, output)
    }

    /// Inclusive scan: `output[c] = S[c]`.
    pub fn inclusive_scan(&mut self, input: &[i32], decay: i32, output: &mut [i32]) -> Result<()> {
        self.exclusive_scan(input, decay, output)?;
        output
            .par_iter_mut()
            .zip(input.par_iter())
            .for_each(|(o, &x)| *o = carry(*o, decay, 1, x));
        Ok(())
    }

    fn check(&self, input: &[i32], decay: i32, output: &[i32]) -> Result<()> {
        if decay > 0 {
            return Err(Error::InvalidUsage(format!("scan decay must not be positive, got {decay}")));
        }
        if input.len() != output.len() {
            return Err(Error::InvalidUsage(format!(
                "scan input has {} elements but output has {}",
                input.len(),
                output.len()
            )));
        }
        if input.len() > self.capacity {
            return Err(Error::InvalidUsage(format!(
                "scan of {} elements on an engine sized for {}",
                input.len(),
                self.capacity
            )));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::host::HostDevice;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn engine(capacity: usize) -> ScanEngine<HostDevice> {
        ScanEngine::new(HostDevice::new(), capacity).unwrap()
    }

    #[test]
    fn test_sequential_chain() {
        assert_eq!(sequential_scan(&[3, 0, 0, 5, 1], -1), vec![3, 2, 1, 5, 4]);
        assert_eq!(sequential_scan(&[-4, -9], -2), vec![-4, -6]);
        assert!(sequential_scan(&[], -1).is_empty());
    }

    #[test]
    fn test_small_exclusive() {
        let mut eng = engine(5);
        let mut out = vec![0; 5];
        eng.exclusive_scan(&[3, 0, 0, 5, 1], -1, &mut out).unwrap();
        assert_eq!(out, vec![NEG_INF, 3, 2, 1, 5]);
        assert_eq!(eng.padded_len(), 8);
        assert_eq!(eng.rounds(), 3);
    }

    #[test]
    fn test_small_inclusive() {
        let mut eng = engine(7);
        let input = [0, 8, 0, 0, 0, 6, 0];
        let mut out = vec![0; 7];
        eng.inclusive_scan(&input, -2, &mut out).unwrap();
        assert_eq!(out, sequential_scan(&input, -2));
        assert_eq!(out, vec![0, 8, 6, 4, 2, 6, 4]);
    }

    #[test]
    fn test_shorter_row_than_capacity() {
        let mut eng = engine(16);
        let input = [1, -5, 2];
        let mut out = vec![0; 3];
        eng.inclusive_scan(&input, -3, &mut out).unwrap();
        assert_eq!(out, vec![1, -2, 2]);
    }

    #[test]
    fn test_single_element() {
        let mut eng = engine(1);
        let mut out = vec![0; 1];
        eng.inclusive_scan(&[-7], -1, &mut out).unwrap();
        assert_eq!(out, vec![-7]);
        assert_eq!(eng.rounds(), 0);
    }

    #[test]
    fn test_engine_is_reusable() {
        let mut eng = engine(6);
        let mut out = vec![0; 6];
        eng.inclusive_scan(&[9, 0, 0, 0, 0, 0], -1, &mut out).unwrap();
        assert_eq!(out, vec![9, 8, 7, 6, 5, 4]);
        eng.inclusive_scan(&[0, 0, 0, 0, 0, 1], -1, &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_bad_usage() {
        let mut eng = engine(4);
        let mut out = vec![0; 4];
        assert!(matches!(eng.exclusive_scan(&[1, 2, 3, 4], 1, &mut out), Err(Error::InvalidUsage(_))));
        assert!(matches!(eng.exclusive_scan(&[1, 2, 3], -1, &mut out), Err(Error::InvalidUsage(_))));
        let mut big = vec![0; 5];
        assert!(matches!(eng.exclusive_scan(&[0; 5], -1, &mut big), Err(Error::InvalidUsage(_))));
    }

    #[test]
    fn test_decay_span_saturates() {
        assert_eq!(decay_span(-1, 8), -8);
        assert_eq!(decay_span(0, 1 << 30), 0);
        assert_eq!(decay_span(-4, 1 << 30), NEG_INF);
        assert_eq!(decay_span(NEG_INF, 1), NEG_INF);
        assert_eq!(carry(NEG_INF, -1, 4, -3), -3);
    }

    proptest! {
        #[test]
        fn scan_matches_sequential(
            input in proptest::collection::vec(-1000i32..1000, 1..300),
            decay in -50i32..=0,
        ) {
            let mut eng = engine(input.len());
            let mut inclusive = vec![0; input.len()];
            eng.inclusive_scan(&input, decay, &mut inclusive).unwrap();
            let expected = sequential_scan(&input, decay);
            prop_assert_eq!(&inclusive, &expected);

            let mut exclusive = vec![0; input.len()];
            eng.exclusive_scan(&input, decay, &mut exclusive).unwrap();
            prop_assert_eq!(exclusive[0], NEG_INF);
            prop_assert_eq!(&exclusive[1..], &expected[..input.len() - 1]);
        }

        #[test]
        fn block_combine_is_associative(
            a in -500i32..500, b in -500i32..500, c in -500i32..500,
            wa in 1u64..64, wb in 1u64..64, wc in 1u64..64,
            decay in -20i32..=0,
        ) {
            let (x, y, z) = (Block { value: a, width: wa }, Block { value: b, width: wb }, Block { value: c, width: wc });
            prop_assert_eq!(
                x.combine(y, decay).combine(z, decay),
                x.combine(y.combine(z, decay), decay)
            );
        }

        #[test]
        fn block_fold_equals_scan_tail(
            input in proptest::collection::vec(-100i32..100, 1..64),
            decay in -10i32..=0,
        ) {
            let folded = input[1..]
                .iter()
                .fold(Block::single(input[0]), |acc, &x| acc.combine(Block::single(x), decay));
            prop_assert_eq!(folded.value, *sequential_scan(&input, decay).last().unwrap());
            prop_assert_eq!(folded.width, input.len() as u64);
        }
    }
}
