//! Fixed-length buffers for one in-flight matrix row.

use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};
use crate::scan::NEG_INF;

/// A row of values with a fixed length set at construction.
///
/// The storage is never reallocated; [`RowBuffer::exchange`] swaps storage
/// between two buffers of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBuffer<T> {
    data: Vec<T>,
}

impl<T: Clone> RowBuffer<T> {
    /// New buffer of `len` copies of `value`.
    pub fn new(len: usize, value: T) -> Self {
        Self { data: vec![value; len] }
    }
}

impl<T> RowBuffer<T> {
    /// Number of slots
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the buffer has no slots
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Swap storage with `other`. Both buffers must have the same length.
    pub fn exchange(&mut self, other: &mut RowBuffer<T>) -> Result<()> {
        if self.data.len() != other.data.len() {
            return Err(Error::InvalidUsage(format!(
                "row buffer exchange between lengths {} and {}",
                self.data.len(),
                other.data.len()
            )));
        }
        std::mem::swap(&mut self.data, &mut other.data);
        Ok(())
    }
}

impl<T> Deref for RowBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for RowBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}


/// The per-row working set of the recurrence: two vertical-gap rows, the
/// gap-free tentative row and the horizontal-gap row.
#[derive(Debug)]
pub struct RowBuffers {
    /// Vertical gaps of the previous row
    pub f_prev: RowBuffer<i32>,
    /// Vertical gaps of the row being built
    pub f_cur:  RowBuffer<i32>,
    /// Gap-free tentative scores of the row being built
    pub h_hat:  RowBuffer<i32>,
    /// Exclusive max-decay prefix of `h_hat`, as read back from the device
    pub e:      RowBuffer<i32>,
}

impl RowBuffers {
    /// Buffers for rows of `len` columns (including column 0).
    pub fn new(len: usize) -> Self {
        Self {
            f_prev: RowBuffer::new(len, NEG_INF),
            f_cur:  RowBuffer::new(len, NEG_INF),
            h_hat:  RowBuffer::new(len, 0),
            e:      RowBuffer::new(len, NEG_INF),
        }
    }

    /// Row length, column 0 included
    pub fn len(&self) -> usize {
        self.h_hat.len()
    }

    /// `true` for zero-length rows
    pub fn is_empty(&self) -> bool {
        self.h_hat.is_empty()
    }

    /// Hand the current F row over to the previous slot for the next row.
    pub fn advance(&mut self) -> Result<()> {
        self.f_prev.exchange(&mut self.f_cur)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_exchange_swaps_storage() {
        let mut a = RowBuffer::new(4, 1);
        let mut b = RowBuffer::new(4, 2);
        b[3] = 7;
        let b_ptr = b.as_ptr();

        a.exchange(&mut b).unwrap();

        assert_eq!(&a[..], &[2, 2, 2, 7]);
        assert_eq!(&b[..], &[1, 1, 1, 1]);
        assert_eq!(a.as_ptr(), b_ptr);
    }

    #[test]
    fn test_exchange_rejects_length_mismatch() {
        let mut a = RowBuffer::new(3, 0);
        let mut b = RowBuffer::new(4, 0);
        assert!(matches!(a.exchange(&mut b), Err(Error::InvalidUsage(_))));
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_advance_moves_current_to_previous() {
        let mut bufs = RowBuffers::new(3);
        bufs.f_cur.copy_from_slice(&[NEG_INF, -9, -4]);
        bufs.advance().unwrap();
        assert_eq!(&bufs.f_prev[..], &[NEG_INF, -9, -4]);
        assert_eq!(bufs.f_cur.len(), 3);
    }
}
