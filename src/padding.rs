//! Power-of-two sizing for the scan tree.

/// Smallest power of two `>= n`. A power of two is returned unchanged.
///
/// `n == 0` gives 1, since the scan buffer always holds at least one slot.
#[inline]
pub fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let mut v = n - 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    #[cfg(target_pointer_width = "64")]
    {
        v |= v >> 32;
    }
    v + 1
}

/// Number of tree levels (upsweep or downsweep rounds) for a padded length.
#[inline]
pub fn log2_pow2(padded: usize) -> u32 {
    debug_assert!(padded.is_power_of_two());
    padded.trailing_zeros()
}
