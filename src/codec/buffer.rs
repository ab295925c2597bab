//! Byte-size helpers shared by the codec and the region sizing logic.

/// Round a byte count up to the next multiple of `step` (non-zero).
#[inline]
pub fn round_up(val: usize, step: usize) -> usize {
    val.div_ceil(step) * step
}
