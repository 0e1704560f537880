use crate::util::*;
use rayon::prelude::*;

/// Sets each element to the same value.
/// `chunk_size` is break the work into tasks for multi-threading.
pub fn set_value<NumType: NumTrait>(
    a_slice: &mut [NumType],
    value: NumType,
    chunk_size: usize,
) {
    a_slice
        .par_chunks_mut(chunk_size)
        .for_each(|a_chunk: &mut [NumType]| {
            for a in a_chunk {
                *a = value;
            }
        });
}

/// Counts positions where `|a - b| > tolerance`.
pub fn count_differences<FloatType: Float + Send + Sync>(
    a_slice: &[FloatType],
    b_slice: &[FloatType],
    tolerance: FloatType,
    chunk_size: usize,
) -> usize {
    debug_assert_eq!(a_slice.len(), b_slice.len());
    a_slice
        .par_chunks(chunk_size)
        .zip(b_slice.par_chunks(chunk_size))
        .map(|(a_chunk, b_chunk)| {
            a_chunk
                .iter()
                .zip(b_chunk)
                .filter(|(a, b)| (**a - **b).abs() > tolerance)
                .count()
        })
        .sum()
}
