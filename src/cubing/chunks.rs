//! Splitting the z range into block-aligned jobs and IO batches

use crate::io::error::{Result, invalid_parameter};
use std::ops::RangeInclusive;

/// Inclusive ranges covering `min..=max`, with boundaries on multiples of
/// `chunk_len`
///
/// Jobs over different ranges never write into the same WKW block when
/// `chunk_len` is a multiple of the block length.
///
/// # Errors
///
/// Returns an error if `chunk_len` is zero or `min > max`
pub fn regular_chunks(min: u64, max: u64, chunk_len: u64) -> Result<Vec<RangeInclusive<u64>>> {
    if chunk_len == 0 {
        return Err(invalid_parameter("chunk_len", &chunk_len, &"must be positive"));
    }
    if min > max {
        return Err(invalid_parameter(
            "range",
            &format!("{min}-{max}"),
            &"minimum exceeds maximum",
        ));
    }

    let mut chunks = Vec::new();
    let mut start = min / chunk_len * chunk_len;
    while start <= max {
        let end = start + chunk_len - 1;
        chunks.push(start.max(min)..=end.min(max));
        start += chunk_len;
    }
    Ok(chunks)
}

/// Consecutive batches of at most `batch_size` items
///
/// # Errors
///
/// Returns an error if `batch_size` is zero
pub fn batches<T>(items: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(invalid_parameter("batch_size", &batch_size, &"must be positive"));
    }
    Ok(items.chunks(batch_size))
}
