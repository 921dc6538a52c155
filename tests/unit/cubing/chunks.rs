//! Tests for job and batch splitting

#[cfg(test)]
mod tests {
    use wkcuber::cubing::chunks::{batches, regular_chunks};

    // Tests chunks are aligned to the chunk length and clamped to the range
    // Verified by starting chunks at min
    #[test]
    fn test_regular_chunks_aligned() {
        let chunks = regular_chunks(5, 70, 32).unwrap();
        assert_eq!(chunks, vec![5..=31, 32..=63, 64..=70]);
    }

    // Tests a range inside one chunk
    // Verified by emitting an empty trailing chunk
    #[test]
    fn test_regular_chunks_single() {
        assert_eq!(regular_chunks(0, 0, 32).unwrap(), vec![0..=0]);
        assert_eq!(regular_chunks(32, 63, 32).unwrap(), vec![32..=63]);
    }

    // Tests invalid arguments
    // Verified by looping on a zero chunk length
    #[test]
    fn test_regular_chunks_invalid() {
        assert!(regular_chunks(0, 10, 0).is_err());
        assert!(regular_chunks(10, 5, 32).is_err());
    }

    // Tests batches keep order and the last batch holds the rest
    // Verified by rounding batch sizes up
    #[test]
    fn test_batches() {
        let slices: Vec<u64> = (10..17).collect();
        let collected: Vec<Vec<u64>> = batches(&slices, 3).unwrap().map(<[u64]>::to_vec).collect();
        assert_eq!(collected, vec![vec![10, 11, 12], vec![13, 14, 15], vec![16]]);
        assert!(batches(&slices, 0).is_err());
    }
}
