use crate::models::BlockRange;

/// Partitions `[from, to]` into consecutive, non-overlapping sub-ranges of
/// at most `max_chunk_size` blocks; the last one may be shorter. Callers
/// guarantee `from <= to` and a positive chunk size.
pub fn split_range(from: u64, to: u64, max_chunk_size: u64) -> Vec<BlockRange> {
    debug_assert!(from <= to);
    debug_assert!(max_chunk_size > 0);

    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(max_chunk_size - 1).min(to);
        ranges.push(BlockRange::new(start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_is_ceil_of_range_over_size() {
        assert_eq!(split_range(0, 999, 100).len(), 10);
        assert_eq!(split_range(0, 1000, 100).len(), 11);
        assert_eq!(split_range(0, 99, 100).len(), 1);
        assert_eq!(split_range(0, 1999, 1000).len(), 2);
    }

    #[test]
    fn test_chunks_cover_the_range_without_gaps_or_overlaps() {
        let ranges = split_range(17, 4242, 256);

        assert_eq!(ranges.first().unwrap().from, 17);
        assert_eq!(ranges.last().unwrap().to, 4242);
        for window in ranges.windows(2) {
            assert_eq!(window[0].to + 1, window[1].from);
        }
        for range in &ranges {
            assert!(range.block_count() <= 256);
        }

        let covered: u64 = ranges.iter().map(|r| r.block_count()).sum();
        assert_eq!(covered, 4242 - 17 + 1);
    }

    #[test]
    fn test_single_block_range() {
        let ranges = split_range(42, 42, 1000);
        assert_eq!(ranges, vec![BlockRange::new(42, 42)]);
    }

    #[test]
    fn test_exact_multiple_leaves_no_stub_chunk() {
        let ranges = split_range(0, 199, 100);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1], BlockRange::new(100, 199));
    }

    #[test]
    fn test_last_chunk_may_be_shorter() {
        let ranges = split_range(0, 250, 100);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[2], BlockRange::new(200, 250));
        assert_eq!(ranges[2].block_count(), 51);
    }
}
