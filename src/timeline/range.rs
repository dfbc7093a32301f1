//! Sample ranges on the song and modification timelines
//!
//! All render-range math is done on half-open `[start, end)` ranges of
//! `i64` sample positions. Song positions can be negative (regions may
//! start before the timeline origin while the host scrolls), so the
//! range type is signed throughout.

/// Half-open range of sample positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub start: i64,
    pub end: i64,
}

impl SampleRange {
    /// Create a range; an inverted range collapses to empty at `start`
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Create a range from a start position and a length
    pub fn with_start_and_length(start: i64, length: i64) -> Self {
        Self::new(start, start + length.max(0))
    }

    /// Number of samples in the range
    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    /// Check if the range holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if a position falls inside the range
    #[inline]
    pub fn contains(&self, position: i64) -> bool {
        position >= self.start && position < self.end
    }

    /// Intersection with another range (possibly empty)
    pub fn intersection(&self, other: &SampleRange) -> SampleRange {
        SampleRange::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// The same-length range re-anchored to start at `new_start`
    pub fn moved_to_start_at(&self, new_start: i64) -> SampleRange {
        SampleRange::with_start_and_length(new_start, self.len())
    }

    /// The range shifted by `delta` samples
    pub fn shifted(&self, delta: i64) -> SampleRange {
        SampleRange::new(self.start + delta, self.end + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_empty() {
        let r = SampleRange::new(100, 50);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.start, 100);
    }

    #[test]
    fn test_with_start_and_length() {
        let r = SampleRange::with_start_and_length(1000, 512);
        assert_eq!(r.start, 1000);
        assert_eq!(r.end, 1512);
        assert!(r.contains(1000));
        assert!(!r.contains(1512));
    }

    #[test]
    fn test_intersection_overlap() {
        let a = SampleRange::new(0, 100);
        let b = SampleRange::new(50, 150);
        assert_eq!(a.intersection(&b), SampleRange::new(50, 100));
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = SampleRange::new(0, 100);
        let b = SampleRange::new(200, 300);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_intersection_touching_is_empty() {
        let a = SampleRange::new(0, 100);
        let b = SampleRange::new(100, 200);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_moved_to_start_at() {
        let r = SampleRange::new(40, 100);
        let moved = r.moved_to_start_at(-10);
        assert_eq!(moved, SampleRange::new(-10, 50));
    }

    #[test]
    fn test_shifted_negative() {
        let r = SampleRange::new(100, 200);
        assert_eq!(r.shifted(-150), SampleRange::new(-50, 50));
    }
}
