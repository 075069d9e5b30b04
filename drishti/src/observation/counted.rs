//! Bitset over observed-cloud indices.

/// Set of observed point indices already credited to a placed object.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CountedSet {
    words: Vec<u64>,
    universe: usize,
    count: usize,
}

impl CountedSet {
    /// Empty set over `universe` points.
    pub fn new(universe: usize) -> Self {
        Self {
            words: vec![0; universe.div_ceil(64)],
            universe,
            count: 0,
        }
    }

    /// Set containing every point.
    pub fn full(universe: usize) -> Self {
        let mut set = Self::new(universe);
        for i in 0..universe {
            set.insert(i);
        }
        set
    }

    /// Insert an index; returns `true` if it was not present.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        debug_assert!(index < self.universe);
        let (w, b) = (index / 64, index % 64);
        let mask = 1u64 << b;
        if self.words[w] & mask != 0 {
            return false;
        }
        self.words[w] |= mask;
        self.count += 1;
        true
    }

    /// Membership test
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.universe && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Number of members
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Size of the universe
    #[inline]
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Number of indices not in the set
    #[inline]
    pub fn remaining(&self) -> usize {
        self.universe - self.count
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.universe).filter(move |&i| self.contains(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_count() {
        let mut set = CountedSet::new(130);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert_eq!(set.len(), 2);
        assert_eq!(set.remaining(), 128);
        assert!(set.contains(129));
        assert!(!set.contains(64));
        assert!(!set.contains(500));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn test_full() {
        let set = CountedSet::full(70);
        assert_eq!(set.len(), 70);
        assert_eq!(set.remaining(), 0);
    }
}
