use std::fmt;

const WORD_BITS: usize = u32::BITS as usize;

/// Fixed-capacity bit vector backed by `W` 32-bit words.
///
/// Every operation walks the words, never individual bits. Bit indices at or
/// beyond [`Bitset::CAPACITY`] are a contract violation and panic, like slice
/// indexing.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bitset<const W: usize> {
    words: [u32; W],
}

impl<const W: usize> Bitset<W> {
    /// Number of addressable bits.
    pub const CAPACITY: usize = W * WORD_BITS;

    pub const fn new() -> Self {
        Self { words: [0; W] }
    }

    fn locate(bit: usize) -> (usize, u32) {
        assert!(
            bit < Self::CAPACITY,
            "bit index {bit} out of range for a {}-bit set",
            Self::CAPACITY
        );
        (bit / WORD_BITS, 1 << (bit % WORD_BITS))
    }

    /// Set a bit. Returns `true` if it was previously clear.
    pub fn set(&mut self, bit: usize) -> bool {
        let (word, mask) = Self::locate(bit);
        let before = self.words[word];
        self.words[word] = before | mask;
        before & mask == 0
    }

    /// Clear a bit. Returns `true` if it was previously set.
    pub fn remove(&mut self, bit: usize) -> bool {
        let (word, mask) = Self::locate(bit);
        let before = self.words[word];
        self.words[word] = before & !mask;
        before & mask != 0
    }

    pub fn has(&self, bit: usize) -> bool {
        let (word, mask) = Self::locate(bit);
        self.words[word] & mask != 0
    }

    /// Whether every bit set in `other` is also set here.
    pub fn contains(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// Whether none of the bits set in `other` is set here.
    pub fn excludes(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| mine & theirs == 0)
    }

    pub fn equals(&self, other: &Self) -> bool {
        self.words == other.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.words = [0; W];
    }

    /// Iterate over set bit indices in ascending order.
    pub fn iter(&self) -> Iter<'_, W> {
        Iter {
            words: &self.words,
            word: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl<const W: usize> Default for Bitset<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> FromIterator<usize> for Bitset<W> {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for bit in iter {
            set.set(bit);
        }
        set
    }
}

impl<const W: usize> fmt::Debug for Bitset<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits of a [`Bitset`].
pub struct Iter<'a, const W: usize> {
    words: &'a [u32; W],
    word: usize,
    current: u32,
}

impl<const W: usize> Iterator for Iter<'_, W> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let offset = self.current.trailing_zeros() as usize;
                // Clear the lowest set bit.
                self.current &= self.current - 1;
                return Some(self.word * WORD_BITS + offset);
            }
            self.word += 1;
            if self.word >= W {
                return None;
            }
            self.current = self.words[self.word];
        }
    }
}
