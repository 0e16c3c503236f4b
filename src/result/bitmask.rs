//! Fixed-size packed bit array.
//!
//! Marks which entries of a candidate batch are still valid. Bits past
//! `n_bits` in the last word are always zero so word popcounts stay exact.

/// Packed bit vector of a fixed length.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmask {
    words: Vec<u64>,
    n_bits: usize,
}

impl Bitmask {
    /// Create a mask of `n_bits` bits, all set to `initial`.
    pub fn new(n_bits: usize, initial: bool) -> Self {
        let mut mask = Self {
            words: vec![0u64; n_bits.div_ceil(64)],
            n_bits,
        };
        if initial {
            mask.fill(true);
        }
        mask
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n_bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_bits == 0
    }

    #[inline]
    fn check(&self, i: usize) {
        assert!(
            i < self.n_bits,
            "bit index {} out of range for bitmask of {} bits",
            i,
            self.n_bits
        );
    }

    /// Read bit `i`.
    ///
    /// # Panics
    /// If `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.check(i);
        (self.words[i >> 6] >> (i & 63)) & 1 != 0
    }

    /// Checked read
    #[inline]
    pub fn try_get(&self, i: usize) -> Option<bool> {
        (i < self.n_bits).then(|| (self.words[i >> 6] >> (i & 63)) & 1 != 0)
    }

    /// Set bit `i` to 1.
    ///
    /// # Panics
    /// If `i >= len()`.
    #[inline]
    pub fn set(&mut self, i: usize) {
        self.check(i);
        self.words[i >> 6] |= 1u64 << (i & 63);
    }

    /// Clear bit `i` to 0. Clearing twice is the same as clearing once.
    ///
    /// # Panics
    /// If `i >= len()`.
    #[inline]
    pub fn clear(&mut self, i: usize) {
        self.check(i);
        self.words[i >> 6] &= !(1u64 << (i & 63));
    }

    #[inline]
    pub fn assign(&mut self, i: usize, value: bool) {
        if value { self.set(i) } else { self.clear(i) }
    }

    /// Set every bit to `value`.
    pub fn fill(&mut self, value: bool) {
        let word = if value { u64::MAX } else { 0 };
        self.words.iter_mut().for_each(|w| *w = word);
        if value {
            self.mask_tail();
        }
    }

    /// Number of bits equal to `value`
    pub fn count(&self, value: bool) -> usize {
        let ones: usize = self.words.iter().map(|w| w.count_ones() as usize).sum();
        if value { ones } else { self.n_bits - ones }
    }

    /// First set bit at index `>= from`
    pub fn next_set(&self, from: usize) -> Option<usize> {
        if from >= self.n_bits {
            return None;
        }
        let mut word_idx = from >> 6;
        let mut word = self.words[word_idx] & (u64::MAX << (from & 63));
        loop {
            if word != 0 {
                let bit = (word_idx << 6) + word.trailing_zeros() as usize;
                return (bit < self.n_bits).then_some(bit);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Last set bit at index `< before`
    pub fn prev_set(&self, before: usize) -> Option<usize> {
        let before = before.min(self.n_bits);
        if before == 0 {
            return None;
        }
        let last = before - 1;
        let mut word_idx = last >> 6;
        let shift = 63 - (last & 63);
        let mut word = (self.words[word_idx] << shift) >> shift;
        loop {
            if word != 0 {
                return Some((word_idx << 6) + 63 - word.leading_zeros() as usize);
            }
            if word_idx == 0 {
                return None;
            }
            word_idx -= 1;
            word = self.words[word_idx];
        }
    }

    /// Index of the `rank`-th set bit (0-based)
    pub fn select(&self, rank: usize) -> Option<usize> {
        let mut remaining = rank;
        for (word_idx, &word) in self.words.iter().enumerate() {
            let ones = word.count_ones() as usize;
            if remaining < ones {
                let mut w = word;
                for _ in 0..remaining {
                    w &= w - 1; // clear lowest set bit
                }
                return Some((word_idx << 6) + w.trailing_zeros() as usize);
            }
            remaining -= ones;
        }
        None
    }

    /// Number of set bits in `[0, i)`
    pub fn rank(&self, i: usize) -> usize {
        let i = i.min(self.n_bits);
        let full = i >> 6;
        let mut r: usize = self.words[..full]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        let rem = i & 63;
        if rem > 0 {
            r += (self.words[full] & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        r
    }

    fn mask_tail(&mut self) {
        let rem = self.n_bits & 63;
        if rem > 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl std::fmt::Debug for Bitmask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmask")
            .field("n_bits", &self.n_bits)
            .field("ones", &self.count(true))
            .finish()
    }
}
