//! Alphabet: symbol <-> dense rank mapping.
//!
//! Ranks come from a 256-entry lookup table, so mapping a symbol is one load.
//! Symbols that are not part of the alphabet map to [`NO_RANK`].

use crate::error::{IndexError, Result};

/// Marker for bytes outside the alphabet
pub const NO_RANK: u8 = 0xFF;

/// Finite symbol set with a bijection symbol <-> rank in `[0, sigma)`.
#[derive(Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<u8>,
    lut: [u8; 256],
}

impl Alphabet {
    /// Build an alphabet from its symbols, in rank order.
    ///
    /// Fails if the symbol list is shorter than 2, contains duplicates, or has
    /// 255 or more entries.
    pub fn new(symbols: &[u8]) -> Result<Self> {
        if symbols.len() < 2 {
            return Err(IndexError::InvalidAlphabet(format!(
                "need at least 2 symbols, got {}",
                symbols.len()
            )));
        }
        if symbols.len() >= NO_RANK as usize {
            return Err(IndexError::InvalidAlphabet(format!(
                "at most {} symbols supported, got {}",
                NO_RANK as usize - 1,
                symbols.len()
            )));
        }

        let mut lut = [NO_RANK; 256];
        for (rank, &sym) in symbols.iter().enumerate() {
            if lut[sym as usize] != NO_RANK {
                return Err(IndexError::InvalidAlphabet(format!(
                    "duplicate symbol {:?}",
                    sym as char
                )));
            }
            lut[sym as usize] = rank as u8;
        }

        Ok(Self {
            symbols: symbols.to_vec(),
            lut,
        })
    }

    /// Nucleotides A, C, G, T (lowercase accepted, U read as T).
    pub fn dna() -> Self {
        let mut lut = [NO_RANK; 256];
        for (rank, (upper, lower)) in [(b'A', b'a'), (b'C', b'c'), (b'G', b'g'), (b'T', b't')]
            .into_iter()
            .enumerate()
        {
            lut[upper as usize] = rank as u8;
            lut[lower as usize] = rank as u8;
        }
        lut[b'U' as usize] = 3;
        lut[b'u' as usize] = 3;
        Self {
            symbols: b"ACGT".to_vec(),
            lut,
        }
    }

    /// The 20 standard amino acids.
    pub fn protein() -> Self {
        let symbols = b"ACDEFGHIKLMNPQRSTVWY";
        let mut lut = [NO_RANK; 256];
        for (rank, &sym) in symbols.iter().enumerate() {
            lut[sym as usize] = rank as u8;
            lut[sym.to_ascii_lowercase() as usize] = rank as u8;
        }
        Self {
            symbols: symbols.to_vec(),
            lut,
        }
    }

    /// Parse a name (`dna`, `protein`) or a literal symbol list.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dna" | "nucleotide" => Ok(Self::dna()),
            "protein" | "aa" => Ok(Self::protein()),
            _ => Self::new(name.as_bytes()),
        }
    }

    /// Alphabet size
    #[inline]
    pub fn sigma(&self) -> usize {
        self.symbols.len()
    }

    /// Rank of `symbol`, or `None` if it is not in the alphabet.
    #[inline]
    pub fn rank(&self, symbol: u8) -> Option<u8> {
        let r = self.lut[symbol as usize];
        if r == NO_RANK { None } else { Some(r) }
    }

    /// Canonical symbol for `rank`.
    #[inline]
    pub fn symbol(&self, rank: u8) -> u8 {
        self.symbols[rank as usize]
    }

    /// Symbols in rank order
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Map a whole sequence to ranks, reporting the first foreign symbol.
    pub fn ranks(&self, seq: &[u8]) -> Result<Vec<u8>> {
        seq.iter()
            .enumerate()
            .map(|(offset, &symbol)| {
                self.rank(symbol)
                    .ok_or(IndexError::InvalidSymbol { offset, symbol })
            })
            .collect()
    }

    /// Check that every symbol of `seq` belongs to the alphabet.
    pub fn validate(&self, seq: &[u8]) -> Result<()> {
        match seq.iter().position(|&b| self.lut[b as usize] == NO_RANK) {
            Some(offset) => Err(IndexError::InvalidSymbol {
                offset,
                symbol: seq[offset],
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alphabet")
            .field("symbols", &String::from_utf8_lossy(&self.symbols))
            .finish()
    }
}
