//! Loading indexable text from disk.
//!
//! Files are memory-mapped and scanned line by line with `memchr`. FASTA input
//! (first non-blank byte is `>`) has its header lines dropped and every record
//! concatenated; raw input only loses its line breaks.

use crate::error::Result;
use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Input format of a sequence file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Raw,
    Fasta,
}

impl SequenceFormat {
    /// FASTA when the first non-whitespace byte is `>`
    pub fn detect(data: &[u8]) -> Self {
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'>') => SequenceFormat::Fasta,
            _ => SequenceFormat::Raw,
        }
    }
}

/// Read a sequence file into one contiguous text.
pub fn load_sequence(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: the map is read-only and dropped before returning
    let mmap = unsafe { Mmap::map(&file)? };
    let format = SequenceFormat::detect(&mmap);
    let text = parse_sequence(&mmap, format);
    debug!(
        path = %path.display(),
        ?format,
        file_len = mmap.len(),
        text_len = text.len(),
        "loaded sequence"
    );
    Ok(text)
}

/// Strip line breaks (and FASTA headers) from `data`.
pub fn parse_sequence(data: &[u8], format: SequenceFormat) -> Vec<u8> {
    let mut text = Vec::with_capacity(data.len());
    let mut rest = data;
    while !rest.is_empty() {
        let (line, next) = match memchr(b'\n', rest) {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        rest = next;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if format == SequenceFormat::Fasta && line.first() == Some(&b'>') {
            continue;
        }
        text.extend(line.iter().copied().filter(|b| !b.is_ascii_whitespace()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_format() {
        assert_eq!(SequenceFormat::detect(b"\n>chr1\nACGT"), SequenceFormat::Fasta);
        assert_eq!(SequenceFormat::detect(b"ACGT\n"), SequenceFormat::Raw);
        assert_eq!(SequenceFormat::detect(b""), SequenceFormat::Raw);
    }

    #[test]
    fn test_parse_fasta() {
        let data = b">seq1 description\nACGT\nTTGA\r\n>seq2\nCC\n";
        assert_eq!(parse_sequence(data, SequenceFormat::Fasta), b"ACGTTTGACC");
    }

    #[test]
    fn test_parse_raw_keeps_gt_free_lines() {
        let data = b"ACG T\nGGA";
        assert_eq!(parse_sequence(data, SequenceFormat::Raw), b"ACGTGGA");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b">r1\nGATTACA\nGATT\n").unwrap();
        file.flush().unwrap();
        assert_eq!(load_sequence(file.path()).unwrap(), b"GATTACAGATT");
    }

    #[test]
    fn test_load_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(load_sequence(file.path()).unwrap().is_empty());
    }
}
