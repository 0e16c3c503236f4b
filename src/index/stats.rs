use crate::index::single::KmerIndex;
use crate::index::store::StoreKind;
use serde::Serialize;
use std::io::{self, Write};

/// Statistics for one single-k index
#[derive(Debug, Clone, Serialize)]
pub struct KStats {
    pub k: usize,
    pub store: StoreKind,
    /// sigma^k
    pub key_space: u64,
    /// Distinct k-mers present in the text
    pub distinct: usize,
    /// Stored positions (one per k-window)
    pub positions: usize,
    /// Longest position list
    pub max_bucket: usize,
    pub estimated_bytes: u64,
}

impl KStats {
    pub fn from_index(index: &KmerIndex) -> Self {
        let store = index.store();
        Self {
            k: index.k(),
            store: store.kind(),
            key_space: index.hasher().key_space(),
            distinct: store.distinct(),
            positions: store.position_count(),
            max_bucket: store
                .buckets()
                .iter()
                .map(|(_, list)| list.len())
                .max()
                .unwrap_or(0),
            estimated_bytes: store.estimated_bytes(),
        }
    }

    /// Fraction of the key space that occurs in the text
    pub fn occupancy(&self) -> f64 {
        if self.key_space == 0 {
            0.0
        } else {
            self.distinct as f64 / self.key_space as f64
        }
    }
}

/// Statistics for a whole multi-k index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub text_len: usize,
    pub sigma: usize,
    pub per_k: Vec<KStats>,
    pub total_bytes: u64,
}

impl IndexStats {
    pub fn collect<'a, I>(text_len: usize, sigma: usize, indices: I) -> Self
    where
        I: IntoIterator<Item = &'a KmerIndex>,
    {
        let per_k: Vec<KStats> = indices.into_iter().map(KStats::from_index).collect();
        let total_bytes = per_k.iter().map(|s| s.estimated_bytes).sum();
        Self {
            text_len,
            sigma,
            per_k,
            total_bytes,
        }
    }

    /// Print a human readable table
    pub fn write_human<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Index Statistics")?;
        writeln!(out, "================")?;
        writeln!(out)?;
        writeln!(out, "Text length:      {}", self.text_len)?;
        writeln!(out, "Alphabet size:    {}", self.sigma)?;
        writeln!(out, "k values:         {}", self.per_k.len())?;
        writeln!(out, "Estimated size:   {}", format_size(self.total_bytes))?;
        writeln!(out)?;
        writeln!(
            out,
            "  {:>4}  {:7}  {:>12}  {:>9}  {:>10}  {:>10}",
            "k", "store", "distinct", "occupancy", "max bucket", "size"
        )?;
        for s in &self.per_k {
            let store = match s.store {
                StoreKind::Direct => "direct",
                StoreKind::Hashed => "hashed",
            };
            writeln!(
                out,
                "  {:>4}  {:7}  {:>12}  {:>8.2}%  {:>10}  {:>10}",
                s.k,
                store,
                s.distinct,
                s.occupancy() * 100.0,
                s.max_bucket,
                format_size(s.estimated_bytes)
            )?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::IndexConfig;
    use crate::utils::alphabet::Alphabet;
    use std::sync::Arc;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_collect_and_render() {
        let a = Arc::new(Alphabet::dna());
        let config = IndexConfig::default();
        let i3 = KmerIndex::build(b"ACGTACGTAA", 3, Arc::clone(&a), &config).unwrap();
        let i4 = KmerIndex::build(b"ACGTACGTAA", 4, a, &config).unwrap();
        let stats = IndexStats::collect(10, 4, [&i3, &i4]);

        assert_eq!(stats.per_k.len(), 2);
        assert_eq!(stats.per_k[0].positions, 8);
        // ACG, CGT, GTA, TAC, TAA
        assert_eq!(stats.per_k[0].distinct, 5);
        assert_eq!(stats.per_k[0].max_bucket, 2);
        assert_eq!(stats.per_k[1].key_space, 256);

        let mut out = Vec::new();
        stats.write_human(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Text length:      10"));

        let json = stats.to_json().unwrap();
        assert!(json.contains("\"per_k\""));
        assert!(json.contains("\"k\": 4"));
    }
}
