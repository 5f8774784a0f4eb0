use std::{collections::HashMap, fmt, path::PathBuf, str::FromStr, time::Duration};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AniError;

/// Extensions stripped from identifiers when none are configured.
pub const DEFAULT_EXTENSIONS: [&str; 4] = [".fa", ".fna", ".fasta", ".ffn"];

/// A genome bin and the nucleotide fasta holding its contigs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRef {
    pub name: String,
    pub path: PathBuf,
}

impl BinRef {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, path: P) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One line of similarity tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub query: String,
    pub subject: String,
    pub ani: f64,
    pub size_q: u64,
    pub size_s: u64,
}

/// Ordered (query block, reference block) indices driving one tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPair {
    pub query: usize,
    pub reference: usize,
}

impl BlockPair {
    pub fn new(query: usize, reference: usize) -> Self {
        Self { query, reference }
    }
}

impl fmt::Display for BlockPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.query, self.reference)
    }
}

pub type PairKey = (String, String);

/// Normalized (query, subject) identifiers mapped to their similarity value.
///
/// Not symmetric: (a, b) and (b, a) are independent entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    values: HashMap<PairKey, f64>,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; returns the value that was replaced.
    pub fn insert<Q, S>(&mut self, query: Q, subject: S, value: f64) -> Option<f64>
    where
        Q: Into<String>,
        S: Into<String>,
    {
        self.values.insert((query.into(), subject.into()), value)
    }

    pub fn get(&self, query: &str, subject: &str) -> Option<f64> {
        self.values
            .get(&(query.to_string(), subject.to_string()))
            .copied()
    }

    pub fn contains(&self, query: &str, subject: &str) -> bool {
        self.get(query, subject).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries ordered by (query, subject), for stable output.
    pub fn sorted(&self) -> Vec<(&PairKey, f64)> {
        let mut entries: Vec<_> = self.values.iter().map(|(k, v)| (k, *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMethod {
    FastAni,
}

impl FromStr for SimilarityMethod {
    type Err = AniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("fastani") {
            Ok(SimilarityMethod::FastAni)
        } else {
            Err(AniError::UnsupportedMethod(s.to_string()))
        }
    }
}

/// Which block pairs get compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Pairing {
    /// Every ordered pair, both (i, j) and (j, i).
    #[default]
    Full,
    /// Pairs with i <= j only. Assumes the tool reports both directions.
    Triangular,
}

/// What happens once a block pair has failed and used up its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FailurePolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct AniConfig {
    pub method: SimilarityMethod,
    pub block_size: usize,
    pub threads: usize,
    pub output: Option<PathBuf>,
    pub program: String,
    pub extensions: Vec<String>,
    pub pairing: Pairing,
    pub on_failure: FailurePolicy,
    pub retries: u32,
    pub timeout: Option<Duration>,
    pub temp_dir: Option<PathBuf>,
    pub strict_ids: bool,
    pub progress: bool,
}

impl Default for AniConfig {
    fn default() -> Self {
        Self {
            method: SimilarityMethod::FastAni,
            block_size: 500,
            threads: 1,
            output: None,
            program: "fastANI".to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            pairing: Pairing::Full,
            on_failure: FailurePolicy::Abort,
            retries: 0,
            timeout: None,
            temp_dir: None,
            strict_ids: false,
            progress: true,
        }
    }
}

impl AniConfig {
    pub fn validate(&self) -> Result<(), AniError> {
        if self.block_size == 0 {
            return Err(AniError::InvalidConfig(
                "block size must be a positive integer".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(AniError::InvalidConfig(
                "thread count must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing() {
        assert_eq!(
            "fastANI".parse::<SimilarityMethod>().unwrap(),
            SimilarityMethod::FastAni
        );
        assert_eq!(
            "FASTANI".parse::<SimilarityMethod>().unwrap(),
            SimilarityMethod::FastAni
        );
        let err = "skani".parse::<SimilarityMethod>().unwrap_err();
        assert!(matches!(err, AniError::UnsupportedMethod(m) if m == "skani"));
    }

    #[test]
    fn config_rejects_zero_block_size() {
        let config = AniConfig {
            block_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AniError::InvalidConfig(_))));
        assert!(AniConfig::default().validate().is_ok());
    }

    #[test]
    fn matrix_last_write_wins() {
        let mut matrix = SimilarityMatrix::new();
        assert_eq!(matrix.insert("x", "y", 97.5), None);
        assert_eq!(matrix.insert("x", "y", 98.1), Some(97.5));
        assert_eq!(matrix.get("x", "y"), Some(98.1));
        assert_eq!(matrix.get("y", "x"), None);
        assert_eq!(matrix.len(), 1);
    }
}
