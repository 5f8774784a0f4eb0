use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    aggregate::normalize_extensions,
    error::Result,
    types::{AniConfig, FailurePolicy, Pairing},
};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Batched all-vs-all ANI between genome bins")]
pub struct Args {
    #[arg(short, long, num_args(1..), help = "Directories with bins")]
    pub bin_dirs: Vec<PathBuf>,

    #[arg(long, help = "Tab-separated table of bin name and nucleotide fasta path")]
    pub bin_table: Option<PathBuf>,

    #[arg(long, help = "Precomputed pairwise similarities, skips running the tool")]
    pub similarities: Option<PathBuf>,

    #[arg(short, long, default_value = "fastANI", help = "Similarity method")]
    pub method: String,

    #[arg(long, default_value = "fastANI", help = "Name or path of the similarity tool")]
    pub program: String,

    #[arg(
        short = 's',
        long,
        default_value_t = 500,
        help = "Bins per block, lower it if the tool runs out of memory"
    )]
    pub block_size: usize,

    #[arg(short, long, default_value_t = 1, help = "Threads passed to the tool")]
    pub threads: usize,

    #[arg(short, long, help = "Keep the raw pairwise results in this file")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Write the normalized similarity matrix to this file instead of stdout")]
    pub matrix: Option<PathBuf>,

    #[arg(
        short,
        long,
        num_args(1..),
        default_values = vec![".fa", ".fna", ".fasta", ".ffn"],
        help = "Extensions of bin fastas, stripped from identifiers"
    )]
    pub extensions: Vec<String>,

    #[arg(long, value_enum, default_value_t = Pairing::Full, help = "Block pairs to compare")]
    pub pairing: Pairing,

    #[arg(
        long,
        value_enum,
        default_value_t = FailurePolicy::Abort,
        help = "What to do when a block pair fails"
    )]
    pub on_failure: FailurePolicy,

    #[arg(long, default_value_t = 0, help = "Extra attempts for a failed block pair")]
    pub retries: u32,

    #[arg(long, help = "Seconds before a tool invocation is killed")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Directory for temporary list and output files")]
    pub temp_dir: Option<PathBuf>,

    #[arg(long, help = "Fail when two bins map to the same identifier")]
    pub strict_ids: bool,

    #[arg(long, help = "Parse every bin fasta before running the tool")]
    pub check_bins: bool,

    #[arg(long, help = "Hide progress bars")]
    pub no_progress: bool,
}

pub fn parse_args() -> Args {
    let mut args = Args::parse();

    args.extensions = normalize_extensions(&args.extensions);
    args
}

impl Args {
    pub fn to_config(&self) -> Result<AniConfig> {
        let config = AniConfig {
            method: self.method.parse()?,
            block_size: self.block_size,
            threads: self.threads,
            output: self.output.clone(),
            program: self.program.clone(),
            extensions: normalize_extensions(&self.extensions),
            pairing: self.pairing,
            on_failure: self.on_failure,
            retries: self.retries,
            timeout: self.timeout.map(Duration::from_secs),
            temp_dir: self.temp_dir.clone(),
            strict_ids: self.strict_ids,
            progress: !self.no_progress,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AniError;
    use crate::types::SimilarityMethod;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["binani", "-b", "bins"]).unwrap();
        let config = args.to_config().unwrap();

        assert_eq!(config.method, SimilarityMethod::FastAni);
        assert_eq!(config.block_size, 500);
        assert_eq!(config.threads, 1);
        assert_eq!(config.extensions, vec![".fa", ".fna", ".fasta", ".ffn"]);
        assert_eq!(config.pairing, Pairing::Full);
        assert_eq!(config.on_failure, FailurePolicy::Abort);
        assert!(config.output.is_none());
        assert!(config.timeout.is_none());
        assert!(config.progress);
    }

    #[test]
    fn options_map_onto_config() {
        let args = Args::try_parse_from([
            "binani",
            "--bin-table",
            "bins.tsv",
            "-s",
            "50",
            "-t",
            "8",
            "-e",
            "FNA",
            "--pairing",
            "triangular",
            "--on-failure",
            "skip",
            "--retries",
            "2",
            "--timeout",
            "3600",
            "-o",
            "anis.tsv",
        ])
        .unwrap();
        let config = args.to_config().unwrap();

        assert_eq!(config.block_size, 50);
        assert_eq!(config.threads, 8);
        assert_eq!(config.extensions, vec![".fna"]);
        assert_eq!(config.pairing, Pairing::Triangular);
        assert_eq!(config.on_failure, FailurePolicy::Skip);
        assert_eq!(config.retries, 2);
        assert_eq!(config.timeout, Some(Duration::from_secs(3600)));
        assert_eq!(config.output, Some(PathBuf::from("anis.tsv")));
    }

    #[test]
    fn unknown_method_is_unimplemented() {
        let args = Args::try_parse_from(["binani", "-b", "bins", "-m", "mash"]).unwrap();
        assert!(matches!(
            args.to_config(),
            Err(AniError::UnsupportedMethod(m)) if m == "mash"
        ));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let args = Args::try_parse_from(["binani", "-b", "bins", "-s", "0"]).unwrap();
        assert!(matches!(args.to_config(), Err(AniError::InvalidConfig(_))));
    }
}
