//! Batched all-vs-all average nucleotide identity between genome bins.
//!
//! Bins are split into blocks, the external tool runs once per (query, reference)
//! block pair, and its rows are merged into one [`SimilarityMatrix`] keyed by bin
//! identifiers with fasta extensions stripped.

pub mod aggregate;
pub mod blocks;
pub mod cli;
pub mod compare;
pub mod engine;
pub mod error;
pub mod fasta;
pub mod io;
pub mod output;
pub mod staging;
pub mod types;

pub use compare::{compute_anis, run_blocks, AniRun};
pub use engine::{FastAni, SimilarityEngine};
pub use error::{AniError, Result};
pub use types::{
    AniConfig, BinRef, BlockPair, FailurePolicy, Pairing, RawRow, SimilarityMatrix,
    SimilarityMethod,
};
