use std::{
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    aggregate::{merge_rows, normalize_extensions, parse_output, ToolOutput},
    blocks::{block_pairs, partition},
    engine::{FastAni, SimilarityEngine},
    error::{AniError, Result},
    io::{check_duplicate_ids, progress_bar},
    output::ResultLog,
    staging::{scratch_output, StagedBlock},
    types::{
        AniConfig, BinRef, BlockPair, FailurePolicy, SimilarityMatrix, SimilarityMethod,
    },
};

/// Outcome of a batched all-vs-all run.
#[derive(Debug, Default)]
pub struct AniRun {
    pub matrix: SimilarityMatrix,
    /// Tool invocations, retries included.
    pub invocations: usize,
    /// Raw rows merged, duplicates included.
    pub rows: usize,
    pub skipped: Vec<BlockPair>,
    /// The persisted raw log, when one was requested.
    pub output: Option<PathBuf>,
}

/// Pairwise similarities between all `bins` using the configured method.
///
/// Fails before touching the disk when the tool cannot be found.
pub fn compute_anis(bins: &[BinRef], config: &AniConfig) -> Result<AniRun> {
    config.validate()?;
    let engine = match config.method {
        SimilarityMethod::FastAni => {
            FastAni::new(&config.program)?.with_timeout(config.timeout)
        }
    };
    run_blocks(bins, config, &engine)
}

/// Drives `engine` over every block pair and merges its output.
///
/// Pairs run one at a time in row-major order, so when the same identifier pair shows
/// up in several block pairs the value from the last one processed is kept.
pub fn run_blocks<E: SimilarityEngine>(
    bins: &[BinRef],
    config: &AniConfig,
    engine: &E,
) -> Result<AniRun> {
    config.validate()?;
    let exts = normalize_extensions(&config.extensions);
    check_duplicate_ids(bins, &exts, config.strict_ids)?;

    let paths: Vec<&Path> = bins.iter().map(|b| b.path.as_path()).collect();
    let blocks = partition(&paths, config.block_size)?;
    if blocks.len() > 1 {
        info!(
            "You have more than {} bins, so {} will run in {} blocks, \
             if it crashes due to memory, make smaller blocks",
            config.block_size,
            engine.name(),
            blocks.len()
        );
    }

    let temp_dir = config.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
    let mut log = config.output.as_ref().map(ResultLog::create).transpose()?;

    let pairs = block_pairs(blocks.len(), config.pairing);
    let pb = progress_bar(pairs.len() as u64, config.progress);
    let mut run = AniRun::default();

    for pair in pairs {
        info!("doing block {} and {}", pair.query, pair.reference);
        pb.set_message(format!("block pair {pair}"));

        let attempt = compare_with_retries(
            engine,
            pair,
            blocks[pair.query],
            blocks[pair.reference],
            &temp_dir,
            config,
            &mut run.invocations,
        );
        let output = match attempt {
            Ok(output) => output,
            Err(e) if e.block_pair().is_some() && config.on_failure == FailurePolicy::Skip => {
                warn!("Skipping block pair {}: {}", pair, e);
                run.skipped.push(pair);
                pb.inc(1);
                continue;
            }
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };

        if let Some(log) = log.as_mut() {
            log.append(&output.records)?;
        }
        run.rows += output.rows.len();
        merge_rows(&output.rows, &exts, &mut run.matrix);
        pb.inc(1);
    }
    pb.finish_and_clear();

    run.output = log.map(ResultLog::finish).transpose()?;
    info!(
        "{} invocations, {} rows, {} similarities, {} block pairs skipped",
        run.invocations,
        run.rows,
        run.matrix.len(),
        run.skipped.len()
    );
    Ok(run)
}

fn compare_with_retries<E: SimilarityEngine>(
    engine: &E,
    pair: BlockPair,
    query: &[&Path],
    reference: &[&Path],
    temp_dir: &Path,
    config: &AniConfig,
    invocations: &mut usize,
) -> Result<ToolOutput> {
    let mut attempt = 0;
    loop {
        *invocations += 1;
        match compare_pair(engine, pair, query, reference, temp_dir, config.threads) {
            Err(e) if e.block_pair().is_some() && attempt < config.retries => {
                attempt += 1;
                warn!("{}, retrying ({}/{})", e, attempt, config.retries);
            }
            result => return result,
        }
    }
}

/// One invocation: stage both blocks, run the engine, parse its output.
///
/// Staged lists and the raw output are removed on every exit path.
fn compare_pair<E: SimilarityEngine>(
    engine: &E,
    pair: BlockPair,
    query: &[&Path],
    reference: &[&Path],
    temp_dir: &Path,
    threads: usize,
) -> Result<ToolOutput> {
    let staged_query = StagedBlock::stage(query, temp_dir)?;
    let staged_reference = StagedBlock::stage(reference, temp_dir)?;
    let output = scratch_output(temp_dir)?;

    engine.compare(
        pair,
        staged_query.path(),
        staged_reference.path(),
        &output,
        threads,
    )?;
    let file = File::open(&output).map_err(|source| match source.kind() {
        ErrorKind::NotFound => AniError::MissingOutput {
            pair,
            path: output.to_path_buf(),
        },
        _ => AniError::ToolIo { pair, source },
    })?;
    let parsed = parse_output(file).map_err(|e| AniError::MalformedRow {
        pair,
        line: e.line,
        reason: e.reason,
    })?;

    output.close()?;
    staged_reference.close()?;
    staged_query.close()?;
    Ok(parsed)
}
