use std::{collections::HashMap, path::Path};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    aggregate::normalize_id,
    error::{AniError, Result},
    fasta::{sequence_stats, SequenceStats},
    types::BinRef,
};

pub(crate) fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Finds bin fastas in each directory by (case-insensitive) extension.
///
/// Bins are sorted by path within a directory so block layout does not depend on
/// directory listing order.
pub fn discover_bins<P: AsRef<Path>>(bin_dirs: &[P], exts: &[String]) -> Result<Vec<BinRef>> {
    let mut bins = Vec::new();

    for dir in bin_dirs {
        let dir = dir.as_ref();
        let mut bin_paths = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                    let filename = filename.to_lowercase();
                    exts.iter().any(|ext| filename.ends_with(ext.as_str()))
                } else {
                    false
                }
            })
            .collect::<Vec<_>>();

        if bin_paths.is_empty() {
            return Err(AniError::NoBins(dir.display().to_string()));
        }
        bin_paths.sort();
        info!("Found {} bins in {}", bin_paths.len(), dir.display());

        bins.extend(bin_paths.into_iter().map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| normalize_id(n, exts))
                .unwrap_or_default();
            BinRef { name, path }
        }));
    }
    Ok(bins)
}

/// Reads a headerless `name<TAB>path` table; lines starting with `#` are skipped.
pub fn read_bin_table<P: AsRef<Path>>(path: P) -> Result<Vec<BinRef>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)?;

    let bins = reader
        .deserialize::<BinRef>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if bins.is_empty() {
        return Err(AniError::NoBins(path.display().to_string()));
    }
    Ok(bins)
}

/// Flags bins whose fasta file names normalize to the same identifier.
///
/// Their similarities would collapse onto one key. With `strict` this is an error,
/// otherwise each collision is logged.
pub fn check_duplicate_ids(bins: &[BinRef], exts: &[String], strict: bool) -> Result<usize> {
    let mut seen: HashMap<String, &BinRef> = HashMap::new();
    let mut duplicates = 0;

    for bin in bins {
        let raw = bin.path.to_string_lossy();
        let id = normalize_id(&raw, exts);
        if let Some(first) = seen.get(&id) {
            if strict {
                return Err(AniError::DuplicateIdentifier {
                    id,
                    first: first.path.clone(),
                    second: bin.path.clone(),
                });
            }
            warn!(
                "Bins {} ({}) and {} ({}) both map to identifier '{}', \
                 their similarities will overwrite each other",
                first.name,
                first.path.display(),
                bin.name,
                bin.path.display(),
                id
            );
            duplicates += 1;
        } else {
            seen.insert(id, bin);
        }
    }
    Ok(duplicates)
}

/// Parses every bin fasta in parallel, failing on the first unreadable or empty one.
pub fn check_bins(bins: &[BinRef], progress: bool) -> Result<Vec<SequenceStats>> {
    let pb = progress_bar(bins.len() as u64, progress);
    pb.set_message("Checking bins...");

    let stats = bins
        .par_iter()
        .progress_with(pb)
        .map(|bin| sequence_stats(&bin.path))
        .collect::<Result<Vec<_>>>()?;

    let total: u64 = stats.iter().map(|s| s.length).sum();
    info!("Checked {} bins, {} bp in total", stats.len(), total);
    Ok(stats)
}
