use std::{
    io::{BufWriter, Write},
    path::Path,
};

use tempfile::{NamedTempFile, TempPath};

use crate::error::Result;

/// A block's fasta paths written one per line to a temporary list-file.
///
/// The file is removed when the handle is dropped, on every exit path.
pub struct StagedBlock {
    file: NamedTempFile,
}

impl StagedBlock {
    pub fn stage<P: AsRef<Path>>(paths: &[P], dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("binani-block-")
            .suffix(".txt")
            .tempfile_in(dir)?;

        let mut writer = BufWriter::new(file.as_file());
        for path in paths {
            writeln!(writer, "{}", path.as_ref().display())?;
        }
        writer.flush()?;
        drop(writer);

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Removes the list-file now, reporting a failed removal instead of ignoring it.
    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

/// A reserved, not yet existing path for the tool's raw output.
///
/// Only the tool creates the file, so its absence after a run is detectable. Whatever
/// ends up at the path is removed on drop.
pub fn scratch_output(dir: &Path) -> Result<TempPath> {
    let path = tempfile::Builder::new()
        .prefix("binani-out-")
        .suffix(".tsv")
        .tempfile_in(dir)?
        .into_temp_path();
    std::fs::remove_file(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn stage_writes_one_path_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            PathBuf::from("/data/bins/g1.fna"),
            PathBuf::from("/data/bins/g2.fa"),
        ];
        let staged = StagedBlock::stage(&paths, dir.path()).unwrap();

        let content = std::fs::read_to_string(staged.path()).unwrap();
        assert_eq!(content, "/data/bins/g1.fna\n/data/bins/g2.fa\n");
    }

    #[test]
    fn staged_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedBlock::stage(&["a.fa"], dir.path()).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn staged_file_removed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedBlock::stage(&["a.fa", "b.fa"], dir.path()).unwrap();
        let path = staged.path().to_path_buf();
        staged.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn scratch_output_is_reserved_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = scratch_output(dir.path()).unwrap();
        let path = out.to_path_buf();
        assert!(!path.exists());

        std::fs::write(&path, "a.fa\tb.fa\t99.0\t1\t1\n").unwrap();
        drop(out);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
