use std::{fs::File, io::BufReader, path::Path};

use flate2::read::GzDecoder;
use seq_io::fasta::{Reader, Record};

use crate::error::{AniError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceStats {
    pub records: usize,
    pub length: u64,
}

/// Counts records and bases of a (possibly gzipped) nucleotide fasta.
pub fn sequence_stats<P>(path: P) -> Result<SequenceStats>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let invalid = |reason: String| AniError::InvalidSequenceFile {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let buf_reader: Box<dyn std::io::BufRead> = if path.extension().map_or(false, |ext| ext == "gz")
    {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut reader = Reader::new(buf_reader);
    let mut stats = SequenceStats::default();

    while let Some(record) = reader.next() {
        let record = record.map_err(|e| invalid(e.to_string()))?;
        stats.records += 1;
        stats.length += record.owned_seq().len() as u64;
    }

    if stats.records == 0 {
        return Err(invalid("no sequences".to_string()));
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn counts_records_and_bases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g1.fna");
        std::fs::write(&path, ">c1 desc\nACGT\nAC\n>c2\nGGGG\n").unwrap();

        let stats = sequence_stats(&path).unwrap();
        assert_eq!(stats, SequenceStats { records: 2, length: 10 });
    }

    #[test]
    fn reads_gzipped_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g2.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b">c1\nACGTACGT\n").unwrap();
        encoder.finish().unwrap();

        let stats = sequence_stats(&path).unwrap();
        assert_eq!(stats, SequenceStats { records: 1, length: 8 });
    }

    #[test]
    fn empty_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fa");
        std::fs::write(&path, "").unwrap();

        assert!(matches!(
            sequence_stats(&path),
            Err(AniError::InvalidSequenceFile { .. })
        ));
    }

    #[test]
    fn missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            sequence_stats(dir.path().join("absent.fa")),
            Err(AniError::InvalidSequenceFile { .. })
        ));
    }
}
