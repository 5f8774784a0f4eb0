use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use csv::StringRecord;

use crate::{
    aggregate::{merge_rows, parse_rows},
    error::{AniError, Result},
    types::SimilarityMatrix,
};

pub const RESULT_HEADER: [&str; 5] = ["query", "subject", "ani", "size_q", "size_s"];

/// Raw log of every row the tool produced, in block-pair order, duplicates included.
///
/// Fields are copied as the tool wrote them, tab-joined, extra columns included.
pub struct ResultLog {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl ResultLog {
    /// Creates (or truncates) `path` and writes the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quote_style(csv::QuoteStyle::Never)
            .from_path(&path)?;
        writer.write_record(RESULT_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, path })
    }

    pub fn append(&mut self, records: &[StringRecord]) -> Result<()> {
        for record in records {
            self.writer.write_record(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

/// Loads a persisted result file (header plus five columns) into a normalized matrix.
pub fn read_similarities<P: AsRef<Path>>(
    path: P,
    extensions: &[String],
) -> Result<SimilarityMatrix> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut header = String::new();
    reader.read_line(&mut header)?;
    if header.split_whitespace().next() != Some(RESULT_HEADER[0]) {
        return Err(AniError::MalformedFile {
            path: path.to_path_buf(),
            line: 1,
            reason: format!("expected header '{}'", RESULT_HEADER.join("\t")),
        });
    }

    let rows = parse_rows(reader).map_err(|e| AniError::MalformedFile {
        path: path.to_path_buf(),
        line: e.line + 1,
        reason: e.reason,
    })?;

    let mut matrix = SimilarityMatrix::new();
    merge_rows(&rows, extensions, &mut matrix);
    Ok(matrix)
}

/// Writes the normalized matrix as `query\tsubject\tani`, sorted by identifiers.
pub fn write_matrix<W: Write>(out: W, matrix: &SimilarityMatrix) -> Result<()> {
    let mut writer = BufWriter::new(out);

    writeln!(writer, "query\tsubject\tani")?;
    for ((query, subject), ani) in matrix.sorted() {
        writeln!(writer, "{}\t{}\t{}", query, subject, ani)?;
    }

    writer.flush()?;
    Ok(())
}
