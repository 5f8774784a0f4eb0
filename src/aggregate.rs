use std::io::Read;

use thiserror::Error;

use csv::StringRecord;

use crate::types::{RawRow, SimilarityMatrix};

pub const RAW_COLUMNS: usize = 5;

/// A row that could not be turned into a [`RawRow`]; callers attach where it came from.
#[derive(Debug, Error)]
#[error("line {line}: {reason}")]
pub struct RowError {
    pub line: u64,
    pub reason: String,
}

/// Lower-cases extensions and makes sure each starts with a dot.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .filter(|e| !e.is_empty() && e != ".")
        .map(|e| if e.starts_with('.') { e } else { format!(".{e}") })
        .collect()
}

/// Base name of `raw` with the longest matching extension removed.
///
/// This is not a plain case-sensitive strip of the last dot segment. Matching ignores
/// ASCII case, so `G4.FNA` becomes `G4` rather than staying whole. A name that would
/// become empty is left whole, so `.fa` stays `.fa` rather than turning into `""`.
pub fn normalize_id(raw: &str, extensions: &[String]) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw);

    let stem = extensions
        .iter()
        .filter_map(|ext| strip_suffix_ignore_case(base, ext))
        .filter(|stem| !stem.is_empty())
        .min_by_key(|stem| stem.len());

    stem.unwrap_or(base).to_string()
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    if s.is_char_boundary(cut) && s[cut..].eq_ignore_ascii_case(suffix) {
        Some(&s[..cut])
    } else {
        None
    }
}

/// Typed rows of one tool output, next to the fields exactly as the tool wrote them.
#[derive(Debug, Default)]
pub struct ToolOutput {
    pub rows: Vec<RawRow>,
    pub records: Vec<StringRecord>,
}

/// Reads headerless tab-separated tool output.
///
/// Rows need at least five columns. Columns past the fifth are kept in `records` only.
pub fn parse_output<R: Read>(reader: R) -> Result<ToolOutput, RowError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut output = ToolOutput::default();
    for result in reader.records() {
        let record = result.map_err(|e| RowError {
            line: e.position().map_or(0, |p| p.line()),
            reason: e.to_string(),
        })?;
        let line = record.position().map_or(0, |p| p.line());
        output.rows.push(parse_record(&record, line)?);
        output.records.push(record);
    }
    Ok(output)
}

pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, RowError> {
    Ok(parse_output(reader)?.rows)
}

fn parse_record(record: &StringRecord, line: u64) -> Result<RawRow, RowError> {
    if record.len() < RAW_COLUMNS {
        return Err(RowError {
            line,
            reason: format!("{} columns, expected {}", record.len(), RAW_COLUMNS),
        });
    }
    let field = |i: usize| record[i].trim();
    let number_err = |name: &str, value: &str| RowError {
        line,
        reason: format!("{name} '{value}' is not a number"),
    };

    Ok(RawRow {
        query: field(0).to_string(),
        subject: field(1).to_string(),
        ani: field(2)
            .parse()
            .map_err(|_| number_err("similarity", field(2)))?,
        size_q: field(3)
            .parse()
            .map_err(|_| number_err("query size", field(3)))?,
        size_s: field(4)
            .parse()
            .map_err(|_| number_err("subject size", field(4)))?,
    })
}

/// Merges rows into `matrix` under normalized identifiers, last write wins.
pub fn merge_rows(rows: &[RawRow], extensions: &[String], matrix: &mut SimilarityMatrix) {
    for row in rows {
        matrix.insert(
            normalize_id(&row.query, extensions),
            normalize_id(&row.subject, extensions),
            row.ani,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_EXTENSIONS;

    fn exts() -> Vec<String> {
        normalize_extensions(&DEFAULT_EXTENSIONS)
    }

    #[test]
    fn normalize_known_and_unknown_extensions() {
        let exts = exts();
        assert_eq!(normalize_id("genomeA.fna", &exts), "genomeA");
        assert_eq!(normalize_id("genomeB.contigs", &exts), "genomeB.contigs");
        assert_eq!(normalize_id("/data/bins/g3.fasta", &exts), "g3");
        assert_eq!(normalize_id("bin.12.fa", &exts), "bin.12");
        assert_eq!(normalize_id("G4.FNA", &exts), "G4");
        assert_eq!(normalize_id(".fa", &exts), ".fa");
        assert_eq!(normalize_id("g5.fa.gz", &exts), "g5.fa.gz");
    }

    #[test]
    fn normalize_is_idempotent() {
        let exts = exts();
        for raw in ["genomeA.fna", "genomeB.contigs", "x/y/bin.3.ffn", "plain"] {
            let once = normalize_id(raw, &exts);
            assert_eq!(normalize_id(&once, &exts), once);
        }
    }

    #[test]
    fn longest_extension_wins() {
        let exts = normalize_extensions(&["gz", ".fa.gz"]);
        assert_eq!(exts, vec![".gz", ".fa.gz"]);
        assert_eq!(normalize_id("g5.fa.gz", &exts), "g5");
    }

    #[test]
    fn parse_fastani_rows() {
        let data = "/b/g1.fna\t/b/g2.fa\t97.8123\t812\t901\n/b/g2.fa\t/b/g1.fna\t97.79\t800\t812\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            RawRow {
                query: "/b/g1.fna".to_string(),
                subject: "/b/g2.fa".to_string(),
                ani: 97.8123,
                size_q: 812,
                size_s: 901,
            }
        );
    }

    #[test]
    fn short_row_is_rejected() {
        let data = "a.fa\tb.fa\t99.0\t10\t10\na.fa\tc.fa\t98.0\n";
        let err = parse_rows(data.as_bytes()).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.reason.contains("3 columns"));
    }

    #[test]
    fn non_numeric_similarity_is_rejected() {
        let err = parse_rows("a.fa\tb.fa\tNaNish\t1\t1\n".as_bytes()).unwrap_err();
        assert!(err.reason.contains("similarity"));
    }

    #[test]
    fn records_keep_tool_text() {
        let output = parse_output("a.fa\tb.fa\t99.50\t10\t12\textra\n".as_bytes()).unwrap();
        assert_eq!(output.rows[0].ani, 99.5);
        assert_eq!(
            output.records[0].iter().collect::<Vec<_>>(),
            vec!["a.fa", "b.fa", "99.50", "10", "12", "extra"]
        );
    }

    #[test]
    fn empty_output_has_no_rows() {
        assert!(parse_rows("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn merge_normalizes_and_overwrites() {
        let exts = exts();
        let rows = parse_rows(
            "/b/x.fna\t/b/y.fa\t95.0\t1\t1\n/other/x.fa\ty.fasta\t96.5\t1\t1\n".as_bytes(),
        )
        .unwrap();
        let mut matrix = SimilarityMatrix::new();
        merge_rows(&rows, &exts, &mut matrix);

        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get("x", "y"), Some(96.5));
    }
}
