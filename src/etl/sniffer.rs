//! Header sniffing for raw open-data CSV exports.
//!
//! Municipal dumps carry an unpredictable number of metadata lines before
//! the real header, an unpredictable field separator, and inconsistent
//! column casing. The sniffer scans for the first line whose token set
//! covers every expected column and reports its line index together with
//! the separator that produced the match.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;

/// Required column names, matched case-insensitively and in any order.
#[derive(Debug, Clone)]
pub struct ExpectedSchema {
    columns: Vec<&'static str>,
}

impl Default for ExpectedSchema {
    fn default() -> Self {
        Self {
            columns: vec!["date", "id_station", "id_parameter", "value", "unit"],
        }
    }
}

impl ExpectedSchema {
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// True when `tokens` is a superset of the required columns. Extra
    /// columns are allowed; they are ignored downstream.
    fn covered_by(&self, tokens: &HashSet<&str>) -> bool {
        self.columns.iter().all(|c| tokens.contains(c))
    }
}

/// Field separator of the tabular region.
///
/// `Whitespace` stands for runs of blanks and is only tried after every
/// delimiter candidate has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Semicolon,
    Tab,
    Whitespace,
}

impl Separator {
    /// Delimiter candidates in tie-break priority order. `Whitespace` is
    /// the fallback and not part of this list.
    pub const PRIORITY: [Separator; 3] = [Separator::Comma, Separator::Semicolon, Separator::Tab];

    fn as_char(self) -> Option<char> {
        match self {
            Separator::Comma => Some(','),
            Separator::Semicolon => Some(';'),
            Separator::Tab => Some('\t'),
            Separator::Whitespace => None,
        }
    }

    /// Splits `line` into cleaned tokens: separated, trimmed, and stripped
    /// of surrounding quotes. A token is only unquoted at its outer edges;
    /// quotes embedding the separator are not rebalanced.
    pub fn tokenize(self, line: &str) -> Vec<String> {
        match self.as_char() {
            Some(sep) => line.split(sep).map(clean_token).collect(),
            None => line.split_whitespace().map(clean_token).collect(),
        }
    }
}

fn clean_token(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

/// Result of a successful sniff: where the header sits and how to split
/// the rows below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSpec {
    pub line_index: usize,
    pub separator: Separator,
}

/// Scans `reader` line by line for the first header candidate.
///
/// Each line is lower-cased and trimmed, then tested against every
/// delimiter in [`Separator::PRIORITY`] and finally against whitespace
/// runs. The first line with a matching split wins; ties on the same line
/// resolve in priority order. Returns `None` when no line in the source
/// matches.
pub fn sniff_header<R: BufRead>(reader: R, schema: &ExpectedSchema) -> Result<Option<HeaderSpec>> {
    for (line_index, line) in lossy_lines(reader).enumerate() {
        let low = line?.trim().to_lowercase();

        for separator in Separator::PRIORITY {
            if matches_schema(separator, &low, schema) {
                return Ok(Some(HeaderSpec {
                    line_index,
                    separator,
                }));
            }
        }

        if matches_schema(Separator::Whitespace, &low, schema) {
            return Ok(Some(HeaderSpec {
                line_index,
                separator: Separator::Whitespace,
            }));
        }
    }

    Ok(None)
}

fn matches_schema(separator: Separator, line: &str, schema: &ExpectedSchema) -> bool {
    let tokens = separator.tokenize(line);
    let set: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    schema.covered_by(&set)
}

/// Bounded diagnostic read of the first `n` lines, kept separate from the
/// scan pass so failure reporting never touches parser state.
pub fn preview_lines(path: &Path, n: usize) -> Result<String> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::with_capacity(n);
    for line in lossy_lines(reader).take(n) {
        lines.push(format!("- {}", line?.trim()));
    }
    Ok(lines.join("\n"))
}

/// Line iterator that replaces invalid UTF-8 instead of failing the read.
/// Strips trailing `\n` / `\r\n`.
pub(crate) fn lossy_lines<R: BufRead>(
    mut reader: R,
) -> impl Iterator<Item = std::io::Result<String>> {
    std::iter::from_fn(move || {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sniff(input: &str) -> Option<HeaderSpec> {
        sniff_header(Cursor::new(input), &ExpectedSchema::default()).unwrap()
    }

    #[test]
    fn test_comma_header_at_first_line() {
        let spec = sniff("date,id_station,id_parameter,value,unit\n").unwrap();
        assert_eq!(spec.line_index, 0);
        assert_eq!(spec.separator, Separator::Comma);
    }

    #[test]
    fn test_header_after_preamble() {
        let input = "\
Secretaria del Medio Ambiente
Red Automatica de Monitoreo Atmosferico
Datos horarios
DATE,ID_STATION,ID_PARAMETER,VALUE,UNIT
2024-01-01 01:00,MER,O3,31.0,ppb
";
        let spec = sniff(input).unwrap();
        assert_eq!(spec.line_index, 3);
        assert_eq!(spec.separator, Separator::Comma);
    }

    #[test]
    fn test_semicolon_and_tab_separators() {
        let spec = sniff("date;id_station;id_parameter;value;unit\n").unwrap();
        assert_eq!(spec.separator, Separator::Semicolon);

        let spec = sniff("date\tid_station\tid_parameter\tvalue\tunit\n").unwrap();
        assert_eq!(spec.separator, Separator::Tab);
    }

    #[test]
    fn test_whitespace_fallback() {
        let spec = sniff("date  id_station id_parameter   value unit\n").unwrap();
        assert_eq!(spec.separator, Separator::Whitespace);
    }

    #[test]
    fn test_comma_wins_tie_against_whitespace() {
        // Spaced-out commas match under both the comma split and the
        // whitespace fallback; the fixed priority picks comma.
        let spec = sniff("date , id_station , id_parameter , value , unit\n").unwrap();
        assert_eq!(spec.separator, Separator::Comma);
    }

    #[test]
    fn test_extra_columns_are_permitted() {
        let spec = sniff("date,id_station,id_parameter,value,unit,flag,source\n").unwrap();
        assert_eq!(spec.line_index, 0);
        assert_eq!(spec.separator, Separator::Comma);
    }

    #[test]
    fn test_quoted_tokens_are_stripped() {
        let spec = sniff("\"date\",\"id_station\",\"id_parameter\",\"value\",\"unit\"\n").unwrap();
        assert_eq!(spec.separator, Separator::Comma);
    }

    #[test]
    fn test_first_matching_line_wins() {
        // A metadata line that happens to contain all expected tokens wins
        // over the real header below it. Known limitation of the scan
        // order; the precedence is fixed.
        let input = "\
columns: date,id_station,id_parameter,value,unit
date,id_station,id_parameter,value,unit
";
        let spec = sniff(input).unwrap();
        assert_eq!(spec.line_index, 0);
    }

    #[test]
    fn test_no_match_returns_none() {
        let input = "\
just some text
fecha,estacion,parametro
1,2,3
";
        assert_eq!(sniff(input), None);
    }

    #[test]
    fn test_incomplete_schema_returns_none() {
        assert_eq!(sniff("date,id_station,value,unit\n"), None);
    }

    #[test]
    fn test_preview_is_bounded() {
        let dir = std::env::temp_dir().join("datapulse_sniffer_preview");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("input.csv");
        std::fs::write(&path, "line one\nline two\nline three\nline four\n").unwrap();

        let preview = preview_lines(&path, 2).unwrap();
        assert_eq!(preview, "- line one\n- line two");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_lossy_lines_tolerates_invalid_utf8() {
        let bytes: &[u8] = b"metadata \xff\xfe line\ndate,id_station,id_parameter,value,unit\n";
        let spec = sniff_header(Cursor::new(bytes), &ExpectedSchema::default())
            .unwrap()
            .unwrap();
        assert_eq!(spec.line_index, 1);
        assert_eq!(spec.separator, Separator::Comma);
    }
}
